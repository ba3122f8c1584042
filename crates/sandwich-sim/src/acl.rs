// ACCESS CONTROL LIST
// Aragon-style permission set keyed by (entity, app, role).

use ethers_core::types::{Address, H256};
use ethers_core::utils::keccak256;
use sandwich_core::ProtocolError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type Role = H256;

/// `keccak256("BURN_ROLE")`, required by the stETH token for `burnShares`.
pub fn burn_role() -> Role {
    H256::from(keccak256(b"BURN_ROLE"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acl {
    /// Permission manager (the DAO voting app)
    manager: Address,
    /// (entity, app, role)
    permissions: BTreeSet<(Address, Address, Role)>,
}

impl Acl {
    pub fn new(manager: Address) -> Self {
        Acl {
            manager,
            permissions: BTreeSet::new(),
        }
    }

    pub fn grant_permission(
        &mut self,
        entity: Address,
        app: Address,
        role: Role,
        sender: Address,
    ) -> Result<(), ProtocolError> {
        if sender != self.manager {
            return Err(ProtocolError::reverted("ACL", "ACL_AUTH_NO_MANAGER"));
        }
        if !self.permissions.insert((entity, app, role)) {
            return Err(ProtocolError::reverted("ACL", "ACL_EXISTENT_PERMISSION"));
        }
        Ok(())
    }

    pub fn revoke_permission(
        &mut self,
        entity: Address,
        app: Address,
        role: Role,
        sender: Address,
    ) -> Result<(), ProtocolError> {
        if sender != self.manager {
            return Err(ProtocolError::reverted("ACL", "ACL_AUTH_NO_MANAGER"));
        }
        self.permissions.remove(&(entity, app, role));
        Ok(())
    }

    pub fn has_permission(&self, entity: Address, app: Address, role: Role) -> bool {
        self.permissions.contains(&(entity, app, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_manager_grants() {
        let voting = Address::from_low_u64_be(1);
        let burner = Address::from_low_u64_be(2);
        let steth = Address::from_low_u64_be(3);
        let mut acl = Acl::new(voting);

        let err = acl.grant_permission(burner, steth, burn_role(), burner).unwrap_err();
        assert_eq!(err.revert_reason(), Some("ACL_AUTH_NO_MANAGER"));
        assert!(!acl.has_permission(burner, steth, burn_role()));

        acl.grant_permission(burner, steth, burn_role(), voting).unwrap();
        assert!(acl.has_permission(burner, steth, burn_role()));

        acl.revoke_permission(burner, steth, burn_role(), voting).unwrap();
        assert!(!acl.has_permission(burner, steth, burn_role()));
    }

    #[test]
    fn test_double_grant_rejected() {
        let voting = Address::from_low_u64_be(1);
        let mut acl = Acl::new(voting);
        let role = burn_role();
        acl.grant_permission(voting, voting, role, voting).unwrap();
        let err = acl.grant_permission(voting, voting, role, voting).unwrap_err();
        assert_eq!(err.revert_reason(), Some("ACL_EXISTENT_PERMISSION"));
    }
}
