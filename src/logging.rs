//! Logger initialisation.

use env_logger::Env;

/// Initialise the global logger, `info` unless `RUST_LOG` says otherwise.
/// Later calls are no-ops.
pub fn init() {
    let _ = env_logger::try_init_from_env(Env::default().default_filter_or("info"));
}

/// Logger for test binaries, captured per test.
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
