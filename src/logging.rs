//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout stays reserved for command output.
//! The filter is read from `PM_LOG` (e.g. `PM_LOG=debug`, `PM_LOG=projectman::storage=trace`).

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "PM_LOG";

/// Filter used when `PM_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the global stderr subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
