//! Logging bootstrap

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "ASSAY_LOG";

/// Install a stderr fmt subscriber
///
/// The filter comes from `ASSAY_LOG` (e.g. `ASSAY_LOG=assay_workflow=debug,info`);
/// when it is unset or unparsable, `default_filter` is used, and when that is
/// unparsable too, `info`. Calling this again after a subscriber is installed
/// does nothing.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Logging initialized");
    }
}
