use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when neither `REVDIFF_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "revdiff_core=info,revdiff_backends=info";

/// Installs a stderr subscriber filtered by `REVDIFF_LOG`, then `RUST_LOG`.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_env("REVDIFF_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
}
