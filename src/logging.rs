//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `verbose`.
/// Calling this twice is harmless.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "sitepipe=debug" } else { "sitepipe=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt().with_env_filter(env_filter).with_target(false).try_init();
}
