//! Diagnostics go to stderr; stdout is reserved for predictions.

use tracing_subscriber::EnvFilter;

const VERBOSE_FILTER: &str = "price_predict=debug,price_model=debug";

/// Install the global subscriber. `RUST_LOG` applies unless `verbose` is set.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // a second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
