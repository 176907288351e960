//! Tracing setup for the `etm` binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "etm_client=info,reqwest=warn";
const VERBOSE_FILTER: &str = "etm_client=debug,reqwest=warn";

/// Install the global subscriber. Logs go to stderr so stdout stays usable
/// for CSV output.
///
/// `RUST_LOG` wins over the defaults unless `verbose` is set.
pub fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
    };

    let registry = tracing_subscriber::registry().with(filter);
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
}
