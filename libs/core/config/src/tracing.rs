use crate::Environment;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// Default directives per environment. The quieted targets are the
// dependencies this workspace actually talks through: reqwest/hyper carry
// every retail-price page and ARM call, and tower-http logs each probe
// hit, so at debug level they would drown out the arbitration and poller
// logs that matter.
const PRODUCTION_DIRECTIVES: &str = "info,hyper=warn,reqwest=warn,tower_http=info";
const DEVELOPMENT_DIRECTIVES: &str = "debug,hyper=info,reqwest=info,tower_http=debug";

/// Install the global tracing subscriber.
///
/// Production emits JSON lines with module targets suppressed, ready for
/// a log pipeline; development keeps the pretty human-readable format.
/// `RUST_LOG` overrides the default directives in either environment.
/// Safe to call more than once: a second install is skipped, which tests
/// rely on.
pub fn init_tracing(environment: &Environment) {
    let directives = if environment.is_production() {
        PRODUCTION_DIRECTIVES
    } else {
        DEVELOPMENT_DIRECTIVES
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let installed = if environment.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .try_init()
    };

    match installed {
        Ok(()) => tracing::info!(environment = ?environment, "Tracing initialized"),
        Err(_) => debug!("Tracing subscriber already installed"),
    }
}

/// Install color-eyre panic and error report handlers.
///
/// Safe to call more than once; subsequent installs are ignored.
pub fn install_color_eyre() {
    if color_eyre::install().is_err() {
        debug!("color-eyre already installed, skipping re-installation");
    }
}
