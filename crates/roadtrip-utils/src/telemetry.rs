//! Logging setup

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence; `default_directive` (e.g. `roadtrip_subscription_core=debug`)
/// is added on top of it.
pub fn init_tracing(default_directive: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(default_directive.parse()?))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    tracing::debug!(directive = default_directive, "Tracing initialized");
    Ok(())
}

/// Install a test-writer subscriber; repeated calls are ignored
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
