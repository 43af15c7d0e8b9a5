use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with an env-filter and fmt layer.
///
/// Safe to call once per process; embedders that install their own
/// subscriber should skip this.
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "picnest=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
