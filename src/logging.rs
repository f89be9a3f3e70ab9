use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Used until the config has been read, and when its filter does not parse
pub const DEFAULT_FILTER: &str = "warn";

/// RUST_LOG wins over the configured filter; an unparsable filter falls
/// back to [`DEFAULT_FILTER`]
pub fn resolve_filter(env: Option<&str>, configured: &str) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Swaps the active filter once the config is known
pub struct LogFilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    env: Option<String>,
}

impl LogFilterHandle {
    pub fn apply_config(&self, configured: &str) {
        let filter = resolve_filter(self.env.as_deref(), configured);
        if let Err(e) = self.handle.reload(filter) {
            tracing::warn!(error = %e, "could not apply configured log filter");
        }
    }
}

/// Build the stderr subscriber with a reloadable filter
pub fn subscriber(
    env: Option<String>,
) -> (impl tracing::Subscriber + Send + Sync + 'static, LogFilterHandle) {
    let (filter, handle) = reload::Layer::new(resolve_filter(env.as_deref(), DEFAULT_FILTER));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));
    (subscriber, LogFilterHandle { handle, env })
}

/// Install the global subscriber. Call before anything that may log.
pub fn init() -> LogFilterHandle {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (subscriber, handle) = subscriber(env);
    subscriber.init();
    handle
}
