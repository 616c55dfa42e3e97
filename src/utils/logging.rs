use anyhow::Error;
use tracing::span::Span;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
/// The `RUST_LOG` environment variable overrides the default `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub trait LogError {
    fn log_error(&self, error: Error);
}

impl LogError for Span {
    /// Logs the whole error chain inside the span, so that it carries the PR being handled.
    fn log_error(&self, error: Error) {
        self.in_scope(|| {
            tracing::error!("Error: {error:?}");
        });
    }
}
