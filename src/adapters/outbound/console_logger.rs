use crate::domains::logger::DomainLogger;
use std::sync::Arc;

/// Forwards domain log lines to whatever `tracing` subscriber the binary installed.
struct TracingBridge;

impl DomainLogger for TracingBridge {
    fn info(&self, msg: &str) {
        tracing::info!(target: "mission_tracker", "{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(target: "mission_tracker", "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "mission_tracker", "{}", msg);
    }

    fn debug(&self, msg: &str) {
        tracing::debug!(target: "mission_tracker", "{}", msg);
    }
}

/// Console logger backed by `tracing`; also the fallback when no file is configured.
pub fn init_console_logger() -> Arc<dyn DomainLogger> {
    Arc::new(TracingBridge)
}
