use crate::config::LoggingConfig;
use crate::domains::logger::DomainLogger;
use std::sync::Arc;

/// Fans each line out to several loggers.
pub struct MultiLogger {
    sinks: Vec<Arc<dyn DomainLogger>>,
}

impl MultiLogger {
    pub fn new(sinks: Vec<Arc<dyn DomainLogger>>) -> Self {
        Self { sinks }
    }
}

impl DomainLogger for MultiLogger {
    fn info(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.info(msg));
    }

    fn warn(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.warn(msg));
    }

    fn error(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.error(msg));
    }

    fn debug(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.debug(msg));
    }
}

/// Builds the logger described by `config`: file and/or console, falling back
/// to the console when the file logger cannot start.
pub fn init_domain_logger(config: &LoggingConfig) -> Arc<dyn DomainLogger> {
    let console = crate::adapters::outbound::init_console_logger();

    let file = config.file.as_deref().and_then(|path| {
        match crate::adapters::outbound::init_file_logger(path, config.level_filter()) {
            Ok(logger) => Some(logger),
            Err(e) => {
                console.warn(&format!("{}; falling back to console logging", e));
                None
            }
        }
    });

    match (file, config.console) {
        (Some(file), true) => Arc::new(MultiLogger::new(vec![file, console])),
        (Some(file), false) => file,
        (None, _) => console,
    }
}
