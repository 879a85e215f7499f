//! Bridge from the `log` facade onto a sink registry.
//!
//! Installed as the process logger, every enabled record is raised through
//! the registry as a diagnostic whose origin is the record's source file. The
//! sink chain may swallow it; everything else reaches the wrapped logger.

use crate::config::types::Severity;
use crate::sink::registry::SinkRegistry;
use log::{Level, Log, Metadata, Record, SetLoggerError};

pub const UNKNOWN_ORIGIN: &str = "<unknown>";

pub fn severity_for(level: Level) -> Severity {
    match level {
        Level::Error => Severity::UserError,
        Level::Warn => Severity::UserWarning,
        Level::Info | Level::Debug | Level::Trace => Severity::UserNotice,
    }
}

pub struct LogBridge<'r> {
    registry: &'r SinkRegistry,
    inner: Box<dyn Log>,
}

impl<'r> LogBridge<'r> {
    pub fn new(registry: &'r SinkRegistry, inner: Box<dyn Log>) -> Self {
        Self { registry, inner }
    }
}

impl LogBridge<'static> {
    /// Install the bridge as the global logger in front of an `env_logger`
    /// configured from `RUST_LOG`.
    pub fn init(registry: &'static SinkRegistry) -> Result<(), SetLoggerError> {
        let inner = env_logger::Builder::from_default_env().build();
        Self::init_with(registry, inner)
    }

    pub fn init_with(
        registry: &'static SinkRegistry,
        inner: env_logger::Logger,
    ) -> Result<(), SetLoggerError> {
        let max_level = inner.filter();
        log::set_boxed_logger(Box::new(Self::new(registry, Box::new(inner))))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for LogBridge<'_> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }

        let origin = record
            .file()
            .or_else(|| record.module_path())
            .unwrap_or(UNKNOWN_ORIGIN);
        let message = record.args().to_string();
        let suppressed = self.registry.raise(
            severity_for(record.level()),
            &message,
            origin,
            record.line().unwrap_or(0),
        );

        if !suppressed {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}
