use tracing::Level;

use crate::log::{log_level::LogLevel, log_sink::LogSink};

/// Forwards sink messages to the `tracing` ecosystem.
///
/// The originating module path is attached as the `origin` field, since
/// `tracing` targets must be known at compile time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        match level {
            LogLevel::Trace => tracing::trace!(origin = target, "{msg}"),
            LogLevel::Debug => tracing::debug!(origin = target, "{msg}"),
            LogLevel::Info => tracing::info!(origin = target, "{msg}"),
            LogLevel::Warn => tracing::warn!(origin = target, "{msg}"),
            LogLevel::Error => tracing::error!(origin = target, "{msg}"),
        }
    }

    fn enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Trace => tracing::enabled!(Level::TRACE),
            LogLevel::Debug => tracing::enabled!(Level::DEBUG),
            LogLevel::Info => tracing::enabled!(Level::INFO),
            LogLevel::Warn => tracing::enabled!(Level::WARN),
            LogLevel::Error => tracing::enabled!(Level::ERROR),
        }
    }
}
