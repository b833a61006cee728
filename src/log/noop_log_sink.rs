use crate::log::{log_level::LogLevel, log_sink::LogSink};

/// Discards everything. Handy for unit tests that do not care about logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn log(&self, _level: LogLevel, _msg: &str, _target: &'static str) {}

    fn enabled(&self, _level: LogLevel) -> bool {
        false
    }
}
