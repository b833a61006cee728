use crate::log::log_level::LogLevel;

/// Destination for log lines emitted by the engine components.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);

    /// Whether a line at `level` would be kept. The `sink_*!` macros skip
    /// formatting when this is false.
    fn enabled(&self, _level: LogLevel) -> bool {
        true
    }
}
