//! Injected logging for the negotiation engine.
//!
//! Components never talk to a global logger directly: they hold an
//! `Arc<dyn LogSink>` and emit through the `sink_*!` macros, whose levels are
//! compiled in or out by the `log-*` cargo features.

pub mod log_level;
pub mod log_macros;
pub mod log_msg;
pub mod log_sink;
pub mod memory_log_sink;
pub mod noop_log_sink;
pub mod tracing_log_sink;

pub use log_level::LogLevel;
pub use log_sink::LogSink;
pub use memory_log_sink::MemoryLogSink;
pub use noop_log_sink::NoopLogSink;
pub use tracing_log_sink::TracingLogSink;
