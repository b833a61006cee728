//! Leveled logging macros for any `LogSink`.
//!
//! Levels are compiled in by the `log-trace`, `log-debug`, `log-info`,
//! `log-warn` and `log-error` cargo features. A compiled-out level still
//! type-checks its arguments inside a dead branch, so no formatting happens
//! and captured variables do not turn into unused warnings.

#[doc(hidden)]
#[macro_export]
macro_rules! sink_log {
    ($sink:expr, $lvl:expr, $($arg:tt)*) => {{
        let __lvl = $lvl;
        let __sink = &$sink;
        if __sink.enabled(__lvl) {
            __sink.log(__lvl, &format!($($arg)*), module_path!());
        }
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! sink_off {
    ($sink:expr, $($arg:tt)*) => {{
        if false {
            let _ = &$sink;
            let _ = format_args!($($arg)*);
        }
    }};
}

#[cfg(feature = "log-trace")]
#[macro_export]
macro_rules! sink_trace {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::LogLevel::Trace, $($arg)*)
    };
}

#[cfg(not(feature = "log-trace"))]
#[macro_export]
macro_rules! sink_trace {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_off!($sink, $($arg)*)
    };
}

#[cfg(feature = "log-debug")]
#[macro_export]
macro_rules! sink_debug {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::LogLevel::Debug, $($arg)*)
    };
}

#[cfg(not(feature = "log-debug"))]
#[macro_export]
macro_rules! sink_debug {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_off!($sink, $($arg)*)
    };
}

#[cfg(feature = "log-info")]
#[macro_export]
macro_rules! sink_info {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::LogLevel::Info, $($arg)*)
    };
}

#[cfg(not(feature = "log-info"))]
#[macro_export]
macro_rules! sink_info {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_off!($sink, $($arg)*)
    };
}

#[cfg(feature = "log-warn")]
#[macro_export]
macro_rules! sink_warn {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::LogLevel::Warn, $($arg)*)
    };
}

#[cfg(not(feature = "log-warn"))]
#[macro_export]
macro_rules! sink_warn {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_off!($sink, $($arg)*)
    };
}

#[cfg(feature = "log-error")]
#[macro_export]
macro_rules! sink_error {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::LogLevel::Error, $($arg)*)
    };
}

#[cfg(not(feature = "log-error"))]
#[macro_export]
macro_rules! sink_error {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_off!($sink, $($arg)*)
    };
}
