//! Diagnostic output gated by `GRAFTJIT_TRACE`.
//!
//! `GRAFTJIT_TRACE=1` enables trace and error messages, `GRAFTJIT_TRACE=full`
//! adds warnings. Messages are forwarded to the `log` facade under the
//! `graftjit` target, so the host application picks the sink.
use std::env;
use std::fmt::Arguments;

use once_cell::sync::Lazy;

#[derive(Clone, Copy, PartialEq, Eq)]
enum TraceLevel {
    Off,
    Basic,
    Full,
}

const TARGET: &str = "graftjit";

static TRACE_LEVEL: Lazy<TraceLevel> = Lazy::new(|| {
    env::var("GRAFTJIT_TRACE")
        .ok()
        .as_deref()
        .map(parse_trace_level)
        .unwrap_or(TraceLevel::Off)
});

fn parse_trace_level(value: &str) -> TraceLevel {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "basic" => TraceLevel::Basic,
        "full" => TraceLevel::Full,
        _ => TraceLevel::Off,
    }
}

fn trace_full_enabled() -> bool {
    *TRACE_LEVEL == TraceLevel::Full
}

fn trace_basic_enabled() -> bool {
    matches!(*TRACE_LEVEL, TraceLevel::Full | TraceLevel::Basic)
}

/// Emit a warning message when trace level allows it.
pub fn emit_warning(args: Arguments) {
    if trace_full_enabled() {
        ::log::warn!(target: TARGET, "{}", args);
    }
}

/// Emit an error message when trace level allows it.
pub fn emit_error(args: Arguments) {
    if trace_basic_enabled() {
        ::log::error!(target: TARGET, "{}", args);
    }
}

/// Emit a critical message unconditionally.
pub fn emit_critical(args: Arguments) {
    ::log::error!(target: TARGET, "[CRITICAL] {}", args);
}

/// Emit a trace message when trace level allows it.
pub fn emit_trace(args: Arguments) {
    if trace_basic_enabled() {
        ::log::debug!(target: TARGET, "{}", args);
    }
}

/// Emit a warning message via the logging subsystem.
#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => {
        $crate::logging::emit_warning(format_args!($($arg)*))
    };
}

/// Emit an error message via the logging subsystem.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logging::emit_error(format_args!($($arg)*))
    };
}

/// Emit a critical message via the logging subsystem.
#[macro_export]
macro_rules! critical {
    ($($arg:tt)*) => {
        $crate::logging::emit_critical(format_args!($($arg)*))
    };
}

/// Emit a trace message via the logging subsystem.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::logging::emit_trace(format_args!($($arg)*))
    };
}

