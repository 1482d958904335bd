mod event;
mod recorder;

pub(crate) use event::format_trace_timing;
pub use event::{TraceEvent, TraceEventKind, TraceTiming};
pub use recorder::{Recorded, TraceRecorder};
