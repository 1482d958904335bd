//! Trace pass and compiled artifacts.
mod artifact;
mod signature;
mod tracer;

pub use artifact::{ArtifactStats, CompiledArtifact};
pub(crate) use signature::fnv1a_bytes;
pub use signature::{HostSig, InputSig, Signature};
pub use tracer::{TraceOutcome, Tracer};
