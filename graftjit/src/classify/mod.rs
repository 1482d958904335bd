//! Control-flow classification.
//!
//! Decides, per statement and per region, whether the code can be recorded
//! as static graph nodes or has to be re-interpreted on every call. The
//! decision only looks at tensor signatures and host constants, never at
//! tensor data, so it is a pure function of the program and the call
//! signature.
mod abs;
mod classifier;
mod report;

pub use abs::{Abs, AbsEnv};
pub use classifier::{ClassificationError, Classifier};
pub use report::{Classification, ClassificationReport, RegionClass, RegionState, StmtPlan};
