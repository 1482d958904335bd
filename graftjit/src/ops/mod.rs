//! Reference kernels.
pub(crate) mod cpu;
