#[path = "common/mod.rs"]
mod common;

#[path = "jit/jit_fallback.rs"]
mod jit_fallback;
#[path = "jit/jit_loops.rs"]
mod jit_loops;
#[path = "jit/jit_cache.rs"]
mod jit_cache;
#[path = "jit/jit_config.rs"]
mod jit_config;

#[path = "ops/ops_compare.rs"]
mod ops_compare;
#[path = "ops/ops_linalg.rs"]
mod ops_linalg;

#[path = "graph/graph_validation.rs"]
mod graph_validation;

#[path = "tensor/tensor_dtypes.rs"]
mod tensor_dtypes;

#[path = "optim/optim_config.rs"]
mod optim_config;
