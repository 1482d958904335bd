//! Engine entry points.
//!
//! `Engine::jit` wraps a program into a `JitFunction`. Each call computes
//! the input signature, replays the cached artifact for it when there is
//! one, and otherwise traces the body once and caches the result. Results
//! always equal eager evaluation of the same body.
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::compile::{CompiledArtifact, Signature, Tracer};
use crate::config::{ExecConfig, ExecMode};
use crate::error::{ConfigError, EngineError, TraceError};
use crate::executor::{Executor, ReplayError};
use crate::interp::{output_tensor, Interpreter};
use crate::optim::OptimizerConfig;
use crate::program::Program;
use crate::registry::OpRegistry;
use crate::tensor::TensorValue;
use crate::trace::TraceEvent;
use crate::types::Value;

#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<OpRegistry>,
    config: ExecConfig,
}

impl Engine {
    /// Engine over the built-in operators.
    pub fn new(config: ExecConfig) -> Result<Self, ConfigError> {
        Self::with_registry(OpRegistry::shared(), config)
    }

    pub fn with_registry(registry: Arc<OpRegistry>, config: ExecConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<OpRegistry> {
        &self.registry
    }

    pub fn optimizer(&self) -> Option<&OptimizerConfig> {
        self.config.optimizer.as_ref()
    }

    pub fn jit(&self, program: Program) -> JitFunction {
        let capacity = NonZeroUsize::new(self.config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        JitFunction {
            program,
            registry: self.registry.clone(),
            config: self.config.clone(),
            cache: Mutex::new(LruCache::new(capacity)),
            trace_count: AtomicUsize::new(0),
            replay_count: AtomicUsize::new(0),
            retrace_count: AtomicUsize::new(0),
            last_trace: Mutex::new(Vec::new()),
        }
    }
}

/// A program bound to an engine configuration and its artifact cache.
pub struct JitFunction {
    program: Program,
    registry: Arc<OpRegistry>,
    config: ExecConfig,
    cache: Mutex<LruCache<u64, Arc<CompiledArtifact>>>,
    trace_count: AtomicUsize,
    replay_count: AtomicUsize,
    retrace_count: AtomicUsize,
    last_trace: Mutex<Vec<TraceEvent>>,
}

impl std::fmt::Debug for JitFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitFunction")
            .field("program", &self.program.name())
            .field("mode", &self.config.mode)
            .field("cached", &self.cached_artifacts())
            .field("traces", &self.trace_count())
            .field("retraces", &self.retrace_count())
            .finish()
    }
}

impl JitFunction {
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Number of trace passes run so far.
    pub fn trace_count(&self) -> usize {
        self.trace_count.load(Ordering::SeqCst)
    }

    /// Number of calls served from a cached artifact.
    pub fn replay_count(&self) -> usize {
        self.replay_count.load(Ordering::SeqCst)
    }

    /// Number of cached artifacts dropped because a fallback guard failed.
    pub fn retrace_count(&self) -> usize {
        self.retrace_count.load(Ordering::SeqCst)
    }

    pub fn cached_artifacts(&self) -> usize {
        self.cache().len()
    }

    /// Cached artifact for these inputs, without touching its LRU position.
    pub fn artifact_for(&self, inputs: &[Value]) -> Result<Option<Arc<CompiledArtifact>>, EngineError> {
        let signature = Signature::of(inputs, self.config.max_unroll);
        Ok(self
            .cache()
            .peek(&signature.key())
            .filter(|artifact| artifact.signature() == &signature)
            .cloned())
    }

    /// Drop every cached artifact.
    pub fn invalidate(&self) {
        self.cache().clear();
    }

    /// Events recorded by the last replay.
    pub fn trace(&self) -> Vec<TraceEvent> {
        self.last_trace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Interpret the body directly, bypassing the cache.
    pub fn run_eager(&self, inputs: &[Value]) -> Result<Vec<TensorValue>, EngineError> {
        let values = Interpreter::new(&self.registry).run(&self.program, inputs)?;
        to_outputs(values)
    }

    pub fn compile_and_run(&self, inputs: &[Value]) -> Result<Vec<TensorValue>, EngineError> {
        let params = self.program.params().len();
        if inputs.len() != params {
            return Err(TraceError::Arity {
                name: self.program.name().to_string(),
                expected: params,
                actual: inputs.len(),
            }
            .into());
        }
        if self.config.mode == ExecMode::Eager {
            return self.run_eager(inputs);
        }

        let signature = Signature::of(inputs, self.config.max_unroll);
        let key = signature.key();
        let cached = self.cache().get(&key).cloned();
        if let Some(artifact) = cached {
            let replayed = match artifact.signature().check(&signature) {
                Ok(()) => self.replay(&artifact, inputs),
                Err(mismatch) => Err(ReplayError::Mismatch(mismatch)),
            };
            match replayed {
                Ok(values) => return to_outputs(values),
                Err(ReplayError::Trace(err)) => return Err(err.into()),
                Err(ReplayError::Mismatch(mismatch)) => {
                    let retraces = self.retrace_count.fetch_add(1, Ordering::SeqCst) + 1;
                    crate::warning!(
                        "`{}`: {}; retracing (retrace #{})",
                        self.program.name(),
                        mismatch,
                        retraces
                    );
                    self.evict(key, &artifact);
                }
            }
        }
        self.trace_and_cache(signature, inputs)
    }

    fn replay(&self, artifact: &CompiledArtifact, inputs: &[Value]) -> Result<Vec<Value>, ReplayError> {
        let mut executor = Executor::new(&self.registry);
        if self.config.trace {
            executor = executor.with_trace();
        }
        if self.config.timer {
            executor = executor.with_timer();
        }
        let result = executor.run(artifact.graph(), inputs);
        *self.last_trace.lock().unwrap_or_else(PoisonError::into_inner) = executor.into_trace();
        if result.is_ok() {
            self.replay_count.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    fn trace_and_cache(&self, signature: Signature, inputs: &[Value]) -> Result<Vec<TensorValue>, EngineError> {
        self.trace_count.fetch_add(1, Ordering::SeqCst);
        self.last_trace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        let outcome = Tracer::new(&self.registry, self.config.max_unroll)
            .trace(&self.program, inputs)
            .map_err(|err| {
                crate::error!("tracing `{}` failed: {}", self.program.name(), err);
                err
            })?;
        let outputs = to_outputs(outcome.outputs)?;
        let artifact = CompiledArtifact::new(signature, outcome.graph, outcome.report).map_err(|err| {
            crate::critical!("`{}` produced an unusable graph: {}", self.program.name(), err);
            err
        })?;
        crate::trace!(
            "`{}`: cached artifact {:016x} ({} nodes, {} fallback holes)",
            self.program.name(),
            artifact.key(),
            artifact.stats().nodes,
            artifact.stats().fallback_holes
        );
        self.cache().put(artifact.key(), Arc::new(artifact));
        Ok(outputs)
    }

    /// Remove `stale` unless another call already replaced it.
    fn evict(&self, key: u64, stale: &Arc<CompiledArtifact>) {
        let mut cache = self.cache();
        if cache.peek(&key).is_some_and(|current| Arc::ptr_eq(current, stale)) {
            cache.pop(&key);
        }
    }

    fn cache(&self) -> MutexGuard<'_, LruCache<u64, Arc<CompiledArtifact>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run `function` on `inputs`, tracing on the first call per signature.
pub fn compile_and_run(function: &JitFunction, inputs: &[Value]) -> Result<Vec<TensorValue>, EngineError> {
    function.compile_and_run(inputs)
}

fn to_outputs(values: Vec<Value>) -> Result<Vec<TensorValue>, EngineError> {
    values
        .into_iter()
        .map(output_tensor)
        .collect::<Result<Vec<_>, TraceError>>()
        .map_err(EngineError::from)
}
