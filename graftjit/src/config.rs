//! Engine configuration.
use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::optim::OptimizerConfig;

/// How `compile_and_run` executes a function body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// Trace, cache and replay compiled artifacts.
    #[default]
    Graph,
    /// Interpret every call; nothing is traced or cached.
    Eager,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub mode: ExecMode,
    /// Longest `for` loop the tracer unrolls into graph nodes.
    pub max_unroll: usize,
    /// Compiled artifacts kept per function.
    pub cache_capacity: usize,
    /// Record a `TraceEvent` per replayed node.
    pub trace: bool,
    /// Time replayed nodes; only meaningful with `trace`.
    pub timer: bool,
    pub optimizer: Option<OptimizerConfig>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            mode: ExecMode::Graph,
            max_unroll: 256,
            cache_capacity: 16,
            trace: false,
            timer: false,
            optimizer: None,
        }
    }
}

impl ExecConfig {
    pub fn eager(mut self) -> Self {
        self.mode = ExecMode::Eager;
        self
    }

    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    pub fn with_timer(mut self) -> Self {
        self.timer = true;
        self
    }

    pub fn with_max_unroll(mut self, max_unroll: usize) -> Self {
        self.max_unroll = max_unroll;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "cache_capacity".to_string(),
                reason: "must hold at least one artifact".to_string(),
            });
        }
        match &self.optimizer {
            Some(optimizer) => optimizer.validate(),
            None => Ok(()),
        }
    }

    /// Defaults overridden by `GRAFTJIT_MAX_UNROLL` and
    /// `GRAFTJIT_CACHE_CAPACITY` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = env_usize("GRAFTJIT_MAX_UNROLL")? {
            config.max_unroll = value;
        }
        if let Some(value) = env_usize("GRAFTJIT_CACHE_CAPACITY")? {
            config.cache_capacity = value;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|err| ConfigError::Invalid {
            name: "config".to_string(),
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| ConfigError::Invalid {
                name: name.to_string(),
                reason: format!("`{}`: {}", value, err),
            }),
        Err(_) => Ok(None),
    }
}
