//! Optimizer collaborator.
//!
//! The engine does not implement optimizer math. It owns the
//! hyperparameter configs, validates them before anything runs, and checks
//! that gradients line up with parameters before handing both to an
//! updater.
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError};
use crate::tensor::TensorValue;

/// Adam hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub weight_decay: f64,
    pub loss_scale: f64,
    pub use_nesterov: bool,
}

impl AdamConfig {
    pub const DEFAULT_BETA1: f64 = 0.9;
    pub const DEFAULT_BETA2: f64 = 0.999;
    pub const DEFAULT_EPS: f64 = 1e-8;

    pub fn new(learning_rate: f64) -> Result<Self, ConfigError> {
        Self {
            learning_rate,
            beta1: Self::DEFAULT_BETA1,
            beta2: Self::DEFAULT_BETA2,
            eps: Self::DEFAULT_EPS,
            weight_decay: 0.0,
            loss_scale: 1.0,
            use_nesterov: false,
        }
        .validated()
    }

    pub fn with_beta1(self, beta1: f64) -> Result<Self, ConfigError> {
        Self { beta1, ..self }.validated()
    }

    pub fn with_beta2(self, beta2: f64) -> Result<Self, ConfigError> {
        Self { beta2, ..self }.validated()
    }

    pub fn with_eps(self, eps: f64) -> Result<Self, ConfigError> {
        Self { eps, ..self }.validated()
    }

    pub fn with_weight_decay(self, weight_decay: f64) -> Result<Self, ConfigError> {
        Self { weight_decay, ..self }.validated()
    }

    pub fn with_loss_scale(self, loss_scale: f64) -> Result<Self, ConfigError> {
        Self { loss_scale, ..self }.validated()
    }

    pub fn with_nesterov(self) -> Self {
        Self {
            use_nesterov: true,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check("learning_rate", "non-negative", self.learning_rate, |v| v >= 0.0)?;
        check("beta1", "in (0, 1)", self.beta1, |v| v > 0.0 && v < 1.0)?;
        check("beta2", "in (0, 1)", self.beta2, |v| v > 0.0 && v < 1.0)?;
        check("eps", "positive", self.eps, |v| v > 0.0)?;
        check("weight_decay", "non-negative", self.weight_decay, |v| v >= 0.0)?;
        check("loss_scale", "positive", self.loss_scale, |v| v > 0.0)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }
}

/// Lazy Adam hyperparameters: Adam's, applied only to the rows a sparse
/// gradient touches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LazyAdamConfig {
    pub adam: AdamConfig,
}

impl LazyAdamConfig {
    pub fn new(learning_rate: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            adam: AdamConfig::new(learning_rate)?,
        })
    }

    pub fn from_adam(adam: AdamConfig) -> Result<Self, ConfigError> {
        adam.validate()?;
        Ok(Self { adam })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.adam.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam(AdamConfig),
    LazyAdam(LazyAdamConfig),
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            OptimizerConfig::Adam(config) => config.validate(),
            OptimizerConfig::LazyAdam(config) => config.validate(),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        match self {
            OptimizerConfig::Adam(config) => config.learning_rate,
            OptimizerConfig::LazyAdam(config) => config.adam.learning_rate,
        }
    }
}

/// A named trainable tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: TensorValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<TensorValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parameter Update Interface implemented by optimizers.
pub trait ParameterUpdate {
    fn config(&self) -> &OptimizerConfig;

    fn update(&mut self, parameters: &mut [Parameter], gradients: &[TensorValue]) -> Result<(), EngineError>;
}

/// Check an update request and delegate it to `updater`.
pub fn apply_update<U: ParameterUpdate + ?Sized>(
    updater: &mut U,
    parameters: &mut [Parameter],
    gradients: &[TensorValue],
) -> Result<(), EngineError> {
    updater.config().validate()?;
    if parameters.len() != gradients.len() {
        return Err(EngineError::Parameter {
            name: "*".to_string(),
            reason: format!(
                "{} parameters but {} gradients",
                parameters.len(),
                gradients.len()
            ),
        });
    }
    for (parameter, gradient) in parameters.iter().zip(gradients) {
        if parameter.value.sig() != gradient.sig() {
            return Err(EngineError::Parameter {
                name: parameter.name.clone(),
                reason: format!(
                    "gradient is {}, parameter is {}",
                    gradient.sig(),
                    parameter.value.sig()
                ),
            });
        }
    }
    updater.update(parameters, gradients)
}

fn check(name: &'static str, expected: &'static str, value: f64, ok: impl Fn(f64) -> bool) -> Result<(), ConfigError> {
    if ok(value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, expected, value })
    }
}
