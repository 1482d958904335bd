use anyhow::{anyhow, Result};
use graftjit::{
    apply_update, AdamConfig, ConfigError, EngineError, LazyAdamConfig, OptimizerConfig, Parameter,
    ParameterUpdate, TensorValue,
};

use crate::common;

#[test]
fn adam_defaults() -> Result<()> {
    let config = AdamConfig::new(0.001)?;
    assert_eq!(config.beta1, 0.9);
    assert_eq!(config.beta2, 0.999);
    assert_eq!(config.eps, 1e-8);
    assert_eq!(config.weight_decay, 0.0);
    assert_eq!(config.loss_scale, 1.0);
    assert!(!config.use_nesterov);
    assert!(config.with_nesterov().use_nesterov);
    Ok(())
}

#[test]
fn negative_learning_rate_is_rejected() {
    let err = AdamConfig::new(-0.1);
    assert!(matches!(
        err,
        Err(ConfigError::OutOfRange {
            name: "learning_rate",
            ..
        })
    ));
    assert!(LazyAdamConfig::new(-0.1).is_err());
}

#[test]
fn beta_outside_unit_interval_is_rejected() -> Result<()> {
    let base = AdamConfig::new(0.1)?;
    assert!(matches!(
        base.with_beta1(2.0),
        Err(ConfigError::OutOfRange { name: "beta1", .. })
    ));
    assert!(matches!(
        base.with_beta2(1.0),
        Err(ConfigError::OutOfRange { name: "beta2", .. })
    ));
    assert!(base.with_eps(0.0).is_err());
    assert!(base.with_loss_scale(-1.0).is_err());
    Ok(())
}

#[test]
fn lazy_adam_accepts_weight_decay_and_loss_scale() -> Result<()> {
    let adam = AdamConfig::new(0.1)?.with_weight_decay(0.9)?.with_loss_scale(2.0)?;
    let lazy = LazyAdamConfig::from_adam(adam)?;
    assert_eq!(lazy.adam.weight_decay, 0.9);
    assert_eq!(lazy.adam.loss_scale, 2.0);
    assert_eq!(OptimizerConfig::LazyAdam(lazy).learning_rate(), 0.1);
    Ok(())
}

struct Recording {
    config: OptimizerConfig,
    calls: usize,
}

impl ParameterUpdate for Recording {
    fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    fn update(&mut self, parameters: &mut [Parameter], _gradients: &[TensorValue]) -> Result<(), EngineError> {
        self.calls += 1;
        for parameter in parameters.iter_mut() {
            parameter.value = TensorValue::zeros(parameter.value.dtype(), parameter.value.shape());
        }
        Ok(())
    }
}

#[test]
fn apply_update_checks_gradients_before_delegating() -> Result<()> {
    let mut updater = Recording {
        config: OptimizerConfig::Adam(AdamConfig::new(0.01)?),
        calls: 0,
    };
    let mut parameters = vec![
        Parameter::new("weight", common::tensor(&[1.0f32, 2.0])),
        Parameter::new("bias", 0.5f32),
    ];

    let err = apply_update(&mut updater, &mut parameters, &[common::tensor(&[0.1f32, 0.1])])
        .err()
        .ok_or_else(|| anyhow!("count mismatch accepted"))?;
    assert!(matches!(err, EngineError::Parameter { ref name, .. } if name == "*"));

    let err = apply_update(
        &mut updater,
        &mut parameters,
        &[common::tensor(&[0.1f32, 0.1, 0.1]), TensorValue::from(0.1f32)],
    )
    .err()
    .ok_or_else(|| anyhow!("shape mismatch accepted"))?;
    assert!(matches!(err, EngineError::Parameter { ref name, .. } if name == "weight"));
    assert_eq!(updater.calls, 0);

    apply_update(
        &mut updater,
        &mut parameters,
        &[common::tensor(&[0.1f32, 0.1]), TensorValue::from(0.1f32)],
    )?;
    assert_eq!(updater.calls, 1);
    common::assert_tensor_eq(&parameters[0].value, &common::tensor(&[0.0f32, 0.0]))?;
    Ok(())
}

#[test]
fn apply_update_revalidates_config() -> Result<()> {
    let mut updater = Recording {
        config: OptimizerConfig::Adam(AdamConfig {
            beta1: 2.0,
            ..AdamConfig::new(0.01)?
        }),
        calls: 0,
    };
    let mut parameters = vec![Parameter::new("w", 1.0f32)];
    let err = apply_update(&mut updater, &mut parameters, &[TensorValue::from(1.0f32)])
        .err()
        .ok_or_else(|| anyhow!("invalid config accepted"))?;
    assert!(matches!(err, EngineError::Config(ConfigError::OutOfRange { name: "beta1", .. })));
    assert_eq!(updater.calls, 0);
    Ok(())
}
