use anyhow::{anyhow, Result};
use graftjit::{AdamConfig, ConfigError, Engine, ExecConfig, ExecMode, LazyAdamConfig, OptimizerConfig};

#[test]
fn defaults_trace_and_cache() {
    let config = ExecConfig::default();
    assert_eq!(config.mode, ExecMode::Graph);
    assert_eq!(config.max_unroll, 256);
    assert_eq!(config.cache_capacity, 16);
    assert!(!config.trace);
    assert!(config.optimizer.is_none());
}

#[test]
fn json_config_fills_missing_fields() -> Result<()> {
    let config = ExecConfig::from_json(r#"{"mode":"eager","max_unroll":8}"#)?;
    assert_eq!(config.mode, ExecMode::Eager);
    assert_eq!(config.max_unroll, 8);
    assert_eq!(config.cache_capacity, 16);

    let err = ExecConfig::from_json(r#"{"cache_capacity":0}"#)
        .err()
        .ok_or_else(|| anyhow!("zero capacity accepted"))?;
    assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == "cache_capacity"));

    assert!(ExecConfig::from_json("{not json").is_err());
    Ok(())
}

#[test]
fn json_config_carries_optimizer() -> Result<()> {
    let text = r#"{
        "optimizer": {
            "kind": "lazy_adam",
            "adam": {
                "learning_rate": 0.1,
                "beta1": 0.9,
                "beta2": 0.999,
                "eps": 1e-8,
                "weight_decay": 0.9,
                "loss_scale": 2.0,
                "use_nesterov": false
            }
        }
    }"#;
    let config = ExecConfig::from_json(text)?;
    let optimizer = config.optimizer.ok_or_else(|| anyhow!("optimizer missing"))?;
    assert!(matches!(optimizer, OptimizerConfig::LazyAdam(_)));
    assert_eq!(optimizer.learning_rate(), 0.1);

    let bad = text.replace("\"learning_rate\": 0.1", "\"learning_rate\": -0.1");
    let err = ExecConfig::from_json(&bad)
        .err()
        .ok_or_else(|| anyhow!("negative learning rate accepted"))?;
    assert!(matches!(err, ConfigError::OutOfRange { name: "learning_rate", .. }));
    Ok(())
}

#[test]
fn engine_rejects_invalid_config_before_any_trace() -> Result<()> {
    let valid = AdamConfig::new(0.01)?;
    let invalid = AdamConfig {
        learning_rate: -0.1,
        ..valid
    };
    let err = Engine::new(ExecConfig::default().with_optimizer(OptimizerConfig::Adam(invalid)))
        .err()
        .ok_or_else(|| anyhow!("engine accepted a negative learning rate"))?;
    assert!(matches!(err, ConfigError::OutOfRange { name: "learning_rate", .. }));

    let err = Engine::new(ExecConfig::default().with_cache_capacity(0))
        .err()
        .ok_or_else(|| anyhow!("engine accepted a zero cache"))?;
    assert!(matches!(err, ConfigError::Invalid { .. }));

    let engine = Engine::new(
        ExecConfig::default().with_optimizer(OptimizerConfig::LazyAdam(LazyAdamConfig::new(0.1)?)),
    )?;
    assert_eq!(engine.optimizer().map(OptimizerConfig::learning_rate), Some(0.1));
    Ok(())
}

#[test]
fn env_overrides_defaults() -> Result<()> {
    std::env::set_var("GRAFTJIT_MAX_UNROLL", "12");
    let config = ExecConfig::from_env();
    std::env::remove_var("GRAFTJIT_MAX_UNROLL");
    let config = config?;
    assert_eq!(config.max_unroll, 12);
    assert_eq!(config.cache_capacity, 16);
    Ok(())
}
