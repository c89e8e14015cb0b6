//! Context configuration.

use crate::traits::{RddError, RddResult};
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`ContextConfig::app_name`].
pub const ENV_APP_NAME: &str = "SPARKLET_APP_NAME";
/// Environment variable overriding [`ContextConfig::default_parallelism`].
pub const ENV_DEFAULT_PARALLELISM: &str = "SPARKLET_DEFAULT_PARALLELISM";
/// Environment variable overriding [`ContextConfig::max_concurrency`].
pub const ENV_MAX_CONCURRENCY: &str = "SPARKLET_MAX_CONCURRENCY";

/// Configuration for a [`FlowContext`](crate::context::FlowContext)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Application name, prefix of the application id
    pub app_name: String,
    /// Partition count of sources and shuffles when none is requested
    pub default_parallelism: usize,
    /// Maximum number of partitions evaluated at the same time
    pub max_concurrency: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            app_name: "sparklet-app".to_string(),
            default_parallelism: num_cpus::get(),
            max_concurrency: num_cpus::get(),
        }
    }
}

impl ContextConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self::default().with_app_name(app_name)
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_default_parallelism(mut self, default_parallelism: usize) -> Self {
        self.default_parallelism = default_parallelism;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> RddResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RddError::Configuration(format!("invalid context config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the `SPARKLET_*` environment variables.
    pub fn from_env() -> RddResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `SPARKLET_*` keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RddResult<Self> {
        let mut config = Self::default();
        if let Some(app_name) = lookup(ENV_APP_NAME) {
            config.app_name = app_name;
        }
        if let Some(value) = lookup(ENV_DEFAULT_PARALLELISM) {
            config.default_parallelism = parse_count(ENV_DEFAULT_PARALLELISM, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
            config.max_concurrency = parse_count(ENV_MAX_CONCURRENCY, &value)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RddResult<()> {
        if self.default_parallelism == 0 {
            return Err(RddError::Configuration(
                "default_parallelism must be positive".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(RddError::Configuration(
                "max_concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> RddResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| RddError::Configuration(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.app_name, "sparklet-app");
        assert!(config.default_parallelism > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = ContextConfig::from_json(r#"{"app_name": "wc", "max_concurrency": 2}"#).unwrap();
        assert_eq!(config.app_name, "wc");
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.default_parallelism, num_cpus::get());
    }

    #[test]
    fn test_from_json_rejects_zero() {
        let err = ContextConfig::from_json(r#"{"default_parallelism": 0}"#).unwrap_err();
        assert!(matches!(err, RddError::Configuration(_)));
        assert!(ContextConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_APP_NAME, "env-app"),
            (ENV_DEFAULT_PARALLELISM, "6"),
            (ENV_MAX_CONCURRENCY, " 3 "),
        ]);
        let config = ContextConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(
            config,
            ContextConfig::new("env-app")
                .with_default_parallelism(6)
                .with_max_concurrency(3)
        );

        let bad = ContextConfig::from_lookup(|k| (k == ENV_MAX_CONCURRENCY).then(|| "many".into()));
        assert!(matches!(bad, Err(RddError::Configuration(_))));
    }
}
