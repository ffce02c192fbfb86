//! Configuration assembled with the `config` crate.
//!
//! # Resolution order (highest priority first)
//!
//! 1. Environment variables prefixed `DUST__`, with `__` between key
//!    segments (`DUST__ENGINES__DUST__CACHE=false`)
//! 2. An optional config file (TOML, JSON, or YAML by extension)
//!
//! Environment keys arrive lowercased, which is why the engine settings
//! also accept `debuglevel` and `clientrender`.

use std::path::Path;

use config::{Config, Environment, File};
use serde_json::Value;

use dustbind_core::{application::ports::ConfigStore, error::DustError};

use super::JsonConfig;

const ENV_PREFIX: &str = "DUST";
const ENV_SEPARATOR: &str = "__";

/// A read-only [`ConfigStore`] over the merged sources.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    tree: JsonConfig,
}

impl LayeredConfig {
    /// Load from `file` (if any) and the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, DustError> {
        Self::from_sources(file, None)
    }

    /// Load with an explicit environment in place of the process one.
    pub fn from_sources(
        file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, DustError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let merged = builder
            .build()
            .map_err(|e| DustError::configuration(e.to_string()))?;
        let tree: Value = merged
            .try_deserialize()
            .map_err(|e| DustError::configuration(e.to_string()))?;

        Ok(Self {
            tree: JsonConfig::new(tree),
        })
    }
}

impl ConfigStore for LayeredConfig {
    fn get(&self, key_path: &str) -> Option<Value> {
        self.tree
            .get(key_path)
            .or_else(|| self.tree.get(&key_path.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustbind_core::domain::EngineSettings;
    use serde_json::json;
    use std::io::Write as _;

    #[test]
    fn file_values_are_readable_by_key_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[engines.dust]\ncache = false\n\n[engines.dust.clientRender]\nenabled = true\n"
        )
        .unwrap();

        let config = LayeredConfig::from_sources(Some(file.path()), Some(config::Map::new())).unwrap();
        assert_eq!(config.get("engines.dust.cache"), Some(json!(false)));
        assert_eq!(
            config.get("engines.dust.clientRender.enabled"),
            Some(json!(true))
        );
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[engines.dust]\ncache = true\n").unwrap();

        let mut env = config::Map::new();
        env.insert("DUST__ENGINES__DUST__CACHE".to_string(), "false".to_string());
        env.insert("DUST__ENGINES__DUST__DEBUGLEVEL".to_string(), "INFO".to_string());

        let config = LayeredConfig::from_sources(Some(file.path()), Some(env)).unwrap();
        let settings =
            EngineSettings::from_value(config.get("engines.dust").unwrap_or(Value::Null)).unwrap();

        assert!(!settings.cache);
        assert_eq!(settings.debug_level, dustbind_core::domain::DebugLevel::Info);
    }

    #[test]
    fn missing_required_file_is_a_configuration_error() {
        let err = LayeredConfig::from_sources(
            Some(Path::new("/definitely/not/here.toml")),
            Some(config::Map::new()),
        )
        .unwrap_err();
        assert!(matches!(err, DustError::Configuration { .. }));
    }
}
