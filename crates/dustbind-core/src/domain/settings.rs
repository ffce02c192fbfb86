//! Engine settings as read from the host configuration.
//!
//! The whole `engines.dust` (or `dust`) subtree deserialises into
//! [`EngineSettings`]; every key is optional and falls back to the
//! defaults below.

use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Minimum severity of engine diagnostics that reach the log.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum DebugLevel {
    #[serde(alias = "debug")]
    Debug,
    #[serde(alias = "info")]
    Info,
    #[default]
    #[serde(alias = "warn")]
    Warn,
    #[serde(alias = "error")]
    Error,
}

impl DebugLevel {
    /// Directive for a `tracing` env filter.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_filter().to_uppercase())
    }
}

impl FromStr for DebugLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            other => Err(DomainError::InvalidSetting {
                key: "debugLevel",
                reason: format!("'{other}' is not one of DEBUG, INFO, WARN, ERROR"),
            }),
        }
    }
}

/// How compiled templates are written for the browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `<path>/<name>.js` file per template.
    #[default]
    Separate,
    /// Every template concatenated into the single file at `path`.
    Combined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientRenderSettings {
    pub enabled: bool,
    pub format: OutputFormat,
    /// A directory for `separate`, a file for `combined`.
    pub path: PathBuf,
    /// Template name patterns; `*` matches anything. Empty exports all.
    pub whitelist: Vec<String>,
}

impl Default for ClientRenderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            format: OutputFormat::Separate,
            path: PathBuf::from("templates"),
            whitelist: Vec::new(),
        }
    }
}

/// Directories holding extension manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionPaths {
    pub filters: PathBuf,
    pub helpers: PathBuf,
}

impl Default for ExtensionPaths {
    fn default() -> Self {
        Self {
            filters: PathBuf::from("workspace/utils/filters"),
            helpers: PathBuf::from("workspace/utils/helpers"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    /// Store compiled templates in the engine cache.
    pub cache: bool,
    pub debug: bool,
    #[serde(alias = "debuglevel")]
    pub debug_level: DebugLevel,
    /// Preserve newlines and indentation in output.
    pub whitespace: bool,
    #[serde(alias = "clientrender")]
    pub client_render: ClientRenderSettings,
    pub paths: ExtensionPaths,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache: true,
            debug: false,
            debug_level: DebugLevel::Warn,
            whitespace: true,
            client_render: ClientRenderSettings::default(),
            paths: ExtensionPaths::default(),
        }
    }
}

impl EngineSettings {
    /// Deserialise from a configuration subtree. `null` means "all defaults".
    pub fn from_value(value: serde_json::Value) -> Result<Self, DomainError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| DomainError::InvalidSetting {
            key: "engine settings",
            reason: e.to_string(),
        })
    }

    /// The process-wide engine switches derived from these settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cache: self.cache,
            whitespace: self.whitespace,
            debug: self.debug,
            debug_level: self.debug_level,
        }
    }
}

/// Global switches of a [`super::DustEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub cache: bool,
    pub whitespace: bool,
    pub debug: bool,
    pub debug_level: DebugLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineSettings::default().engine_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_subtree_yields_defaults() {
        let settings = EngineSettings::from_value(serde_json::Value::Null).unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert!(settings.cache);
        assert!(settings.whitespace);
        assert_eq!(settings.client_render.path, PathBuf::from("templates"));
    }

    #[test]
    fn partial_subtree_keeps_other_defaults() {
        let settings = EngineSettings::from_value(json!({
            "debugLevel": "INFO",
            "clientRender": { "enabled": true, "format": "combined" },
            "paths": { "filters": "test/workspace/filters" }
        }))
        .unwrap();

        assert_eq!(settings.debug_level, DebugLevel::Info);
        assert!(settings.client_render.enabled);
        assert_eq!(settings.client_render.format, OutputFormat::Combined);
        assert_eq!(settings.paths.filters, PathBuf::from("test/workspace/filters"));
        assert_eq!(settings.paths.helpers, PathBuf::from("workspace/utils/helpers"));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = EngineSettings::from_value(json!({ "clientRender": { "format": "zip" } }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidSetting { .. }));
    }

    #[test]
    fn debug_levels_order_by_severity() {
        assert!(DebugLevel::Debug < DebugLevel::Warn);
        assert!(DebugLevel::Error > DebugLevel::Warn);
        assert_eq!("info".parse::<DebugLevel>().unwrap(), DebugLevel::Info);
        assert!("loud".parse::<DebugLevel>().is_err());
    }
}
