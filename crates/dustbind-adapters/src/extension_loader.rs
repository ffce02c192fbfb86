//! TOML extension manifests.
//!
//! Each `.toml` file under the configured filters or helpers directory may
//! declare any number of filters and helpers:
//!
//! ```toml
//! [[filter]]
//! name  = "up"
//! apply = ["trim", "upper"]      # primitives or already-registered filters
//!
//! [[helper]]
//! name     = "Trim"
//! template = "{body|s}"          # `body` is the caller's rendered block
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use dustbind_core::{
    application::{ApplicationError, ports::ExtensionLoader},
    domain::{ExtensionDefinition, FilterDefinition, HelperDefinition},
};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    filter: Vec<FilterDefinition>,
    #[serde(default)]
    helper: Vec<HelperDefinition>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlExtensionLoader;

impl TomlExtensionLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ExtensionLoader for TomlExtensionLoader {
    fn file_extension(&self) -> &str {
        ".toml"
    }

    fn parse(
        &self,
        path: &Path,
        source: &str,
    ) -> Result<Vec<ExtensionDefinition>, ApplicationError> {
        let manifest: Manifest =
            toml::from_str(source).map_err(|e| ApplicationError::Extension {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        debug!(
            path = %path.display(),
            filters = manifest.filter.len(),
            helpers = manifest.helper.len(),
            "parsed extension manifest"
        );

        Ok(manifest
            .filter
            .into_iter()
            .map(ExtensionDefinition::Filter)
            .chain(manifest.helper.into_iter().map(ExtensionDefinition::Helper))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filters_then_helpers() {
        let source = r#"
            [[helper]]
            name = "Trim"
            template = "{body|s}"

            [[filter]]
            name = "up"
            apply = ["upper"]
        "#;
        let definitions = TomlExtensionLoader
            .parse(Path::new("ext.toml"), source)
            .unwrap();

        assert_eq!(
            definitions,
            vec![
                ExtensionDefinition::Filter(FilterDefinition {
                    name: "up".into(),
                    apply: vec!["upper".into()],
                }),
                ExtensionDefinition::Helper(HelperDefinition {
                    name: "Trim".into(),
                    template: "{body|s}".into(),
                }),
            ]
        );
    }

    #[test]
    fn empty_manifest_is_fine() {
        assert!(TomlExtensionLoader.parse(Path::new("e.toml"), "").unwrap().is_empty());
    }

    #[test]
    fn unknown_tables_are_rejected() {
        let err = TomlExtensionLoader
            .parse(Path::new("bad.toml"), "[[macro]]\nname = \"x\"\n")
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Extension { .. }));
    }
}
