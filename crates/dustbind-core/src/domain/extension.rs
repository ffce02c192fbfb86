//! Filter and helper extensions.
//!
//! Extensions reach the engine two ways: native hooks handed to the
//! adapter at construction, and declarative definitions read from
//! manifests in the configured filter and helper directories.

use std::{fmt, sync::Arc};

use serde::Deserialize;
use serde_json::Value;

use super::engine::DustEngine;
use super::error::DomainError;
use super::template::{filters, Filter, Helper, TemplateHelper};

/// A filter composed from named steps, applied left to right.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterDefinition {
    pub name: String,
    pub apply: Vec<String>,
}

/// A helper whose output is a Dust template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HelperDefinition {
    pub name: String,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionDefinition {
    Filter(FilterDefinition),
    Helper(HelperDefinition),
}

impl ExtensionDefinition {
    pub fn name(&self) -> &str {
        match self {
            Self::Filter(def) => &def.name,
            Self::Helper(def) => &def.name,
        }
    }

    /// Register this extension with `engine`.
    ///
    /// Filter steps resolve at install time, so a step may name a filter
    /// installed earlier but not one installed later.
    pub fn install(&self, engine: &DustEngine) -> Result<(), DomainError> {
        match self {
            Self::Filter(def) => {
                let filter = compose(def, engine)?;
                engine.register_filter(def.name.clone(), filter);
            }
            Self::Helper(def) => {
                let template = engine
                    .compile(&def.template, &format!("@{}", def.name))
                    .map_err(|source| DomainError::InvalidHelper {
                        helper: def.name.clone(),
                        source,
                    })?;
                engine.register_helper(def.name.clone(), Arc::new(TemplateHelper::new(template)));
            }
        }
        Ok(())
    }
}

fn compose(def: &FilterDefinition, engine: &DustEngine) -> Result<Filter, DomainError> {
    if def.apply.is_empty() {
        return Err(DomainError::EmptyFilter {
            filter: def.name.clone(),
        });
    }

    let steps = def
        .apply
        .iter()
        .map(|step| {
            filters::primitive(step)
                .or_else(|| engine.filter(step))
                .ok_or_else(|| DomainError::UnknownFilterStep {
                    filter: def.name.clone(),
                    step: step.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Arc::new(move |value: &Value| -> Result<Value, String> {
        let mut current = value.clone();
        for step in &steps {
            current = step(&current)?;
        }
        Ok(current)
    }))
}

/// Native extensions supplied by the host.
#[derive(Clone, Default)]
pub struct ExtensionHooks {
    filters: Vec<(String, Filter)>,
    helpers: Vec<(String, Arc<dyn Helper>)>,
}

impl fmt::Debug for ExtensionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionHooks")
            .field("filters", &self.filters.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("helpers", &self.helpers.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, name: impl Into<String>, filter: Filter) -> Self {
        self.filters.push((name.into(), filter));
        self
    }

    pub fn helper(mut self, name: impl Into<String>, helper: Arc<dyn Helper>) -> Self {
        self.helpers.push((name.into(), helper));
        self
    }

    pub fn install(&self, engine: &DustEngine) {
        for (name, filter) in &self.filters {
            engine.register_filter(name.clone(), Arc::clone(filter));
        }
        for (name, helper) in &self.helpers {
            engine.register_helper(name.clone(), Arc::clone(helper));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::string_filter;
    use crate::domain::RenderOptions;
    use serde_json::json;

    fn render(engine: &DustEngine, source: &str, locals: Value) -> String {
        let template = engine.compile(source, "test").unwrap();
        engine
            .render_template(&template, &locals, &RenderOptions::default())
            .unwrap()
    }

    #[test]
    fn filter_steps_compose_in_order() {
        let engine = DustEngine::new();
        ExtensionDefinition::Filter(FilterDefinition {
            name: "shout".into(),
            apply: vec!["trim".into(), "upper".into()],
        })
        .install(&engine)
        .unwrap();

        assert_eq!(render(&engine, "[{v|shout}]", json!({ "v": "  hi " })), "[HI]");
    }

    #[test]
    fn filter_steps_may_reference_registered_filters() {
        let engine = DustEngine::new();
        engine.register_filter("exclaim", string_filter(|s| format!("{s}!")));
        ExtensionDefinition::Filter(FilterDefinition {
            name: "loud".into(),
            apply: vec!["upper".into(), "exclaim".into()],
        })
        .install(&engine)
        .unwrap();

        assert_eq!(render(&engine, "{v|loud}", json!({ "v": "go" })), "GO!");
    }

    #[test]
    fn unknown_step_is_rejected() {
        let engine = DustEngine::new();
        let err = ExtensionDefinition::Filter(FilterDefinition {
            name: "odd".into(),
            apply: vec!["reverse".into()],
        })
        .install(&engine)
        .unwrap_err();

        assert_eq!(
            err,
            DomainError::UnknownFilterStep {
                filter: "odd".into(),
                step: "reverse".into()
            }
        );
        assert!(!engine.has_filter("odd"));
    }

    #[test]
    fn helper_template_sees_params_and_body() {
        let engine = DustEngine::new();
        ExtensionDefinition::Helper(HelperDefinition {
            name: "Wrap".into(),
            template: "<{tag}>{body|s}</{tag}>".into(),
        })
        .install(&engine)
        .unwrap();

        let out = render(
            &engine,
            "{@Wrap tag=\"em\"}{who}{/Wrap}",
            json!({ "who": "you" }),
        );
        assert_eq!(out, "<em>you</em>");
    }

    #[test]
    fn broken_helper_template_is_rejected() {
        let engine = DustEngine::new();
        let err = ExtensionDefinition::Helper(HelperDefinition {
            name: "Broken".into(),
            template: "{#open}".into(),
        })
        .install(&engine)
        .unwrap_err();

        assert!(matches!(err, DomainError::InvalidHelper { .. }));
        assert!(!engine.has_helper("Broken"));
    }

    #[test]
    fn hooks_install_filters_and_helpers() {
        let engine = DustEngine::new();
        let hooks = ExtensionHooks::new()
            .filter("rev", string_filter(|s| s.chars().rev().collect()))
            .helper(
                "year",
                crate::domain::template::helper_fn(|call| {
                    call.write("2024");
                    Ok(())
                }),
            );
        hooks.install(&engine);

        assert!(engine.has_filter("rev"));
        assert_eq!(render(&engine, "{v|rev} {@year/}", json!({ "v": "abc" })), "cba 2024");
    }
}
