//! The engine handle: compiled-template cache, filter and helper
//! registries, and process-wide switches.
//!
//! All state sits behind `RwLock`s so one engine can be shared by the
//! adapter and any host code holding [`DustEngine`] through `Arc`.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::error::{CompileError, RenderError};
use super::settings::{DebugLevel, EngineConfig};
use super::template::{filters, helpers, parser, CompiledTemplate, Filter, Helper, Renderer};

/// Version reported through the adapter's `info()`.
pub const ENGINE_VERSION: &str = "2.7.2";

/// Per-call render settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Overrides the engine's whitespace default for this render only.
    pub keep_whitespace: Option<bool>,
}

impl RenderOptions {
    pub fn keep_whitespace(keep: bool) -> Self {
        Self {
            keep_whitespace: Some(keep),
        }
    }
}

pub struct DustEngine {
    config: RwLock<EngineConfig>,
    cache: RwLock<BTreeMap<String, Arc<CompiledTemplate>>>,
    filters: RwLock<BTreeMap<String, Filter>>,
    helpers: RwLock<BTreeMap<String, Arc<dyn Helper>>>,
}

impl Default for DustEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DustEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DustEngine")
            .field("config", &self.config())
            .field("templates", &self.template_names())
            .field("filters", &self.filter_names())
            .field("helpers", &self.helper_names())
            .finish()
    }
}

// Registries hold plain data, so a panic mid-write leaves them usable.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DustEngine {
    /// An engine with default switches and the built-in filters and helpers.
    pub fn new() -> Self {
        Self {
            config: RwLock::new(EngineConfig::default()),
            cache: RwLock::new(BTreeMap::new()),
            filters: RwLock::new(filters::builtin()),
            helpers: RwLock::new(helpers::builtin()),
        }
    }

    pub fn version(&self) -> &'static str {
        ENGINE_VERSION
    }

    pub fn config(&self) -> EngineConfig {
        *read(&self.config)
    }

    pub fn configure(&self, config: EngineConfig) {
        *write(&self.config) = config;
    }

    // ── Templates ─────────────────────────────────────────────────────────

    /// Compile `source` under `name` without touching the cache.
    pub fn compile(&self, source: &str, name: &str) -> Result<CompiledTemplate, CompileError> {
        let parsed = parser::parse(name, source)?;
        Ok(CompiledTemplate::new(name, parsed))
    }

    /// Make a compiled template available by name.
    ///
    /// With caching off the template is returned but not stored, so later
    /// lookups by name (including partial references) miss.
    pub fn load_source(&self, template: CompiledTemplate) -> Arc<CompiledTemplate> {
        let template = Arc::new(template);
        if self.config().cache {
            write(&self.cache).insert(template.name.clone(), Arc::clone(&template));
        }
        template
    }

    pub fn remove(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        write(&self.cache).remove(name)
    }

    pub fn template(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        read(&self.cache).get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        read(&self.cache).contains_key(name)
    }

    /// Cached template names in lexical order.
    pub fn template_names(&self) -> Vec<String> {
        read(&self.cache).keys().cloned().collect()
    }

    /// Snapshot of every cached template, in name order.
    pub fn templates(&self) -> Vec<Arc<CompiledTemplate>> {
        read(&self.cache).values().cloned().collect()
    }

    /// Render the cached template `name` against `locals`.
    pub fn render(
        &self,
        name: &str,
        locals: &Value,
        options: &RenderOptions,
    ) -> Result<String, RenderError> {
        let template = self
            .template(name)
            .ok_or_else(|| RenderError::TemplateNotFound(name.to_string()))?;
        self.render_template(&template, locals, options)
    }

    pub fn render_template(
        &self,
        template: &CompiledTemplate,
        locals: &Value,
        options: &RenderOptions,
    ) -> Result<String, RenderError> {
        let whitespace = options
            .keep_whitespace
            .unwrap_or_else(|| self.config().whitespace);
        Renderer::new(self, whitespace).render_template(template, locals)
    }

    // ── Filters ───────────────────────────────────────────────────────────

    /// Register `filter` under `name`, replacing any existing filter.
    pub fn register_filter(&self, name: impl Into<String>, filter: Filter) {
        write(&self.filters).insert(name.into(), filter);
    }

    pub fn filter(&self, name: &str) -> Option<Filter> {
        read(&self.filters).get(name).cloned()
    }

    pub fn has_filter(&self, name: &str) -> bool {
        read(&self.filters).contains_key(name)
    }

    pub fn filter_names(&self) -> Vec<String> {
        read(&self.filters).keys().cloned().collect()
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    pub fn register_helper(&self, name: impl Into<String>, helper: Arc<dyn Helper>) {
        write(&self.helpers).insert(name.into(), helper);
    }

    pub fn helper(&self, name: &str) -> Option<Arc<dyn Helper>> {
        read(&self.helpers).get(name).cloned()
    }

    pub fn has_helper(&self, name: &str) -> bool {
        read(&self.helpers).contains_key(name)
    }

    pub fn helper_names(&self) -> Vec<String> {
        read(&self.helpers).keys().cloned().collect()
    }

    // ── Diagnostics ───────────────────────────────────────────────────────

    /// Emit an engine diagnostic if debugging is on and `level` passes the
    /// configured threshold.
    pub fn log(&self, level: DebugLevel, message: &str) {
        let config = self.config();
        if !config.debug || level < config.debug_level {
            return;
        }
        match level {
            DebugLevel::Debug => debug!(target: "dustbind::engine", "{message}"),
            DebugLevel::Info => info!(target: "dustbind::engine", "{message}"),
            DebugLevel::Warn => warn!(target: "dustbind::engine", "{message}"),
            DebugLevel::Error => error!(target: "dustbind::engine", "{message}"),
        }
    }
}
