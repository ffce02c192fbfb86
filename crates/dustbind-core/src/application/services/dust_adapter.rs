//! Dust adapter service - the host-facing composition root.
//!
//! The host constructs the adapter, calls [`DustAdapter::initialise`] once,
//! then [`DustAdapter::register`] per page template and
//! [`DustAdapter::render`] per request, and finally
//! [`DustAdapter::finish_loading`] to export client templates.
//!
//! Initialisation runs three phases strictly in sequence so filters and
//! helpers exist before any partial referencing them compiles:
//! 1. filter manifests
//! 2. helper manifests
//! 3. partial templates

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::client_export;
use crate::{
    application::{
        ApplicationError,
        files::{DiscoveryOptions, read_directory, read_files},
        ports::{ConfigStore, ExtensionLoader, Filesystem},
    },
    domain::{
        DustEngine, EngineSettings, ExtensionDefinition, ExtensionHooks, RenderError,
        RenderOptions, template_name,
    },
    error::{DustError, DustResult},
};

/// Settings subtree read when the host does not name one.
pub const DEFAULT_CONFIG_PREFIX: &str = "engines.dust";
/// Flat settings scheme, consulted when the default subtree is absent.
pub const FLAT_CONFIG_PREFIX: &str = "dust";
/// Host key prepended to the client render output path.
pub const PUBLIC_PATH_KEY: &str = "paths.public";

const TEMPLATE_EXTENSION: &str = ".dust";
const TEMPLATE_EXTENSIONS: &[&str] = &[TEMPLATE_EXTENSION];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdapterState {
    Constructed,
    Initialising,
    Ready,
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Constructed => "constructed",
            Self::Initialising => "initialising",
            Self::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// Reported by [`DustAdapter::info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub engine: &'static str,
    pub version: &'static str,
}

/// File routing metadata for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdapterMetadata {
    pub extensions: &'static [&'static str],
    pub handle: &'static str,
}

/// Construction options.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// Template names are paths relative to this directory.
    pub pages_root: PathBuf,
    /// Partial templates registered during initialisation.
    pub partials: Vec<PathBuf>,
    pub hooks: ExtensionHooks,
    pub config_prefix: String,
    /// Base for relative paths. Defaults to the process working directory.
    pub working_dir: Option<PathBuf>,
}

impl AdapterOptions {
    pub fn new(pages_root: impl Into<PathBuf>) -> Self {
        Self {
            pages_root: pages_root.into(),
            partials: Vec::new(),
            hooks: ExtensionHooks::default(),
            config_prefix: DEFAULT_CONFIG_PREFIX.to_string(),
            working_dir: None,
        }
    }

    pub fn with_partials(mut self, partials: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.partials = partials.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hooks(mut self, hooks: ExtensionHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_config_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config_prefix = prefix.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
struct LoadedSettings {
    engine: EngineSettings,
    public_dir: Option<PathBuf>,
}

pub struct DustAdapter {
    config: Arc<dyn ConfigStore>,
    filesystem: Arc<dyn Filesystem>,
    extensions: Arc<dyn ExtensionLoader>,
    engine: Arc<DustEngine>,
    options: AdapterOptions,
    settings: RwLock<LoadedSettings>,
    state: RwLock<AdapterState>,
}

impl fmt::Debug for DustAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DustAdapter")
            .field("state", &self.state())
            .field("options", &self.options)
            .field("engine", &self.engine)
            .finish()
    }
}

impl DustAdapter {
    /// Create an adapter. No I/O happens until [`Self::initialise`].
    pub fn new(
        config: Arc<dyn ConfigStore>,
        filesystem: Arc<dyn Filesystem>,
        extensions: Arc<dyn ExtensionLoader>,
        options: AdapterOptions,
    ) -> Self {
        Self {
            config,
            filesystem,
            extensions,
            engine: Arc::new(DustEngine::new()),
            options,
            settings: RwLock::new(LoadedSettings::default()),
            state: RwLock::new(AdapterState::Constructed),
        }
    }

    pub const fn metadata() -> AdapterMetadata {
        AdapterMetadata {
            extensions: TEMPLATE_EXTENSIONS,
            handle: "dust",
        }
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            engine: "dust",
            version: self.engine.version(),
        }
    }

    /// The engine, for hosts that need to go past the adapter surface.
    pub fn core(&self) -> Arc<DustEngine> {
        Arc::clone(&self.engine)
    }

    pub fn state(&self) -> AdapterState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Settings applied by the last successful initialisation.
    pub fn settings(&self) -> EngineSettings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .engine
            .clone()
    }

    fn set_state(&self, state: AdapterState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Apply settings, load extensions, and register partials.
    ///
    /// A failure returns the adapter to `Constructed`; whatever was loaded
    /// before the failing phase stays registered.
    #[instrument(skip(self), fields(prefix = %self.options.config_prefix))]
    pub async fn initialise(&self) -> DustResult<()> {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if *state == AdapterState::Initialising {
                return Err(DustError::Internal {
                    message: "initialise called while already initialising".into(),
                });
            }
            *state = AdapterState::Initialising;
        }

        match self.run_initialise().await {
            Ok(()) => {
                self.set_state(AdapterState::Ready);
                info!("dust adapter ready");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "initialisation failed");
                self.set_state(AdapterState::Constructed);
                Err(e)
            }
        }
    }

    async fn run_initialise(&self) -> DustResult<()> {
        let loaded = self.read_settings()?;
        self.engine.configure(loaded.engine.engine_config());
        let paths = loaded.engine.paths.clone();
        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = loaded;

        self.options.hooks.install(&self.engine);

        let filters = self.load_extensions(&self.resolve(&paths.filters)).await?;
        debug!(?filters, "filters loaded");

        let helpers = self.load_extensions(&self.resolve(&paths.helpers)).await?;
        debug!(?helpers, "helpers loaded");

        let partials = self.load_partials().await?;
        debug!(?partials, "partials loaded");
        Ok(())
    }

    fn read_settings(&self) -> DustResult<LoadedSettings> {
        let prefix = self.options.config_prefix.as_str();
        let subtree = self.config.get(prefix).or_else(|| {
            (prefix == DEFAULT_CONFIG_PREFIX)
                .then(|| self.config.get(FLAT_CONFIG_PREFIX))
                .flatten()
        });

        let engine = EngineSettings::from_value(subtree.unwrap_or(Value::Null))
            .map_err(|e| DustError::configuration(e.to_string()))?;

        let public_dir = match self.config.get(PUBLIC_PATH_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(dir)) => Some(PathBuf::from(dir)),
            Some(other) => {
                return Err(DustError::configuration(format!(
                    "'{PUBLIC_PATH_KEY}' must be a string, found {other}"
                )));
            }
        };

        Ok(LoadedSettings { engine, public_dir })
    }

    /// Load every manifest under `dir` and install its definitions.
    ///
    /// Manifests install in path order, so a filter may build on filters
    /// from manifests that sort before it.
    async fn load_extensions(&self, dir: &Path) -> DustResult<Vec<String>> {
        let suffix = self.extensions.file_extension().to_string();
        let files = read_directory(
            Arc::clone(&self.filesystem),
            dir,
            &DiscoveryOptions::recursive(&[suffix.as_str()]),
        )
        .await?;

        let filesystem = Arc::clone(&self.filesystem);
        let loader = Arc::clone(&self.extensions);
        let parse = move |path: PathBuf| {
            let filesystem = Arc::clone(&filesystem);
            let loader = Arc::clone(&loader);
            async move {
                let source = filesystem.read_to_string(&path).await?;
                let definitions = loader.parse(&path, &source)?;
                Ok::<_, ApplicationError>((path, definitions))
            }
        };

        let mut manifests = read_files(
            Arc::clone(&self.filesystem),
            files,
            &[suffix],
            Some(parse),
        )
        .await?;
        manifests.sort_by(|a, b| a.0.cmp(&b.0));

        let mut installed = Vec::new();
        for (path, definitions) in manifests {
            for definition in definitions {
                self.install(&path, &definition)?;
                installed.push(definition.name().to_string());
            }
        }
        Ok(installed)
    }

    fn install(&self, path: &Path, definition: &ExtensionDefinition) -> DustResult<()> {
        definition.install(&self.engine).map_err(|e| {
            ApplicationError::Extension {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn load_partials(&self) -> DustResult<Vec<String>> {
        let files: Vec<PathBuf> = self
            .options
            .partials
            .iter()
            .map(|p| self.resolve(p))
            .collect();
        let pages_root = Arc::new(self.resolve(&self.options.pages_root));

        let filesystem = Arc::clone(&self.filesystem);
        let engine = Arc::clone(&self.engine);
        let load = move |path: PathBuf| {
            let filesystem = Arc::clone(&filesystem);
            let engine = Arc::clone(&engine);
            let pages_root = Arc::clone(&pages_root);
            async move {
                let source = filesystem.read_to_string(&path).await?;
                let name = template_name(&pages_root, &path);
                let compiled = engine.compile(&source, &name)?;
                engine.load_source(compiled);
                Ok::<_, DustError>(name)
            }
        };

        read_files(
            Arc::clone(&self.filesystem),
            files,
            &[TEMPLATE_EXTENSION.to_string()],
            Some(load),
        )
        .await
    }

    /// Compile `source` as `name`, replacing any existing template.
    ///
    /// The previous template stays in place if compilation fails.
    #[instrument(skip(self, source))]
    pub fn register(&self, name: &str, source: &str) -> DustResult<()> {
        let compiled = self.engine.compile(source, name)?;
        if !self.engine.config().cache {
            self.engine.remove(name);
        }
        self.engine.load_source(compiled);
        debug!("template registered");
        Ok(())
    }

    /// Render `name` against `locals`.
    ///
    /// A name that is not cached is compiled from `source` for this call
    /// only.
    #[instrument(skip(self, source, locals))]
    pub fn render(
        &self,
        name: &str,
        source: Option<&str>,
        locals: &Value,
        options: &RenderOptions,
    ) -> DustResult<String> {
        let output = match (self.engine.template(name), source) {
            (Some(template), _) => self.engine.render_template(&template, locals, options)?,
            (None, Some(source)) => {
                let compiled = self.engine.compile(source, name)?;
                self.engine.render_template(&compiled, locals, options)?
            }
            (None, None) => return Err(RenderError::TemplateNotFound(name.to_string()).into()),
        };
        Ok(output)
    }

    /// Called by the host once every initial template is registered.
    pub async fn finish_loading(&self) -> DustResult<Vec<PathBuf>> {
        self.export_client_templates().await
    }

    /// Write compiled templates for client-side rendering, if enabled.
    pub async fn export_client_templates(&self) -> DustResult<Vec<PathBuf>> {
        let loaded = self
            .settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let client = &loaded.engine.client_render;

        let output = match &loaded.public_dir {
            Some(public) => public.join(&client.path),
            None => client.path.clone(),
        };

        client_export::export_client_templates(
            &self.engine,
            Arc::clone(&self.filesystem),
            client,
            self.resolve(&output),
        )
        .await
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match &self.options.working_dir {
            Some(dir) => dir.join(path),
            None => std::env::current_dir()
                .map(|dir| dir.join(path))
                .unwrap_or_else(|_| path.to_path_buf()),
        }
    }
}
