// ============================================================================
//  DOMAIN: THE DUST ENGINE AND ITS SETTINGS
// ============================================================================

//! Core domain layer for dustbind.
//!
//! Everything here is synchronous and free of I/O: the template engine,
//! extension definitions, settings, and template naming. File access and
//! configuration lookup live behind ports in the application layer.

pub mod engine;
pub mod error;
pub mod extension;
pub mod naming;
pub mod settings;
pub mod template;

pub use engine::{DustEngine, ENGINE_VERSION, RenderOptions};
pub use error::{CompileError, DomainError, ErrorCategory, RenderError};
pub use extension::{ExtensionDefinition, ExtensionHooks, FilterDefinition, HelperDefinition};
pub use naming::{Whitelist, template_name};
pub use settings::{
    ClientRenderSettings, DebugLevel, EngineConfig, EngineSettings, ExtensionPaths, OutputFormat,
};
pub use template::{CompiledTemplate, Filter, Helper, HelperCall, helper_fn, string_filter};
