//! Infrastructure adapters for dustbind.
//!
//! This crate implements the ports defined in
//! `dustbind-core::application::ports` and owns every external I/O
//! dependency: tokio filesystem access, TOML manifests, the `config` crate,
//! and the tracing subscriber.

pub mod config;
pub mod extension_loader;
pub mod filesystem;
pub mod logging;

pub use self::config::{JsonConfig, LayeredConfig};
pub use extension_loader::TomlExtensionLoader;
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use logging::init_logging;
