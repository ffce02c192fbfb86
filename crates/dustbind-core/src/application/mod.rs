//! Application layer for dustbind.
//!
//! This layer contains:
//! - **Services**: the `DustAdapter` orchestrator and client export
//! - **Ports**: traits for the filesystem, configuration, and manifests
//! - **Files**: discovery, batch processing, and writing over the ports
//! - **Errors**: application-specific error types
//!
//! Template semantics live in `crate::domain`; this layer only moves files
//! in and out of the engine.

pub mod error;
pub mod files;
pub mod ports;
pub mod services;

pub use services::{AdapterMetadata, AdapterOptions, AdapterState, DustAdapter, EngineInfo};

pub use ports::{ConfigStore, EntryKind, ExtensionLoader, Filesystem};

pub use error::ApplicationError;
