//! Application services.
//!
//! `DustAdapter` is the single use-case orchestrator the host talks to;
//! client export is split out because it is the only multi-write flow.

pub mod client_export;
pub mod dust_adapter;

pub use client_export::export_client_templates;
pub use dust_adapter::{
    AdapterMetadata, AdapterOptions, AdapterState, DEFAULT_CONFIG_PREFIX, DustAdapter, EngineInfo,
    FLAT_CONFIG_PREFIX, PUBLIC_PATH_KEY,
};
