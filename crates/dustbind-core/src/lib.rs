//! dustbind core - a Dust template engine and the adapter that wires it
//! into a host framework.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Host framework               │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        DustAdapter (application)        │
//! │  initialise / register / render / export│
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ Filesystem, ConfigStore, ExtensionLoader│
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     dustbind-adapters (Infrastructure)  │
//! └─────────────────────────────────────────┘
//!
//!        DustEngine (domain): parser, renderer, filters, helpers
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dustbind_core::prelude::*;
//!
//! # async fn run(
//! #     config: Arc<dyn ConfigStore>,
//! #     filesystem: Arc<dyn Filesystem>,
//! #     loader: Arc<dyn ExtensionLoader>,
//! # ) -> DustResult<()> {
//! let adapter = DustAdapter::new(
//!     config,
//!     filesystem,
//!     loader,
//!     AdapterOptions::new("pages").with_partials(["pages/partials/header.dust"]),
//! );
//! adapter.initialise().await?;
//! adapter.register("products", "<ul>{#products}<li>{name}</li>{/products}</ul>")?;
//! let html = adapter.render(
//!     "products",
//!     None,
//!     &serde_json::json!({ "products": [{ "name": "A" }] }),
//!     &RenderOptions::default(),
//! )?;
//! adapter.finish_loading().await?;
//! # Ok(())
//! # }
//! ```

pub mod domain;

pub mod application;

pub mod error;

pub mod prelude {
    pub use crate::application::{
        AdapterOptions, AdapterState, DustAdapter,
        ports::{ConfigStore, EntryKind, ExtensionLoader, Filesystem},
    };
    pub use crate::domain::{
        CompiledTemplate, DebugLevel, DustEngine, EngineSettings, ExtensionDefinition,
        ExtensionHooks, OutputFormat, RenderOptions, helper_fn, string_filter,
    };
    pub use crate::error::{DustError, DustResult};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
