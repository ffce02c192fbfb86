//! The Dust template language: parser, compiled tree, renderer, filters,
//! helpers, and client-side code generation.

pub mod ast;
pub mod codegen;
pub mod context;
pub mod filters;
pub mod helpers;
pub mod parser;
pub mod renderer;

pub use ast::Body;
pub use context::Context;
pub use filters::{Filter, string_filter};
pub use helpers::{FnHelper, Helper, HelperCall, TemplateHelper, helper_fn};
pub use renderer::{MAX_NESTING_DEPTH, Renderer};

/// A template ready to render or to export for the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub name: String,
    pub body: Body,
    /// Inline partials (`{<name}`) hoisted from the whole template.
    pub blocks: Vec<(String, Body)>,
}

impl CompiledTemplate {
    pub fn new(name: impl Into<String>, parsed: parser::Parsed) -> Self {
        Self {
            name: name.into(),
            body: parsed.body,
            blocks: parsed.blocks,
        }
    }

    /// JavaScript registering this template with the Dust client runtime.
    pub fn client_source(&self, whitespace: bool) -> String {
        codegen::generate(self, whitespace)
    }
}
