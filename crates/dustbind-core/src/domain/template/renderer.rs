//! Tree-walking renderer.
//!
//! Rendering never fails because a helper, partial, or filter is missing;
//! those are logged through the engine's debug gate and skipped.

use std::borrow::Cow;

use serde_json::{Map, Value};

use super::ast::{Body, Node, Param, ParamValue, Partial, PartialName, Reference, Section, SectionKind};
use super::context::{BlockFrame, Context};
use super::filters::{escape_html, is_empty, stringify};
use super::helpers::HelperCall;
use super::CompiledTemplate;
use crate::domain::{DebugLevel, DustEngine, RenderError};

/// Partials and helpers nested deeper than this abort the render.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Renders compiled templates against one engine's registries.
pub struct Renderer<'e> {
    engine: &'e DustEngine,
    whitespace: bool,
    depth: std::cell::Cell<usize>,
}

impl<'e> Renderer<'e> {
    pub fn new(engine: &'e DustEngine, whitespace: bool) -> Self {
        Self {
            engine,
            whitespace,
            depth: std::cell::Cell::new(0),
        }
    }

    pub fn engine(&self) -> &'e DustEngine {
        self.engine
    }

    /// Render a whole template with `locals` as the root frame.
    pub fn render_template(
        &self,
        template: &CompiledTemplate,
        locals: &Value,
    ) -> Result<String, RenderError> {
        let root = Context::root(locals);
        let frame = BlockFrame {
            definitions: &template.blocks,
            parent: None,
        };
        let ctx = root.with_blocks(&frame);

        let mut out = String::new();
        self.render_body(&template.body, &ctx, &mut out)?;
        Ok(out)
    }

    pub fn render_body(
        &self,
        body: &Body,
        ctx: &Context<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for node in &body.nodes {
            match node {
                Node::Buffer(text) => out.push_str(text),
                Node::Format(text) => {
                    if self.whitespace {
                        out.push_str(text);
                    }
                }
                Node::Special(text) => out.push_str(text),
                Node::Reference(reference) => self.render_reference(reference, ctx, out)?,
                Node::Section(section) => self.render_section(section, ctx, out)?,
                Node::Partial(partial) => self.render_partial(partial, ctx, out)?,
                Node::Block { name, default } => match ctx.block(name) {
                    Some(body) => self.render_body(body, ctx, out)?,
                    None => self.render_body(default, ctx, out)?,
                },
            }
        }
        Ok(())
    }

    /// Render a body into a fresh string.
    pub fn render_to_string(&self, body: &Body, ctx: &Context<'_>) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render_body(body, ctx, &mut out)?;
        Ok(out)
    }

    fn render_reference(
        &self,
        reference: &Reference,
        ctx: &Context<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let value = ctx.resolve(&reference.path);
        if is_empty(value) {
            return Ok(());
        }

        let mut current = Cow::Borrowed(value);
        let mut auto_escape = true;
        for name in &reference.filters {
            if name == "s" {
                auto_escape = false;
                continue;
            }
            match self.engine.filter(name) {
                Some(filter) => {
                    let next = filter(current.as_ref()).map_err(|reason| RenderError::Filter {
                        filter: name.clone(),
                        reason,
                    })?;
                    current = Cow::Owned(next);
                }
                None => self
                    .engine
                    .log(DebugLevel::Warn, &format!("Invalid filter [{name}]")),
            }
        }

        let text = stringify(&current);
        if auto_escape {
            match self.engine.filter("h") {
                Some(h) => {
                    let escaped = h(&Value::String(text)).map_err(|reason| RenderError::Filter {
                        filter: "h".into(),
                        reason,
                    })?;
                    out.push_str(&stringify(&escaped));
                }
                None => out.push_str(&escape_html(&text)),
            }
        } else {
            out.push_str(&text);
        }
        Ok(())
    }

    fn render_section(
        &self,
        section: &Section,
        ctx: &Context<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        if section.kind == SectionKind::Helper {
            return self.render_helper(section, ctx, out);
        }

        let value = ctx.resolve(&section.key);

        let params_ctx;
        let base = if section.params.is_empty() {
            ctx
        } else {
            params_ctx = ctx.push_map(self.resolve_params(&section.params, ctx)?);
            &params_ctx
        };

        let block = section.block.as_ref();
        let otherwise = section.body("else");

        match section.kind {
            SectionKind::Section => match value {
                Value::Array(items) if !items.is_empty() => {
                    if let Some(block) = block {
                        let len = items.len();
                        for (idx, item) in items.iter().enumerate() {
                            let mut position = Map::new();
                            position.insert("$idx".into(), Value::from(idx));
                            position.insert("$len".into(), Value::from(len));
                            let iteration = base.push_map(position);
                            let item_ctx = iteration.push(Cow::Borrowed(item));
                            self.render_body(block, &item_ctx, out)?;
                        }
                    }
                }
                Value::Bool(true) => self.render_optional(block, base, out)?,
                other if !is_empty(other) => {
                    if let Some(block) = block {
                        let pushed = base.push(Cow::Borrowed(other));
                        self.render_body(block, &pushed, out)?;
                    }
                }
                _ => self.render_optional(otherwise, base, out)?,
            },
            kind => {
                // `?` renders the block for present values, `^` for empty ones.
                let present = !is_empty(value);
                let chosen = if present == (kind == SectionKind::Exists) {
                    block
                } else {
                    otherwise
                };
                self.render_optional(chosen, base, out)?;
            }
        }
        Ok(())
    }

    fn render_optional(
        &self,
        body: Option<&Body>,
        ctx: &Context<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        match body {
            Some(body) => self.render_body(body, ctx, out),
            None => Ok(()),
        }
    }

    fn render_helper(
        &self,
        section: &Section,
        ctx: &Context<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let name = section.key.to_string();
        let Some(helper) = self.engine.helper(&name) else {
            self.engine.log(
                DebugLevel::Warn,
                &format!("Helper '{name}' does not exist; skipping its section"),
            );
            return Ok(());
        };

        let params = self.resolve_params(&section.params, ctx)?;
        self.nested(
            |limit| RenderError::HelperDepth {
                helper: name.clone(),
                limit,
            },
            || {
                let mut call = HelperCall::new(self, &name, ctx, section, params, out);
                helper.call(&mut call)
            },
        )
    }

    fn render_partial(
        &self,
        partial: &Partial,
        ctx: &Context<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let name = match &partial.name {
            PartialName::Static(name) => Cow::Borrowed(name.as_str()),
            PartialName::Dynamic(body) => Cow::Owned(self.render_to_string(body, ctx)?),
        };

        let Some(template) = self.engine.template(&name) else {
            self.engine.log(
                DebugLevel::Warn,
                &format!("Partial '{name}' is not loaded; skipping it"),
            );
            return Ok(());
        };

        let params_ctx;
        let base = if partial.params.is_empty() {
            ctx
        } else {
            params_ctx = ctx.push_map(self.resolve_params(&partial.params, ctx)?);
            &params_ctx
        };

        let frame = BlockFrame {
            definitions: &template.blocks,
            parent: base.blocks(),
        };
        let partial_ctx = base.with_blocks(&frame);

        self.nested(
            |limit| RenderError::PartialDepth {
                partial: name.to_string(),
                limit,
            },
            || self.render_body(&template.body, &partial_ctx, out),
        )
    }

    /// Run `render` one nesting level deeper, failing with `exceeded` once
    /// the shared partial and helper budget is spent.
    fn nested(
        &self,
        exceeded: impl FnOnce(usize) -> RenderError,
        render: impl FnOnce() -> Result<(), RenderError>,
    ) -> Result<(), RenderError> {
        let depth = self.depth.get() + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(exceeded(MAX_NESTING_DEPTH));
        }
        self.depth.set(depth);
        let result = render();
        self.depth.set(depth - 1);
        result
    }

    fn resolve_params(
        &self,
        params: &[Param],
        ctx: &Context<'_>,
    ) -> Result<Map<String, Value>, RenderError> {
        let mut resolved = Map::new();
        for param in params {
            let value = match &param.value {
                ParamValue::Path(path) => ctx.resolve(path).clone(),
                ParamValue::Number(n) => Value::Number(n.clone()),
                ParamValue::Literal(text) => Value::String(text.clone()),
                ParamValue::Interpolated(body) => Value::String(self.render_to_string(body, ctx)?),
            };
            resolved.insert(param.key.clone(), value);
        }
        Ok(resolved)
    }
}
