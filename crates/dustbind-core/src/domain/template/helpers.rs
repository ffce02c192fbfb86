//! Helpers: `{@name params}...{/name}` extensions.
//!
//! A helper receives a [`HelperCall`] giving it the resolved params, the
//! caller's context, and the ability to render the section's bodies into
//! the output. The comparison and iteration helpers Dust users expect are
//! registered by default.

use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use serde_json::{Map, Value};

use super::ast::Section;
use super::context::{BlockFrame, Context};
use super::filters::{escape_json, stringify};
use super::renderer::Renderer;
use super::CompiledTemplate;
use crate::domain::{DebugLevel, RenderError};

pub trait Helper: Send + Sync {
    fn call(&self, call: &mut HelperCall<'_>) -> Result<(), RenderError>;
}

/// Adapts a closure into a [`Helper`].
pub struct FnHelper<F>(pub F);

impl<F> Helper for FnHelper<F>
where
    F: Fn(&mut HelperCall<'_>) -> Result<(), RenderError> + Send + Sync,
{
    fn call(&self, call: &mut HelperCall<'_>) -> Result<(), RenderError> {
        (self.0)(call)
    }
}

/// Wrap a closure as a shareable helper.
pub fn helper_fn<F>(f: F) -> Arc<dyn Helper>
where
    F: Fn(&mut HelperCall<'_>) -> Result<(), RenderError> + Send + Sync + 'static,
{
    Arc::new(FnHelper(f))
}

/// One invocation of a helper.
pub struct HelperCall<'r> {
    renderer: &'r Renderer<'r>,
    name: &'r str,
    ctx: &'r Context<'r>,
    section: &'r Section,
    params: Map<String, Value>,
    out: &'r mut String,
}

impl<'r> HelperCall<'r> {
    pub(super) fn new(
        renderer: &'r Renderer<'r>,
        name: &'r str,
        ctx: &'r Context<'r>,
        section: &'r Section,
        params: Map<String, Value>,
        out: &'r mut String,
    ) -> Self {
        Self {
            renderer,
            name,
            ctx,
            section,
            params,
            out,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn context(&self) -> &Context<'r> {
        self.ctx
    }

    pub fn has_block(&self) -> bool {
        self.section.block.is_some()
    }

    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Render the main body with the caller's context.
    pub fn render_block(&mut self) -> Result<(), RenderError> {
        match &self.section.block {
            Some(block) => self.renderer.render_body(block, self.ctx, self.out),
            None => Ok(()),
        }
    }

    /// Render the `{:else}` body, if any.
    pub fn render_else(&mut self) -> Result<(), RenderError> {
        match self.section.body("else") {
            Some(body) => self.renderer.render_body(body, self.ctx, self.out),
            None => Ok(()),
        }
    }

    /// The main body rendered to a string instead of the output.
    pub fn block_to_string(&self) -> Result<String, RenderError> {
        match &self.section.block {
            Some(block) => self.renderer.render_to_string(block, self.ctx),
            None => Ok(String::new()),
        }
    }

    /// Render another compiled template in place, with `frame` pushed onto
    /// the caller's context.
    pub fn render_template_with(
        &mut self,
        template: &CompiledTemplate,
        frame: Map<String, Value>,
    ) -> Result<(), RenderError> {
        let pushed = self.ctx.push_map(frame);
        let blocks = BlockFrame {
            definitions: &template.blocks,
            parent: pushed.blocks(),
        };
        let ctx = pushed.with_blocks(&blocks);
        self.renderer.render_body(&template.body, &ctx, self.out)
    }

    /// Emit a diagnostic through the engine's debug gate.
    pub fn warn(&self, message: &str) {
        self.renderer.engine().log(DebugLevel::Warn, message);
    }

    pub fn fail(&self, reason: impl Into<String>) -> RenderError {
        RenderError::helper(self.name, reason)
    }
}

/// Helpers every engine starts with.
pub fn builtin() -> BTreeMap<String, Arc<dyn Helper>> {
    let mut helpers: BTreeMap<String, Arc<dyn Helper>> = BTreeMap::new();
    for op in [
        Comparison::Eq,
        Comparison::Ne,
        Comparison::Lt,
        Comparison::Lte,
        Comparison::Gt,
        Comparison::Gte,
    ] {
        helpers.insert(op.name().into(), Arc::new(op));
    }
    for position in [Position::Sep, Position::First, Position::Last] {
        helpers.insert(position.name().into(), Arc::new(position));
    }
    helpers.insert("size".into(), helper_fn(size));
    helpers.insert("contextDump".into(), helper_fn(context_dump));
    helpers
}

// ── Comparisons ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    pub fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
        }
    }

    fn holds(self, key: &Value, value: &Value) -> bool {
        match self {
            Self::Eq => loosely_equal(key, value),
            Self::Ne => !loosely_equal(key, value),
            Self::Lt => order(key, value) == Some(Ordering::Less),
            Self::Lte => matches!(order(key, value), Some(Ordering::Less | Ordering::Equal)),
            Self::Gt => order(key, value) == Some(Ordering::Greater),
            Self::Gte => matches!(
                order(key, value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

impl Helper for Comparison {
    fn call(&self, call: &mut HelperCall<'_>) -> Result<(), RenderError> {
        let Some(key) = call.param("key").cloned() else {
            call.warn(&format!("No key specified for filter in @{}", self.name()));
            return Ok(());
        };
        let value = call.param("value").cloned().unwrap_or(Value::Null);
        let kind = call.param("type").and_then(Value::as_str).map(str::to_owned);

        let key = coerce(key, kind.as_deref());
        let value = coerce(value, kind.as_deref());

        if self.holds(&key, &value) {
            call.render_block()
        } else {
            call.render_else()
        }
    }
}

fn coerce(value: Value, kind: Option<&str>) -> Value {
    match kind {
        Some("number") => match &value {
            Value::Number(_) => value,
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map_or(Value::Null, Value::Number),
            Value::Bool(b) => Value::from(u8::from(*b)),
            _ => Value::Null,
        },
        Some("string") => Value::String(stringify(&value)),
        Some("boolean") => Value::Bool(match &value {
            Value::String(s) => s == "true",
            other => !super::filters::is_empty(other),
        }),
        _ => value,
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// ── Iteration position ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Every iteration except the last.
    Sep,
    First,
    Last,
}

impl Position {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sep => "sep",
            Self::First => "first",
            Self::Last => "last",
        }
    }
}

impl Helper for Position {
    fn call(&self, call: &mut HelperCall<'_>) -> Result<(), RenderError> {
        let ctx = call.context();
        let idx = ctx.get("$idx").and_then(Value::as_u64);
        let len = ctx.get("$len").and_then(Value::as_u64);
        let (Some(idx), Some(len)) = (idx, len) else {
            return Ok(());
        };

        let matches = match self {
            Self::Sep => idx + 1 < len,
            Self::First => idx == 0,
            Self::Last => idx + 1 == len,
        };
        if matches { call.render_block() } else { Ok(()) }
    }
}

// ── Misc ──────────────────────────────────────────────────────────────────────

fn size(call: &mut HelperCall<'_>) -> Result<(), RenderError> {
    let size = match call.param("key") {
        Some(Value::Array(items)) => items.len().to_string(),
        Some(Value::Object(map)) => map.len().to_string(),
        Some(Value::String(s)) => s.chars().count().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "0".to_string(),
    };
    call.write(&size);
    Ok(())
}

fn context_dump(call: &mut HelperCall<'_>) -> Result<(), RenderError> {
    let full = call.param("key").and_then(Value::as_str) == Some("full");
    let value = if full {
        call.context().dump()
    } else {
        call.context().head().clone()
    };
    let json = serde_json::to_string_pretty(&value).map_err(|e| call.fail(e.to_string()))?;
    call.write(&escape_json(&json));
    Ok(())
}

/// A helper defined as a Dust template in an extension manifest.
///
/// The template sees the caller's context with the helper params pushed on
/// top, plus `body` holding the caller's rendered block.
pub struct TemplateHelper {
    template: Arc<CompiledTemplate>,
}

impl TemplateHelper {
    pub fn new(template: CompiledTemplate) -> Self {
        Self {
            template: Arc::new(template),
        }
    }
}

impl Helper for TemplateHelper {
    fn call(&self, call: &mut HelperCall<'_>) -> Result<(), RenderError> {
        let mut frame = call.params().clone();
        if call.has_block() {
            frame.insert("body".into(), Value::String(call.block_to_string()?));
        }
        call.render_template_with(&self.template, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comparisons_coerce_by_type() {
        assert!(Comparison::Eq.holds(
            &coerce(json!("3"), Some("number")),
            &coerce(json!(3), Some("number"))
        ));
        assert!(!Comparison::Eq.holds(&json!("3"), &json!(3)));
        assert!(Comparison::Lt.holds(&json!(2), &json!(10)));
        assert!(Comparison::Gte.holds(&json!("b"), &json!("a")));
        assert!(!Comparison::Gt.holds(&json!("b"), &json!(1)));
    }

    #[test]
    fn integer_and_float_numbers_compare_equal() {
        assert!(Comparison::Eq.holds(&json!(1), &json!(1.0)));
    }

    #[test]
    fn builtin_helper_names() {
        let names: Vec<_> = builtin().into_keys().collect();
        for expected in ["contextDump", "eq", "first", "gt", "last", "sep", "size"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }
}
