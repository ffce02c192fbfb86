//! Client-side JavaScript emission.
//!
//! Produces the same shape of module Dust's own compiler emits, so the
//! output runs against the stock Dust client runtime:
//!
//! ```text
//! (function(dust){dust.register("name",body_0);function body_0(chk,ctx){return chk.w("...");}body_0.__dustBody=!0;return body_0}(dust));
//! ```

use std::fmt::Write as _;

use super::ast::{Body, Node, Param, ParamValue, PartialName, Path, Section, SectionKind, Segment};
use super::CompiledTemplate;

/// JavaScript source registering `template` with the Dust client runtime.
pub fn generate(template: &CompiledTemplate, whitespace: bool) -> String {
    let mut codegen = Codegen {
        functions: Vec::new(),
        whitespace,
    };

    let root = codegen.reserve();
    let blocks: Vec<String> = template
        .blocks
        .iter()
        .map(|(name, body)| {
            let index = codegen.body(body, false);
            format!("{}:body_{index}", js_string(name))
        })
        .collect();
    let shift_blocks = !blocks.is_empty();
    codegen.fill(root, &template.body, shift_blocks);

    let mut out = String::new();
    let _ = write!(
        out,
        "(function(dust){{dust.register({},body_{root});",
        js_string(&template.name)
    );
    if shift_blocks {
        let _ = write!(out, "var blocks={{{}}};", blocks.join(","));
    }
    for function in &codegen.functions {
        out.push_str(function);
    }
    let _ = write!(out, "return body_{root}}}(dust));");
    out
}

struct Codegen {
    functions: Vec<String>,
    whitespace: bool,
}

impl Codegen {
    fn reserve(&mut self) -> usize {
        self.functions.push(String::new());
        self.functions.len() - 1
    }

    fn body(&mut self, body: &Body, shift_blocks: bool) -> usize {
        let index = self.reserve();
        self.fill(index, body, shift_blocks);
        index
    }

    fn fill(&mut self, index: usize, body: &Body, shift_blocks: bool) {
        let chain = self.chain(body);
        let prelude = if shift_blocks {
            "ctx=ctx.shiftBlocks(blocks);"
        } else {
            ""
        };
        self.functions[index] = format!(
            "function body_{index}(chk,ctx){{{prelude}return chk{chain};}}body_{index}.__dustBody=!0;"
        );
    }

    fn chain(&mut self, body: &Body) -> String {
        let mut chain = String::new();
        for node in &body.nodes {
            match node {
                Node::Buffer(text) => {
                    let _ = write!(chain, ".w({})", js_string(text));
                }
                Node::Format(text) => {
                    if self.whitespace {
                        let _ = write!(chain, ".w({})", js_string(text));
                    }
                }
                Node::Special(text) => {
                    let _ = write!(chain, ".w({})", js_string(text));
                }
                Node::Reference(reference) => {
                    let _ = write!(
                        chain,
                        ".f({},ctx,\"h\"{})",
                        path_expr(&reference.path),
                        filter_list(&reference.filters)
                    );
                }
                Node::Section(section) => {
                    let call = self.section(section);
                    chain.push_str(&call);
                }
                Node::Partial(partial) => {
                    let name = match &partial.name {
                        PartialName::Static(name) => js_string(name),
                        PartialName::Dynamic(body) => format!("body_{}", self.body(body, false)),
                    };
                    let params = self.params(&partial.params);
                    let _ = write!(chain, ".p({name},ctx,ctx,{params})");
                }
                Node::Block { name, default } => {
                    let bodies = if default.is_empty() {
                        "{}".to_string()
                    } else {
                        format!("{{\"block\":body_{}}}", self.body(default, false))
                    };
                    let _ = write!(
                        chain,
                        ".b(ctx.getBlock({}),ctx,{bodies},{{}})",
                        js_string(name)
                    );
                }
            }
        }
        chain
    }

    fn section(&mut self, section: &Section) -> String {
        let mut bodies = Vec::new();
        for (name, body) in &section.bodies {
            bodies.push(format!("{}:body_{}", js_string(name), self.body(body, false)));
        }
        if let Some(block) = &section.block {
            bodies.push(format!("\"block\":body_{}", self.body(block, false)));
        }
        let bodies = format!("{{{}}}", bodies.join(","));
        let params = self.params(&section.params);

        match section.kind {
            SectionKind::Helper => format!(
                ".h({},ctx,{bodies},{params},\"h\")",
                js_string(&section.key.to_string())
            ),
            SectionKind::Section => format!(".s({},ctx,{bodies},{params})", path_expr(&section.key)),
            SectionKind::Exists => format!(".x({},ctx,{bodies},{params})", path_expr(&section.key)),
            SectionKind::NotExists => {
                format!(".nx({},ctx,{bodies},{params})", path_expr(&section.key))
            }
        }
    }

    fn params(&mut self, params: &[Param]) -> String {
        let entries: Vec<String> = params
            .iter()
            .map(|param| {
                let value = match &param.value {
                    ParamValue::Path(path) => path_expr(path),
                    ParamValue::Number(n) => n.to_string(),
                    ParamValue::Literal(text) => js_string(text),
                    ParamValue::Interpolated(body) => format!("body_{}", self.body(body, false)),
                };
                format!("{}:{value}", js_string(&param.key))
            })
            .collect();
        format!("{{{}}}", entries.join(","))
    }
}

fn path_expr(path: &Path) -> String {
    if let Some(key) = path.as_simple_key() {
        return format!("ctx.get([{}], false)", js_string(key));
    }
    let segments: Vec<String> = path
        .segments
        .iter()
        .map(|segment| match segment {
            Segment::Key(key) => js_string(key),
            Segment::Index(index) => index.to_string(),
        })
        .collect();
    format!("ctx.getPath({}, [{}])", path.current, segments.join(","))
}

fn filter_list(filters: &[String]) -> String {
    if filters.is_empty() {
        return String::new();
    }
    let quoted: Vec<String> = filters.iter().map(|f| js_string(f)).collect();
    format!(",[{}]", quoted.join(","))
}

/// A double-quoted JavaScript string literal.
fn js_string(text: &str) -> String {
    serde_json::to_string(text)
        .unwrap_or_else(|_| String::from("\"\""))
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}
