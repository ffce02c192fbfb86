//! Render context: a stack of JSON frames plus the visible block tables.

use std::borrow::Cow;

use serde_json::{Map, Value};

use super::ast::{Body, Path, Segment};

static NULL: Value = Value::Null;

/// One frame of the context stack.
///
/// Frames borrow their parent, so pushing is cheap and popping is simply
/// dropping the child context.
#[derive(Debug)]
pub struct Context<'a> {
    head: Cow<'a, Value>,
    parent: Option<&'a Context<'a>>,
    blocks: Option<&'a BlockFrame<'a>>,
}

/// Inline partial definitions visible to a render, innermost first.
#[derive(Debug)]
pub struct BlockFrame<'a> {
    pub definitions: &'a [(String, Body)],
    pub parent: Option<&'a BlockFrame<'a>>,
}

impl<'a> Context<'a> {
    /// Root context for a render.
    pub fn root(locals: &'a Value) -> Self {
        Self {
            head: Cow::Borrowed(locals),
            parent: None,
            blocks: None,
        }
    }

    pub fn head(&self) -> &Value {
        &self.head
    }

    /// Push a new frame on top of this one.
    pub fn push<'b>(&'b self, head: Cow<'b, Value>) -> Context<'b> {
        Context {
            head,
            parent: Some(self),
            blocks: self.blocks,
        }
    }

    /// Push an object frame built from key/value pairs.
    pub fn push_map<'b>(&'b self, map: Map<String, Value>) -> Context<'b> {
        self.push(Cow::Owned(Value::Object(map)))
    }

    /// The same frames with another block table in front.
    pub fn with_blocks<'b>(&'b self, blocks: &'b BlockFrame<'b>) -> Context<'b> {
        Context {
            head: Cow::Borrowed(self.head.as_ref()),
            parent: self.parent,
            blocks: Some(blocks),
        }
    }

    pub fn blocks(&self) -> Option<&'a BlockFrame<'a>> {
        self.blocks
    }

    /// Find a key by searching from the innermost frame outwards.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut frame = Some(self);
        while let Some(ctx) = frame {
            if let Some(value) = ctx.head.get(key) {
                return Some(value);
            }
            frame = ctx.parent;
        }
        None
    }

    /// Resolve a path. Missing values resolve to `null`.
    pub fn resolve(&self, path: &Path) -> &Value {
        let mut segments = path.segments.iter();

        let mut value: &Value = if path.current {
            self.head()
        } else {
            match segments.next() {
                Some(Segment::Key(key)) => match self.get(key) {
                    Some(value) => value,
                    None => return &NULL,
                },
                Some(Segment::Index(index)) => match self.head().get(*index) {
                    Some(value) => value,
                    None => return &NULL,
                },
                None => self.head(),
            }
        };

        for segment in segments {
            let next = match segment {
                Segment::Key(key) => value.get(key.as_str()),
                Segment::Index(index) => value.get(*index),
            };
            match next {
                Some(next) => value = next,
                None => return &NULL,
            }
        }
        value
    }

    /// Innermost inline partial called `name`.
    pub fn block(&self, name: &str) -> Option<&'a Body> {
        let mut frame = self.blocks;
        while let Some(table) = frame {
            if let Some((_, body)) = table.definitions.iter().rev().find(|(n, _)| n == name) {
                return Some(body);
            }
            frame = table.parent;
        }
        None
    }

    /// Flatten the visible frames into one object, inner keys winning.
    pub fn dump(&self) -> Value {
        let mut frames = Vec::new();
        let mut frame = Some(self);
        while let Some(ctx) = frame {
            frames.push(ctx.head());
            frame = ctx.parent;
        }

        let mut merged = Map::new();
        for head in frames.into_iter().rev() {
            if let Value::Object(map) = head {
                for (k, v) in map {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }
        Value::Object(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(current: bool, keys: &[&str]) -> Path {
        Path {
            current,
            segments: keys.iter().map(|k| Segment::Key(k.to_string())).collect(),
        }
    }

    #[test]
    fn lookup_walks_up_the_stack() {
        let locals = json!({ "site": "Shop", "user": { "name": "Ana" } });
        let root = Context::root(&locals);
        let inner = root.push(Cow::Owned(json!({ "name": "Widget" })));

        assert_eq!(inner.get("site"), Some(&json!("Shop")));
        assert_eq!(inner.get("name"), Some(&json!("Widget")));
        assert_eq!(inner.resolve(&path(false, &["user", "name"])), &json!("Ana"));
    }

    #[test]
    fn leading_dot_only_sees_current_frame() {
        let locals = json!({ "site": "Shop" });
        let root = Context::root(&locals);
        let inner = root.push(Cow::Owned(json!({ "title": "T" })));

        assert_eq!(inner.resolve(&path(true, &["site"])), &Value::Null);
        assert_eq!(inner.resolve(&path(true, &["title"])), &json!("T"));
        assert_eq!(inner.resolve(&path(true, &[])), &json!({ "title": "T" }));
    }

    #[test]
    fn index_segments_drill_into_arrays() {
        let locals = json!({ "items": ["a", "b"] });
        let root = Context::root(&locals);
        let p = Path {
            current: false,
            segments: vec![Segment::Key("items".into()), Segment::Index(1)],
        };
        assert_eq!(root.resolve(&p), &json!("b"));
    }

    #[test]
    fn newest_block_definition_wins() {
        let outer = [("title".to_string(), Body::default())];
        let inner = [(
            "title".to_string(),
            Body::new(vec![super::super::ast::Node::Buffer("inner".into())]),
        )];
        let outer_frame = BlockFrame {
            definitions: &outer,
            parent: None,
        };
        let inner_frame = BlockFrame {
            definitions: &inner,
            parent: Some(&outer_frame),
        };

        let locals = json!({});
        let root = Context::root(&locals);
        let ctx = root.with_blocks(&inner_frame);
        assert_eq!(ctx.block("title"), Some(&inner[0].1));
        assert!(ctx.block("missing").is_none());
    }

    #[test]
    fn dump_merges_frames() {
        let locals = json!({ "a": 1, "b": 1 });
        let root = Context::root(&locals);
        let inner = root.push(Cow::Owned(json!({ "b": 2 })));
        assert_eq!(inner.dump(), json!({ "a": 1, "b": 2 }));
    }
}
