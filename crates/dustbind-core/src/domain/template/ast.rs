//! Compiled template tree.
//!
//! The parser turns Dust source into a [`Body`]; the renderer and the
//! client code generator both walk it. Nothing here knows about context
//! data or output buffers.

use std::fmt;

/// A sequence of nodes rendered in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    pub nodes: Vec<Node>,
}

impl Body {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal markup.
    Buffer(String),
    /// A newline and the indentation following it. Only emitted when
    /// whitespace is preserved.
    Format(String),
    /// `{~n}`, `{~s}`, ... already resolved to their text.
    Special(&'static str),
    Reference(Reference),
    Section(Section),
    Partial(Partial),
    /// `{+name}default{/name}`
    Block { name: String, default: Body },
}

/// `{path|filter|filter}`
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub path: Path,
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// `{#key}`
    Section,
    /// `{?key}`
    Exists,
    /// `{^key}`
    NotExists,
    /// `{@name}`
    Helper,
}

impl SectionKind {
    pub fn sigil(self) -> char {
        match self {
            Self::Section => '#',
            Self::Exists => '?',
            Self::NotExists => '^',
            Self::Helper => '@',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    /// Context path for `#`, `?`, `^`; for helpers only `key` is used.
    pub key: Path,
    pub params: Vec<Param>,
    /// Main body; `None` for self-closing tags.
    pub block: Option<Body>,
    /// Named bodies introduced with `{:name}` (usually `else`).
    pub bodies: Vec<(String, Body)>,
}

impl Section {
    pub fn body(&self, name: &str) -> Option<&Body> {
        self.bodies
            .iter()
            .find_map(|(n, b)| (n == name).then_some(b))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partial {
    pub name: PartialName,
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartialName {
    Static(String),
    /// `{>"layouts/{kind}"/}`, resolved at render time.
    Dynamic(Body),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub key: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Path(Path),
    Number(serde_json::Number),
    Literal(String),
    /// A quoted string containing references or specials.
    Interpolated(Body),
}

/// A lookup into the context stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Leading dot: only the current frame is consulted.
    pub current: bool,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Path {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            current: false,
            segments: vec![Segment::Key(key.into())],
        }
    }

    /// The single key of a plain `{name}` reference.
    pub fn as_simple_key(&self) -> Option<&str> {
        match (self.current, self.segments.as_slice()) {
            (false, [Segment::Key(k)]) => Some(k),
            _ => None,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.current {
            f.write_str(".")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(k) if i == 0 => f.write_str(k)?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}
