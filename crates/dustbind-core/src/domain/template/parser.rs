//! Dust source parser.
//!
//! A hand-written recursive descent parser over the template source. It
//! produces the tree in [`super::ast`] plus the inline partials (`{<name}`)
//! found anywhere in the template, which Dust hoists to template level.
//!
//! A `{` followed by a tag sigil must form a valid tag, otherwise parsing
//! fails. A `{` that starts neither a tag nor a well-formed reference is
//! literal text, so embedded CSS and script blocks survive untouched.

use super::ast::{
    Body, Node, Param, ParamValue, Partial, PartialName, Path, Reference, Section, SectionKind,
    Segment,
};
use crate::domain::CompileError;

/// Sections, blocks and inline partials nested deeper than this fail to
/// compile.
pub const MAX_SECTION_DEPTH: usize = 256;

/// Output of a successful parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    pub body: Body,
    /// `{<name}...{/name}` definitions, in source order.
    pub blocks: Vec<(String, Body)>,
}

/// Parse `source` as the template called `name`.
pub fn parse(name: &str, source: &str) -> Result<Parsed, CompileError> {
    let mut parser = Parser::new(name, source);
    let (nodes, stop) = parser.parse_nodes()?;

    match stop {
        Stop::Eof => Ok(Parsed {
            body: Body::new(nodes),
            blocks: parser.blocks,
        }),
        Stop::Close { key, at } => Err(parser.error_at(at, format!("Unexpected end tag '{key}'"))),
        Stop::Bodies { name, at } => {
            Err(parser.error_at(at, format!("Unexpected '{{:{name}}}' outside of a section")))
        }
    }
}

/// Why a run of nodes ended.
enum Stop {
    Eof,
    /// `{/key}`
    Close { key: String, at: usize },
    /// `{:name}`
    Bodies { name: String, at: usize },
}

enum Quoted {
    Literal(String),
    Interpolated(Body),
}

enum Tag {
    Node(Node),
    Close(String),
    Bodies(String),
    /// Comments and hoisted inline partials.
    Nothing,
}

struct Parser<'a> {
    name: &'a str,
    src: &'a str,
    pos: usize,
    depth: usize,
    blocks: Vec<(String, Body)>,
}

impl<'a> Parser<'a> {
    fn new(name: &'a str, src: &'a str) -> Self {
        Self {
            name,
            src,
            pos: 0,
            depth: 0,
            blocks: Vec::new(),
        }
    }

    // ── Body ─────────────────────────────────────────────────────────────

    fn parse_nodes(&mut self) -> Result<(Vec<Node>, Stop), CompileError> {
        if self.depth >= MAX_SECTION_DEPTH {
            return Err(self.error_at(self.pos, "Sections nested too deeply"));
        }
        self.depth += 1;
        let parsed = self.parse_run();
        self.depth -= 1;
        parsed
    }

    fn parse_run(&mut self) -> Result<(Vec<Node>, Stop), CompileError> {
        let mut nodes = Vec::new();
        let mut buffer = String::new();

        loop {
            let Some(c) = self.peek() else {
                flush(&mut buffer, &mut nodes);
                return Ok((nodes, Stop::Eof));
            };

            match c {
                '{' => {
                    let start = self.pos;
                    match self.parse_tag()? {
                        Some(Tag::Node(node)) => {
                            flush(&mut buffer, &mut nodes);
                            nodes.push(node);
                        }
                        Some(Tag::Nothing) => {}
                        Some(Tag::Close(key)) => {
                            flush(&mut buffer, &mut nodes);
                            return Ok((nodes, Stop::Close { key, at: start }));
                        }
                        Some(Tag::Bodies(name)) => {
                            flush(&mut buffer, &mut nodes);
                            return Ok((nodes, Stop::Bodies { name, at: start }));
                        }
                        None => {
                            self.pos = start + 1;
                            buffer.push('{');
                        }
                    }
                }
                '\n' | '\r' => {
                    flush(&mut buffer, &mut nodes);
                    let start = self.pos;
                    self.eat_eol();
                    while matches!(self.peek(), Some(' ' | '\t')) {
                        self.bump();
                    }
                    nodes.push(Node::Format(self.src[start..self.pos].to_string()));
                }
                _ => {
                    buffer.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Parse the tag at `{`. `Ok(None)` means the brace is literal text.
    fn parse_tag(&mut self) -> Result<Option<Tag>, CompileError> {
        let start = self.pos;
        self.bump(); // '{'

        let Some(sigil) = self.peek() else {
            return Ok(None);
        };

        match sigil {
            '!' => self.parse_comment(start).map(Some),
            '`' => self.parse_raw(start).map(Some),
            '#' | '?' | '^' | '@' => {
                self.bump();
                let kind = match sigil {
                    '#' => SectionKind::Section,
                    '?' => SectionKind::Exists,
                    '^' => SectionKind::NotExists,
                    _ => SectionKind::Helper,
                };
                self.parse_section(kind, start).map(|s| Some(Tag::Node(Node::Section(s))))
            }
            '+' => {
                self.bump();
                self.parse_block(start).map(Some)
            }
            '<' => {
                self.bump();
                self.parse_inline_partial(start).map(Some)
            }
            '>' => {
                self.bump();
                self.parse_partial(start)
                    .map(|p| Some(Tag::Node(Node::Partial(p))))
            }
            '/' => {
                self.bump();
                let key = self.take_until_close(start)?;
                Ok(Some(Tag::Close(key)))
            }
            ':' => {
                self.bump();
                let name = self.take_until_close(start)?;
                if !is_key(&name) {
                    return Err(self.error_at(start, format!("Invalid body name '{name}'")));
                }
                Ok(Some(Tag::Bodies(name)))
            }
            '~' => {
                self.bump();
                self.parse_special(start).map(|s| Some(Tag::Node(Node::Special(s))))
            }
            _ => Ok(self
                .parse_reference()
                .map(|r| Tag::Node(Node::Reference(r)))),
        }
    }

    fn parse_comment(&mut self, start: usize) -> Result<Tag, CompileError> {
        match self.src[self.pos..].find("!}") {
            Some(offset) => {
                self.pos += offset + 2;
                Ok(Tag::Nothing)
            }
            None => Err(self.error_at(start, "Unterminated comment")),
        }
    }

    fn parse_raw(&mut self, start: usize) -> Result<Tag, CompileError> {
        self.bump(); // '`'
        match self.src[self.pos..].find("`}") {
            Some(offset) => {
                let text = self.src[self.pos..self.pos + offset].to_string();
                self.pos += offset + 2;
                Ok(Tag::Node(Node::Buffer(text)))
            }
            None => Err(self.error_at(start, "Unterminated raw block")),
        }
    }

    fn parse_special(&mut self, start: usize) -> Result<&'static str, CompileError> {
        let name = self.take_until_close(start)?;
        match name.as_str() {
            "n" => Ok("\n"),
            "r" => Ok("\r"),
            "s" => Ok(" "),
            "lb" => Ok("{"),
            "rb" => Ok("}"),
            other => Err(self.error_at(start, format!("Unknown special '~{other}'"))),
        }
    }

    fn parse_section(&mut self, kind: SectionKind, start: usize) -> Result<Section, CompileError> {
        self.skip_ws();
        let key_start = self.pos;
        let key = if kind == SectionKind::Helper {
            self.parse_key().map(Path::key)
        } else {
            self.parse_path()
        }
        .ok_or_else(|| self.error_at(start, format!("Expected a key after '{{{}'", kind.sigil())))?;
        let key_text = self.src[key_start..self.pos].to_string();

        let params = self.parse_params(start)?;
        let mut section = Section {
            kind,
            key,
            params,
            block: None,
            bodies: Vec::new(),
        };

        if self.eat("/}") {
            return Ok(section);
        }
        if !self.eat("}") {
            return Err(self.error_at(start, format!("Expected '}}' to close '{{{}{key_text}'", kind.sigil())));
        }

        let (nodes, mut stop) = self.parse_nodes()?;
        section.block = Some(Body::new(nodes));

        loop {
            match stop {
                Stop::Eof => {
                    return Err(self.error_at(start, format!("Expected end tag for '{key_text}'")));
                }
                Stop::Close { key, at } => {
                    if key != key_text {
                        return Err(self.error_at(
                            at,
                            format!("Expected end tag for '{key_text}' but found '{key}'"),
                        ));
                    }
                    return Ok(section);
                }
                Stop::Bodies { name, .. } => {
                    let (nodes, next) = self.parse_nodes()?;
                    section.bodies.push((name, Body::new(nodes)));
                    stop = next;
                }
            }
        }
    }

    fn parse_block(&mut self, start: usize) -> Result<Tag, CompileError> {
        let (name, self_closing) = self.parse_named_open(start, '+')?;
        let default = if self_closing {
            Body::default()
        } else {
            self.parse_closed_body(start, &name)?
        };
        Ok(Tag::Node(Node::Block { name, default }))
    }

    fn parse_inline_partial(&mut self, start: usize) -> Result<Tag, CompileError> {
        let (name, self_closing) = self.parse_named_open(start, '<')?;
        if self_closing {
            return Err(self.error_at(start, format!("Inline partial '{name}' needs a body")));
        }
        let body = self.parse_closed_body(start, &name)?;
        self.blocks.push((name, body));
        Ok(Tag::Nothing)
    }

    /// `name}` or `name/}` after a block sigil. Returns the name and whether
    /// the tag closed itself.
    fn parse_named_open(&mut self, start: usize, sigil: char) -> Result<(String, bool), CompileError> {
        self.skip_ws();
        let name = self
            .parse_key()
            .ok_or_else(|| self.error_at(start, format!("Expected a name after '{{{sigil}'")))?;
        self.skip_ws();
        if self.eat("/}") {
            Ok((name, true))
        } else if self.eat("}") {
            Ok((name, false))
        } else {
            Err(self.error_at(start, format!("Expected '}}' to close '{{{sigil}{name}'")))
        }
    }

    fn parse_closed_body(&mut self, start: usize, name: &str) -> Result<Body, CompileError> {
        let (nodes, stop) = self.parse_nodes()?;
        match stop {
            Stop::Close { key, .. } if key == name => Ok(Body::new(nodes)),
            Stop::Close { key, at } => Err(self.error_at(
                at,
                format!("Expected end tag for '{name}' but found '{key}'"),
            )),
            Stop::Bodies { name: body, at } => {
                Err(self.error_at(at, format!("Unexpected '{{:{body}}}' inside '{name}'")))
            }
            Stop::Eof => Err(self.error_at(start, format!("Expected end tag for '{name}'"))),
        }
    }

    fn parse_partial(&mut self, start: usize) -> Result<Partial, CompileError> {
        self.skip_ws();
        let name = if self.peek() == Some('"') {
            match self.parse_quoted(start)? {
                Quoted::Literal(text) => PartialName::Static(text),
                Quoted::Interpolated(body) => PartialName::Dynamic(body),
            }
        } else {
            let from = self.pos;
            while matches!(self.peek(), Some(c) if is_partial_name_char(c)) {
                self.bump();
            }
            if from == self.pos {
                return Err(self.error_at(start, "Expected a partial name after '{>'"));
            }
            PartialName::Static(self.src[from..self.pos].to_string())
        };

        let params = self.parse_params(start)?;
        if !self.eat("/}") {
            return Err(self.error_at(start, "Partials must be self-closing ('/}')"));
        }
        Ok(Partial { name, params })
    }

    // ── Params ───────────────────────────────────────────────────────────

    fn parse_params(&mut self, start: usize) -> Result<Vec<Param>, CompileError> {
        let mut params = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                Some('}') | Some('/') | None => return Ok(params),
                _ if !had_ws => {
                    return Err(self.error_at(start, "Expected whitespace before parameter"));
                }
                _ => {}
            }

            let key = self
                .parse_key()
                .ok_or_else(|| self.error_at(self.pos, "Expected a parameter name"))?;
            if !self.eat("=") {
                return Err(self.error_at(self.pos, format!("Expected '=' after parameter '{key}'")));
            }

            let value = match self.peek() {
                Some('"') => match self.parse_quoted(start)? {
                    Quoted::Literal(text) => ParamValue::Literal(text),
                    Quoted::Interpolated(body) => ParamValue::Interpolated(body),
                },
                Some(c) if c.is_ascii_digit() || c == '-' => self.parse_number()?,
                _ => ParamValue::Path(
                    self.parse_path()
                        .ok_or_else(|| self.error_at(self.pos, format!("Invalid value for '{key}'")))?,
                ),
            };
            params.push(Param { key, value });
        }
    }

    fn parse_number(&mut self) -> Result<ParamValue, CompileError> {
        let from = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        let text = &self.src[from..self.pos];

        let number = if text.contains('.') {
            text.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
        } else {
            text.parse::<i64>().ok().map(serde_json::Number::from)
        };
        number
            .map(ParamValue::Number)
            .ok_or_else(|| self.error_at(from, format!("Invalid number '{text}'")))
    }

    /// A `"..."` string. Plain text becomes a literal; references and
    /// specials turn it into an interpolated body.
    fn parse_quoted(&mut self, start: usize) -> Result<Quoted, CompileError> {
        self.bump(); // opening quote
        let mut nodes = Vec::new();
        let mut buffer = String::new();

        loop {
            match self.peek() {
                None => return Err(self.error_at(start, "Unterminated string")),
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') if self.src[self.pos + 1..].starts_with('"') => {
                    self.pos += 2;
                    buffer.push('"');
                }
                Some('{') => {
                    let at = self.pos;
                    self.bump();
                    let node = match self.peek() {
                        Some('~') => {
                            self.bump();
                            Some(Node::Special(self.parse_special(at)?))
                        }
                        _ => self.parse_reference().map(Node::Reference),
                    };
                    match node {
                        Some(node) => {
                            flush(&mut buffer, &mut nodes);
                            nodes.push(node);
                        }
                        None => {
                            self.pos = at + 1;
                            buffer.push('{');
                        }
                    }
                }
                Some(c) => {
                    buffer.push(c);
                    self.bump();
                }
            }
        }

        if nodes.is_empty() {
            return Ok(Quoted::Literal(buffer));
        }
        flush(&mut buffer, &mut nodes);
        Ok(Quoted::Interpolated(Body::new(nodes)))
    }

    // ── References and paths ─────────────────────────────────────────────

    /// `path|filter}` after the opening brace. Restores the position and
    /// returns `None` when the text is not a reference.
    fn parse_reference(&mut self) -> Option<Reference> {
        let from = self.pos;
        let parsed = self.parse_path().and_then(|path| {
            let mut filters = Vec::new();
            while self.eat("|") {
                filters.push(self.parse_key()?);
            }
            self.eat("}").then_some(Reference { path, filters })
        });
        if parsed.is_none() {
            self.pos = from;
        }
        parsed
    }

    fn parse_path(&mut self) -> Option<Path> {
        let from = self.pos;
        let mut path = Path {
            current: false,
            segments: Vec::new(),
        };

        if self.eat(".") {
            path.current = true;
            if let Some(key) = self.parse_key() {
                path.segments.push(Segment::Key(key));
            }
        } else {
            match self.parse_key() {
                Some(key) => path.segments.push(Segment::Key(key)),
                None => return None,
            }
        }

        loop {
            if self.peek() == Some('.') {
                self.bump();
                match self.parse_key() {
                    Some(key) => path.segments.push(Segment::Key(key)),
                    None => {
                        self.pos = from;
                        return None;
                    }
                }
            } else if self.peek() == Some('[') {
                self.bump();
                let digits_from = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.bump();
                }
                let index = self.src[digits_from..self.pos].parse::<usize>().ok();
                match (index, self.eat("]")) {
                    (Some(index), true) => path.segments.push(Segment::Index(index)),
                    _ => {
                        self.pos = from;
                        return None;
                    }
                }
            } else {
                return Some(path);
            }
        }
    }

    fn parse_key(&mut self) -> Option<String> {
        let from = self.pos;
        match self.peek() {
            Some(c) if is_key_start(c) => self.bump(),
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if is_key_char(c)) {
            self.bump();
        }
        Some(self.src[from..self.pos].to_string())
    }

    // ── Low level ────────────────────────────────────────────────────────

    /// Text up to the next `}` on the same line, trimmed.
    fn take_until_close(&mut self, start: usize) -> Result<String, CompileError> {
        let rest = &self.src[self.pos..];
        let end = rest
            .find(['}', '\n'])
            .filter(|&i| rest[i..].starts_with('}'))
            .ok_or_else(|| self.error_at(start, "Expected '}' to close tag"))?;
        let text = rest[..end].trim().to_string();
        self.pos += end + 1;
        Ok(text)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.src[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn eat_eol(&mut self) {
        if !self.eat("\r\n") {
            self.bump();
        }
    }

    /// Skip spaces and tabs inside a tag. Returns whether anything was
    /// skipped.
    fn skip_ws(&mut self) -> bool {
        let from = self.pos;
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }
        from != self.pos
    }

    fn error_at(&self, at: usize, message: impl Into<String>) -> CompileError {
        let before = &self.src[..at.min(self.src.len())];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
            + 1;
        CompileError::new(self.name, message, line, column)
    }
}

fn flush(buffer: &mut String, nodes: &mut Vec<Node>) {
    if !buffer.is_empty() {
        nodes.push(Node::Buffer(std::mem::take(buffer)));
    }
}

fn is_key_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-')
}

fn is_key(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(is_key_start) && chars.all(is_key_char)
}

fn is_partial_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-' | '/' | '.')
}
