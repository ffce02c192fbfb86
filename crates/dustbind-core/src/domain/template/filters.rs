//! Reference filters and value stringification.
//!
//! Filters take a context value and return a new value; the renderer
//! stringifies whatever comes out of the chain. `h` is applied last unless
//! the chain contains `s`.

use std::{collections::BTreeMap, fmt::Write as _, sync::Arc};

use serde_json::{Number, Value};

/// A named value transform usable as `{ref|name}`.
pub type Filter = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Wrap a plain string transform as a [`Filter`].
pub fn string_filter(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Filter {
    Arc::new(move |value: &Value| -> Result<Value, String> {
        Ok(Value::String(f(&stringify(value))))
    })
}

/// Filters every engine starts with.
pub fn builtin() -> BTreeMap<String, Filter> {
    let mut filters: BTreeMap<String, Filter> = BTreeMap::new();
    filters.insert("h".into(), string_filter(escape_html));
    filters.insert("j".into(), string_filter(escape_js));
    filters.insert("u".into(), string_filter(encode_uri));
    filters.insert("uc".into(), string_filter(encode_uri_component));
    filters.insert(
        "js".into(),
        Arc::new(|value: &Value| -> Result<Value, String> {
            serde_json::to_string(value)
                .map(|json| Value::String(escape_json(&json)))
                .map_err(|e| e.to_string())
        }),
    );
    filters.insert(
        "jp".into(),
        Arc::new(|value: &Value| -> Result<Value, String> {
            match value {
                Value::String(text) => serde_json::from_str(text).map_err(|e| e.to_string()),
                other => Ok(other.clone()),
            }
        }),
    );
    filters
}

/// String transforms extension manifests can compose into new filters.
pub fn primitive(name: &str) -> Option<Filter> {
    let filter = match name {
        "upper" => string_filter(|s| s.to_uppercase()),
        "lower" => string_filter(|s| s.to_lowercase()),
        "trim" => string_filter(|s| s.trim().to_string()),
        "trim_start" => string_filter(|s| s.trim_start().to_string()),
        "trim_end" => string_filter(|s| s.trim_end().to_string()),
        "capitalize" => string_filter(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }),
        _ => return None,
    };
    Some(filter)
}

/// Dust's notion of an empty value: null, false, "", and empty arrays.
/// Zero is not empty.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Number(_) | Value::Object(_) => false,
    }
}

/// Convert a value to output text the way JavaScript's `String()` would.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".into(),
    }
}

/// Integers print as-is; floats follow JavaScript's `Number.prototype.toString`.
fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => format_float(f),
        _ => n.to_string(),
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".into();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    if f == 0.0 {
        return "0".into();
    }

    // Shortest round-trip digits and their decimal exponent.
    let scientific = format!("{:e}", f.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent.parse::<i32>().unwrap_or(0) + 1;

    let mut out = String::new();
    if f < 0.0 {
        out.push('-');
    }
    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat_n('0', (n - k) as usize));
    } else if 0 < n && n <= 21 {
        let (whole, fraction) = digits.split_at(n as usize);
        let _ = write!(out, "{whole}.{fraction}");
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', n.unsigned_abs() as usize));
        out.push_str(&digits);
    } else {
        let (lead, rest) = digits.split_at(1);
        out.push_str(lead);
        if !rest.is_empty() {
            let _ = write!(out, ".{rest}");
        }
        let sign = if n > 0 { '+' } else { '-' };
        let _ = write!(out, "e{sign}{}", (n - 1).abs());
    }
    out
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_js(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\u{000C}' => out.push_str("\\f"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON that is safe to drop into a `<script>` tag.
pub fn escape_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

pub fn encode_uri(input: &str) -> String {
    percent_encode(input, |c| {
        c.is_ascii_alphanumeric() || ";,/?:@&=+$-_.!~*'()#".contains(c)
    })
}

pub fn encode_uri_component(input: &str) -> String {
    percent_encode(input, |c| {
        c.is_ascii_alphanumeric() || "-_.!~*'()".contains(c)
    })
}

fn percent_encode(input: &str, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut buf = [0u8; 4];
    for c in input.chars() {
        if keep(c) {
            out.push(c);
        } else {
            for byte in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}
