//! Typed value tree produced by the pseudo-JSON grammar.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

// ── Value ─────────────────────────────────────────────────────

/// A single value from a pseudo-JSON span.
///
/// Numbers are always stored as `f64`, whatever their lexical form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Quoted string, delimiters removed and escapes resolved.
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    /// Unquoted identifier in value position, e.g. `IXSCAN` or `MinKey`.
    BareWord(String),
    /// Typed literal such as `ObjectId('5a2f...')` or `Timestamp(1538979514, 76)`.
    Constructor { tag: String, args: Vec<Value> },
    Array(Vec<Value>),
    Document(PseudoDocument),
}

impl Value {
    /// Text of a quoted string or bare word.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::BareWord(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&PseudoDocument> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Tag and arguments of a tagged constructor.
    pub fn as_constructor(&self) -> Option<(&str, &[Value])> {
        match self {
            Self::Constructor { tag, args } => Some((tag, args)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Null => "null",
            Self::BareWord(_) => "bare_word",
            Self::Constructor { .. } => "constructor",
            Self::Array(_) => "array",
            Self::Document(_) => "document",
        }
    }
}

impl From<PseudoDocument> for Value {
    fn from(doc: PseudoDocument) -> Self {
        Self::Document(doc)
    }
}

// ── PseudoDocument ────────────────────────────────────────────

/// Ordered key/value pairs with a key lookup.
///
/// Keys are opaque: `"a.b"` is one key, never a nested path. When a key
/// repeats, both pairs stay in the ordered sequence and the lookup resolves
/// to the last one.
#[derive(Debug, Clone, Default)]
pub struct PseudoDocument {
    pairs: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl PseudoDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair. The lookup always points at the latest occurrence.
    pub fn push(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.index.insert(key.clone(), self.pairs.len());
        self.pairs.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.pairs[i].1)
    }

    /// Nested document stored under `key`.
    pub fn get_document(&self, key: &str) -> Option<&PseudoDocument> {
        self.get(key).and_then(Value::as_document)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Pairs in source order, duplicates included.
    pub fn pairs(&self) -> &[(String, Value)] {
        &self.pairs
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl PartialEq for PseudoDocument {
    fn eq(&self, other: &Self) -> bool {
        self.pairs == other.pairs
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for PseudoDocument {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut doc = Self::new();
        for (key, value) in iter {
            doc.push(key, value);
        }
        doc
    }
}

// ── Display (pseudo-JSON re-serialization) ────────────────────

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write_quoted(f, s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
            Self::BareWord(w) => f.write_str(w),
            Self::Constructor { tag, args } => {
                write!(f, "{tag}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Self::Array(items) if items.is_empty() => f.write_str("[]"),
            Self::Array(items) => {
                f.write_str("[ ")?;
                write_list(f, items)?;
                f.write_str(" ]")
            }
            Self::Document(doc) => write!(f, "{doc}"),
        }
    }
}

impl fmt::Display for PseudoDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pairs.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if is_bare_key(key) {
                f.write_str(key)?;
            } else {
                write_quoted(f, key)?;
            }
            write!(f, ": {value}")?;
        }
        f.write_str(" }")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

/// Whether `key` can be written unquoted: `$`-prefixed dotted segments.
pub(crate) fn is_bare_key(key: &str) -> bool {
    let body = key.strip_prefix('$').unwrap_or(key);
    !body.is_empty()
        && body
            .split('.')
            .all(|seg| !seg.is_empty() && seg.bytes().all(is_key_byte))
}

pub(crate) fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

// ── Serialize (JSON output) ───────────────────────────────────

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) | Self::BareWord(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Null => serializer.serialize_unit(),
            Self::Constructor { tag, args } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("$type", tag)?;
                map.serialize_entry("args", args)?;
                map.end()
            }
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Document(doc) => doc.serialize(serializer),
        }
    }
}

impl Serialize for PseudoDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
