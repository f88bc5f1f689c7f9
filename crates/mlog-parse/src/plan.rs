//! Plan summary mini-language: `IXSCAN { a: 1 }, COLLSCAN keysExamined:0 ...`.

use serde::Serialize;
use std::fmt;

use crate::error::GrammarError;
use crate::grammar;
use crate::value::PseudoDocument;

/// One execution strategy and its details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanItem {
    /// Plan method keyword, e.g. `IXSCAN`, `COLLSCAN`, `IDHACK`.
    pub method: String,
    pub detail: PseudoDocument,
}

/// Non-empty, ordered list of plan items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PlanSummary {
    items: Vec<PlanItem>,
}

impl PlanSummary {
    pub fn items(&self) -> &[PlanItem] {
        &self.items
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.method.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a parsed summary; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for PlanItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            f.write_str(&self.method)
        } else {
            write!(f, "{} {}", self.method, self.detail)
        }
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// Parse a plan summary span.
///
/// Items are separated by top-level commas; a comma inside braces,
/// brackets, parentheses or quotes belongs to the item's details. A method
/// with nothing after it gets an empty detail document.
pub fn parse_plan_summary(text: &str) -> Result<PlanSummary, GrammarError> {
    if text.trim().is_empty() {
        return Err(GrammarError::new(text, 0, "plan method"));
    }
    let items = split_top_level(text)
        .into_iter()
        .map(|(start, segment)| parse_item(text, start, segment))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PlanSummary { items })
}

fn parse_item(text: &str, start: usize, segment: &str) -> Result<PlanItem, GrammarError> {
    let body = segment.trim_start();
    let base = start + (segment.len() - body.len());

    let method_len = body
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if method_len == 0 || body.as_bytes()[0].is_ascii_digit() {
        return Err(GrammarError::new(text, base, "plan method"));
    }

    let rest = &body[method_len..];
    let detail = if rest.trim().is_empty() {
        PseudoDocument::new()
    } else {
        grammar::parse_document(rest).map_err(|e| e.rebase(text, base + method_len))?
    };

    Ok(PlanItem {
        method: body[..method_len].to_string(),
        detail,
    })
}

/// Split on commas at nesting depth zero, outside quoted strings.
/// Returns each segment with its byte offset in `text`.
fn split_top_level(text: &str) -> Vec<(usize, &str)> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, b) in text.bytes().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' | b'[' | b'(' => depth += 1,
            b'}' | b']' | b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                segments.push((start, &text[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push((start, &text[start..]));
    segments
}
