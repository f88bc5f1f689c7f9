//! Recursive-descent parser for the pseudo-JSON embedded in log messages.
//!
//! ```text
//! document    := (bracedGroup | pair)+            top level only
//! bracedGroup := '{' [pair (',' pair)*] '}'
//! pair        := key ':' value
//! key         := ['$'] SEG ('.' SEG)* | quoted
//! value       := quoted | number | true | false | null | bareWord
//!              | IDENT '(' [value (',' value)*] ')'
//!              | '[' [value (',' value)*] ']'
//!              | bracedGroup
//! ```
//!
//! At the top level a `{` always opens a braced group; anything else is read
//! as a bare pair. Every pair found at the top level, braced or not, lands in
//! one flat document in source order, so `{ a: 1 }`, `a: 1` and
//! `a: 1 { b: 2 }` are all valid documents.

use crate::error::GrammarError;
use crate::value::{PseudoDocument, Value, is_key_byte};

/// Deepest nesting of documents, arrays and constructor arguments accepted.
pub const MAX_DEPTH: usize = 128;

/// Parse a document in any of its top-level forms (braced, bare, mixed).
pub fn parse_document(text: &str) -> Result<PseudoDocument, GrammarError> {
    let mut parser = Parser::new(text);
    let doc = parser.top_level_document()?;
    parser.finish()?;
    Ok(doc)
}

/// Parse a single value. Text that opens like a document (a `{` or a
/// `key:` pair) is parsed as a top-level document.
pub fn parse_value(text: &str) -> Result<Value, GrammarError> {
    let mut parser = Parser::new(text);
    parser.skip_ws();
    let value = if parser.at_document_start() {
        Value::Document(parser.top_level_document()?)
    } else {
        parser.value(0)?
    };
    parser.finish()?;
    Ok(value)
}

#[derive(Clone)]
struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    // ── Cursor helpers ────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> Result<(), GrammarError> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn error(&self, expected: &'static str) -> GrammarError {
        self.error_at(self.pos, expected)
    }

    fn error_at(&self, offset: usize, expected: &'static str) -> GrammarError {
        GrammarError::new(self.src, offset, expected)
    }

    fn descend(&self, depth: usize) -> Result<usize, GrammarError> {
        if depth >= MAX_DEPTH {
            return Err(self.error("shallower nesting"));
        }
        Ok(depth + 1)
    }

    fn finish(&mut self) -> Result<(), GrammarError> {
        self.skip_ws();
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    // ── Documents ─────────────────────────────────────────────

    /// Whether the cursor sits on a `{` or a `key:` pair.
    fn at_document_start(&self) -> bool {
        if self.peek() == Some(b'{') {
            return true;
        }
        let mut probe = self.clone();
        if probe.key().is_err() {
            return false;
        }
        probe.skip_ws();
        probe.peek() == Some(b':')
    }

    fn top_level_document(&mut self) -> Result<PseudoDocument, GrammarError> {
        let mut doc = PseudoDocument::new();
        self.skip_ws();
        if self.at_end() {
            return Err(self.error("document"));
        }
        while !self.at_end() {
            if self.peek() == Some(b'{') {
                self.braced_group_into(&mut doc, 1)?;
            } else {
                self.pair_into(&mut doc, 0)?;
            }
            self.skip_ws();
        }
        Ok(doc)
    }

    fn braced_document(&mut self, depth: usize) -> Result<PseudoDocument, GrammarError> {
        let depth = self.descend(depth)?;
        let mut doc = PseudoDocument::new();
        self.braced_group_into(&mut doc, depth)?;
        Ok(doc)
    }

    fn braced_group_into(
        &mut self,
        doc: &mut PseudoDocument,
        depth: usize,
    ) -> Result<(), GrammarError> {
        self.expect(b'{', "'{'")?;
        self.skip_ws();
        if self.eat(b'}') {
            return Ok(());
        }
        loop {
            self.pair_into(doc, depth)?;
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => return Err(self.error("',' or '}'")),
            }
        }
    }

    fn pair_into(&mut self, doc: &mut PseudoDocument, depth: usize) -> Result<(), GrammarError> {
        let key = self.key()?;
        self.skip_ws();
        self.expect(b':', "':'")?;
        self.skip_ws();
        let value = self.value(depth)?;
        doc.push(key, value);
        Ok(())
    }

    fn key(&mut self) -> Result<String, GrammarError> {
        if matches!(self.peek(), Some(b'"' | b'\'')) {
            return self.quoted();
        }
        let start = self.pos;
        self.eat(b'$');
        self.key_segment(start)?;
        while self.peek() == Some(b'.') && self.peek_at(1).is_some_and(is_key_byte) {
            self.pos += 1;
            self.key_segment(start)?;
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn key_segment(&mut self, key_start: usize) -> Result<(), GrammarError> {
        let start = self.pos;
        while self.peek().is_some_and(is_key_byte) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error_at(key_start, "key"));
        }
        Ok(())
    }

    // ── Values ────────────────────────────────────────────────

    fn value(&mut self, depth: usize) -> Result<Value, GrammarError> {
        match self.peek() {
            Some(b'"' | b'\'') => self.quoted().map(Value::String),
            Some(b'-' | b'0'..=b'9') => self.number(),
            Some(b'[') => {
                let depth = self.descend(depth)?;
                self.pos += 1;
                self.list(b']', "',' or ']'", depth).map(Value::Array)
            }
            Some(b'{') => self.braced_document(depth).map(Value::Document),
            Some(b) if is_ident_start(b) => self.word(depth),
            _ => Err(self.error("value")),
        }
    }

    /// Comma-separated values up to `close`; the opening delimiter is consumed.
    fn list(
        &mut self,
        close: u8,
        expected: &'static str,
        depth: usize,
    ) -> Result<Vec<Value>, GrammarError> {
        let mut items = Vec::new();
        self.skip_ws();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            self.skip_ws();
            items.push(self.value(depth)?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b) if b == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => return Err(self.error(expected)),
            }
        }
    }

    /// Keyword, bare word or tagged constructor.
    fn word(&mut self, depth: usize) -> Result<Value, GrammarError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_byte) {
            self.pos += 1;
        }
        let word = &self.src[start..self.pos];
        if self.peek() == Some(b'(') {
            let depth = self.descend(depth)?;
            self.pos += 1;
            let args = self.list(b')', "',' or ')'", depth)?;
            return Ok(Value::Constructor {
                tag: word.to_string(),
                args,
            });
        }
        Ok(match word {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            "null" => Value::Null,
            _ => Value::BareWord(word.to_string()),
        })
    }

    fn number(&mut self) -> Result<Value, GrammarError> {
        let start = self.pos;
        self.eat(b'-');
        if !self.digits() {
            return Err(self.error_at(start, "number"));
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            self.digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if !self.digits() {
                self.pos = mark;
            }
        }
        self.src[start..self.pos]
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| self.error_at(start, "number"))
    }

    fn digits(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos > start
    }

    /// Single- or double-quoted string with backslash escapes.
    fn quoted(&mut self) -> Result<String, GrammarError> {
        let start = self.pos;
        let quote = self.bytes[start];
        self.pos += 1;
        let mut out = String::new();
        let mut chunk = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error_at(start, "closing quote")),
                Some(b) if b == quote => {
                    out.push_str(&self.src[chunk..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push_str(&self.src[chunk..self.pos]);
                    self.pos += 1;
                    let Some(escaped) = self.src[self.pos..].chars().next() else {
                        return Err(self.error_at(start, "closing quote"));
                    };
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                    self.pos += escaped.len_utf8();
                    chunk = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> PseudoDocument {
        parse_document(text).unwrap_or_else(|e| panic!("failed to parse {text:?}: {e}"))
    }

    #[test]
    fn nested_command_parameters() {
        let msg = doc(r#"{
            count.x: "mycatpicscollection",
            query: {
                MyObjectId: ObjectId('5a2fc7bd9b45c7117bee26c5'),
                baz.max_time: { $gte: 1523022862.698 },
                fooLimit: 42,
                category: "bagfoo"
            },
            $readPreference: {
                mode: "secondaryPreferred"
            },
            $db: "FooDb"
        }"#);

        assert_eq!(msg.get_str("count.x"), Some("mycatpicscollection"));
        assert_eq!(msg.get_str("$db"), Some("FooDb"));

        let query = msg.get_document("query").unwrap();
        let (tag, args) = query.get("MyObjectId").unwrap().as_constructor().unwrap();
        assert_eq!(tag, "ObjectId");
        assert_eq!(args, [Value::String("5a2fc7bd9b45c7117bee26c5".into())]);
        assert_eq!(query.get_str("category"), Some("bagfoo"));
        assert_eq!(query.get_f64("fooLimit"), Some(42.0));
        let gte = query.get_document("baz.max_time").unwrap().get_f64("$gte");
        assert_eq!(gte, Some(1523022862.698));

        let mode = msg.get_document("$readPreference").unwrap().get_str("mode");
        assert_eq!(mode, Some("secondaryPreferred"));
    }

    #[test]
    fn dotted_keys_stay_flat() {
        let d = doc("{ a.b: 1 }");
        assert_eq!(d.keys().collect::<Vec<_>>(), ["a.b"]);
        assert!(d.get("a").is_none());
    }

    #[test]
    fn signed_numbers() {
        let d = doc("{ a: -1, b: 2 }");
        assert_eq!(d.get_f64("a"), Some(-1.0));
        assert_eq!(d.get_f64("b"), Some(2.0));
    }

    #[test]
    fn exponent_numbers() {
        let d = doc("{ a: 1.5e3, b: -2E-2 }");
        assert_eq!(d.get_f64("a"), Some(1500.0));
        assert_eq!(d.get_f64("b"), Some(-0.02));
    }

    #[test]
    fn array_preserves_order() {
        let d = doc("{ a: [ -42, 55, 9 ] }");
        let items: Vec<f64> = d
            .get("a")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_f64)
            .collect();
        assert_eq!(items, [-42.0, 55.0, 9.0]);
    }

    #[test]
    fn empty_containers() {
        let d = doc("{ find: \"foocollection\", projection: {}, tags: [], foo: 2 }");
        assert!(d.get_document("projection").unwrap().is_empty());
        assert!(d.get("tags").unwrap().as_array().unwrap().is_empty());
        assert!(doc("{}").is_empty());
    }

    #[test]
    fn keywords_get_dedicated_kinds() {
        let d = doc("{ find: true, projection: false, hint: null, plan: IXSCAN }");
        assert_eq!(d.get("find"), Some(&Value::Boolean(true)));
        assert_eq!(d.get("projection"), Some(&Value::Boolean(false)));
        assert_eq!(d.get("hint"), Some(&Value::Null));
        assert_eq!(d.get("plan"), Some(&Value::BareWord("IXSCAN".into())));
    }

    #[test]
    fn constructors_of_any_tag_and_arity() {
        let d = doc(
            r#"{ id: UUID("a2c81b1a-4d36-45db-93f0-c0beefb77838"), objectId: ObjectId("foo!"),
                 ts: Timestamp(1538979514, 76), hash: BinData(0, "0000"), empty: MinKey() }"#,
        );
        let (tag, args) = d.get("ts").unwrap().as_constructor().unwrap();
        assert_eq!(tag, "Timestamp");
        assert_eq!(args, [Value::Number(1538979514.0), Value::Number(76.0)]);
        let (tag, args) = d.get("hash").unwrap().as_constructor().unwrap();
        assert_eq!(tag, "BinData");
        assert_eq!(args.len(), 2);
        assert_eq!(
            d.get("objectId").unwrap().as_constructor().unwrap().1,
            [Value::String("foo!".into())]
        );
        assert!(d.get("empty").unwrap().as_constructor().unwrap().1.is_empty());
    }

    #[test]
    fn single_and_double_quotes_with_escapes() {
        let d = doc(r#"{ a: 'it\'s', b: "say \"hi\"", c: 'x\\y' }"#);
        assert_eq!(d.get_str("a"), Some("it's"));
        assert_eq!(d.get_str("b"), Some("say \"hi\""));
        assert_eq!(d.get_str("c"), Some("x\\y"));
    }

    #[test]
    fn quoted_keys() {
        let d = doc(r#"{ "weird key": 1, 'other': 2 }"#);
        assert_eq!(d.get_f64("weird key"), Some(1.0));
        assert_eq!(d.get_f64("other"), Some(2.0));
    }

    #[test]
    fn mixed_mode_top_level() {
        let d = doc("x: 1  y: 2 { z: 3 }");
        assert_eq!(d.keys().collect::<Vec<_>>(), ["x", "y", "z"]);
        assert_eq!(d.get_f64("z"), Some(3.0));

        let d = doc("{ x: 1} y: 2 ");
        assert_eq!(d.get_f64("x"), Some(1.0));
        assert_eq!(d.get_f64("y"), Some(2.0));
    }

    #[test]
    fn three_top_level_forms_agree() {
        let braced = doc("{ a: 1, b: \"two\", c: { d: [ 3 ] } }");
        let bare = doc("a: 1 b: \"two\" c: { d: [ 3 ] }");
        let mixed = doc("a: 1 { b: \"two\" } c: { d: [ 3 ] }");
        assert_eq!(braced, bare);
        assert_eq!(braced, mixed);
    }

    #[test]
    fn command_with_trailing_statistics() {
        let d = doc(
            "{ foo.FooObjectId: 1, foo.category: 1, foo.min_time: -1, foo.max_time: 1 }
             keysExamined:50314 docsExamined:2 cursorExhausted:1 numYields:393 nreturned:2 reslen:14980
             locks:{ Global: { acquireCount: { r: 788 } }, Database: { acquireCount: { r: 394 } },
             Collection: { acquireCount: { r: 394 } } }",
        );
        assert_eq!(d.get_f64("foo.min_time"), Some(-1.0));
        assert_eq!(d.get_f64("keysExamined"), Some(50314.0));
        let r = d
            .get_document("locks")
            .and_then(|l| l.get_document("Global"))
            .and_then(|g| g.get_document("acquireCount"))
            .and_then(|a| a.get_f64("r"));
        assert_eq!(r, Some(788.0));
    }

    #[test]
    fn accepts_documents_seen_in_the_wild() {
        let samples = [
            r#"{ kala: "maja" }"#,
            r#"{ kala: "maja", int: 1234, float: 12.34 }"#,
            r#"{ driver: { name: "PyMongo", version: "3.4.0" }, os: { type: "Linux" } }"#,
            r#"{ $kala: "maja" }"#,
            r#"{ find: "mycatpicscollection", filter: { foo.FooObjectId: ObjectId('5a8c3a142053a407a936745e'),
               foo.max_time: { $gte: 1534769530.5 }, foo.min_time: { $lte: 1534769548.47 },
               foo.category: { $in: [ "alley", "home" ] } }, $db: "FooDb" }"#,
        ];
        for sample in samples {
            doc(sample);
        }
    }

    #[test]
    fn parse_value_scalars_and_documents() {
        assert_eq!(parse_value(" 42 ").unwrap(), Value::Number(42.0));
        assert_eq!(parse_value("'x'").unwrap(), Value::String("x".into()));
        assert_eq!(parse_value("COLLSCAN").unwrap(), Value::BareWord("COLLSCAN".into()));
        let id = parse_value("ObjectId('5a2f')").unwrap();
        assert_eq!(id.as_constructor().unwrap().0, "ObjectId");
        let v = parse_value("a: 1 b: 2").unwrap();
        assert_eq!(v.as_document().unwrap().len(), 2);
        let v = parse_value("{ a: 1 }").unwrap();
        assert_eq!(v.as_document().unwrap().get_f64("a"), Some(1.0));
    }

    #[test]
    fn display_round_trip_is_a_fixed_point() {
        let text = r#"{ find: "cats", filter: { id: ObjectId('5a8c'), t: { $gte: 1534769530.5 },
            tags: { $in: [ "alley", 'home', -3, true, null ] } }, hint: IXSCAN, "odd key": "a\"b\\c\n" }"#;
        let first = doc(text);
        let second = doc(&first.to_string());
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn errors_report_offset_and_remaining() {
        let err = parse_document("{ a: 1, b: ? }").unwrap_err();
        assert_eq!(err.offset, 11);
        assert_eq!(err.remaining, "? }");
        assert_eq!(err.expected, "value");
    }

    #[test]
    fn unterminated_inputs_fail() {
        assert!(parse_document("").is_err());
        assert!(parse_document("   ").is_err());
        assert!(parse_document("{ a: 1").is_err());
        assert!(parse_document("{ a: \"open }").is_err());
        assert!(parse_document("{ a: [1, 2 }").is_err());
        assert!(parse_document("{ a 1 }").is_err());
        assert!(parse_document("{ a: 1 } }").is_err());
    }

    #[test]
    fn bare_minus_is_not_a_number() {
        let err = parse_document("{ a: - }").unwrap_err();
        assert_eq!(err.expected, "number");
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn unquoted_hex_is_rejected() {
        let err = parse_document("{ hash: BinData(0, 0000ABCD) }").unwrap_err();
        assert_eq!(err.expected, "',' or ')'");
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}{}", "{ a: ".repeat(MAX_DEPTH + 1), "}".repeat(MAX_DEPTH + 1));
        let err = parse_document(&deep).unwrap_err();
        assert_eq!(err.expected, "shallower nesting");

        let ok = format!("{}1{}", "{ a: ".repeat(10), " }".repeat(10));
        assert!(parse_document(&ok).is_ok());
    }
}
