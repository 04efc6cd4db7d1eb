//! Literal lexer shared by the array, record and hstore parsers.
//!
//! Postgres text output quotes with `"` and escapes with `\`. Blanks are the
//! space character only, tabs and newlines are regular content.
//!
//! - [`Cursor`]
//! - [`split_fields`]
//! - [`MalformedLiteral`]
use std::{borrow::Cow, fmt};

use crate::{Result, ext::StrExt};

/// Split a flat literal body on `delim`.
///
/// A delimiter inside a double quoted span does not split. Inside quotes
/// both `""` and `\"` are a literal quote, outside quotes a backslash escapes
/// the following character. An unquoted field that is exactly `NULL`
/// (case insensitive) is returned as [`None`], a quoted `"NULL"` is the string.
///
/// ```
/// let fields = pgcast::lexer::split_fields(r#"a,"b,c",NULL,"NULL",d\,e"#, b',')?;
/// let fields: Vec<Option<&str>> = fields.iter().map(Option::as_deref).collect();
/// assert_eq!(fields, [Some("a"), Some("b,c"), None, Some("NULL"), Some("d,e")]);
/// # Ok::<_, pgcast::Error>(())
/// ```
pub fn split_fields(body: &str, delim: u8) -> Result<Vec<Option<String>>> {
    let mut cursor = Cursor::new(body, LiteralKind::Field);
    let delim = cursor.delimiter(delim, b"\\\"")?;
    let mut fields = vec![];

    if body.is_empty() {
        return Ok(fields);
    }

    loop {
        let field = cursor.field(delim, None)?;
        match field.raw.is_null_token() {
            true => fields.push(None),
            false => fields.push(Some(field.value)),
        }
        if cursor.is_eof() {
            break;
        }
        cursor.bump();
    }

    Ok(fields)
}

/// Which grammar a [`Cursor`] is reading, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Array,
    Record,
    Hstore,
    Field,
}

/// Cursor over a literal.
///
/// Positions are byte offsets, all structural characters are ascii so
/// slicing at them is always on a char boundary.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    input: &'a str,
    pos: usize,
    kind: LiteralKind,
}

/// An unquoted token, still escaped.
#[derive(Debug, Clone, Copy)]
pub struct Unquoted<'a> {
    pub raw: &'a str,
    pub escaped: bool,
}

/// A record style field, quotes and escapes resolved.
#[derive(Debug)]
pub struct Field<'a> {
    /// Source text including quotes.
    pub raw: &'a str,
    pub value: String,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str, kind: LiteralKind) -> Self {
        Self { input, pos: 0, kind }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos == self.input.len()
    }

    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Returns `true` if next char is `ch`.
    pub fn at(&self, ch: char) -> bool {
        self.peek() == Some(ch)
    }

    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Consume `ch` if it is the next char.
    pub fn eat(&mut self, ch: char) -> bool {
        if self.at(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn skip_blanks(&mut self) {
        while self.eat(' ') { }
    }

    /// Validate a delimiter, rejecting it when it collide with `reserved`.
    pub fn delimiter(&self, delim: u8, reserved: &[u8]) -> Result<char, MalformedLiteral> {
        if !delim.is_ascii() || reserved.contains(&delim) {
            return Err(self.error(Malformed::InvalidDelimiter));
        }
        Ok(delim as char)
    }

    /// Only blanks may follow.
    pub fn finish(mut self) -> Result<(), MalformedLiteral> {
        self.skip_blanks();
        match self.is_eof() {
            true => Ok(()),
            false => Err(self.error(Malformed::TrailingCharacters)),
        }
    }

    pub fn error(&self, reason: Malformed) -> MalformedLiteral {
        MalformedLiteral { literal: self.kind, reason, position: self.pos }
    }

    /// Read a double quoted token, the cursor must be at the opening quote.
    ///
    /// The token ends at the first unescaped quote, which is consumed.
    pub fn quoted(&mut self) -> Result<Cow<'a, str>, MalformedLiteral> {
        debug_assert!(self.at('"'));
        self.bump();
        let start = self.pos;
        let mut escaped = false;
        loop {
            match self.bump() {
                None => return Err(self.error(Malformed::UnterminatedQuote)),
                Some('"') => break,
                Some('\\') => {
                    escaped = true;
                    if self.bump().is_none() {
                        return Err(self.error(Malformed::UnterminatedQuote));
                    }
                }
                Some(_) => {}
            }
        }
        let raw = &self.input[start..self.pos - 1];
        Ok(match escaped {
            true => Cow::Owned(unescape(raw)),
            false => Cow::Borrowed(raw),
        })
    }

    /// Read an unquoted token until `stop` returns `true` for an unescaped char.
    pub fn unquoted(&mut self, stop: impl Fn(char) -> bool) -> Unquoted<'a> {
        let start = self.pos;
        let mut escaped = false;
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                escaped = true;
                self.bump();
                if self.bump().is_none() {
                    break;
                }
                continue;
            }
            if stop(ch) {
                break;
            }
            self.bump();
        }
        Unquoted { raw: &self.input[start..self.pos], escaped }
    }

    /// Read a record style field.
    ///
    /// Unquoted content ends at `delim` or `close`, quote state toggles at
    /// every `"` and a doubled quote inside quotes is a literal quote. The
    /// delimiter or closing char is not consumed.
    pub fn field(&mut self, delim: char, close: Option<char>) -> Result<Field<'a>, MalformedLiteral> {
        let start = self.pos;
        let mut quoted = false;
        let mut value = String::new();

        loop {
            let Some(ch) = self.peek() else {
                if quoted {
                    return Err(self.error(Malformed::UnterminatedQuote));
                }
                if close.is_some() {
                    return Err(self.error(Malformed::UnexpectedEnd));
                }
                break;
            };
            if !quoted && (ch == delim || Some(ch) == close) {
                break;
            }
            self.bump();
            match ch {
                '"' => {
                    if quoted && self.at('"') {
                        self.bump();
                        value.push('"');
                    } else {
                        quoted = !quoted;
                    }
                }
                '\\' => match self.bump() {
                    Some(ch) => value.push(ch),
                    None => return Err(self.error(Malformed::UnexpectedEnd)),
                },
                ch => value.push(ch),
            }
        }

        Ok(Field { raw: &self.input[start..self.pos], value })
    }
}

impl<'a> Unquoted<'a> {
    /// Drop trailing blanks that are not escaped.
    pub fn trim_end(self) -> Self {
        let mut end = self.raw.trim_end_matches(' ').len();
        if end < self.raw.len() {
            let slashes = self.raw[..end].bytes().rev().take_while(|b| *b == b'\\').count();
            if slashes % 2 == 1 {
                end += 1;
            }
        }
        Self { raw: &self.raw[..end], escaped: self.escaped }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn value(&self) -> Cow<'a, str> {
        match self.escaped {
            true => Cow::Owned(unescape(self.raw)),
            false => Cow::Borrowed(self.raw),
        }
    }
}

/// Remove backslash escapes, `\x` becomes `x`.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => if let Some(ch) = chars.next() {
                out.push(ch)
            },
            ch => out.push(ch),
        }
    }
    out
}

/// Append `value` wrapped in double quotes, escaping `"` and `\`.
pub fn push_quoted(out: &mut String, value: &str) {
    out.reserve(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
}

/// Append `value` as a standard conforming sql string literal.
pub fn push_sql_string(out: &mut String, value: &str) {
    out.reserve(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
}

/// Literal does not follow its grammar.
pub struct MalformedLiteral {
    literal: LiteralKind,
    reason: Malformed,
    position: usize,
}

impl MalformedLiteral {
    pub(crate) fn new(literal: LiteralKind, reason: Malformed, position: usize) -> Self {
        Self { literal, reason, position }
    }

    pub fn literal(&self) -> LiteralKind {
        self.literal
    }

    pub fn reason(&self) -> Malformed {
        self.reason
    }

    /// Byte offset where the error was detected.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// The reason a literal is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    /// Input ended inside a value.
    UnexpectedEnd,
    UnterminatedQuote,
    /// Something other than blanks after the closing brace or parenthesis.
    TrailingCharacters,
    /// Input ended before every brace was closed.
    UnbalancedBraces,
    /// Bound declarations count differ from nesting depth.
    DimensionMismatch,
    /// A `[lo:hi]` group could not be read.
    InvalidDimensions,
    /// A subarray where elements expected.
    UnexpectedSubarray,
    /// An element where a subarray expected.
    MissingSubarray,
    /// Empty unquoted array element.
    MissingElement,
    /// Character after a value that is neither a delimiter nor a closing char.
    UnexpectedCharacter,
    /// Array must start with a left brace.
    MissingBrace,
    /// Record must start with a left parenthesis.
    MissingParenthesis,
    InvalidDelimiter,
    MissingKey,
    MissingValue,
    /// Hstore key not followed by `=>`.
    MissingArrow,
    /// Hstore comma not followed by another pair.
    MissingEntry,
}

impl std::error::Error for MalformedLiteral { }

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Array => "array",
            Self::Record => "record",
            Self::Hstore => "hstore",
            Self::Field => "field list",
        })
    }
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnexpectedEnd => "unexpected end of input",
            Self::UnterminatedQuote => "unterminated quote",
            Self::TrailingCharacters => "unexpected characters after end of literal",
            Self::UnbalancedBraces => "unbalanced braces",
            Self::DimensionMismatch => "array dimensions do not match content",
            Self::InvalidDimensions => "invalid array dimensions",
            Self::UnexpectedSubarray => "subarray found where not expected",
            Self::MissingSubarray => "subarray expected but not found",
            Self::MissingElement => "missing array element",
            Self::UnexpectedCharacter => "unexpected character after value",
            Self::MissingBrace => "array must start with a left brace",
            Self::MissingParenthesis => "record must start with a left parenthesis",
            Self::InvalidDelimiter => "invalid delimiter",
            Self::MissingKey => "missing key",
            Self::MissingValue => "missing value",
            Self::MissingArrow => "invalid characters after key",
            Self::MissingEntry => "missing entry",
        })
    }
}

impl fmt::Display for MalformedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed {} literal at {}: {}", self.literal, self.position, self.reason)
    }
}

impl fmt::Debug for MalformedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn split(body: &str) -> Vec<Option<String>> {
        split_fields(body, b',').unwrap()
    }

    fn s(v: &str) -> Option<String> {
        Some(v.to_owned())
    }

    #[test]
    fn split_plain() {
        assert_eq!(split(""), Vec::<Option<String>>::new());
        assert_eq!(split("a"), [s("a")]);
        assert_eq!(split("a,b,c"), [s("a"), s("b"), s("c")]);
        assert_eq!(split("a,,c"), [s("a"), s(""), s("c")]);
        assert_eq!(split("a,"), [s("a"), s("")]);
    }

    #[test]
    fn split_quoting() {
        assert_eq!(split(r#""a,b",c"#), [s("a,b"), s("c")]);
        assert_eq!(split(r#""a""b""#), [s("a\"b")]);
        assert_eq!(split(r#""a\"b""#), [s("a\"b")]);
        assert_eq!(split(r#""a\\b""#), [s("a\\b")]);
        assert_eq!(split(r#""\x""#), [s("x")]);
        assert_eq!(split(r"a\,b"), [s("a,b")]);
        assert_eq!(split(r#"a\"b"#), [s("a\"b")]);
        assert_eq!(split(r#""""#), [s("")]);
    }

    #[test]
    fn split_null_token() {
        assert_eq!(split("NULL"), [None]);
        assert_eq!(split("null,NuLl"), [None, None]);
        assert_eq!(split(r#""NULL""#), [s("NULL")]);
        assert_eq!(split("NULLS"), [s("NULLS")]);
    }

    #[test]
    fn split_delimiter() {
        assert_eq!(split_fields("a;b,c", b';').unwrap(), [s("a"), s("b,c")]);
        assert!(split_fields("a", b'"').is_err());
        assert!(split_fields("a", b'\\').is_err());
    }

    #[test]
    fn split_malformed() {
        let err = split_fields(r#""abc"#, b',').unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::ErrorKind::MalformedLiteral(e) if e.reason() == Malformed::UnterminatedQuote
        ));
        assert!(split_fields("abc\\", b',').is_err());
    }

    #[test]
    fn cursor_quoted() {
        let mut c = Cursor::new(r#""a\"b" tail"#, LiteralKind::Array);
        assert_eq!(c.quoted().unwrap(), "a\"b");
        assert_eq!(c.rest(), " tail");

        let mut c = Cursor::new(r#""plain""#, LiteralKind::Array);
        assert!(matches!(c.quoted().unwrap(), Cow::Borrowed("plain")));

        let mut c = Cursor::new(r#""open"#, LiteralKind::Array);
        assert_eq!(c.quoted().unwrap_err().reason(), Malformed::UnterminatedQuote);
    }

    #[test]
    fn unquoted_trim() {
        let mut c = Cursor::new(r"not null  }", LiteralKind::Array);
        let tok = c.unquoted(|ch| ch == '}').trim_end();
        assert_eq!(tok.raw, "not null");

        let mut c = Cursor::new(r"a\   }", LiteralKind::Array);
        let tok = c.unquoted(|ch| ch == '}').trim_end();
        assert_eq!(tok.value(), "a ");
    }

    #[test]
    fn field_toggle() {
        let mut c = Cursor::new(r#""a" "b")"#, LiteralKind::Record);
        let f = c.field(',', Some(')')).unwrap();
        assert_eq!(f.value, "a b");
        assert!(c.at(')'));
    }

    #[test]
    fn sql_string() {
        let mut out = String::new();
        push_sql_string(&mut out, "it's");
        assert_eq!(out, "'it''s'");

        let mut out = String::new();
        push_quoted(&mut out, r#"a"b\c"#);
        assert_eq!(out, r#""a\"b\\c""#);
    }
}
