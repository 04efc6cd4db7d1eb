//! Hstore literal parser and formatter.
//!
//! ```text
//! "1-a" => "anything at all", k => v, nothing => NULL
//! ```
use std::collections::HashMap;

use crate::{
    Result,
    ext::StrExt,
    lexer::{Cursor, LiteralKind, Malformed, push_quoted},
};

/// Hstore value, `NULL` values are [`None`].
pub type Hstore = HashMap<String, Option<String>>;

/// Parse an hstore literal.
///
/// An unquoted key ends at `=` or a blank, an unquoted value at `,` or a
/// blank. Only an unquoted value may be the `NULL` token, keys are always
/// strings.
///
/// ```
/// let map = pgcast::hstore::parse(r#"k => v, "a b" => NULL"#)?;
/// assert_eq!(map["k"].as_deref(), Some("v"));
/// assert_eq!(map["a b"], None);
/// # Ok::<_, pgcast::Error>(())
/// ```
pub fn parse(literal: &str) -> Result<Hstore> {
    let mut cursor = Cursor::new(literal, LiteralKind::Hstore);
    let mut map = HashMap::new();

    cursor.skip_blanks();
    if cursor.is_eof() {
        return Ok(map);
    }

    loop {
        let key = match cursor.peek() {
            Some('"') => cursor.quoted()?.into_owned(),
            _ => {
                let token = cursor.unquoted(|ch| ch == '=' || ch == ' ');
                if token.is_empty() {
                    return Err(cursor.error(Malformed::MissingKey).into());
                }
                token.value().into_owned()
            }
        };

        cursor.skip_blanks();
        if !(cursor.eat('=') && cursor.eat('>')) {
            return Err(cursor.error(Malformed::MissingArrow).into());
        }
        cursor.skip_blanks();

        let value = match cursor.peek() {
            None => return Err(cursor.error(Malformed::MissingValue).into()),
            Some('"') => Some(cursor.quoted()?.into_owned()),
            Some(_) => {
                let token = cursor.unquoted(|ch| ch == ',' || ch == ' ');
                if token.is_empty() {
                    return Err(cursor.error(Malformed::MissingValue).into());
                }
                match token.raw.is_null_token() {
                    true => None,
                    false => Some(token.value().into_owned()),
                }
            }
        };

        map.insert(key, value);

        cursor.skip_blanks();
        if cursor.is_eof() {
            break;
        }
        if !cursor.eat(',') {
            return Err(cursor.error(Malformed::UnexpectedCharacter).into());
        }
        cursor.skip_blanks();
        if cursor.is_eof() {
            return Err(cursor.error(Malformed::MissingEntry).into());
        }
    }

    Ok(map)
}

/// Format as an hstore literal, pairs are ordered by key.
pub fn format(map: &Hstore) -> String {
    let mut pairs: Vec<_> = map.iter().collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    for (i, (key, value)) in pairs.into_iter().enumerate() {
        if i != 0 {
            out.push_str(", ");
        }
        push_part(&mut out, key);
        out.push_str("=>");
        match value {
            Some(value) => push_part(&mut out, value),
            None => out.push_str("NULL"),
        }
    }
    out
}

fn push_part(out: &mut String, part: &str) {
    match part.needs_hstore_quote() {
        true => push_quoted(out, part),
        false => out.push_str(part),
    }
}
