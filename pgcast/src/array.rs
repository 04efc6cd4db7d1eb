//! Array literal parser and formatter.
//!
//! ```text
//! [1:2][0:1]={{a,"b c"},{NULL,"\"d\""}}
//! ```
//!
//! Elements only appear at the innermost level, the nesting depth is the
//! number of leading braces.
use crate::{
    Result, Value,
    common::unit_error,
    ext::StrExt,
    lexer::{Cursor, LiteralKind, Malformed, push_quoted},
};

/// Maximum supported nesting depth.
pub const MAX_DEPTH: usize = 16;

unit_error! {
    /// An error when array literal nesting is deeper than [`MAX_DEPTH`].
    pub struct DepthExceeded("array is too deeply nested");
}

/// Element cast used by [`parse`].
pub type ElementCast<'a> = &'a dyn Fn(&str) -> Result<Value>;

/// Parse an array literal.
///
/// `delim` defaults to `,`. Without `cast`, elements are returned as
/// [`Value::Text`]. Errors from `cast` are returned unchanged.
///
/// ```
/// use pgcast::{Value, array};
///
/// let items = array::parse("{{a,b},{NULL,\"c d\"}}", None, None)?;
/// assert_eq!(items, [
///     Value::Array(vec!["a".into(), "b".into()]),
///     Value::Array(vec![Value::Null, "c d".into()]),
/// ]);
/// # Ok::<_, pgcast::Error>(())
/// ```
pub fn parse(literal: &str, delim: Option<u8>, cast: Option<ElementCast<'_>>) -> Result<Vec<Value>> {
    let mut cursor = Cursor::new(literal, LiteralKind::Array);
    let delim = cursor.delimiter(delim.unwrap_or(b','), b"{}\\")?;

    cursor.skip_blanks();

    let ranges = match cursor.at('[') {
        true => dimensions(&mut cursor)?,
        false => 0,
    };

    let depth = cursor
        .rest()
        .bytes()
        .take_while(|b| matches!(b, b'{' | b' '))
        .filter(|b| *b == b'{')
        .count();

    if depth == 0 {
        return Err(cursor.error(Malformed::MissingBrace).into());
    }
    if ranges != 0 && ranges != depth {
        return Err(cursor.error(Malformed::DimensionMismatch).into());
    }
    if depth > MAX_DEPTH {
        return Err(DepthExceeded.into());
    }

    // level where elements live
    let depth = depth - 1;

    cursor.skip_blanks();
    cursor.bump();
    cursor.skip_blanks();

    let mut stack: Vec<Vec<Value>> = Vec::with_capacity(depth);
    let mut result = vec![];

    loop {
        let Some(ch) = cursor.peek() else {
            return Err(cursor.error(Malformed::UnbalancedBraces).into());
        };

        if ch == '}' {
            let Some(mut parent) = stack.pop() else {
                // top level closed
                break;
            };
            cursor.bump();
            cursor.skip_blanks();
            match cursor.peek() {
                None => return Err(cursor.error(Malformed::UnbalancedBraces).into()),
                Some('}') => {}
                Some(ch) if ch == delim => {
                    cursor.bump();
                    cursor.skip_blanks();
                    match cursor.peek() {
                        Some('{') => {}
                        None => return Err(cursor.error(Malformed::UnbalancedBraces).into()),
                        Some(_) => return Err(cursor.error(Malformed::MissingSubarray).into()),
                    }
                }
                Some(_) => return Err(cursor.error(Malformed::UnexpectedCharacter).into()),
            }
            parent.push(Value::Array(std::mem::replace(&mut result, vec![])));
            result = parent;
        } else if stack.len() == depth {
            let element = match ch {
                '{' => return Err(cursor.error(Malformed::UnexpectedSubarray).into()),
                '"' => {
                    let text = cursor.quoted()?;
                    cursor.skip_blanks();
                    Some(text)
                }
                _ => {
                    let token = cursor
                        .unquoted(|ch| matches!(ch, '"' | '{' | '}') || ch == delim)
                        .trim_end();
                    if token.is_empty() {
                        return Err(cursor.error(Malformed::MissingElement).into());
                    }
                    match token.raw.is_null_token() {
                        true => None,
                        false => Some(token.value()),
                    }
                }
            };

            if cursor.is_eof() {
                return Err(cursor.error(Malformed::UnbalancedBraces).into());
            }

            result.push(match (element, cast) {
                (None, _) => Value::Null,
                (Some(text), Some(cast)) => cast(&text)?,
                (Some(text), None) => Value::Text(text.into_owned()),
            });

            match cursor.peek() {
                Some('}') => {}
                Some(ch) if ch == delim => {
                    cursor.bump();
                    cursor.skip_blanks();
                    if cursor.is_eof() {
                        return Err(cursor.error(Malformed::UnbalancedBraces).into());
                    }
                }
                _ => return Err(cursor.error(Malformed::UnexpectedCharacter).into()),
            }
        } else {
            if ch != '{' {
                return Err(cursor.error(Malformed::MissingSubarray).into());
            }
            cursor.bump();
            cursor.skip_blanks();
            stack.push(std::mem::take(&mut result));
        }
    }

    cursor.bump();
    cursor.finish()?;

    Ok(result)
}

/// Read `[lo:hi]...=`, returns the number of groups.
fn dimensions(cursor: &mut Cursor) -> Result<usize> {
    fn bound(cursor: &mut Cursor) -> Result<()> {
        if !cursor.eat('+') {
            cursor.eat('-');
        }
        let digits = cursor.rest().bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(cursor.error(Malformed::InvalidDimensions).into());
        }
        for _ in 0..digits {
            cursor.bump();
        }
        Ok(())
    }

    let mut ranges = 0;
    loop {
        if !cursor.eat('[') {
            return Err(cursor.error(Malformed::InvalidDimensions).into());
        }
        cursor.skip_blanks();
        bound(cursor)?;
        if !cursor.eat(':') {
            return Err(cursor.error(Malformed::InvalidDimensions).into());
        }
        bound(cursor)?;
        if !cursor.eat(']') {
            return Err(cursor.error(Malformed::InvalidDimensions).into());
        }
        cursor.skip_blanks();
        ranges += 1;
        if cursor.eat('=') {
            cursor.skip_blanks();
            return Ok(ranges);
        }
    }
}

/// Format items as an array literal.
///
/// Nested [`Value::Array`] become subarrays, `NULL` is written unquoted.
pub fn format(items: &[Value], delim: char) -> String {
    let mut out = String::new();
    push_array(&mut out, items, delim);
    out
}

fn push_array(out: &mut String, items: &[Value], delim: char) {
    out.push('{');
    for (i, item) in items.iter().enumerate() {
        if i != 0 {
            out.push(delim);
        }
        match item {
            Value::Array(items) => push_array(out, items, delim),
            item => match item.to_literal() {
                None => out.push_str("NULL"),
                Some(text) if text.needs_array_quote(delim) => push_quoted(out, &text),
                Some(text) => out.push_str(&text),
            },
        }
    }
    out.push('}');
}
