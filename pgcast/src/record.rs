//! Record (composite) literal parser and formatter.
//!
//! ```text
//! ("fuzzy dice",42,,"a ""quoted"" word")
//! ```
//!
//! Unlike arrays, blanks inside the parenthesis are content, an empty field
//! is `NULL` and there is no `NULL` token.
use std::fmt;

use crate::{
    Result, Value,
    array::ElementCast,
    ext::StrExt,
    lexer::{Cursor, LiteralKind, Malformed},
};

/// How record fields are converted.
#[derive(Clone, Copy, Default)]
pub enum RecordCasts<'a> {
    /// Every field is returned as [`Value::Text`].
    #[default]
    None,
    /// Same cast for every field.
    Uniform(ElementCast<'a>),
    /// One cast per field, the field count must match.
    ///
    /// [`None`] entries are returned as text. An empty list is the same
    /// as [`RecordCasts::None`].
    Fields(&'a [Option<ElementCast<'a>>]),
}

/// Parse a record literal.
///
/// `delim` defaults to `,`.
///
/// ```
/// use pgcast::{Value, record::{self, RecordCasts}};
///
/// let fields = record::parse(r#"("fuzzy dice",42,)"#, RecordCasts::None, None)?;
/// assert_eq!(fields, ["fuzzy dice".into(), "42".into(), Value::Null]);
/// # Ok::<_, pgcast::Error>(())
/// ```
pub fn parse(literal: &str, casts: RecordCasts<'_>, delim: Option<u8>) -> Result<Vec<Value>> {
    let mut cursor = Cursor::new(literal, LiteralKind::Record);
    let delim = cursor.delimiter(delim.unwrap_or(b','), b"()\"\\")?;

    cursor.skip_blanks();
    if !cursor.eat('(') {
        return Err(cursor.error(Malformed::MissingParenthesis).into());
    }

    let mut raw = vec![];
    loop {
        let field = cursor.field(delim, Some(')'))?;
        raw.push(match field.raw.is_empty() {
            true => None,
            false => Some(field.value),
        });
        if cursor.bump() == Some(')') {
            break;
        }
    }
    cursor.finish()?;

    let casts = match casts {
        RecordCasts::Fields([]) => RecordCasts::None,
        casts => casts,
    };

    if let RecordCasts::Fields(list) = casts {
        if list.len() != raw.len() {
            return Err(FieldCountMismatch { expected: list.len(), found: raw.len() }.into());
        }
    }

    raw.into_iter()
        .enumerate()
        .map(|(i, text)| {
            let Some(text) = text else {
                return Ok(Value::Null);
            };
            let cast = match casts {
                RecordCasts::None => None,
                RecordCasts::Uniform(cast) => Some(cast),
                RecordCasts::Fields(list) => list[i],
            };
            match cast {
                Some(cast) => cast(&text),
                None => Ok(Value::Text(text)),
            }
        })
        .collect()
}

/// Format fields as a record literal.
///
/// `NULL` is an empty field, the empty string is written as `""`.
pub fn format(fields: &[Value], delim: char) -> String {
    let mut out = String::from("(");
    for (i, field) in fields.iter().enumerate() {
        if i != 0 {
            out.push(delim);
        }
        match field.to_literal() {
            None => {}
            Some(text) if text.is_empty() || text.needs_record_quote(delim) => {
                out.push('"');
                for ch in text.chars() {
                    if matches!(ch, '"' | '\\') {
                        out.push(ch);
                    }
                    out.push(ch);
                }
                out.push('"');
            }
            Some(text) => out.push_str(&text),
        }
    }
    out.push(')');
    out
}

/// Record field count differ from the number of per field casts.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FieldCountMismatch {
    pub expected: usize,
    pub found: usize,
}

impl std::error::Error for FieldCountMismatch { }

impl fmt::Display for FieldCountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qualifier = match self.found > self.expected {
            true => "too many",
            false => "too few",
        };
        write!(
            f,
            "{qualifier} fields in record, expected {}, found {}",
            self.expected, self.found
        )
    }
}

impl fmt::Debug for FieldCountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Error, ErrorKind};

    fn int(text: &str) -> Result<Value> {
        text.trim()
            .parse()
            .map(Value::Int)
            .map_err(|e| Error::cast_failure("int4", text, e))
    }

    fn float(text: &str) -> Result<Value> {
        text.trim()
            .parse()
            .map(Value::Float)
            .map_err(|e| Error::cast_failure("float8", text, e))
    }

    fn t(s: &str) -> Value {
        Value::Text(s.into())
    }

    const N: Value = Value::Null;

    #[derive(Clone, Copy)]
    enum C {
        Text,
        Int,
        List(&'static [K]),
    }

    #[derive(Clone, Copy)]
    enum K {
        S,
        I,
        F,
    }

    fn run(literal: &str, cast: C, delim: Option<u8>) -> Result<Vec<Value>> {
        match cast {
            C::Text => parse(literal, RecordCasts::None, delim),
            C::Int => parse(literal, RecordCasts::Uniform(&int), delim),
            C::List(kinds) => {
                let list: Vec<Option<ElementCast>> = kinds
                    .iter()
                    .map(|k| match k {
                        K::S => None,
                        K::I => Some(&int as ElementCast),
                        K::F => Some(&float as ElementCast),
                    })
                    .collect();
                parse(literal, RecordCasts::Fields(&list), delim)
            }
        }
    }

    fn cases() -> Vec<(&'static str, C, Option<Vec<Value>>)> {
        use C::*;
        use K::*;
        vec![
            ("", Text, None),
            ("(", Text, None),
            ("()", Text, Some(vec![N])),
            ("()", Int, Some(vec![N])),
            ("(,)", Text, Some(vec![N, N])),
            ("( , )", Text, Some(vec![t(" "), t(" ")])),
            ("(\")", Text, None),
            ("(\"\")", Text, Some(vec![t("")])),
            ("(\"\")", Int, None),
            ("(\"\" )", Text, Some(vec![t(" ")])),
            ("(\"\" )", Int, None),
            ("    ()    ", Text, Some(vec![N])),
            ("   (   )   ", Text, Some(vec![t("   ")])),
            ("(()", Text, Some(vec![t("(")])),
            ("(())", Text, None),
            ("()(", Text, None),
            ("()()", Text, None),
            ("[]", Text, None),
            ("{}", Text, None),
            ("([])", Text, Some(vec![t("[]")])),
            ("(hello)", Int, None),
            ("(42)", Int, Some(vec![Value::Int(42)])),
            ("( 42 )", Int, Some(vec![Value::Int(42)])),
            ("(  42)", Int, Some(vec![Value::Int(42)])),
            ("(42)", Text, Some(vec![t("42")])),
            ("( 42 )", Text, Some(vec![t(" 42 ")])),
            ("(42", Int, None),
            ("( 42 ", Int, None),
            ("(hello)", Text, Some(vec![t("hello")])),
            ("( hello )", Text, Some(vec![t(" hello ")])),
            ("(hello))", Text, None),
            ("   (hello)   ", Text, Some(vec![t("hello")])),
            ("   (hello)   )", Text, None),
            ("(hello)?", Text, None),
            ("(null)", Text, Some(vec![t("null")])),
            ("(null)", Int, None),
            (" ( NULL ) ", Text, Some(vec![t(" NULL ")])),
            (" (\"NULL\") ", Text, Some(vec![t("NULL")])),
            ("('Hi!')", Text, Some(vec![t("'Hi!'")])),
            ("(\"Hi!\" )", Text, Some(vec![t("Hi! ")])),
            ("( \"Hi!\")", Text, Some(vec![t(" Hi!")])),
            ("( \"\"Hi!\"\" )", Text, Some(vec![t(" Hi! ")])),
            ("( \"\"\"Hi!\"\"\" )", Text, Some(vec![t(" \"Hi!\" ")])),
            ("(a\")", Text, None),
            ("(\"b)", Text, None),
            ("(\"a\" \"b)", Text, None),
            ("(\"a\" \"b\")", Text, Some(vec![t("a b")])),
            ("(  \"a\"  \"b\"  \"c\"  )", Text, Some(vec![t("  a  b  c  ")])),
            ("(  \"a,b\"  \"c,d\"  )", Text, Some(vec![t("  a,b  c,d  ")])),
            ("( \"(a,b,c)\" d, e, \"f,g\")", Text, Some(vec![t(" (a,b,c) d"), t(" e"), t(" f,g")])),
            ("(a\",b,c\",d,\"e,f\")", Text, Some(vec![t("a,b,c"), t("d"), t("e,f")])),
            (
                "( \"\"\"a,b\"\"\", \"\"c,d\"\", \"e,f\", \"g\", \"\"h\"\", \"\"\"i\"\"\")",
                Text,
                Some(vec![t(" \"a,b\""), t(" c"), t("d"), t(" e,f"), t(" g"), t(" h"), t(" \"i\"")]),
            ),
            ("(a\",b)\",c\"),(d,e)\",f,g)", Text, Some(vec![t("a,b)"), t("c),(d,e)"), t("f"), t("g")])),
            ("(a\"b)", Text, None),
            (r#"(a\"b)"#, Text, Some(vec![t("a\"b")])),
            ("(a\"\"b)", Text, Some(vec![t("ab")])),
            ("(\"a\"\"b\")", Text, Some(vec![t("a\"b")])),
            (r"(a\,b)", Text, Some(vec![t("a,b")])),
            (r#"("\a\b\c")"#, Text, Some(vec![t("abc")])),
            (r"(\,)", Text, Some(vec![t(",")])),
            (r"(\(\))", Text, Some(vec![t("()")])),
            (r"(\)\()", Text, Some(vec![t(")(")])),
            ("(Hello, World!)", Text, Some(vec![t("Hello"), t(" World!")])),
            (r"(Hello\, World!)", Text, Some(vec![t("Hello, World!")])),
            ("(null,should,be,)", Text, Some(vec![t("null"), t("should"), t("be"), N])),
            (
                r#"(abcABC0123!?+-*/=&%$\\'\"{[]}"""":;\,,)"#,
                Text,
                Some(vec![t(r#"abcABC0123!?+-*/=&%$\'"{[]}":;,"#), N]),
            ),
            ("(3, 2, 1,)", Int, Some(vec![Value::Int(3), Value::Int(2), Value::Int(1), N])),
            ("(3, 2, 1, )", Int, None),
            ("(, 1, 2, 3)", Int, Some(vec![N, Value::Int(1), Value::Int(2), Value::Int(3)])),
            ("( , 1, 2, 3)", Int, None),
            (
                "(,1,,2,,3,)",
                Int,
                Some(vec![N, Value::Int(1), N, Value::Int(2), N, Value::Int(3), N]),
            ),
            (" ( 3 , 17 , 51 ) ", Text, Some(vec![t(" 3 "), t(" 17 "), t(" 51 ")])),
            ("(())", Int, None),
            ("((),())", Text, None),
            ("(\"()\",\"()\")", Text, Some(vec![t("()"), t("()")])),
            ("( \" () , () , () \" )", Text, Some(vec![t("  () , () , ()  ")])),
            ("(\"breakfast\",\"consulting\",\"meeting\",\"lunch\")", List(&[S, S, S]), None),
            (
                "(\"breakfast\",\"consulting\",\"meeting\",\"lunch\")",
                List(&[S, S, S, S]),
                Some(vec![t("breakfast"), t("consulting"), t("meeting"), t("lunch")]),
            ),
            ("(\"breakfast\",\"consulting\",\"meeting\",\"lunch\")", List(&[S, S, S, S, S]), None),
            ("(\"fuzzy dice\",42,1.9375)", Int, None),
            (
                "(\"fuzzy dice\",42,1.9375)",
                List(&[S, I, F]),
                Some(vec![t("fuzzy dice"), Value::Int(42), Value::Float(1.9375)]),
            ),
            ("(\"fuzzy dice\",42,1.9375)", List(&[S, I]), None),
            ("(\"fuzzy dice\",42,1.9375)", List(&[S, I, F, S]), None),
            ("(\"fuzzy dice\",42,)", List(&[S, I, F]), Some(vec![t("fuzzy dice"), Value::Int(42), N])),
            ("(\"fuzzy dice\",42,)", List(&[S, I]), None),
            ("(\"\",42,)", List(&[S, I, F]), Some(vec![t(""), Value::Int(42), N])),
            ("(\"fuzzy dice\",\"\",1.9375)", List(&[S, I, F]), None),
            (
                "(fuzzy dice,\"42\",\"1.9375\")",
                List(&[S, I, F]),
                Some(vec![t("fuzzy dice"), Value::Int(42), Value::Float(1.9375)]),
            ),
        ]
    }

    #[test]
    fn parse_table() {
        for (literal, cast, expected) in cases() {
            let result = run(literal, cast, None);
            match expected {
                Some(expected) => assert_eq!(result.unwrap(), expected, "{literal:?}"),
                None => assert!(result.is_err(), "{literal:?} should fail, got {result:?}"),
            }
        }
    }

    #[test]
    fn parse_table_other_delimiter() {
        fn swap(s: &str) -> String {
            s.replace(';', "@").replace(',', ";").replace('@', ",")
        }

        for (literal, cast, expected) in cases() {
            let literal = swap(literal);
            let result = run(&literal, cast, Some(b';'));
            match expected {
                Some(expected) => {
                    let expected: Vec<Value> = expected
                        .into_iter()
                        .map(|v| match v {
                            Value::Text(s) => Value::Text(swap(&s)),
                            v => v,
                        })
                        .collect();
                    assert_eq!(result.unwrap(), expected, "{literal:?}");
                }
                None => assert!(result.is_err(), "{literal:?}"),
            }
        }
    }

    #[test]
    fn nested_is_malformed() {
        for literal in ["((a,b,c))", "((a,b),(c,d))", "((a),(b),(c))", "(((((((abc)))))))"] {
            assert!(parse(literal, RecordCasts::None, None).is_err(), "{literal}");
        }
    }

    #[test]
    fn many_fields() {
        for n in [3, 5, 9, 12, 16, 32, 64, 256] {
            let literal = format!(
                "({})",
                (0..n).map(|i| i.to_string()).collect::<Vec<_>>().join(",")
            );
            let fields = parse(&literal, RecordCasts::Uniform(&int), None).unwrap();
            assert_eq!(fields, (0..n).map(Value::Int).collect::<Vec<_>>());
        }
    }

    #[test]
    fn casts() {
        let ok = |s: &str| -> Result<Value> { Ok(Value::Text(format!("{s} is ok"))) };
        let too = |s: &str| -> Result<Value> { Ok(Value::Text(format!("and {s} is ok, too"))) };

        assert_eq!(parse("(1)", RecordCasts::Fields(&[]), None).unwrap(), [t("1")]);
        assert_eq!(parse("(1)", RecordCasts::Fields(&[None]), None).unwrap(), [t("1")]);
        assert_eq!(parse("(1)", RecordCasts::Fields(&[Some(&int)]), None).unwrap(), [Value::Int(1)]);
        assert_eq!(parse("(a)", RecordCasts::Uniform(&ok), None).unwrap(), [t("a is ok")]);
        assert_eq!(
            parse("(a,b)", RecordCasts::Fields(&[Some(&ok), Some(&too)]), None).unwrap(),
            [t("a is ok"), t("and b is ok, too")]
        );

        let err = parse("(1)", RecordCasts::Fields(&[None, None]), None).unwrap_err();
        assert!(matches!(
            err.into_kind(),
            ErrorKind::FieldCountMismatch(FieldCountMismatch { expected: 2, found: 1 })
        ));
        let err = parse("(a,b,c)", RecordCasts::Fields(&[Some(&ok), Some(&too)]), None).unwrap_err();
        assert!(err.to_string().contains("too many"), "{err}");
    }

    #[test]
    fn delimiter() {
        assert_eq!(parse("(1,2)", RecordCasts::None, None).unwrap(), [t("1"), t("2")]);
        assert_eq!(parse("(1;2)", RecordCasts::None, None).unwrap(), [t("1;2")]);
        assert_eq!(parse("(1;2)", RecordCasts::None, Some(b';')).unwrap(), [t("1"), t("2")]);
        assert_eq!(parse("(1,2)", RecordCasts::None, Some(b';')).unwrap(), [t("1,2")]);
        assert_eq!(parse("()", RecordCasts::None, Some(b';')).unwrap(), [N]);
        for delim in [b'\\', b'(', b')'] {
            assert!(parse("()", RecordCasts::None, Some(delim)).is_err());
        }
    }

    #[test]
    fn format_fields() {
        let fields = vec![t("fuzzy dice"), Value::Int(42), N, t(""), t("a\"b"), t("(x)"), t("plain")];
        let literal = format(&fields, ',');
        assert_eq!(literal, r#"("fuzzy dice",42,,"","a""b","(x)",plain)"#);
        assert_eq!(parse(&literal, RecordCasts::None, None).unwrap()[..4], [
            t("fuzzy dice"),
            t("42"),
            N,
            t(""),
        ]);
        assert_eq!(format(&[], ','), "()");
        assert_eq!(format(&[t("a;b")], ';'), r#"("a;b")"#);
    }

    #[test]
    fn round_trip() {
        let fields = vec![t(" lead"), t("back\\slash"), t("com,ma"), N, t("{1,2}"), t("NULL")];
        let literal = format(&fields, ',');
        assert_eq!(parse(&literal, RecordCasts::None, None).unwrap(), fields);
    }
}
