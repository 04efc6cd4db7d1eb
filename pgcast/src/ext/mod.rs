/// Literal token helpers.
pub trait StrExt {
    /// Case insensitive `NULL`.
    fn is_null_token(&self) -> bool;

    /// Element must be quoted inside an array literal.
    ///
    /// Empty string, `NULL` token, blanks, braces, quote, backslash, or the delimiter.
    fn needs_array_quote(&self, delim: char) -> bool;

    /// Field must be quoted inside a record literal.
    fn needs_record_quote(&self, delim: char) -> bool;

    /// Key or value must be quoted inside an hstore literal.
    fn needs_hstore_quote(&self) -> bool;
}

/// Helper trait to [`Display`][std::fmt::Display] bytes.
pub trait FmtExt {
    /// Lossy [`Display`][std::fmt::Display] bytes.
    fn lossy(&self) -> LossyFmt<'_>;
}

/// Lossy [`Display`][std::fmt::Display] implementation for bytes.
pub struct LossyFmt<'a>(pub &'a [u8]);

impl StrExt for str {
    fn is_null_token(&self) -> bool {
        self.eq_ignore_ascii_case("NULL")
    }

    fn needs_array_quote(&self, delim: char) -> bool {
        self.is_empty()
            || self.is_null_token()
            || self.chars().any(|ch| {
                matches!(ch, '{' | '}' | '"' | '\\') || ch == delim || ch.is_whitespace()
            })
    }

    fn needs_record_quote(&self, delim: char) -> bool {
        self.chars().any(|ch| matches!(ch, '(' | ')' | '"' | '\\') || ch == delim || ch.is_whitespace())
    }

    fn needs_hstore_quote(&self) -> bool {
        self.is_empty()
            || self.is_null_token()
            || self.chars().any(|ch| matches!(ch, ',' | '=' | '>' | '"' | '\\') || ch.is_whitespace())
    }
}

impl FmtExt for [u8] {
    fn lossy(&self) -> LossyFmt<'_> {
        LossyFmt(self)
    }
}

impl std::fmt::Display for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b\"{self}\"")
    }
}
