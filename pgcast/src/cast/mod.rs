//! Cast functions, text to [`Value`].
//!
//! A [`Cast`] is either plain, only looking at the text, or contextual,
//! additionally receiving the connection [`Context`] (date style, config).
//! The kind is decided when the cast is created.
//!
//! [`builtins`] returns the casts registered as global defaults.
use std::{fmt, sync::Arc};

use crate::{
    Config, DateStyle, IntervalStyle, Record, Result, Value,
    array, hstore, record,
    error::{BoxError, Error},
    interval::Interval,
};

#[cfg(feature = "time")]
pub mod time;

type PlainFn = dyn Fn(&str) -> Result<Value> + Send + Sync;
type ContextualFn = dyn Fn(&str, &Context) -> Result<Value> + Send + Sync;

/// Reference counted cast function.
///
/// Cloning is cheap and clones are [`Cast::ptr_eq`].
#[derive(Clone)]
pub enum Cast {
    Plain(Arc<PlainFn>),
    Contextual(Arc<ContextualFn>),
}

impl Cast {
    /// Create cast that only needs the text.
    pub fn plain<F>(f: F) -> Cast
    where
        F: Fn(&str) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Plain(Arc::new(f))
    }

    /// Create cast that also receive the connection [`Context`].
    pub fn contextual<F>(f: F) -> Cast
    where
        F: Fn(&str, &Context) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Contextual(Arc::new(f))
    }

    /// Run the cast.
    pub fn apply(&self, text: &str, ctx: &Context) -> Result<Value> {
        match self {
            Self::Plain(f) => f(text),
            Self::Contextual(f) => f(text, ctx),
        }
    }

    pub fn is_contextual(&self) -> bool {
        matches!(self, Self::Contextual(_))
    }

    /// Returns `true` if both are the same function instance.
    pub fn ptr_eq(&self, other: &Cast) -> bool {
        match (self, other) {
            (Self::Plain(a), Self::Plain(b)) => Arc::ptr_eq(a, b),
            (Self::Contextual(a), Self::Contextual(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn addr(&self) -> *const () {
        match self {
            Self::Plain(f) => Arc::as_ptr(f) as *const (),
            Self::Contextual(f) => Arc::as_ptr(f) as *const (),
        }
    }
}

impl fmt::Debug for Cast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Plain(_) => "Plain",
            Self::Contextual(_) => "Contextual",
        };
        write!(f, "Cast::{kind}({:p})", self.addr())
    }
}

/// Connection state available to contextual casts.
///
/// Styles are read from the server on every decode, they can change with `SET`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    pub(crate) date_style: DateStyle,
    pub(crate) interval_style: IntervalStyle,
    pub(crate) config: Config,
}

impl Context {
    pub fn new(date_style: DateStyle, interval_style: IntervalStyle, config: Config) -> Self {
        Self { date_style, interval_style, config }
    }

    /// Effective date style, [`Config::date_style`] takes precedence.
    pub fn date_style(&self) -> DateStyle {
        self.config.date_style.unwrap_or(self.date_style)
    }

    pub fn interval_style(&self) -> IntervalStyle {
        self.interval_style
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// A cast function rejected its input.
pub struct CastFailure {
    type_name: String,
    text: String,
    source: BoxError,
}

impl CastFailure {
    pub(crate) fn new(type_name: impl Into<String>, text: &str, source: impl Into<BoxError>) -> Self {
        Self { type_name: type_name.into(), text: text.into(), source: source.into() }
    }

    /// Target type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The rejected text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl std::error::Error for CastFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

impl fmt::Display for CastFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot cast {:?} to {}: {}", self.text, self.type_name, self.source)
    }
}

impl fmt::Debug for CastFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Reason attached to a [`CastFailure`] by builtin casts.
struct Invalid(&'static str);

impl std::error::Error for Invalid { }

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Debug for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

fn invalid(type_name: &str, text: &str, reason: &'static str) -> Error {
    Error::cast_failure(type_name, text, Invalid(reason))
}

/// Casts registered as global defaults, `(type name, cast)`.
pub fn builtins() -> Vec<(&'static str, Cast)> {
    let int = Cast::plain(cast_int);
    let float = Cast::plain(cast_float);
    let text = Cast::plain(cast_text);
    let json = Cast::contextual(cast_json);

    let mut casts = vec![
        ("bool", Cast::contextual(cast_bool)),
        ("bytea", Cast::contextual(cast_bytea)),
        ("int2", int.clone()),
        ("int4", int.clone()),
        ("int8", int.clone()),
        ("oid", int.clone()),
        ("serial", int.clone()),
        ("cid", int.clone()),
        ("xid", int),
        ("float4", float.clone()),
        ("float8", float),
        ("numeric", Cast::plain(cast_numeric)),
        ("money", Cast::contextual(cast_money)),
        ("int2vector", Cast::plain(cast_int2vector)),
        ("uuid", Cast::plain(cast_uuid)),
        ("hstore", Cast::plain(cast_hstore)),
        ("json", json.clone()),
        ("jsonb", json),
        ("interval", Cast::plain(cast_interval)),
        ("char", text.clone()),
        ("bpchar", text.clone()),
        ("name", text.clone()),
        ("text", text.clone()),
        ("varchar", text),
        ("anyarray", Cast::plain(cast_anyarray)),
        ("record", Cast::plain(cast_record)),
    ];

    #[cfg(feature = "time")]
    casts.extend(time::builtins());

    casts
}

/// `t` is true, anything else is false.
pub fn cast_bool(text: &str, ctx: &Context) -> Result<Value> {
    if ctx.config.bool_as_text {
        return Ok(Value::Text(text.into()));
    }
    Ok(Value::Bool(text.starts_with('t')))
}

/// Both the `hex` and `escape` output format.
pub fn cast_bytea(text: &str, ctx: &Context) -> Result<Value> {
    if ctx.config.bytea_escaped {
        return Ok(Value::Text(text.into()));
    }
    unescape_bytea(text).map(Value::Bytes)
}

/// Decode `\x` hex, or the traditional escape format.
pub fn unescape_bytea(text: &str) -> Result<Vec<u8>> {
    if let Some(hex) = text.strip_prefix("\\x") {
        if hex.len() % 2 != 0 {
            return Err(invalid("bytea", text, "odd number of hex digits"));
        }
        return hex
            .as_bytes()
            .chunks(2)
            .map(|pair| match (hex_digit(pair[0]), hex_digit(pair[1])) {
                (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
                _ => Err(invalid("bytea", text, "invalid hex digit")),
            })
            .collect();
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match &bytes[i..] {
            [b'\\', b'\\', ..] => {
                out.push(b'\\');
                i += 2;
            }
            [b'\\', a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7', ..] => {
                out.push((a - b'0') << 6 | (b - b'0') << 3 | (c - b'0'));
                i += 4;
            }
            [b, ..] => {
                out.push(*b);
                i += 1;
            }
            [] => break,
        }
    }
    Ok(out)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Any integer type, surrounding whitespace is ignored.
pub fn cast_int(text: &str) -> Result<Value> {
    text.trim()
        .parse()
        .map(Value::Int)
        .map_err(|e| Error::cast_failure("int", text, e))
}

/// `float4` and `float8`, including `NaN` and `Infinity`.
pub fn cast_float(text: &str) -> Result<Value> {
    text.trim()
        .parse()
        .map(Value::Float)
        .map_err(|e| Error::cast_failure("float", text, e))
}

/// Validated, kept as its exact text.
pub fn cast_numeric(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    match is_numeric(trimmed) {
        true => Ok(Value::Numeric(trimmed.into())),
        false => Err(invalid("numeric", text, "invalid numeric syntax")),
    }
}

fn is_numeric(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if matches!(unsigned, "NaN" | "Infinity") {
        return text == unsigned || unsigned == "Infinity";
    }

    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e.strip_prefix(['+', '-']).unwrap_or(e))),
        None => (unsigned, None),
    };
    let (whole, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    (!whole.is_empty() || !frac.is_empty())
        && digits(whole)
        && digits(frac)
        && exponent.is_none_or(|e| !e.is_empty() && digits(e))
}

/// Currency symbols and grouping are dropped, parentheses are negative.
///
/// Without a configured decimal point money is kept as text.
pub fn cast_money(text: &str, ctx: &Context) -> Result<Value> {
    let Some(point) = ctx.config.decimal_point else {
        return Ok(Value::Text(text.into()));
    };
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '0'..='9' => out.push(ch),
            '(' | '-' => out.push('-'),
            ch if ch == point => out.push('.'),
            _ => {}
        }
    }
    match is_numeric(&out) {
        true => Ok(Value::Numeric(out)),
        false => Err(invalid("money", text, "no amount found")),
    }
}

/// Space separated integers.
pub fn cast_int2vector(text: &str) -> Result<Value> {
    text.split_whitespace()
        .map(cast_int)
        .collect::<Result<_>>()
        .map(Value::Array)
}

/// Normalized to lower case hyphenated form.
pub fn cast_uuid(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);
    let hex: String = inner.chars().filter(|ch| *ch != '-').collect();
    if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid("uuid", text, "expected 32 hex digits"));
    }
    let hex = hex.to_ascii_lowercase();
    Ok(Value::Text(format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    )))
}

pub fn cast_hstore(text: &str) -> Result<Value> {
    hstore::parse(text).map(Value::Hstore)
}

/// Decoded with `serde_json` when [`Config::json`] is enabled.
pub fn cast_json(text: &str, ctx: &Context) -> Result<Value> {
    #[cfg(feature = "json")]
    if ctx.config.json {
        return serde_json::from_str(text)
            .map(Value::Json)
            .map_err(|e| Error::cast_failure("json", text, e));
    }
    let _ = ctx;
    Ok(Value::Text(text.into()))
}

pub fn cast_interval(text: &str) -> Result<Value> {
    Ok(Value::Interval(Interval::parse(text)?))
}

pub fn cast_text(text: &str) -> Result<Value> {
    Ok(Value::Text(text.into()))
}

/// Array of unknown element type, elements are text.
pub fn cast_anyarray(text: &str) -> Result<Value> {
    array::parse(text, None, None).map(Value::Array)
}

/// Record of unknown composite type, fields are text.
pub fn cast_record(text: &str) -> Result<Value> {
    record::parse(text, record::RecordCasts::None, None).map(|fields| Value::Record(Record::new(fields)))
}
