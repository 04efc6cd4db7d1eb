//! Decoded postgres value.
//!
//! - [`Value`]
//! - [`Record`]
//! - [`FromValue`]
//! - [`FromRecord`]
//!
//! - [`Index`]
//! - [`DecodeError`]
use std::{borrow::Cow, collections::HashMap, fmt, sync::Arc};

use crate::{
    array, hstore, record,
    common::ByteStr,
    ext::FmtExt,
    interval::Interval,
    lexer::push_sql_string,
    postgres::PgType,
};

/// A value converted from its postgres text representation.
#[derive(Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Arbitrary precision number kept as its exact text.
    Numeric(String),
    Text(String),
    Bytes(Vec<u8>),
    Interval(Interval),
    Array(Vec<Value>),
    Record(Record),
    Hstore(HashMap<String, Option<String>>),
    #[cfg(feature = "json")]
    Json(serde_json::Value),
    #[cfg(feature = "time")]
    Date(time::Date),
    #[cfg(feature = "time")]
    Time(time::Time),
    #[cfg(feature = "time")]
    TimeTz(time::Time, time::UtcOffset),
    #[cfg(feature = "time")]
    Timestamp(time::PrimitiveDateTime),
    #[cfg(feature = "time")]
    TimestampTz(time::OffsetDateTime),
}

impl Value {
    /// Returns `true` if value is `NULL`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytea",
            Self::Interval(_) => "interval",
            Self::Array(_) => "array",
            Self::Record(_) => "record",
            Self::Hstore(_) => "hstore",
            #[cfg(feature = "json")]
            Self::Json(_) => "json",
            #[cfg(feature = "time")]
            Self::Date(_) => "date",
            #[cfg(feature = "time")]
            Self::Time(_) => "time",
            #[cfg(feature = "time")]
            Self::TimeTz(..) => "timetz",
            #[cfg(feature = "time")]
            Self::Timestamp(_) => "timestamp",
            #[cfg(feature = "time")]
            Self::TimestampTz(_) => "timestamptz",
        }
    }

    /// Returns the inner str for [`Value::Text`] and [`Value::Numeric`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Numeric(s) => Some(s),
            _ => None,
        }
    }

    /// Try extract value using [`FromValue`] implementation.
    pub fn decode<T: FromValue>(self) -> Result<T, DecodeError> {
        T::from_value(self)
    }

    /// Render as a text format parameter.
    ///
    /// Returns [`None`] for `NULL`, which is sent as a null parameter.
    pub fn to_literal(&self) -> Option<String> {
        let text = match self {
            Self::Null => return None,
            Self::Bool(true) => "t".into(),
            Self::Bool(false) => "f".into(),
            Self::Int(i) => itoa::Buffer::new().format(*i).to_owned(),
            Self::Float(f) => format_float(*f).into_owned(),
            Self::Numeric(s) | Self::Text(s) => s.clone(),
            Self::Bytes(b) => format_bytea(b),
            Self::Interval(i) => i.to_iso8601(),
            Self::Array(items) => array::format(items, ','),
            Self::Record(r) => record::format(r.fields(), ','),
            Self::Hstore(map) => hstore::format(map),
            #[cfg(feature = "json")]
            Self::Json(v) => v.to_string(),
            #[cfg(feature = "time")]
            Self::Date(_)
            | Self::Time(_)
            | Self::TimeTz(..)
            | Self::Timestamp(_)
            | Self::TimestampTz(_) => crate::cast::time::format(self)?,
        };
        Some(text)
    }

    /// Render as a literal embedded directly in a sql command.
    ///
    /// Arrays become `ARRAY[...]`, records `(...)`, and values whose type is
    /// ambiguous as a string get an explicit cast, e.g. `'2001-02-03'::date`.
    pub fn to_inline(&self) -> String {
        let mut out = String::new();
        self.push_inline(&mut out, false);
        out
    }

    fn push_inline(&self, out: &mut String, nested: bool) {
        match self {
            Self::Null => out.push_str("NULL"),
            Self::Bool(true) => out.push_str("true"),
            Self::Bool(false) => out.push_str("false"),
            Self::Int(i) => out.push_str(itoa::Buffer::new().format(*i)),
            Self::Float(f) if f.is_finite() => out.push_str(&format_float(*f)),
            Self::Float(f) => {
                out.push('\'');
                out.push_str(&format_float(*f));
                out.push('\'');
            }
            Self::Numeric(s) if is_plain_number(s) => out.push_str(s),
            Self::Text(s) => push_sql_string(out, s),
            Self::Array(items) if items.is_empty() && !nested => out.push_str("'{}'"),
            Self::Array(items) => {
                out.push_str(if nested { "[" } else { "ARRAY[" });
                for (i, item) in items.iter().enumerate() {
                    if i != 0 {
                        out.push(',');
                    }
                    item.push_inline(out, true);
                }
                out.push(']');
            }
            Self::Record(r) => {
                out.push('(');
                for (i, field) in r.fields().iter().enumerate() {
                    if i != 0 {
                        out.push(',');
                    }
                    field.push_inline(out, false);
                }
                out.push(')');
            }
            other => {
                // the remaining variants always have a literal
                let literal = other.to_literal().unwrap_or_default();
                push_sql_string(out, &literal);
                out.push_str("::");
                out.push_str(other.kind());
            }
        }
    }
}

/// Optional `-`, digits with at most one `.`, at least one digit.
///
/// Anything else is inlined quoted with a cast.
fn is_plain_number(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    (!whole.is_empty() || !frac.is_empty()) && digits(whole) && digits(frac)
}

fn format_float(f: f64) -> Cow<'static, str> {
    if f.is_nan() {
        "NaN".into()
    } else if f == f64::INFINITY {
        "Infinity".into()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".into()
    } else {
        f.to_string().into()
    }
}

/// Hex format, `\x` followed by two digit per byte.
fn format_bytea(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_literal() {
            Some(literal) => f.write_str(&literal),
            None => f.write_str("NULL"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Numeric(v) => f.debug_tuple("Numeric").field(v).finish(),
            Self::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Self::Bytes(v) => f.debug_tuple("Bytes").field(&v.lossy()).finish(),
            Self::Interval(v) => f.debug_tuple("Interval").field(v).finish(),
            Self::Array(v) => f.debug_list().entries(v).finish(),
            Self::Record(v) => v.fmt(f),
            Self::Hstore(v) => f.debug_tuple("Hstore").field(v).finish(),
            #[cfg(feature = "json")]
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            #[cfg(feature = "time")]
            Self::Date(v) => f.debug_tuple("Date").field(v).finish(),
            #[cfg(feature = "time")]
            Self::Time(v) => f.debug_tuple("Time").field(v).finish(),
            #[cfg(feature = "time")]
            Self::TimeTz(v, o) => f.debug_tuple("TimeTz").field(v).field(o).finish(),
            #[cfg(feature = "time")]
            Self::Timestamp(v) => f.debug_tuple("Timestamp").field(v).finish(),
            #[cfg(feature = "time")]
            Self::TimestampTz(v) => f.debug_tuple("TimestampTz").field(v).finish(),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    /// Records with field names serialize as maps, dates and times as ISO 8601 text.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::{Serialize, ser::{SerializeMap, SerializeSeq}};

        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Numeric(s) | Self::Text(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_bytes(b),
            Self::Interval(i) => i.serialize(serializer),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Record(r) => match r.names() {
                Some(names) => {
                    let mut map = serializer.serialize_map(Some(r.len()))?;
                    for (name, value) in names.iter().zip(r.fields()) {
                        map.serialize_entry(name.as_str(), value)?;
                    }
                    map.end()
                }
                None => {
                    let mut seq = serializer.serialize_seq(Some(r.len()))?;
                    for value in r.fields() {
                        seq.serialize_element(value)?;
                    }
                    seq.end()
                }
            },
            Self::Hstore(map) => map.serialize(serializer),
            #[cfg(feature = "json")]
            Self::Json(v) => v.serialize(serializer),
            #[cfg(feature = "time")]
            Self::Date(_)
            | Self::Time(_)
            | Self::TimeTz(..)
            | Self::Timestamp(_)
            | Self::TimestampTz(_) => match crate::cast::time::format(self) {
                Some(text) => serializer.serialize_str(&text),
                None => serializer.serialize_none(),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

/// Composite type value.
///
/// Fields are positional, names are available when the record was decoded
/// from a known composite type.
#[derive(Clone)]
pub struct Record {
    fields: Vec<Value>,
    names: Option<Arc<[ByteStr]>>,
}

impl Record {
    /// Create anonymous record.
    pub fn new(fields: Vec<Value>) -> Self {
        Self { fields, names: None }
    }

    /// Create record with field names.
    ///
    /// `names` is shared by every record of the same composite type.
    pub fn with_names(fields: Vec<Value>, names: Arc<[ByteStr]>) -> Self {
        debug_assert_eq!(fields.len(), names.len());
        Self { fields, names: Some(names) }
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if record contains no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn names(&self) -> Option<&[ByteStr]> {
        self.names.as_deref()
    }

    pub fn into_fields(self) -> Vec<Value> {
        self.fields
    }

    /// Returns field by position or name.
    pub fn get<I: Index>(&self, idx: I) -> Option<&Value> {
        let i = idx.position(self.names.as_deref(), self.fields.len()).ok()?;
        self.fields.get(i)
    }

    /// Try get and decode field.
    pub fn try_get<I: Index, T: FromValue>(&self, idx: I) -> Result<T, DecodeError> {
        let i = idx.position(self.names.as_deref(), self.fields.len())?;
        T::from_value(self.fields[i].clone())
    }

    /// Move a field out and decode it, leaving `NULL` in its place.
    pub fn take<I: Index, T: FromValue>(&mut self, idx: I) -> Result<T, DecodeError> {
        let i = idx.position(self.names.as_deref(), self.fields.len())?;
        T::from_value(std::mem::replace(&mut self.fields[i], Value::Null))
    }

    /// Like [`Record::take`] by `name`, by `position` when the record has no names.
    pub fn take_field<T: FromValue>(&mut self, name: &str, position: usize) -> Result<T, DecodeError> {
        match self.names {
            Some(_) => self.take(name),
            None => self.take(position),
        }
    }

    /// Try decode type using [`FromRecord`] implementation.
    pub fn decode<T: FromRecord>(self) -> Result<T, DecodeError> {
        T::from_record(self)
    }
}

impl PartialEq for Record {
    /// Names does not take part in equality.
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.names.as_deref() {
            Some(names) => {
                let mut dbg = f.debug_map();
                for (name, value) in names.iter().zip(&self.fields) {
                    dbg.entry(name, value);
                }
                dbg.finish()
            }
            None => {
                let mut dbg = f.debug_tuple("");
                for value in &self.fields {
                    dbg.field(value);
                }
                dbg.finish()
            }
        }
    }
}

impl IntoIterator for Record {
    type Item = Value;

    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

// ===== Traits =====

/// A type that can be constructed from [`Value`].
pub trait FromValue: Sized {
    /// Try extract self from value.
    fn from_value(value: Value) -> Result<Self, DecodeError>;
}

/// Type that can be constructed from a [`Record`].
pub trait FromRecord: Sized {
    /// Construct self from record.
    fn from_record(record: Record) -> Result<Self, DecodeError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            Value::Null => Err(DecodeError::Null),
            other => Err(DecodeError::mismatch("array", &other)),
        }
    }
}

impl FromRecord for Record {
    fn from_record(record: Record) -> Result<Self, DecodeError> {
        Ok(record)
    }
}

impl FromValue for Record {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Record(r) => Ok(r),
            Value::Null => Err(DecodeError::Null),
            other => Err(DecodeError::mismatch(Self::NAME, &other)),
        }
    }
}

macro_rules! from_value {
    ($ty:ty, $pat:pat => $body:expr) => {
        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, DecodeError> {
                match value {
                    $pat => $body,
                    Value::Null => Err(DecodeError::Null),
                    other => Err(DecodeError::mismatch(<$ty as PgType>::NAME, &other)),
                }
            }
        }
    };
}

macro_rules! from_value_int {
    ($($ty:ty),*) => {$(
        from_value!($ty, Value::Int(i) => <$ty>::try_from(i)
            .map_err(|_| DecodeError::OutOfRange(<$ty as PgType>::NAME)));
    )*};
}

from_value!(bool, Value::Bool(b) => Ok(b));
from_value_int!(i16, i32, i64, u32);
from_value!(f64, Value::Float(f) => Ok(f));
from_value!(f32, Value::Float(f) => Ok(f as f32));
from_value!(String, Value::Text(s) | Value::Numeric(s) => Ok(s));
from_value!(bytes::Bytes, Value::Bytes(b) => Ok(b.into()));
from_value!(Interval, Value::Interval(i) => Ok(i));
from_value!(HashMap<String, Option<String>>, Value::Hstore(map) => Ok(map));

#[cfg(feature = "json")]
from_value!(serde_json::Value, Value::Json(v) => Ok(v));

#[cfg(feature = "time")]
mod time_values {
    use super::*;

    from_value!(time::Date, Value::Date(d) => Ok(d));
    from_value!(time::Time, Value::Time(t) | Value::TimeTz(t, _) => Ok(t));
    from_value!(time::PrimitiveDateTime, Value::Timestamp(t) => Ok(t));
    from_value!(time::OffsetDateTime, Value::TimestampTz(t) => Ok(t));
}

macro_rules! from_record_tuple {
    ($($t:ident $i:literal),*) => {
        impl<$($t),*> FromRecord for ($($t),*,)
        where
            $($t: FromValue),*
        {
            fn from_record(mut record: Record) -> Result<Self, DecodeError> {
                Ok((
                    $(record.take($i)?),*,
                ))
            }
        }

        impl<$($t),*> FromValue for ($($t),*,)
        where
            $($t: FromValue),*
        {
            fn from_value(value: Value) -> Result<Self, DecodeError> {
                Record::from_value(value)?.decode()
            }
        }
    };
}

from_record_tuple!(T0 0);
from_record_tuple!(T0 0, T1 1);
from_record_tuple!(T0 0, T1 1, T2 2);
from_record_tuple!(T0 0, T1 1, T2 2, T3 3);
from_record_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4);
from_record_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);

/// Type that can be used for indexing record field.
pub trait Index: Sized + sealed::Sealed {
    /// Returns the field position.
    fn position(self, names: Option<&[ByteStr]>, len: usize) -> Result<usize, DecodeError>;
}

impl Index for usize {
    fn position(self, _: Option<&[ByteStr]>, len: usize) -> Result<usize, DecodeError> {
        match self < len {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl Index for &str {
    fn position(self, names: Option<&[ByteStr]>, _: usize) -> Result<usize, DecodeError> {
        names
            .and_then(|names| names.iter().position(|name| name == self))
            .ok_or_else(|| DecodeError::FieldNotFound(String::from(self).into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
}

/// An error when extracting a rust type from [`Value`].
pub enum DecodeError {
    /// Field requested not found.
    FieldNotFound(Cow<'static,str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
    /// Value variant differ from requested type.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// Integer does not fit requested type.
    OutOfRange(&'static str),
    /// Value is null.
    Null,
    /// Failed to deserialize using `serde_json`.
    #[cfg(feature = "json")]
    Json(serde_json::error::Error),
}

impl DecodeError {
    pub(crate) fn mismatch(expected: &'static str, found: &Value) -> Self {
        Self::TypeMismatch { expected, found: found.kind() }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::FieldNotFound(name) => write!(f, "field not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::OutOfRange(ty) => write!(f, "integer out of range for {ty}"),
            Self::Null => write!(f, "unexpected NULL value"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(feature = "json")]
impl From<serde_json::error::Error> for DecodeError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::Json(e)
    }
}

impl std::error::Error for DecodeError { }

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
