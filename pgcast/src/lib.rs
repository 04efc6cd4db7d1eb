//! Postgres Text Format Typecasting
//!
//! Decode the text representation of postgres values, arrays, composite
//! records, hstore and intervals included, into [`Value`].
//!
//! # Examples
//!
//! Parsing literals directly:
//!
//! ```
//! use pgcast::{Interval, Value};
//!
//! let items = pgcast::array::parse(r#"{{1,2},{"a b",NULL}}"#, None, None)?;
//! assert_eq!(items[1], Value::Array(vec![Value::from("a b"), Value::Null]));
//!
//! let fields = pgcast::record::parse("(1,,\"\")", Default::default(), None)?;
//! assert_eq!(fields, [Value::from("1"), Value::Null, Value::from("")]);
//!
//! let a = Interval::parse("1 year 2 mons")?;
//! let b = Interval::parse("P1Y2M")?;
//! assert_eq!(a, b);
//! # Ok::<_, pgcast::Error>(())
//! ```
//!
//! Casting with server type metadata goes through a [`Session`], which owns a
//! [`Catalog`] implemented by the connection.

pub mod common;
mod ext;

// Protocol
pub mod postgres;

// Literal
pub mod lexer;
pub mod array;
pub mod record;
pub mod hstore;
pub mod interval;

// Value
mod value;
pub mod cast;

// Registry
pub mod types;
pub mod typecast;
mod session;

mod config;
mod error;

pub use value::{Value, Record, FromValue, FromRecord, Index, DecodeError};
pub use interval::Interval;
pub use hstore::Hstore;
pub use cast::{Cast, Context};
pub use typecast::Typecasts;
pub use types::{Catalog, CatalogRow, TypeCache, TypeInfo};
pub use session::Session;
pub use config::{Config, DateStyle, IntervalStyle};
pub use error::{Error, ErrorKind, Result, BoxError};

#[cfg(feature = "macros")]
pub use pgcast_macros::FromRecord;
