//! `pgcast` error types.
use std::{backtrace::Backtrace, fmt};

use crate::{
    array::DepthExceeded,
    cast::CastFailure,
    interval::UnparsableInterval,
    lexer::MalformedLiteral,
    record::FieldCountMismatch,
    types::UnknownType,
    value::DecodeError,
};

/// A specialized [`Result`] type for `pgcast` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error returned by user supplied collaborator, e.g. [`Catalog`][crate::Catalog].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All possible error from `pgcast` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    /// Create [`ErrorKind::CastFailure`] for text that cannot be converted to `type_name`.
    ///
    /// This is the error custom cast functions should return.
    pub fn cast_failure(
        type_name: impl Into<String>,
        text: &str,
        source: impl Into<BoxError>,
    ) -> Error {
        CastFailure::new(type_name, text, source).into()
    }

    /// Prepend a context message shown before the error kind.
    pub fn with_context(mut self, context: impl Into<String>) -> Error {
        let context = context.into();
        if self.context.is_empty() {
            self.context = context;
        } else {
            self.context = format!("{context}: {}", self.context);
        }
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

/// All possible error kind from `pgcast` library.
pub enum ErrorKind {
    /// Server returned a literal that does not follow its grammar.
    MalformedLiteral(MalformedLiteral),
    /// No interval dialect matched.
    UnparsableInterval(UnparsableInterval),
    /// Record arity differ from the expected cast list.
    FieldCountMismatch(FieldCountMismatch),
    /// Catalog lookup failed or returned nothing.
    UnknownType(UnknownType),
    /// Array nesting over the supported limit.
    DepthExceeded(DepthExceeded),
    /// A cast function rejected its input.
    CastFailure(CastFailure),
    /// Typed extraction from [`Value`][crate::Value] failed.
    Decode(DecodeError),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<MalformedLiteral>e => ErrorKind::MalformedLiteral(e));
from!(<UnparsableInterval>e => ErrorKind::UnparsableInterval(e));
from!(<FieldCountMismatch>e => ErrorKind::FieldCountMismatch(e));
from!(<UnknownType>e => ErrorKind::UnknownType(e));
from!(<DepthExceeded>e => ErrorKind::DepthExceeded(e));
from!(<CastFailure>e => ErrorKind::CastFailure(e));

from!(<DecodeError>e => ErrorKind::Decode(e));

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::CastFailure(e) => std::error::Error::source(e),
            ErrorKind::UnknownType(e) => std::error::Error::source(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedLiteral(e) => e.fmt(f),
            Self::UnparsableInterval(e) => e.fmt(f),
            Self::FieldCountMismatch(e) => e.fmt(f),
            Self::UnknownType(e) => e.fmt(f),
            Self::DepthExceeded(e) => e.fmt(f),
            Self::CastFailure(e) => e.fmt(f),
            Self::Decode(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
