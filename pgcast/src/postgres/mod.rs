//! Postgres type identity.
mod pg_type;

pub use pg_type::{BUILTIN, Oid, PgType, builtin_name};
