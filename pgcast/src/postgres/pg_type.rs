
/// Postgres object identifier.
///
/// The oid type is implemented as an unsigned four-byte integer.
///
/// <https://www.postgresql.org/docs/current/datatype-oid.html>
pub type Oid = u32;

/// A rust type that have corresponding postgres type.
pub trait PgType {
    /// `pg_type.oid`
    const OID: Oid;
    /// `pg_type.typname`
    const NAME: &'static str;
}

macro_rules! oid {
    ($ty:ty, $oid:literal, $name:literal $(, $doc:literal)? ) => {
        $(#[doc = $doc])?
        impl PgType for $ty {
            const OID: Oid = $oid;
            const NAME: &'static str = $name;
        }
    };
}

oid!(bool, 16, "bool");
oid!(i64, 20, "int8", "`int8` ~18 digit integer, 8-byte storage");
oid!(i16, 21, "int2", "`int2` -32 thousand to 32 thousand, 2-byte storage");
oid!(i32, 23, "int4", "`int4` -2 billion to 2 billion integer, 4-byte storage");
oid!(u32, 26, "oid", "`oid` object identifier");
oid!(String, 25, "text", "`text` variable-length string, no limit specified");
oid!(f32, 700, "float4", "`float4` single-precision floating point number, 4-byte storage");
oid!(f64, 701, "float8", "`float8` double-precision floating point number, 8-byte storage");
oid!(bytes::Bytes, 17, "bytea", "`bytea` variable-length string, binary values escaped");
oid!(crate::Interval, 1186, "interval", "`interval` time interval");
oid!(crate::Record, 2249, "record", "pseudo-type representing any composite type");
oid!(std::collections::HashMap<String, Option<String>>, 0, "hstore", "`hstore` extension type, no fixed oid");

#[cfg(feature = "json")]
oid!(serde_json::Value, 3802, "jsonb", "binary JSON");

#[cfg(feature = "time")]
mod time_types {
    use super::{Oid, PgType};

    oid!(time::Date, 1082, "date", "calendar date (year, month, day)");
    oid!(time::Time, 1083, "time", "time of day");
    oid!(time::PrimitiveDateTime, 1114, "timestamp", "date and time");
    oid!(time::OffsetDateTime, 1184, "timestamptz", "date and time with time zone");
}

/// Well known builtin type, `(oid, typname, array oid)`.
///
/// Used to describe result columns without a catalog roundtrip.
pub const BUILTIN: &[(Oid, &str, Oid)] = &[
    (16, "bool", 1000),
    (17, "bytea", 1001),
    (18, "char", 1002),
    (19, "name", 1003),
    (20, "int8", 1016),
    (21, "int2", 1005),
    (22, "int2vector", 1006),
    (23, "int4", 1007),
    (25, "text", 1009),
    (26, "oid", 1028),
    (28, "xid", 1011),
    (29, "cid", 1012),
    (114, "json", 199),
    (700, "float4", 1021),
    (701, "float8", 1022),
    (790, "money", 791),
    (1042, "bpchar", 1014),
    (1043, "varchar", 1015),
    (1082, "date", 1182),
    (1083, "time", 1183),
    (1114, "timestamp", 1115),
    (1184, "timestamptz", 1185),
    (1186, "interval", 1187),
    (1266, "timetz", 1270),
    (1700, "numeric", 1231),
    (2249, "record", 2287),
    (2277, "anyarray", 0),
    (2950, "uuid", 2951),
    (3802, "jsonb", 3807),
];

/// Returns the builtin type name of `oid`, array types are prefixed with `_`.
pub fn builtin_name(oid: Oid) -> Option<std::borrow::Cow<'static, str>> {
    BUILTIN.iter().find_map(|&(id, name, array)| {
        if id == oid {
            Some(name.into())
        } else if array == oid && array != 0 {
            Some(format!("_{name}").into())
        } else {
            None
        }
    })
}
