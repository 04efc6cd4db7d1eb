//! Type metadata cache.
//!
//! Describes server types by oid or name, populated on demand through a
//! [`Catalog`] and kept for the lifetime of a connection.
//!
//! - [`TypeInfo`]
//! - [`TypeCache`]
//! - [`Catalog`]
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use crate::{
    DateStyle, IntervalStyle, Result,
    common::{ByteStr, span, verbose},
    error::BoxError,
    postgres::Oid,
    typecast::TypeSource,
};

/// Descriptor query, `$1` is either an oid or a type name.
pub const TYPE_QUERY: &str = "SELECT oid, typname, oid::regtype, typlen, typtype, typcategory, \
    typdelim, typrelid, typelem FROM pg_catalog.pg_type WHERE oid = $1::regtype";

/// Composite attributes query, `$1` is `typrelid`.
pub const FIELDS_QUERY: &str = "SELECT attname, atttypid FROM pg_catalog.pg_attribute \
    WHERE attrelid = $1::oid AND attnum > 0 AND NOT attisdropped ORDER BY attnum";

// ===== Catalog =====

/// Server collaborator answering catalog queries.
///
/// Implemented by a connection. Parameters and columns are in text format.
pub trait Catalog {
    /// Run `sql` with text parameters, returns every row.
    fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<CatalogRow>, BoxError>;

    /// Current `DateStyle` parameter.
    fn date_style(&self) -> DateStyle {
        DateStyle::default()
    }

    /// Current `IntervalStyle` parameter.
    fn interval_style(&self) -> IntervalStyle {
        IntervalStyle::default()
    }
}

impl<C: Catalog + ?Sized> Catalog for &mut C {
    fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<CatalogRow>, BoxError> {
        C::query(self, sql, params)
    }

    fn date_style(&self) -> DateStyle {
        C::date_style(self)
    }

    fn interval_style(&self) -> IntervalStyle {
        C::interval_style(self)
    }
}

/// A row returned by [`Catalog::query`], columns in text format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow {
    columns: Vec<Option<String>>,
}

impl CatalogRow {
    pub fn new(columns: Vec<Option<String>>) -> Self {
        Self { columns }
    }

    /// Returns column text, [`None`] when out of bounds or `NULL`.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: Into<String>> FromIterator<Option<S>> for CatalogRow {
    fn from_iter<T: IntoIterator<Item = Option<S>>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|col| col.map(Into::into)).collect())
    }
}

// ===== TypeInfo =====

/// `pg_type.typtype`, arrays are told apart by `typcategory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Base,
    Array,
    Composite,
    Domain,
    Enum,
    Pseudo,
    Range,
    Multirange,
    Unknown,
}

impl Category {
    fn new(typtype: u8, typcategory: u8, element: Oid) -> Self {
        match typtype {
            b'b' if typcategory == b'A' && element != 0 => Self::Array,
            b'b' => Self::Base,
            b'c' => Self::Composite,
            b'd' => Self::Domain,
            b'e' => Self::Enum,
            b'p' => Self::Pseudo,
            b'r' => Self::Range,
            b'm' => Self::Multirange,
            _ => Self::Unknown,
        }
    }
}

/// Server type descriptor.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    oid: Oid,
    name: ByteStr,
    regtype: ByteStr,
    length: i16,
    category: Category,
    delimiter: u8,
    relid: Oid,
    element: Option<Arc<TypeInfo>>,
    fields: Option<Arc<[FieldInfo]>>,
}

/// Composite type attribute.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: ByteStr,
    pub info: Arc<TypeInfo>,
}

impl TypeInfo {
    /// Create base type descriptor.
    pub fn base(oid: Oid, name: impl Into<ByteStr>) -> Self {
        let name = name.into();
        Self {
            oid,
            regtype: name.clone(),
            name,
            length: -1,
            category: Category::Base,
            delimiter: b',',
            relid: 0,
            element: None,
            fields: None,
        }
    }

    /// Create array type descriptor, the name is `_` followed by element name.
    pub fn array(oid: Oid, element: Arc<TypeInfo>) -> Self {
        let name = ByteStr::from(format!("_{}", element.name));
        Self {
            regtype: format!("{}[]", element.regtype).into(),
            category: Category::Array,
            element: Some(element),
            ..Self::base(oid, name)
        }
    }

    /// Create composite type descriptor.
    pub fn composite(oid: Oid, name: impl Into<ByteStr>, relid: Oid, fields: Vec<FieldInfo>) -> Self {
        Self {
            category: Category::Composite,
            relid,
            fields: Some(fields.into()),
            ..Self::base(oid, name)
        }
    }

    /// Replace the element delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Replace the `regtype` text.
    pub fn with_regtype(mut self, regtype: impl Into<ByteStr>) -> Self {
        self.regtype = regtype.into();
        self
    }

    /// `pg_type.oid`
    pub fn oid(&self) -> Oid {
        self.oid
    }

    /// `pg_type.typname`, the typecast registry key.
    pub fn name(&self) -> &ByteStr {
        &self.name
    }

    /// `oid::regtype`, e.g. `integer` or `character varying[]`.
    pub fn regtype(&self) -> &ByteStr {
        &self.regtype
    }

    /// `pg_type.typlen`, negative for variable length.
    pub fn length(&self) -> i16 {
        self.length
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Array element delimiter, `pg_type.typdelim`.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// `pg_type.typrelid`, non zero for composite types.
    pub fn relid(&self) -> Oid {
        self.relid
    }

    /// Element type of an array.
    pub fn element(&self) -> Option<&Arc<TypeInfo>> {
        self.element.as_ref()
    }

    /// Attributes of a composite type, ordered by position.
    pub fn fields(&self) -> Option<&Arc<[FieldInfo]>> {
        self.fields.as_ref()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.regtype)
    }
}

/// Type lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKey<'a> {
    Oid(Oid),
    Name(&'a str),
}

impl From<Oid> for TypeKey<'_> {
    fn from(value: Oid) -> Self {
        Self::Oid(value)
    }
}

impl<'a> From<&'a str> for TypeKey<'a> {
    fn from(value: &'a str) -> Self {
        Self::Name(value)
    }
}

impl fmt::Display for TypeKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oid(oid) => write!(f, "{oid}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

// ===== TypeCache =====

/// Per connection type descriptor cache.
///
/// Every key of a type, its oid, `typname` and `regtype`, point to the same
/// [`Arc`].
#[derive(Debug, Default)]
pub struct TypeCache {
    by_oid: HashMap<Oid, Arc<TypeInfo>>,
    by_name: HashMap<ByteStr, Arc<TypeInfo>>,
    resolving: HashSet<Oid>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns cached descriptor without querying.
    pub fn get<'a>(&self, key: impl Into<TypeKey<'a>>) -> Option<Arc<TypeInfo>> {
        match key.into() {
            TypeKey::Oid(oid) => self.by_oid.get(&oid).cloned(),
            TypeKey::Name(name) => self.by_name.get(name).cloned(),
        }
    }

    /// Returns the descriptor, querying `catalog` on a miss.
    ///
    /// Element and field types are resolved recursively. A type that is
    /// requested again while it is being resolved fails with [`UnknownType`].
    pub fn resolve<'a, C: Catalog + ?Sized>(
        &mut self,
        catalog: &mut C,
        key: impl Into<TypeKey<'a>>,
    ) -> Result<Arc<TypeInfo>, UnknownType> {
        let key = key.into();
        if let Some(info) = self.get(key) {
            return Ok(info);
        }
        span!("resolve", %key);

        if let TypeKey::Oid(oid) = key {
            if self.resolving.contains(&oid) {
                return Err(UnknownType::recursive(key));
            }
        }

        let param = key.to_string();
        let rows = catalog
            .query(TYPE_QUERY, &[&param])
            .map_err(|e| UnknownType::with_source(key, e))?;
        let Some(row) = rows.first() else {
            return Err(UnknownType::new(key));
        };
        let desc = Descriptor::from_row(row).ok_or_else(|| UnknownType::new(key))?;

        // same type under another alias
        if let Some(info) = self.by_oid.get(&desc.oid).cloned() {
            if let TypeKey::Name(name) = key {
                self.by_name.insert(ByteStr::copy_from_str(name), info.clone());
            }
            return Ok(info);
        }

        let oid = desc.oid;
        if !self.resolving.insert(oid) {
            return Err(UnknownType::recursive(key));
        }
        let result = self.build(catalog, desc);
        self.resolving.remove(&oid);
        let info = result?;

        verbose!(oid = info.oid, name = %info.name, "type resolved");
        self.by_oid.insert(info.oid, info.clone());
        self.by_name.insert(info.name.clone(), info.clone());
        self.by_name.insert(info.regtype.clone(), info.clone());
        if let TypeKey::Name(name) = key {
            self.by_name.insert(ByteStr::copy_from_str(name), info.clone());
        }
        Ok(info)
    }

    fn build<C: Catalog + ?Sized>(&mut self, catalog: &mut C, desc: Descriptor) -> Result<Arc<TypeInfo>, UnknownType> {
        let category = Category::new(desc.typtype, desc.typcategory, desc.element);

        let element = match category {
            Category::Array => Some(self.resolve(catalog, desc.element)?),
            _ => None,
        };

        let fields = match desc.relid {
            0 => None,
            relid => Some(self.load_fields(catalog, desc.oid, relid)?),
        };

        Ok(Arc::new(TypeInfo {
            oid: desc.oid,
            name: desc.name,
            regtype: desc.regtype,
            length: desc.length,
            category,
            delimiter: desc.delimiter,
            relid: desc.relid,
            element,
            fields,
        }))
    }

    fn load_fields<C: Catalog + ?Sized>(
        &mut self,
        catalog: &mut C,
        oid: Oid,
        relid: Oid,
    ) -> Result<Arc<[FieldInfo]>, UnknownType> {
        let key = TypeKey::Oid(oid);
        let param = itoa::Buffer::new().format(relid).to_owned();
        let rows = catalog
            .query(FIELDS_QUERY, &[&param])
            .map_err(|e| UnknownType::with_source(key, e))?;

        let mut fields = Vec::with_capacity(rows.len());
        for row in &rows {
            let (Some(name), Some(typid)) = (row.get(0), row.get(1).and_then(|s| s.parse().ok())) else {
                return Err(UnknownType::new(key));
            };
            fields.push(FieldInfo {
                name: ByteStr::copy_from_str(name),
                info: self.resolve(catalog, TypeKey::Oid(typid))?,
            });
        }

        Ok(fields.into())
    }

    /// Returns the attributes of a composite type, [`None`] for any other type.
    pub fn fields_of<'a, C: Catalog + ?Sized>(
        &mut self,
        catalog: &mut C,
        key: impl Into<TypeKey<'a>>,
    ) -> Result<Option<Arc<[FieldInfo]>>, UnknownType> {
        Ok(self.resolve(catalog, key)?.fields.clone())
    }

    /// Adapt as a [`TypeSource`] for the typecast registry.
    ///
    /// A type missing from the catalog is reported as [`None`], a failed
    /// query is an error.
    pub fn source<'a, C: Catalog + ?Sized>(&'a mut self, catalog: &'a mut C) -> CatalogSource<'a, C> {
        CatalogSource { cache: self, catalog }
    }

    /// Remove every cached descriptor.
    pub fn reset(&mut self) {
        self.by_oid.clear();
        self.by_name.clear();
        self.resolving.clear();
    }
}

/// [`TypeSource`] backed by a [`TypeCache`] and its [`Catalog`].
pub struct CatalogSource<'a, C: ?Sized> {
    cache: &'a mut TypeCache,
    catalog: &'a mut C,
}

impl<C: Catalog + ?Sized> TypeSource for CatalogSource<'_, C> {
    fn describe(&mut self, name: &str) -> Result<Option<Arc<TypeInfo>>> {
        match self.cache.resolve(&mut *self.catalog, name) {
            Ok(info) => Ok(Some(info)),
            Err(err) if err.is_missing() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Parsed [`TYPE_QUERY`] row.
struct Descriptor {
    oid: Oid,
    name: ByteStr,
    regtype: ByteStr,
    length: i16,
    typtype: u8,
    typcategory: u8,
    delimiter: u8,
    relid: Oid,
    element: Oid,
}

impl Descriptor {
    fn from_row(row: &CatalogRow) -> Option<Self> {
        let byte = |i: usize| row.get(i).and_then(|s| s.bytes().next());
        Some(Self {
            oid: row.get(0)?.parse().ok()?,
            name: ByteStr::copy_from_str(row.get(1)?),
            regtype: ByteStr::copy_from_str(row.get(2)?),
            length: row.get(3)?.parse().ok()?,
            typtype: byte(4)?,
            typcategory: byte(5)?,
            delimiter: byte(6).unwrap_or(b','),
            relid: row.get(7)?.parse().ok()?,
            element: row.get(8)?.parse().ok()?,
        })
    }
}

// ===== Error =====

/// Type could not be described by the catalog.
pub struct UnknownType {
    key: String,
    recursive: bool,
    source: Option<BoxError>,
}

impl UnknownType {
    fn new(key: TypeKey) -> Self {
        Self { key: key.to_string(), recursive: false, source: None }
    }

    fn with_source(key: TypeKey, source: BoxError) -> Self {
        Self { key: key.to_string(), recursive: false, source: Some(source) }
    }

    fn recursive(key: TypeKey) -> Self {
        Self { key: key.to_string(), recursive: true, source: None }
    }

    /// Requested oid or name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `true` if the catalog has no such type.
    ///
    /// `false` when the query failed or the type refers to itself.
    pub fn is_missing(&self) -> bool {
        !self.recursive && self.source.is_none()
    }

    /// Returns `true` if the type was requested while being resolved.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }
}

impl std::error::Error for UnknownType {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

impl fmt::Display for UnknownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.recursive {
            true => write!(f, "type {:?} is defined in terms of itself", self.key)?,
            false => write!(f, "unknown type {:?}", self.key)?,
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for UnknownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Rows keyed by the first parameter, counting queries.
    #[derive(Default)]
    struct Script {
        types: HashMap<String, Vec<Option<String>>>,
        fields: HashMap<String, Vec<(String, Oid)>>,
        queries: usize,
    }

    impl Script {
        fn ty(mut self, oid: Oid, name: &str, regtype: &str, typtype: char, cat: char, relid: Oid, elem: Oid) -> Self {
            let row: Vec<Option<String>> = [
                oid.to_string(),
                name.into(),
                regtype.into(),
                "-1".into(),
                typtype.into(),
                cat.into(),
                ",".into(),
                relid.to_string(),
                elem.to_string(),
            ]
            .into_iter()
            .map(Some)
            .collect();
            self.types.insert(oid.to_string(), row.clone());
            self.types.insert(name.into(), row.clone());
            self.types.insert(regtype.into(), row);
            self
        }

        fn fields(mut self, relid: Oid, fields: &[(&str, Oid)]) -> Self {
            let fields = fields.iter().map(|(n, o)| (n.to_string(), *o)).collect();
            self.fields.insert(relid.to_string(), fields);
            self
        }
    }

    impl Catalog for Script {
        fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<CatalogRow>, BoxError> {
            self.queries += 1;
            if sql == TYPE_QUERY {
                Ok(self.types.get(params[0]).map(|row| CatalogRow::new(row.clone())).into_iter().collect())
            } else if sql == FIELDS_QUERY {
                let fields = self.fields.get(params[0]).cloned().unwrap_or_default();
                Ok(fields
                    .into_iter()
                    .map(|(name, oid)| [Some(name), Some(oid.to_string())].into_iter().collect())
                    .collect())
            } else {
                Err("unexpected query".into())
            }
        }
    }

    fn catalog() -> Script {
        Script::default()
            .ty(23, "int4", "integer", 'b', 'N', 0, 0)
            .ty(1007, "_int4", "integer[]", 'b', 'A', 0, 23)
            .ty(25, "text", "text", 'b', 'S', 0, 0)
            .ty(16400, "inventory_item", "inventory_item", 'c', 'C', 16398, 0)
            .fields(16398, &[("name", 25), ("supplier_id", 23), ("counts", 1007)])
    }

    #[test]
    fn identity() {
        let mut catalog = catalog();
        let mut cache = TypeCache::new();

        let by_name = cache.resolve(&mut catalog, "int4").unwrap();
        let queries = catalog.queries;
        let by_oid = cache.resolve(&mut catalog, TypeKey::Oid(23)).unwrap();
        let by_regtype = cache.resolve(&mut catalog, "integer").unwrap();
        assert_eq!(catalog.queries, queries);
        assert!(Arc::ptr_eq(&by_name, &by_oid));
        assert!(Arc::ptr_eq(&by_name, &by_regtype));
        assert_eq!(by_name.category(), Category::Base);
        assert_eq!(by_name.to_string(), "integer");
    }

    #[test]
    fn array_element() {
        let mut catalog = catalog();
        let mut cache = TypeCache::new();
        let array = cache.resolve(&mut catalog, "_int4").unwrap();
        assert_eq!(array.category(), Category::Array);
        let element = array.element().unwrap();
        assert!(Arc::ptr_eq(element, &cache.get(TypeKey::Oid(23)).unwrap()));
        assert_eq!(array.delimiter(), b',');
    }

    #[test]
    fn composite_fields() {
        let mut catalog = catalog();
        let mut cache = TypeCache::new();
        let fields = cache.fields_of(&mut catalog, "inventory_item").unwrap().unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "supplier_id", "counts"]);
        assert_eq!(fields[1].info.name(), "int4");
        assert!(Arc::ptr_eq(&fields[1].info, &cache.get("integer").unwrap()));
        assert_eq!(fields[2].info.element().unwrap().name(), "int4");

        assert!(cache.fields_of(&mut catalog, "int4").unwrap().is_none());
    }

    #[test]
    fn composite_without_attributes() {
        let mut catalog = catalog().ty(16600, "nothing", "nothing", 'c', 'C', 16599, 0);
        let mut cache = TypeCache::new();
        let fields = cache.fields_of(&mut catalog, "nothing").unwrap().unwrap();
        assert!(fields.is_empty());
        assert_eq!(cache.get("nothing").unwrap().category(), Category::Composite);
    }

    #[test]
    fn unknown() {
        let mut catalog = catalog();
        let mut cache = TypeCache::new();
        let err = cache.resolve(&mut catalog, "nope").unwrap_err();
        assert_eq!(err.key(), "nope");
        assert!(!err.is_recursive());
        assert!(err.is_missing());

        struct Failing;
        impl Catalog for Failing {
            fn query(&mut self, _: &str, _: &[&str]) -> Result<Vec<CatalogRow>, BoxError> {
                Err("connection closed".into())
            }
        }
        let err = cache.resolve(&mut Failing, TypeKey::Oid(23)).unwrap_err();
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_missing());
        assert!(err.to_string().ends_with("connection closed"));

        // failed lookups are not cached
        assert!(cache.resolve(&mut catalog, TypeKey::Oid(23)).is_ok());
    }

    #[test]
    fn self_referencing_type() {
        let mut catalog = catalog()
            .ty(16500, "node", "node", 'c', 'C', 16499, 0)
            .ty(16501, "_node", "node[]", 'b', 'A', 0, 16500)
            .fields(16499, &[("value", 23), ("children", 16501)]);
        let mut cache = TypeCache::new();
        let err = cache.resolve(&mut catalog, "node").unwrap_err();
        assert!(err.is_recursive());
        assert!(cache.get("node").is_none());

        // unrelated types still resolve afterwards
        assert!(cache.resolve(&mut catalog, "inventory_item").is_ok());
    }

    #[test]
    fn reset() {
        let mut catalog = catalog();
        let mut cache = TypeCache::new();
        let before = cache.resolve(&mut catalog, "text").unwrap();
        cache.reset();
        assert!(cache.get("text").is_none());
        let after = cache.resolve(&mut catalog, "text").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn builders() {
        let int4 = Arc::new(TypeInfo::base(23, "int4").with_regtype("integer"));
        let array = TypeInfo::array(1007, int4.clone());
        assert_eq!(array.name(), "_int4");
        assert_eq!(array.regtype(), "integer[]");
        assert_eq!(array.category(), Category::Array);

        let boxes = TypeInfo::base(603, "box").with_delimiter(b';');
        assert_eq!(boxes.delimiter(), b';');

        let item = TypeInfo::composite(16400, "item", 16398, vec![FieldInfo { name: "id".into(), info: int4 }]);
        assert_eq!(item.fields().unwrap().len(), 1);
        assert!(TypeInfo::composite(1, "empty", 2, vec![]).fields().unwrap().is_empty());
        assert!(TypeInfo::base(23, "int4").fields().is_none());
    }
}
