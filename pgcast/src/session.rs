//! Per connection typecasting.
use std::sync::Arc;

use crate::{
    Config, Result, Value,
    cast::{Cast, Context},
    common::span,
    postgres::{Oid, builtin_name},
    record::FieldCountMismatch,
    typecast::{self, Typecasts},
    types::{Catalog, FieldInfo, TypeCache, TypeInfo, TypeKey},
};

/// Type metadata and typecasts of one connection.
///
/// ```
/// use pgcast::{BoxError, Catalog, CatalogRow, Session};
///
/// struct Offline;
///
/// impl Catalog for Offline {
///     fn query(&mut self, _: &str, _: &[&str]) -> Result<Vec<CatalogRow>, BoxError> {
///         Err("offline".into())
///     }
/// }
///
/// let mut session = Session::new(Offline);
/// let value = session.typecast(Some("{1,2,3}"), "_int4")?;
/// let numbers: Vec<i32> = value.decode()?;
/// assert_eq!(numbers, [1, 2, 3]);
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Session<C> {
    catalog: C,
    types: TypeCache,
    casts: Typecasts,
    config: Config,
}

impl<C: Catalog> Session<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_config(catalog, Config::default())
    }

    pub fn with_config(catalog: C, config: Config) -> Self {
        Self {
            catalog,
            types: TypeCache::new(),
            casts: Typecasts::new(),
            config,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut C {
        &mut self.catalog
    }

    pub fn into_catalog(self) -> C {
        self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Cast context with the current server styles.
    pub fn context(&self) -> Context {
        Context::new(self.catalog.date_style(), self.catalog.interval_style(), self.config)
    }

    /// Describe type by oid or name.
    pub fn type_info<'a>(&mut self, key: impl Into<TypeKey<'a>>) -> Result<Arc<TypeInfo>> {
        Ok(self.types.resolve(&mut self.catalog, key)?)
    }

    /// Attributes of a composite type, [`None`] for any other type.
    pub fn fields_of<'a>(&mut self, key: impl Into<TypeKey<'a>>) -> Result<Option<Arc<[FieldInfo]>>> {
        Ok(self.types.fields_of(&mut self.catalog, key)?)
    }

    /// Returns the cast used for `ty`, [`None`] if values are kept as text.
    ///
    /// A failed catalog query is [`ErrorKind::UnknownType`][crate::ErrorKind::UnknownType]
    /// and is retried on the next call.
    pub fn get_typecast(&mut self, ty: &str) -> Result<Option<Cast>> {
        let mut source = self.types.source(&mut self.catalog);
        self.casts.get(ty, &mut source)
    }

    /// Override the cast of every type in `types`.
    ///
    /// With [`None`], the override is removed and the global default applies again.
    pub fn set_typecast(&mut self, types: &[&str], cast: Option<Cast>) {
        for ty in types {
            match &cast {
                Some(cast) => self.casts.set(ty, cast.clone()),
                None => self.casts.reset(ty),
            }
        }
    }

    /// Remove the override of `ty`, or every override with [`None`].
    pub fn reset_typecast(&mut self, ty: Option<&str>) {
        match ty {
            Some(ty) => self.casts.reset(ty),
            None => self.casts.reset_all(),
        }
    }

    /// Cast a text value of type `ty`.
    ///
    /// `NULL` stays [`Value::Null`], a type without cast is returned as text.
    pub fn typecast(&mut self, value: Option<&str>, ty: &str) -> Result<Value> {
        let ctx = self.context();
        self.cast_with(value, ty, &ctx)
    }

    fn cast_with(&mut self, value: Option<&str>, ty: &str, ctx: &Context) -> Result<Value> {
        let Some(text) = value else {
            return Ok(Value::Null);
        };
        let cast = self
            .get_typecast(ty)
            .map_err(|e| e.with_context(format!("typecast {ty}")))?;
        match cast {
            Some(cast) => typecast::apply(&cast, ty, text, ctx),
            None => Ok(Value::Text(text.into())),
        }
    }

    /// Cast a row of text values, `oids` are the column types.
    pub fn decode_row(&mut self, values: &[Option<&str>], oids: &[Oid]) -> Result<Vec<Value>> {
        span!("decode_row", columns = oids.len());
        if values.len() != oids.len() {
            return Err(FieldCountMismatch { expected: oids.len(), found: values.len() }.into());
        }

        let ctx = self.context();
        let mut row = Vec::with_capacity(values.len());
        for (value, &oid) in values.iter().zip(oids) {
            let name = match builtin_name(oid) {
                Some(name) => name,
                None => self.type_info(TypeKey::Oid(oid))?.name().to_string().into(),
            };
            row.push(self.cast_with(*value, &name, &ctx)?);
        }
        Ok(row)
    }

    /// Forget every type descriptor and derived cast, overrides are kept.
    ///
    /// Needed after types are altered on the server.
    pub fn reset(&mut self) {
        self.types.reset();
        self.casts.clear_resolved();
    }
}
