//! Typecast registry.
//!
//! Casts are looked up by type name in order:
//!
//! 1. connection override, [`Typecasts::set`]
//! 2. connection cache of earlier resolutions
//! 3. global default, [`set_default`]
//! 4. derived: `_name` is an array of `name`, a composite type is a record
//!    of its field casts
//! 5. no cast, the value is returned as text
//!
//! Derived casts remember the types they were built from, changing one of
//! those invalidates them. A failed type lookup is an error and nothing is
//! cached for it.
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, LazyLock, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    Record, Result, Value, array,
    cast::{self, Cast},
    common::{ByteStr, span, verbose, warn},
    postgres::BUILTIN,
    record::{self, RecordCasts},
    types::TypeInfo,
};

static DEFAULTS: LazyLock<Mutex<HashMap<ByteStr, Cast>>> = LazyLock::new(|| Mutex::new(builtins()));

/// Bumped on every change of [`DEFAULTS`].
static GENERATION: AtomicU64 = AtomicU64::new(0);

fn builtins() -> HashMap<ByteStr, Cast> {
    cast::builtins()
        .into_iter()
        .map(|(name, cast)| (ByteStr::from_static(name), cast))
        .collect()
}

fn defaults() -> MutexGuard<'static, HashMap<ByteStr, Cast>> {
    DEFAULTS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn changed() {
    GENERATION.fetch_add(1, Ordering::Release);
}

/// Returns the global default cast for `ty`.
pub fn get_default(ty: &str) -> Option<Cast> {
    defaults().get(ty).cloned()
}

/// Register a global default cast.
///
/// A default registered for the array type `_ty` is removed, so arrays of
/// `ty` are derived from the new cast.
pub fn set_default(ty: &str, cast: Cast) {
    let mut defaults = defaults();
    defaults.remove(format!("_{ty}").as_str());
    defaults.insert(ByteStr::copy_from_str(ty), cast);
    changed();
}

/// Remove the global default of `ty` and `_ty`.
pub fn remove_default(ty: &str) {
    let mut defaults = defaults();
    defaults.remove(ty);
    defaults.remove(format!("_{ty}").as_str());
    changed();
}

/// Restore the builtin global defaults.
pub fn reset_defaults() {
    *defaults() = builtins();
    changed();
}

/// Type descriptor lookup used to derive casts.
pub trait TypeSource {
    /// Describe type by name, [`None`] if the type does not exist.
    fn describe(&mut self, name: &str) -> Result<Option<Arc<TypeInfo>>>;
}

impl<F: FnMut(&str) -> Result<Option<Arc<TypeInfo>>>> TypeSource for F {
    fn describe(&mut self, name: &str) -> Result<Option<Arc<TypeInfo>>> {
        self(name)
    }
}

/// [`TypeSource`] that knows no type.
///
/// Arrays are still derived, with the default delimiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTypes;

impl TypeSource for NoTypes {
    fn describe(&mut self, _: &str) -> Result<Option<Arc<TypeInfo>>> {
        Ok(None)
    }
}

/// Per connection typecast registry.
#[derive(Debug)]
pub struct Typecasts {
    overrides: HashMap<ByteStr, Cast>,
    /// [`None`] caches that no cast exists.
    resolved: HashMap<ByteStr, Option<Cast>>,
    /// type name to the derived types built from it
    dependents: HashMap<ByteStr, HashSet<ByteStr>>,
    resolving: HashSet<ByteStr>,
    generation: u64,
}

impl Default for Typecasts {
    fn default() -> Self {
        Self::new()
    }
}

impl Typecasts {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            resolved: HashMap::new(),
            dependents: HashMap::new(),
            resolving: HashSet::new(),
            generation: GENERATION.load(Ordering::Acquire),
        }
    }

    /// Returns the cast for `ty`, deriving and caching it on a miss.
    ///
    /// [`None`] means values of `ty` are kept as text. Errors of `types` are
    /// returned as is.
    pub fn get(&mut self, ty: &str, types: &mut dyn TypeSource) -> Result<Option<Cast>> {
        self.sync();

        if let Some(cast) = self.overrides.get(ty) {
            return Ok(Some(cast.clone()));
        }
        if let Some(resolved) = self.resolved.get(ty) {
            return Ok(resolved.clone());
        }
        if self.resolving.contains(ty) {
            return Ok(None);
        }

        span!("typecast", ty);
        let key = ByteStr::copy_from_str(ty);
        self.resolving.insert(key.clone());
        let derived = self.derive(ty, types);
        self.resolving.remove(ty);

        let (cast, cache) = derived?;
        if cache {
            self.resolved.insert(key, cast.clone());
        }
        Ok(cast)
    }

    /// Resolve a miss, returns whether the result can be cached.
    fn derive(&mut self, ty: &str, types: &mut dyn TypeSource) -> Result<(Option<Cast>, bool)> {
        if let Some(cast) = get_default(ty) {
            return Ok((Some(cast), true));
        }

        if let Some(base) = ty.strip_prefix('_') {
            let element = self.get(base, types)?;
            let delim = match is_builtin(base) {
                true => b',',
                false => types.describe(base)?.map_or(b',', |info| info.delimiter()),
            };
            verbose!(base, has_cast = element.is_some(), "derived array cast");
            self.depend(ty, base);
            let cache = element.is_some();
            return Ok((Some(array_cast(element, delim)), cache));
        }

        let fields = types.describe(ty)?.and_then(|info| info.fields().cloned());
        if let Some(fields) = fields {
            let mut casts = Vec::with_capacity(fields.len());
            for field in fields.iter() {
                self.depend(ty, &field.info.name());
                casts.push(self.get(&field.info.name(), types)?);
            }
            let names = fields.iter().map(|field| field.name.clone()).collect();
            verbose!(fields = fields.len(), "derived record cast");
            return Ok((Some(record_cast(names, casts)), true));
        }

        warn!("no typecast for {ty:?}, returned as text");
        Ok((None, true))
    }

    fn depend(&mut self, derived: &str, base: &str) {
        self.dependents
            .entry(ByteStr::copy_from_str(base))
            .or_default()
            .insert(ByteStr::copy_from_str(derived));
    }

    /// Override the cast of `ty` for this connection.
    pub fn set(&mut self, ty: &str, cast: Cast) {
        self.sync();
        self.invalidate(ty);
        self.overrides.insert(ByteStr::copy_from_str(ty), cast);
    }

    /// Remove the connection override of `ty`.
    pub fn reset(&mut self, ty: &str) {
        self.sync();
        self.invalidate(ty);
        self.overrides.remove(ty);
    }

    /// Remove every override and cached resolution.
    pub fn reset_all(&mut self) {
        self.overrides.clear();
        self.clear_resolved();
    }

    /// Drop cached resolutions, overrides are kept.
    pub fn clear_resolved(&mut self) {
        self.resolved.clear();
        self.dependents.clear();
        self.generation = GENERATION.load(Ordering::Acquire);
    }

    /// Returns `true` if `ty` has a connection override.
    pub fn is_overridden(&self, ty: &str) -> bool {
        self.overrides.contains_key(ty)
    }

    /// Returns `true` if a resolution of `ty` is cached.
    pub fn is_cached(&self, ty: &str) -> bool {
        self.resolved.contains_key(ty)
    }

    /// Drop `ty` and every cast derived from it, transitively.
    fn invalidate(&mut self, ty: &str) {
        let mut stack = vec![ByteStr::copy_from_str(ty)];
        while let Some(ty) = stack.pop() {
            self.resolved.remove(&ty);
            if let Some(dependents) = self.dependents.remove(&ty) {
                verbose!(%ty, dependents = dependents.len(), "invalidate derived casts");
                stack.extend(dependents);
            }
        }
    }

    fn sync(&mut self) {
        let generation = GENERATION.load(Ordering::Acquire);
        if self.generation != generation {
            verbose!("global defaults changed");
            self.resolved.clear();
            self.dependents.clear();
            self.generation = generation;
        }
    }
}

/// Every builtin type uses `,` between array elements.
fn is_builtin(ty: &str) -> bool {
    BUILTIN.iter().any(|&(_, name, _)| name == ty)
}

/// Array of `element`, text elements without one.
fn array_cast(element: Option<Cast>, delim: u8) -> Cast {
    Cast::contextual(move |text, ctx| {
        let items = match &element {
            Some(element) => array::parse(text, Some(delim), Some(&|s: &str| element.apply(s, ctx)))?,
            None => array::parse(text, Some(delim), None)?,
        };
        Ok(Value::Array(items))
    })
}

/// Record with named fields, each cast by its own field cast.
fn record_cast(names: Arc<[ByteStr]>, casts: Vec<Option<Cast>>) -> Cast {
    Cast::contextual(move |text, ctx| {
        let apply: Vec<_> = casts
            .iter()
            .map(|cast| cast.as_ref().map(|cast| move |s: &str| cast.apply(s, ctx)))
            .collect();
        let fields: Vec<Option<array::ElementCast<'_>>> = apply
            .iter()
            .map(|f| f.as_ref().map(|f| f as array::ElementCast<'_>))
            .collect();
        let values: Vec<Value> = record::parse(text, RecordCasts::Fields(&fields), None)?;
        Ok(Value::Record(Record::with_names(values, names.clone())))
    })
}

/// Apply `cast` to `text` under `ty` in error context.
pub(crate) fn apply(cast: &Cast, ty: &str, text: &str, ctx: &cast::Context) -> Result<Value> {
    cast.apply(text, ctx).map_err(|e| e.with_context(format!("typecast {ty}")))
}
