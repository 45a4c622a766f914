//! Process-wide memo of per-class derived data.
//!
//! Entries are keyed by `ClassId` and never hold a strong handle to the
//! class they describe, so dropping a dynamically built class is not
//! blocked by its own cache entry. Nothing is evicted in steady state.

use crate::{
    annotation::{Annotation, Origin},
    class::{Class, ClassId, WeakClass},
    resolver::ClassDescriptor,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, LazyLock, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

static CACHE: LazyLock<RwLock<TypeCache>> = LazyLock::new(|| RwLock::new(TypeCache::default()));

static COUNTERS: [Counter; CacheKind::COUNT] = [const { Counter::new() }; CacheKind::COUNT];

///
/// TypeCache
///

#[derive(Default)]
struct TypeCache {
    mro: HashMap<ClassId, Vec<WeakClass>>,
    descriptors: HashMap<ClassId, Arc<ClassDescriptor>>,
    immutable_fields: HashMap<ClassId, Arc<[String]>>,
    forward_refs: HashMap<(Option<ClassId>, String), WeakClass>,
    origins: HashMap<String, Origin>,
}

///
/// CacheKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CacheKind {
    Mro,
    Descriptor,
    ImmutableFields,
    ForwardRef,
    Origin,
}

impl CacheKind {
    const COUNT: usize = 5;

    const fn index(self) -> usize {
        self as usize
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Mro => "mro",
            Self::Descriptor => "descriptor",
            Self::ImmutableFields => "immutable_fields",
            Self::ForwardRef => "forward_ref",
            Self::Origin => "origin",
        }
    }
}

struct Counter {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counter {
    const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

///
/// CacheStats
///
/// Snapshot of hit and miss counters; diagnostics only.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub mro: HitMiss,
    pub descriptor: HitMiss,
    pub immutable_fields: HitMiss,
    pub forward_ref: HitMiss,
    pub origin: HitMiss,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HitMiss {
    pub hits: u64,
    pub misses: u64,
}

// Counters are best-effort; Relaxed is enough since nothing depends on them.
fn record_hit(kind: CacheKind) {
    COUNTERS[kind.index()].hits.fetch_add(1, Ordering::Relaxed);
    tracing::trace!(cache = kind.label(), "type cache hit");
}

fn record_miss(kind: CacheKind) {
    COUNTERS[kind.index()].misses.fetch_add(1, Ordering::Relaxed);
}

fn snapshot(kind: CacheKind) -> HitMiss {
    let counter = &COUNTERS[kind.index()];

    HitMiss {
        hits: counter.hits.load(Ordering::Relaxed),
        misses: counter.misses.load(Ordering::Relaxed),
    }
}

#[must_use]
pub fn stats() -> CacheStats {
    CacheStats {
        mro: snapshot(CacheKind::Mro),
        descriptor: snapshot(CacheKind::Descriptor),
        immutable_fields: snapshot(CacheKind::ImmutableFields),
        forward_ref: snapshot(CacheKind::ForwardRef),
        origin: snapshot(CacheKind::Origin),
    }
}

pub fn reset_stats() {
    for counter in &COUNTERS {
        counter.hits.store(0, Ordering::Relaxed);
        counter.misses.store(0, Ordering::Relaxed);
    }
}

/// Drop every entry. Counters are left alone.
pub fn clear() {
    *write() = TypeCache::default();
}

fn read() -> std::sync::RwLockReadGuard<'static, TypeCache> {
    CACHE
        .read()
        .expect("type cache RwLock poisoned while acquiring read lock")
}

fn write() -> std::sync::RwLockWriteGuard<'static, TypeCache> {
    CACHE
        .write()
        .expect("type cache RwLock poisoned while acquiring write lock")
}

// Lookups release the lock before computing: computing a descriptor
// recurses into the cache for each base class.
fn cached<T, E>(
    kind: CacheKind,
    lookup: impl FnOnce(&TypeCache) -> Option<T>,
    compute: impl FnOnce() -> Result<T, E>,
    store: impl FnOnce(&mut TypeCache, &T),
) -> Result<T, E> {
    let hit = lookup(&*read());
    if let Some(value) = hit {
        record_hit(kind);
        return Ok(value);
    }

    record_miss(kind);
    let value = compute()?;
    store(&mut *write(), &value);

    Ok(value)
}

/// Linearised ancestry of `class`. An entry whose classes were dropped is
/// recomputed.
pub(crate) fn mro(class: &Class, compute: impl FnOnce() -> Vec<Class>) -> Vec<Class> {
    let id = class.id();
    let result: Result<_, std::convert::Infallible> = cached(
        CacheKind::Mro,
        |cache| {
            let weak = cache.mro.get(&id)?;
            weak.iter().map(WeakClass::upgrade).collect::<Option<Vec<_>>>()
        },
        || Ok(compute()),
        |cache, mro: &Vec<Class>| {
            cache
                .mro
                .insert(id, mro.iter().map(Class::downgrade).collect());
        },
    );

    let Ok(mro) = result;

    mro
}

pub(crate) fn descriptor<E>(
    class: &Class,
    compute: impl FnOnce() -> Result<Arc<ClassDescriptor>, E>,
) -> Result<Arc<ClassDescriptor>, E> {
    let id = class.id();

    cached(
        CacheKind::Descriptor,
        |cache| cache.descriptors.get(&id).cloned(),
        compute,
        |cache, descriptor| {
            cache.descriptors.insert(id, Arc::clone(descriptor));
        },
    )
}

pub(crate) fn immutable_fields(class: &Class, compute: impl FnOnce() -> Vec<String>) -> Arc<[String]> {
    let id = class.id();
    let result: Result<_, std::convert::Infallible> = cached(
        CacheKind::ImmutableFields,
        |cache| cache.immutable_fields.get(&id).cloned(),
        || Ok(Arc::from(compute())),
        |cache, fields| {
            cache.immutable_fields.insert(id, Arc::clone(fields));
        },
    );

    let Ok(fields) = result;

    fields
}

/// Forward reference `name` as seen from `owner`.
pub(crate) fn forward_ref<E>(
    owner: Option<&Class>,
    name: &str,
    compute: impl FnOnce() -> Result<Class, E>,
) -> Result<Class, E> {
    let key = (owner.map(Class::id), name.to_string());
    let store_key = key.clone();

    cached(
        CacheKind::ForwardRef,
        |cache| cache.forward_refs.get(&key).and_then(WeakClass::upgrade),
        compute,
        |cache, class| {
            cache.forward_refs.insert(store_key, class.downgrade());
        },
    )
}

/// Generic origin of `annotation`, memoised by its rendering.
#[must_use]
pub fn origin(annotation: &Annotation) -> Origin {
    let key = annotation.to_string();
    let store_key = key.clone();
    let result: Result<_, std::convert::Infallible> = cached(
        CacheKind::Origin,
        |cache| cache.origins.get(&key).copied(),
        || Ok(annotation.origin()),
        |cache, origin| {
            cache.origins.insert(store_key, *origin);
        },
    );

    let Ok(origin) = result;

    origin
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_is_memoised() {
        let annotation = Annotation::list(Annotation::Str);
        let before = stats().origin;

        assert_eq!(origin(&annotation), Origin::List);
        assert_eq!(origin(&annotation), Origin::List);

        let after = stats().origin;
        assert!(after.hits > before.hits);
    }

    #[test]
    fn mro_entries_do_not_keep_classes_alive() {
        let class = Class::builder("Cache_Probe").build().expect("class");
        let weak = class.downgrade();

        let first = mro(&class, || vec![class.clone(), Class::root()]);
        assert_eq!(first.len(), 2);
        drop(first);
        drop(class);

        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let class = Class::builder("Cache_Hit_Probe").build().expect("class");
        let before = stats().immutable_fields;

        let first = immutable_fields(&class, || vec!["a".to_string()]);
        let second = immutable_fields(&class, || vec!["never".to_string()]);

        assert_eq!(&*second, &*first);
        let after = stats().immutable_fields;
        assert!(after.hits > before.hits);
        assert!(after.misses > before.misses);
    }
}
