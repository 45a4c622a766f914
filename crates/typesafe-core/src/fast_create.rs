//! Schema-driven construction.
//!
//! The first construction of a class builds one template instance the
//! normal way and classifies each slot. Later constructions copy static
//! values, call factories for mutable ones, and recurse into nested
//! classes; no validator runs. Keyword arguments are stored unchecked.
//!
//! A nested class already being created further up the same chain starts
//! as `None`, as it does on the normal path.

use crate::{
    class::{Class, ClassId},
    config::{self, Config},
    error::Error,
    instance::{Instance, Kwargs, init},
    resolver::{self, ClassDescriptor},
    value::Value,
};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, LazyLock, RwLock},
};

static CACHE: LazyLock<FastCreateCache> = LazyLock::new(FastCreateCache::default);

thread_local! {
    // Classes whose schema is being generated on this thread.
    static GENERATING: RefCell<HashSet<ClassId>> = RefCell::new(HashSet::new());
}

/// The process-wide schema cache.
#[must_use]
pub fn cache() -> &'static FastCreateCache {
    &CACHE
}

///
/// Factory
///
/// Produces a fresh value for a mutable slot, keeping element annotations
/// and dict specialisation.
///

#[derive(Clone)]
pub struct Factory(Arc<dyn Fn() -> Value + Send + Sync>);

impl Factory {
    pub fn new(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    #[must_use]
    pub fn produce(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory")
    }
}

///
/// FieldMode
///

#[derive(Clone, Debug)]
pub enum FieldMode {
    /// Immutable; every instance gets a copy of this value.
    Static(Value),
    /// Mutable; built fresh per instance.
    Factory(Factory),
    /// A nested Type-Safe object, itself fast-created per instance.
    Nested(Class),
}

///
/// FieldSchema
///

#[derive(Clone, Debug)]
pub struct FieldSchema {
    pub name: String,
    pub mode: FieldMode,
}

///
/// ClassSchema
///

#[derive(Debug)]
pub struct ClassSchema {
    class: Class,
    descriptor: Arc<ClassDescriptor>,
    fields: Vec<FieldSchema>,
}

impl ClassSchema {
    #[must_use]
    pub const fn class(&self) -> &Class {
        &self.class
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn static_count(&self) -> usize {
        self.count(|mode| matches!(mode, FieldMode::Static(_)))
    }

    #[must_use]
    pub fn factory_count(&self) -> usize {
        self.count(|mode| matches!(mode, FieldMode::Factory(_)))
    }

    #[must_use]
    pub fn nested_count(&self) -> usize {
        self.count(|mode| matches!(mode, FieldMode::Nested(_)))
    }

    fn count(&self, pred: impl Fn(&FieldMode) -> bool) -> usize {
        self.fields.iter().filter(|f| pred(&f.mode)).count()
    }
}

///
/// FastCreateCache
///

#[derive(Default)]
pub struct FastCreateCache {
    schemas: RwLock<HashMap<ClassId, Arc<ClassSchema>>>,
}

impl FastCreateCache {
    /// The schema for `class`, generated on first use. Every caller gets
    /// the same `Arc`.
    pub fn get_schema(&self, class: &Class) -> Result<Arc<ClassSchema>, Error> {
        if let Some(schema) = self.read().get(&class.id()) {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(generate(class)?);

        Ok(Arc::clone(self.write().entry(class.id()).or_insert(schema)))
    }

    /// Generate schemas for `class` and every class nested inside it.
    pub fn warm_cache(&self, class: &Class) -> Result<(), Error> {
        let mut seen = HashSet::new();

        self.warm(class, &mut seen)
    }

    fn warm(&self, class: &Class, seen: &mut HashSet<ClassId>) -> Result<(), Error> {
        if !seen.insert(class.id()) {
            return Ok(());
        }

        let schema = self.get_schema(class)?;
        for field in schema.fields() {
            if let FieldMode::Nested(nested) = &field.mode {
                self.warm(nested, seen)?;
            }
        }

        Ok(())
    }

    pub fn clear_cache(&self) {
        self.write().clear();
    }

    /// Whether this thread is generating the schema for `class` right now.
    #[must_use]
    pub fn is_generating(&self, class: &Class) -> bool {
        GENERATING.with(|g| g.borrow().contains(&class.id()))
    }

    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.read().len()
    }

    /// Build an instance from the schema. A class whose schema is being
    /// generated on this thread falls back to the normal path.
    pub fn create(&self, class: &Class, kwargs: Kwargs) -> Result<Instance, Error> {
        self.create_in(class, kwargs, &mut Vec::new())
    }

    // `chain` holds the classes being created above this one.
    fn create_in(&self, class: &Class, kwargs: Kwargs, chain: &mut Vec<ClassId>) -> Result<Instance, Error> {
        if self.is_generating(class) {
            return init::initialize(class, kwargs);
        }

        let schema = self.get_schema(class)?;
        chain.push(class.id());
        let slots = self.fill_slots(&schema, chain);
        chain.pop();
        let slots = slots?;

        let mut instance = Instance::from_parts(class.clone(), Arc::clone(&schema.descriptor), slots);
        for (name, value) in kwargs {
            if !schema.descriptor.has_attribute(&name) {
                return Err(init::unknown_kwarg(class, &name, &value));
            }
            if !value.is_none() {
                instance.store(&name, value);
            }
        }

        Ok(instance)
    }

    fn fill_slots(
        &self,
        schema: &ClassSchema,
        chain: &mut Vec<ClassId>,
    ) -> Result<Vec<(String, Value)>, Error> {
        let mut slots = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let value = match &field.mode {
                FieldMode::Static(value) => value.clone(),
                FieldMode::Factory(factory) => factory.produce(),
                FieldMode::Nested(nested) if chain.contains(&nested.id()) => Value::None,
                FieldMode::Nested(nested) => {
                    Value::Object(self.create_in(nested, Kwargs::new(), chain)?)
                }
            };
            slots.push((field.name.clone(), value));
        }

        Ok(slots)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ClassId, Arc<ClassSchema>>> {
        self.schemas
            .read()
            .expect("schema cache RwLock poisoned while acquiring read lock")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ClassId, Arc<ClassSchema>>> {
        self.schemas
            .write()
            .expect("schema cache RwLock poisoned while acquiring write lock")
    }
}

fn generate(class: &Class) -> Result<ClassSchema, Error> {
    tracing::debug!(class = %class.qualified_name(), "generating construction schema");

    let _guard = GeneratingGuard::enter(class.id());
    let template = config::with_config(
        Config {
            fast_create: false,
            ..config::current()
        },
        || init::initialize(class, Kwargs::new()),
    )?;

    let descriptor = resolver::descriptor(class)?;
    let fields = template
        .slots()
        .map(|(name, value)| {
            let policy_default = descriptor.field(name).is_some_and(|f| f.default.is_none());
            FieldSchema {
                name: name.to_string(),
                mode: if policy_default { classify(value) } else { keep(value) },
            }
        })
        .collect();

    Ok(ClassSchema {
        class: class.clone(),
        descriptor,
        fields,
    })
}

// Explicit defaults and class variables: every instance starts from the
// same value.
fn keep(value: &Value) -> FieldMode {
    if value.is_mutable() {
        let template = value.clone();
        FieldMode::Factory(Factory::new(move || template.clone()))
    } else {
        FieldMode::Static(value.clone())
    }
}

// Defaults produced by the default-value policy.
fn classify(value: &Value) -> FieldMode {
    match value {
        Value::Object(obj) => FieldMode::Nested(obj.class().clone()),
        Value::Deferred(deferred) => FieldMode::Nested(deferred.class().clone()),

        // auto-generated primitives need a fresh value per instance
        Value::Primitive(p) if p.primitive_type().has_generator() => {
            let ty = p.primitive_type().clone();
            let fallback = value.clone();
            FieldMode::Factory(Factory::new(move || {
                ty.default_value().map_or_else(|_| fallback.clone(), Value::Primitive)
            }))
        }
        v => keep(v),
    }
}

struct GeneratingGuard(ClassId);

impl GeneratingGuard {
    fn enter(id: ClassId) -> Self {
        GENERATING.with(|g| g.borrow_mut().insert(id));
        Self(id)
    }
}

impl Drop for GeneratingGuard {
    fn drop(&mut self) {
        GENERATING.with(|g| g.borrow_mut().remove(&self.0));
    }
}

///
/// TESTS
///
