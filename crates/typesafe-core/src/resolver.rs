//! Annotation resolver: ancestry, merged field tables, class-level defaults
//! and string forward references.

use crate::{
    annotation::{Annotation, TypeRef},
    cache,
    class::{Class, ClassId, FieldDef, MemberKind, check_default},
    collection::{TypedDict, TypedList, TypedSet, TypedTuple},
    config,
    error::Error,
    instance::{Deferred, Instance},
    registry,
    value::Value,
};
use rust_decimal::Decimal;
use std::{cell::RefCell, sync::Arc};

thread_local! {
    // Classes whose default instance is being built on this thread.
    static BUILDING: RefCell<Vec<ClassId>> = const { RefCell::new(Vec::new()) };
}

///
/// ClassDescriptor
///
/// Everything derived from a class and its ancestry that instances need:
/// the merged field table and the user-facing class variables.
///

#[derive(Debug)]
pub struct ClassDescriptor {
    class_name: String,
    fields: Vec<FieldDescriptor>,
    class_vars: Vec<(String, Value)>,
}

///
/// FieldDescriptor
///

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub annotation: Annotation,
    /// Explicit class-level default from the nearest class that sets one.
    pub default: Option<Value>,
    /// Class whose annotation won the merge.
    pub declared_in: String,
}

impl ClassDescriptor {
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Merged fields, base classes first.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.field(name).map(|f| &f.annotation)
    }

    /// Annotation-less class variables, most-derived value wins.
    #[must_use]
    pub fn class_vars(&self) -> &[(String, Value)] {
        &self.class_vars
    }

    /// Declared field or class variable.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.field(name).is_some() || self.class_vars.iter().any(|(n, _)| n == name)
    }
}

/// Depth-first, left-to-right ancestry with duplicates removed (last
/// occurrence kept), so shared bases come after every class deriving them.
#[must_use]
pub fn mro(class: &Class) -> Vec<Class> {
    cache::mro(class, || {
        let mut walk = Vec::new();
        depth_first(class, &mut walk);

        let mut out: Vec<Class> = Vec::with_capacity(walk.len());
        for (i, c) in walk.iter().enumerate() {
            if !walk[i + 1..].contains(c) {
                out.push(c.clone());
            }
        }

        out
    })
}

fn depth_first(class: &Class, out: &mut Vec<Class>) {
    out.push(class.clone());
    for base in class.bases() {
        depth_first(base, out);
    }
}

/// Merged descriptor for `class`, built once and cached.
pub fn descriptor(class: &Class) -> Result<Arc<ClassDescriptor>, Error> {
    cache::descriptor(class, || {
        tracing::debug!(class = %class.qualified_name(), "building class descriptor");
        build_descriptor(class).map(Arc::new)
    })
}

fn build_descriptor(class: &Class) -> Result<ClassDescriptor, Error> {
    let ancestry = mro(class);
    let ancestry: Vec<&Class> = ancestry.iter().filter(|c| !c.is_root()).collect();

    let mut fields: Vec<FieldDescriptor> = Vec::new();
    for cls in ancestry.iter().rev() {
        for own in cls.own_fields() {
            match fields.iter_mut().find(|f| f.name == own.name) {
                Some(existing) => {
                    existing.annotation = own.annotation.clone();
                    existing.declared_in = cls.name().to_string();
                }
                None => fields.push(FieldDescriptor {
                    name: own.name.clone(),
                    annotation: own.annotation.clone(),
                    default: None,
                    declared_in: cls.name().to_string(),
                }),
            }
        }
    }

    for field in &mut fields {
        field.default = explicit_default(class, &ancestry, field)?;
    }

    let is_member = |name: &str| {
        ancestry
            .iter()
            .any(|c| c.own_members().iter().any(|(n, _)| n == name))
    };
    let mut class_vars: Vec<(String, Value)> = Vec::new();
    for cls in &ancestry {
        for (name, value) in cls.own_class_vars() {
            let skip = name.starts_with("__")
                || is_member(name)
                || fields.iter().any(|f| &f.name == name)
                || class_vars.iter().any(|(n, _)| n == name);
            if !skip {
                class_vars.push((name.clone(), value.clone()));
            }
        }
    }

    Ok(ClassDescriptor {
        class_name: class.name().to_string(),
        fields,
        class_vars,
    })
}

// The nearest class that sets a value for the field wins, whether it set
// it with an annotation or as a bare class variable. Bare overrides are
// checked against the merged annotation.
fn explicit_default(
    class: &Class,
    ancestry: &[&Class],
    field: &FieldDescriptor,
) -> Result<Option<Value>, Error> {
    for cls in ancestry {
        if let Some(own) = cls.own_fields().iter().find(|f| f.name == field.name)
            && let Some(default) = &own.default
        {
            return Ok(Some(default.clone()));
        }
        if let Some((_, value)) = cls.own_class_vars().iter().find(|(n, _)| *n == field.name) {
            let def = FieldDef {
                name: field.name.clone(),
                annotation: field.annotation.clone(),
                default: None,
            };
            return check_default(class.name(), &def, value.clone()).map(Some);
        }
    }

    Ok(None)
}

/// Names of fields whose annotation only admits immutable values.
pub fn immutable_fields(class: &Class) -> Result<Arc<[String]>, Error> {
    let descriptor = descriptor(class)?;

    Ok(cache::immutable_fields(class, || {
        descriptor
            .fields()
            .iter()
            .filter(|f| f.annotation.is_immutable())
            .map(|f| f.name.clone())
            .collect()
    }))
}

/// Starting values for a new instance: every field (explicit default or
/// the default-value policy) followed by the class variables.
///
/// Under `skip_mro_walk` the cached descriptor is read directly; otherwise
/// the ancestry is walked leaf to root and the first class to provide a
/// value for a name wins.
pub fn class_kwargs(class: &Class) -> Result<Vec<(String, Value)>, Error> {
    let descriptor = descriptor(class)?;

    if config::current().skip_mro_walk {
        return kwargs_from_descriptor(class, &descriptor);
    }

    let mut found: Vec<(String, Option<Value>)> = Vec::new();
    for cls in mro(class).iter().filter(|c| !c.is_root()) {
        for (name, value) in cls.own_class_vars() {
            if !name.starts_with("__") && !found.iter().any(|(n, _)| n == name) {
                found.push((name.clone(), Some(value.clone())));
            }
        }
        for own in cls.own_fields() {
            if !found.iter().any(|(n, _)| *n == own.name) {
                found.push((own.name.clone(), own.default.clone()));
            }
        }
    }

    let mut kwargs = Vec::with_capacity(found.len());
    for field in descriptor.fields() {
        let explicit = found
            .iter()
            .find(|(n, _)| *n == field.name)
            .and_then(|(_, v)| v.as_ref())
            .and(field.default.clone());
        let value = match explicit {
            Some(value) => value,
            None => default_value(&field.annotation, class)?,
        };
        kwargs.push((field.name.clone(), value));
    }
    kwargs.extend(descriptor.class_vars().iter().cloned());

    Ok(kwargs)
}

fn kwargs_from_descriptor(
    class: &Class,
    descriptor: &ClassDescriptor,
) -> Result<Vec<(String, Value)>, Error> {
    let mut kwargs = Vec::with_capacity(descriptor.fields().len());
    for field in descriptor.fields() {
        let value = match &field.default {
            Some(value) => value.clone(),
            None => default_value(&field.annotation, class)?,
        };
        kwargs.push((field.name.clone(), value));
    }
    kwargs.extend(descriptor.class_vars().iter().cloned());

    Ok(kwargs)
}

/// Value an unassigned field starts with.
pub fn default_value(annotation: &Annotation, owner: &Class) -> Result<Value, Error> {
    let value = match annotation {
        Annotation::Any
        | Annotation::NoneType
        | Annotation::Enum(_)
        | Annotation::Optional(_)
        | Annotation::Union(_)
        | Annotation::DateTime => Value::None,
        Annotation::Bool => Value::Bool(false),
        Annotation::Int => Value::Int(0),
        Annotation::Float => Value::Float(0.0),
        Annotation::Str => Value::Str(String::new()),
        Annotation::Bytes => Value::Bytes(Vec::new()),
        Annotation::Decimal => Value::Decimal(Decimal::ZERO),

        // A primitive whose empty value is refused starts unset.
        Annotation::Primitive(ty) => ty.default_value().map_or(Value::None, Value::Primitive),

        Annotation::Class(class) => nested_default(class, owner)?,
        Annotation::ForwardRef(name) => match resolve_forward(name, Some(owner)) {
            Ok(class) => nested_default(&class, owner)?,
            Err(_) => Value::None,
        },

        Annotation::List(element) => {
            Value::TypedList(TypedList::new(resolve_or_keep(element, owner)))
        }
        Annotation::Set(element) => Value::TypedSet(TypedSet::new(resolve_or_keep(element, owner))),
        Annotation::Dict(key, value) => Value::TypedDict(TypedDict::new(
            resolve_or_keep(key, owner),
            resolve_or_keep(value, owner),
        )),
        Annotation::DictSubclass(ty) => Value::TypedDict(TypedDict::with_type(ty)),
        Annotation::Tuple(slots) => {
            let items = slots
                .iter()
                .map(|slot| default_value(slot, owner))
                .collect::<Result<Vec<_>, _>>()?;
            let slots = slots.iter().map(|s| resolve_or_keep(s, owner)).collect();
            Value::TypedTuple(TypedTuple::from_parts(slots, items))
        }

        Annotation::Type(target) => type_default(target, owner),
        Annotation::Annotated(inner, _) => default_value(inner, owner)?,
    };

    Ok(value)
}

// `Type[T]` defaults to `T`; a forward reference naming an ancestor
// defaults to the owner itself.
fn type_default(target: &Annotation, owner: &Class) -> Value {
    if let Annotation::ForwardRef(name) = target {
        if mro(owner).iter().any(|c| c.name() == name) {
            return Value::Type(TypeRef::Class(owner.clone()));
        }
        return resolve_forward(name, Some(owner))
            .map_or(Value::None, |class| Value::Type(TypeRef::Class(class)));
    }

    TypeRef::from_annotation(target).map_or(Value::None, Value::Type)
}

// A field typed as its own class (directly or through a cycle) starts as
// `None`; otherwise a fresh child is built, or deferred under
// `on_demand_nested`.
fn nested_default(class: &Class, owner: &Class) -> Result<Value, Error> {
    if class == owner || BUILDING.with(|b| b.borrow().contains(&class.id())) {
        return Ok(Value::None);
    }
    if config::current().on_demand_nested {
        return Ok(Value::Deferred(Deferred::new(class)));
    }

    let _guard = BuildingGuard::enter(owner.id());

    Instance::new(class).map(Value::Object)
}

struct BuildingGuard;

impl BuildingGuard {
    fn enter(id: ClassId) -> Self {
        BUILDING.with(|b| b.borrow_mut().push(id));
        Self
    }
}

impl Drop for BuildingGuard {
    fn drop(&mut self) {
        BUILDING.with(|b| {
            b.borrow_mut().pop();
        });
    }
}

/// Resolve a string forward reference: the owner and its ancestors first,
/// then the class registry (preferring the owner's module).
pub fn resolve_forward(name: &str, owner: Option<&Class>) -> Result<Class, Error> {
    cache::forward_ref(owner, name, || {
        tracing::debug!(name, owner = owner.map(Class::name), "resolving forward reference");

        if let Some(owner) = owner
            && let Some(found) = mro(owner).into_iter().find(|c| c.name() == name)
        {
            return Ok(found);
        }

        registry::find_class(name, owner.map(Class::module)).ok_or_else(|| {
            Error::ForwardRefUnresolved {
                name: name.to_string(),
                scope: owner.map_or_else(|| "<global>".to_string(), Class::qualified_name),
            }
        })
    })
}

/// Replace every forward reference inside `annotation` with its class.
pub fn resolve_annotation(annotation: &Annotation, owner: Option<&Class>) -> Result<Annotation, Error> {
    if !annotation.has_forward_ref() {
        return Ok(annotation.clone());
    }

    let each = |items: &[Annotation]| {
        items
            .iter()
            .map(|a| resolve_annotation(a, owner))
            .collect::<Result<Vec<_>, _>>()
    };

    Ok(match annotation {
        Annotation::ForwardRef(name) => Annotation::Class(resolve_forward(name, owner)?),
        Annotation::Optional(inner) => Annotation::optional(resolve_annotation(inner, owner)?),
        Annotation::List(inner) => Annotation::list(resolve_annotation(inner, owner)?),
        Annotation::Set(inner) => Annotation::set(resolve_annotation(inner, owner)?),
        Annotation::Type(inner) => Annotation::type_of(resolve_annotation(inner, owner)?),
        Annotation::Dict(k, v) => {
            Annotation::dict(resolve_annotation(k, owner)?, resolve_annotation(v, owner)?)
        }
        Annotation::Union(members) => Annotation::Union(each(members)?),
        Annotation::Tuple(slots) => Annotation::Tuple(each(slots)?),
        Annotation::Annotated(inner, validators) => {
            Annotation::Annotated(Box::new(resolve_annotation(inner, owner)?), validators.clone())
        }
        other => other.clone(),
    })
}

// Element annotations of default collections resolve against the owner
// when possible; an unresolved name is retried when items arrive.
fn resolve_or_keep(annotation: &Annotation, owner: &Class) -> Annotation {
    resolve_annotation(annotation, Some(owner)).unwrap_or_else(|_| annotation.clone())
}

/// True when the class declares `name` as a method-like member.
#[must_use]
pub fn member_kind(class: &Class, name: &str) -> Option<MemberKind> {
    mro(class).iter().find_map(|c| {
        c.own_members()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kind)| *kind)
    })
}

///
/// TESTS
///
