//! Validator and coercer.
//!
//! `check_or_coerce` is the single gate every stored value passes through:
//! field assignment, collection mutation, class defaults and method
//! parameters. `is_instance` is the non-coercing membership test.

use crate::{
    annotation::{Annotation, FieldValidator, TypeRef, ViolationKind},
    class::{Class, EnumType},
    collection::{DictType, TypedDict, TypedList, TypedSet, TypedTuple},
    config,
    error::{Error, Site},
    instance::{Instance, Kwargs},
    primitive::{PrimitiveError, PrimitiveType, ScalarKind},
    resolver,
    value::Value,
};
use std::sync::Arc;

///
/// Context
///
/// Where a check happens: the class owning the annotation (scope for
/// forward references), the site named in errors, and whether inputs may
/// be converted.
///

#[derive(Clone, Debug)]
pub struct Context<'a> {
    owner: Option<&'a Class>,
    site: Site,
    conversion: bool,
}

impl<'a> Context<'a> {
    /// Conversion follows the active config's `skip_conversion`.
    #[must_use]
    pub fn new(owner: Option<&'a Class>, site: Site) -> Self {
        Self {
            owner,
            site,
            conversion: !config::current().skip_conversion,
        }
    }

    #[must_use]
    pub fn with_site(&self, site: Site) -> Self {
        Self {
            owner: self.owner,
            site,
            conversion: self.conversion,
        }
    }

    #[must_use]
    pub const fn without_conversion(mut self) -> Self {
        self.conversion = false;
        self
    }

    #[must_use]
    pub const fn owner(&self) -> Option<&'a Class> {
        self.owner
    }

    #[must_use]
    pub const fn site(&self) -> &Site {
        &self.site
    }

    #[must_use]
    pub const fn conversion(&self) -> bool {
        self.conversion
    }
}

/// Return `value` if it satisfies `annotation`, the converted value if it
/// can be coerced, or a `TypeMismatch` (or the primitive's own range and
/// pattern errors).
pub fn check_or_coerce(annotation: &Annotation, value: Value, ctx: &Context<'_>) -> Result<Value, Error> {
    match annotation {
        Annotation::Any => Ok(value),
        Annotation::Annotated(inner, validators) => {
            let value = check_or_coerce(inner, value, ctx)?;
            run_validators(validators, &value)?;
            Ok(value)
        }
        Annotation::Optional(inner) => {
            if value.is_none() {
                Ok(value)
            } else {
                check_or_coerce(inner, value, ctx)
            }
        }
        Annotation::Union(members) => check_union(annotation, members, value, ctx),

        _ if value.is_none() => Err(mismatch(annotation, &value, ctx)),

        Annotation::NoneType => Err(mismatch(annotation, &value, ctx)),
        Annotation::Bool | Annotation::Str | Annotation::Bytes | Annotation::Decimal | Annotation::DateTime => {
            if is_instance(annotation, &value) {
                Ok(value)
            } else {
                Err(mismatch(annotation, &value, ctx))
            }
        }
        Annotation::Int => match value {
            Value::Int(_) => Ok(value),
            Value::Primitive(ref p) if p.primitive_type().scalar_kind() == ScalarKind::Int => Ok(value),
            other => Err(mismatch(annotation, &other, ctx)),
        },
        #[allow(clippy::cast_precision_loss)]
        Annotation::Float => match value {
            Value::Float(_) => Ok(value),
            Value::Int(i) => Ok(Value::Float(i as f64)),
            Value::Primitive(ref p) if p.primitive_type().scalar_kind() == ScalarKind::Float => Ok(value),
            other => Err(mismatch(annotation, &other, ctx)),
        },

        Annotation::Primitive(ty) => check_primitive(ty, value, ctx),
        Annotation::Enum(ty) => check_enum(ty, value, ctx),
        Annotation::Class(class) => check_object(class, value, ctx),
        Annotation::ForwardRef(name) => {
            let class = resolver::resolve_forward(name, ctx.owner)?;
            check_object(&class, value, ctx)
        }

        Annotation::List(element) => check_list(annotation, element, value, ctx),
        Annotation::Set(element) => check_set(annotation, element, value, ctx),
        Annotation::Dict(key, val) => check_dict(annotation, key, val, value, ctx),
        Annotation::DictSubclass(ty) => check_dict_subclass(ty, value, ctx),
        Annotation::Tuple(slots) => check_tuple(annotation, slots, value, ctx),
        Annotation::Type(target) => check_type(annotation, target, value, ctx),
    }
}

/// Non-coercing test: would `value` be stored unchanged under `annotation`?
#[must_use]
pub fn is_instance(annotation: &Annotation, value: &Value) -> bool {
    match annotation {
        Annotation::Any => true,
        Annotation::NoneType => value.is_none(),
        Annotation::Bool => matches!(value, Value::Bool(_)),
        Annotation::Int => scalar_of(value, ScalarKind::Int) || matches!(value, Value::Int(_)),
        Annotation::Float => scalar_of(value, ScalarKind::Float) || matches!(value, Value::Float(_)),
        Annotation::Str => scalar_of(value, ScalarKind::Str) || matches!(value, Value::Str(_)),
        Annotation::Bytes => matches!(value, Value::Bytes(_)),
        Annotation::Decimal => matches!(value, Value::Decimal(_)),
        Annotation::DateTime => matches!(value, Value::DateTime(_)),
        Annotation::Primitive(ty) => matches!(value, Value::Primitive(p) if p.is_a(ty)),
        Annotation::Enum(ty) => matches!(value, Value::Enum(m) if m.enum_type() == ty),
        Annotation::Class(class) => object_of(value, class),
        Annotation::ForwardRef(name) => {
            resolver::resolve_forward(name, None).is_ok_and(|class| object_of(value, &class))
        }
        Annotation::Optional(inner) => value.is_none() || is_instance(inner, value),
        Annotation::Union(members) => members.iter().any(|m| is_instance(m, value)),
        Annotation::List(element) => match value {
            Value::TypedList(list) => {
                list.element() == &**element || list.iter().all(|item| is_instance(element, item))
            }
            Value::List(items) => items.iter().all(|item| is_instance(element, item)),
            _ => false,
        },
        Annotation::Set(element) => match value {
            Value::TypedSet(set) => {
                set.element() == &**element || set.iter().all(|item| is_instance(element, item))
            }
            _ => false,
        },
        Annotation::Dict(key, val) => match value {
            Value::TypedDict(dict) => dict
                .iter()
                .all(|(k, v)| is_instance(key, k) && is_instance(val, v)),
            Value::Map(entries) => entries
                .iter()
                .all(|(k, v)| is_instance(key, k) && is_instance(val, v)),
            _ => false,
        },
        Annotation::DictSubclass(ty) => {
            matches!(value, Value::TypedDict(dict) if dict.dict_type() == Some(ty))
        }
        Annotation::Tuple(slots) => match value {
            Value::Tuple(items) => slots_match(slots, items),
            Value::TypedTuple(tuple) => slots_match(slots, tuple.as_slice()),
            _ => false,
        },
        Annotation::Type(target) => match (value, TypeRef::from_annotation(target)) {
            (Value::Type(_), None) => true,
            (Value::Type(ty), Some(target)) => ty.is_subclass_of(&target),
            _ => false,
        },
        Annotation::Annotated(inner, validators) => {
            is_instance(inner, value) && validators.iter().all(|v| v.validate(value).is_ok())
        }
    }
}

fn slots_match(slots: &[Annotation], items: &[Value]) -> bool {
    slots.len() == items.len() && slots.iter().zip(items).all(|(a, v)| is_instance(a, v))
}

fn scalar_of(value: &Value, kind: ScalarKind) -> bool {
    matches!(value, Value::Primitive(p) if p.primitive_type().scalar_kind() == kind)
}

fn object_of(value: &Value, class: &Class) -> bool {
    match value {
        Value::Object(obj) => obj.class().is_subclass_of(class),
        Value::Deferred(d) => d.class().is_subclass_of(class),
        _ => false,
    }
}

fn mismatch(annotation: &Annotation, value: &Value, ctx: &Context<'_>) -> Error {
    Error::type_mismatch(&ctx.site, annotation, value.type_name())
}

fn run_validators(validators: &[Arc<dyn FieldValidator>], value: &Value) -> Result<(), Error> {
    for validator in validators {
        if let Err(message) = validator.validate(value) {
            let type_name = validator.name().to_string();

            return Err(match validator.violation() {
                ViolationKind::Range => Error::ValueOutOfRange { type_name, message },
                ViolationKind::Pattern => Error::ValuePatternViolation { type_name, message },
            });
        }
    }

    Ok(())
}

// Exact members are tried before any member is allowed to convert, so
// `Union[Safe_Id, str]` keeps a plain string as a string.
fn check_union(
    annotation: &Annotation,
    members: &[Annotation],
    value: Value,
    ctx: &Context<'_>,
) -> Result<Value, Error> {
    if members.iter().any(|m| is_instance(m, &value)) {
        return Ok(value);
    }
    for member in members {
        if let Ok(converted) = check_or_coerce(member, value.clone(), ctx) {
            return Ok(converted);
        }
    }

    Err(mismatch(annotation, &value, ctx))
}

fn check_primitive(ty: &PrimitiveType, value: Value, ctx: &Context<'_>) -> Result<Value, Error> {
    if matches!(&value, Value::Primitive(p) if p.is_a(ty)) {
        return Ok(value);
    }
    if !ctx.conversion {
        return Err(mismatch(&Annotation::Primitive(ty.clone()), &value, ctx));
    }

    let actual = value.type_name().to_string();
    let input = match value {
        Value::Primitive(p) => p.to_plain(),
        v @ (Value::Str(_) | Value::Int(_) | Value::Float(_) | Value::Bool(_)) => v,
        other => return Err(mismatch(&Annotation::Primitive(ty.clone()), &other, ctx)),
    };

    ty.construct(input)
        .map(Value::Primitive)
        .map_err(|err| primitive_failure(err, &actual, ctx))
}

/// Map a primitive's rejection onto `Error`, attaching the site and the
/// runtime type of the rejected input.
pub(crate) fn primitive_failure(err: PrimitiveError, actual: &str, ctx: &Context<'_>) -> Error {
    match Error::from(err) {
        Error::TypeMismatch {
            expected, message, ..
        } => Error::TypeMismatch {
            site: ctx.site.clone(),
            expected,
            actual: actual.to_string(),
            message,
        },
        other => other,
    }
}

fn check_enum(ty: &EnumType, value: Value, ctx: &Context<'_>) -> Result<Value, Error> {
    if matches!(&value, Value::Enum(m) if m.enum_type() == ty) {
        return Ok(value);
    }
    if ctx.conversion
        && !matches!(value, Value::Enum(_))
        && let Some(member) = ty.lookup(&value)
    {
        return Ok(Value::Enum(member));
    }

    Err(Error::type_mismatch_with(
        &ctx.site,
        ty.name(),
        value.type_name(),
        format!("Invalid value '{value}' for enum {}", ty.name()),
    ))
}

// A mapping supplied for a class-typed slot is built into an instance.
fn check_object(class: &Class, value: Value, ctx: &Context<'_>) -> Result<Value, Error> {
    match value {
        Value::Object(ref obj) if obj.class().is_subclass_of(class) => Ok(value),
        Value::Deferred(ref d) if d.class().is_subclass_of(class) => Ok(value),
        Value::Map(entries) if ctx.conversion => {
            let kwargs = Kwargs::from_entries(entries).map_err(|found| {
                Error::type_mismatch(&ctx.site, class.name(), found.type_name())
            })?;

            Instance::with_kwargs(class, kwargs).map(Value::Object)
        }
        other => Err(mismatch(&Annotation::Class(class.clone()), &other, ctx)),
    }
}

fn element_annotation(annotation: &Annotation, ctx: &Context<'_>) -> Annotation {
    resolver::resolve_annotation(annotation, ctx.owner).unwrap_or_else(|_| annotation.clone())
}

fn check_list(
    annotation: &Annotation,
    element: &Annotation,
    value: Value,
    ctx: &Context<'_>,
) -> Result<Value, Error> {
    let element = element_annotation(element, ctx);

    match value {
        Value::TypedList(list) if list.element() == &element => Ok(Value::TypedList(list)),
        Value::TypedList(list) => TypedList::from_items(element, list).map(Value::TypedList),
        Value::List(items) => TypedList::from_items(element, items).map(Value::TypedList),
        other => Err(mismatch(annotation, &other, ctx)),
    }
}

fn check_set(
    annotation: &Annotation,
    element: &Annotation,
    value: Value,
    ctx: &Context<'_>,
) -> Result<Value, Error> {
    let element = element_annotation(element, ctx);

    match value {
        Value::TypedSet(set) if set.element() == &element => Ok(Value::TypedSet(set)),
        Value::TypedSet(set) => TypedSet::from_items(element, set).map(Value::TypedSet),
        Value::TypedList(list) => TypedSet::from_items(element, list).map(Value::TypedSet),
        Value::List(items) | Value::Tuple(items) => {
            TypedSet::from_items(element, items).map(Value::TypedSet)
        }
        other => Err(mismatch(annotation, &other, ctx)),
    }
}

fn check_dict(
    annotation: &Annotation,
    key: &Annotation,
    val: &Annotation,
    value: Value,
    ctx: &Context<'_>,
) -> Result<Value, Error> {
    let key = element_annotation(key, ctx);
    let val = element_annotation(val, ctx);

    match value {
        Value::TypedDict(dict) if dict.key() == &key && dict.value() == &val => {
            Ok(Value::TypedDict(dict))
        }
        Value::TypedDict(dict) => TypedDict::from_entries(key, val, dict).map(Value::TypedDict),
        Value::Map(entries) => TypedDict::from_entries(key, val, entries).map(Value::TypedDict),
        other => Err(mismatch(annotation, &other, ctx)),
    }
}

// The declared specialisation is always the runtime type: a compatible
// generic dict or a plain mapping is rebuilt as `ty`.
fn check_dict_subclass(ty: &DictType, value: Value, ctx: &Context<'_>) -> Result<Value, Error> {
    match value {
        Value::TypedDict(dict) if dict.dict_type() == Some(ty) => Ok(Value::TypedDict(dict)),
        Value::TypedDict(dict) => TypedDict::from_type_entries(ty, dict).map(Value::TypedDict),
        Value::Map(entries) => TypedDict::from_type_entries(ty, entries).map(Value::TypedDict),
        other => Err(mismatch(&Annotation::DictSubclass(ty.clone()), &other, ctx)),
    }
}

fn check_tuple(
    annotation: &Annotation,
    slots: &[Annotation],
    value: Value,
    ctx: &Context<'_>,
) -> Result<Value, Error> {
    let slots: Vec<Annotation> = slots.iter().map(|s| element_annotation(s, ctx)).collect();

    match value {
        Value::TypedTuple(tuple) if tuple.slots() == slots.as_slice() => Ok(Value::TypedTuple(tuple)),
        Value::TypedTuple(tuple) => TypedTuple::new(slots, tuple.into_vec()).map(Value::TypedTuple),
        Value::Tuple(items) => TypedTuple::new(slots, items).map(Value::TypedTuple),
        other => Err(mismatch(annotation, &other, ctx)),
    }
}

fn check_type(
    annotation: &Annotation,
    target: &Annotation,
    value: Value,
    ctx: &Context<'_>,
) -> Result<Value, Error> {
    let Value::Type(ty) = &value else {
        return Err(mismatch(annotation, &value, ctx));
    };

    let target = match target {
        Annotation::ForwardRef(name) => Some(resolver::resolve_forward(name, ctx.owner)?.type_ref()),
        other => TypeRef::from_annotation(other),
    };
    match target {
        Some(target) if !ty.is_subclass_of(&target) => Err(Error::type_mismatch_with(
            &ctx.site,
            annotation,
            ty.name(),
            format!(
                "Invalid type for {}. Expected '{annotation}' but got '{}', which is not a subclass of {}",
                ctx.site,
                ty.qualified_name(),
                target.qualified_name()
            ),
        )),
        _ => Ok(value),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Config, with_config},
        error::ErrorKind,
        test_support::{safe_id, safe_str, status_enum},
    };

    fn field(name: &str) -> Context<'static> {
        Context::new(None, Site::field(name))
    }

    #[test]
    fn bool_is_never_an_int() {
        let err = check_or_coerce(&Annotation::Int, true.into(), &field("age")).expect_err("bool");

        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(
            err.to_string(),
            "Invalid type for attribute 'age'. Expected 'int' but got 'bool'"
        );
    }

    #[test]
    fn int_widens_into_float() {
        let value = check_or_coerce(&Annotation::Float, 3.into(), &field("ratio")).expect("widen");

        assert!(matches!(value, Value::Float(x) if x == 3.0));
    }

    #[test]
    fn none_needs_an_optional_annotation() {
        let ctx = field("name");

        assert!(check_or_coerce(&Annotation::Str, Value::None, &ctx).is_err());
        assert!(
            check_or_coerce(&Annotation::optional(Annotation::Str), Value::None, &ctx)
                .expect("optional")
                .is_none()
        );
    }

    #[test]
    fn strings_convert_into_primitives_unless_conversion_is_off() {
        let ann = Annotation::Primitive(safe_id());

        let value = check_or_coerce(&ann, "abc".into(), &field("id")).expect("convert");
        assert!(matches!(&value, Value::Primitive(p) if p.is_a(&safe_id())));

        let err = with_config(
            Config {
                skip_conversion: true,
                ..Config::default()
            },
            || check_or_coerce(&ann, "abc".into(), &field("id")),
        )
        .expect_err("no conversion");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn primitive_satisfies_its_base_scalar() {
        let value = Value::Primitive(safe_str().construct("x".into()).expect("safe str"));

        assert!(is_instance(&Annotation::Str, &value));
        assert!(!is_instance(&Annotation::Int, &value));
    }

    #[test]
    fn enum_accepts_member_name_or_value() {
        let status = status_enum();
        let ann = Annotation::Enum(status.clone());

        let by_name = check_or_coerce(&ann, "ACTIVE".into(), &field("kind")).expect("name");
        let by_value = check_or_coerce(&ann, "active".into(), &field("kind")).expect("value");
        assert_eq!(by_name, by_value);

        let err = check_or_coerce(&ann, "bogus".into(), &field("kind")).expect_err("bogus");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.to_string(), "Invalid value 'bogus' for enum Status");
    }

    #[test]
    fn union_prefers_exact_members() {
        let ann = Annotation::union(vec![Annotation::Primitive(safe_id()), Annotation::Str]);

        let value = check_or_coerce(&ann, "abc".into(), &field("id")).expect("union");
        assert!(matches!(value, Value::Str(_)));

        let err = check_or_coerce(&ann, Value::List(vec![]), &field("id")).expect_err("list");
        assert!(err.to_string().contains("Union[Safe_Id, str]"));
    }

    #[test]
    fn plain_list_becomes_typed_list() {
        let ann = Annotation::list(Annotation::Primitive(safe_id()));
        let value = check_or_coerce(&ann, vec![Value::from("a"), Value::from("b")].into(), &field("ids"))
            .expect("list");

        let Value::TypedList(list) = value else {
            panic!("expected typed list");
        };
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|v| matches!(v, Value::Primitive(_))));
    }

    #[test]
    fn tuple_arity_is_checked() {
        let ann = Annotation::tuple(vec![Annotation::Int, Annotation::Str]);

        assert!(check_or_coerce(&ann, Value::Tuple(vec![1.into(), "a".into()]), &field("t")).is_ok());
        assert!(check_or_coerce(&ann, Value::Tuple(vec![1.into()]), &field("t")).is_err());
    }

    #[test]
    fn type_annotation_requires_subclass() {
        let base = Class::builder("Validate_Base").build().expect("base");
        let child = Class::builder("Validate_Child").base(&base).build().expect("child");
        let other = Class::builder("Validate_Other").build().expect("other");
        let ann = Annotation::type_of(&base);

        assert!(check_or_coerce(&ann, Value::Type(child.type_ref()), &field("kind")).is_ok());
        let err = check_or_coerce(&ann, Value::Type(other.type_ref()), &field("kind"))
            .expect_err("unrelated");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    struct Positive;

    impl FieldValidator for Positive {
        fn name(&self) -> &str {
            "Positive"
        }

        fn validate(&self, value: &Value) -> Result<(), String> {
            match value.as_int() {
                Some(i) if i > 0 => Ok(()),
                _ => Err(format!("{value} must be positive")),
            }
        }
    }

    #[test]
    fn annotated_runs_validators_after_the_inner_check() {
        let ann = Annotation::annotated(Annotation::Int, vec![Arc::new(Positive)]);

        assert!(check_or_coerce(&ann, 3.into(), &field("n")).is_ok());
        let err = check_or_coerce(&ann, (-3).into(), &field("n")).expect_err("negative");
        assert_eq!(err.kind(), ErrorKind::ValueOutOfRange);
        assert_eq!(err.to_string(), "-3 must be positive");
    }
}
