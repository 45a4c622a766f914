//! Typed collections: containers that carry their element annotations and
//! check every incoming item before they change.

mod dict;
mod list;
mod set;
mod tuple;

pub use dict::{DictType, DictTypeBuilder, TypedDict};
pub use list::TypedList;
pub use set::TypedSet;
pub use tuple::TypedTuple;

use crate::{
    annotation::Annotation,
    config,
    error::{Error, Site},
    validate::{self, Context},
    value::Value,
};

pub(crate) const LIST_LABEL: &str = "Type_Safe__List";
pub(crate) const DICT_LABEL: &str = "Type_Safe__Dict";
pub(crate) const SET_LABEL: &str = "Type_Safe__Set";
pub(crate) const TUPLE_LABEL: &str = "Type_Safe__Tuple";

///
/// Role
///
/// Which side of a collection entry is being checked.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Role {
    Item,
    Key,
    Value,
}

impl Role {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Key => "key",
            Self::Value => "value",
        }
    }
}

/// Check (and convert) one incoming element. Under `fast_collections` or
/// `skip_validation` the raw item is stored.
pub(crate) fn check_item(
    label: &str,
    role: Role,
    annotation: &Annotation,
    item: Value,
    site: Site,
) -> Result<Value, Error> {
    let config = config::current();
    if config.fast_collections || config.skip_validation {
        return Ok(item);
    }

    let ctx = Context::new(None, site);
    let actual = item.type_name().to_string();

    validate::check_or_coerce(annotation, item, &ctx).map_err(|err| {
        let expected = annotation.to_string();
        match (annotation.unwrap_annotated(), err) {
            (Annotation::Primitive(ty), err) if !matches!(annotation, Annotation::Annotated(..)) => {
                Error::type_mismatch_with(
                    ctx.site(),
                    &expected,
                    &actual,
                    format!("In {label}: Could not convert {actual} to {}: {err}", ty.name()),
                )
            }
            (_, Error::TypeMismatch { expected, actual, .. }) => Error::type_mismatch_with(
                ctx.site(),
                &expected,
                &actual,
                format!(
                    "In {label}: Invalid type for {}: Expected '{expected}', but got '{actual}'",
                    role.as_str()
                ),
            ),
            (_, other) => other,
        }
    })
}

/// Check a batch up front so a failing item leaves the collection untouched.
pub(crate) fn check_all(
    label: &str,
    annotation: &Annotation,
    items: impl IntoIterator<Item = Value>,
    first_index: usize,
) -> Result<Vec<Value>, Error> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| check_item(label, Role::Item, annotation, item, Site::Index(first_index + i)))
        .collect()
}

/// Membership with the element's own conversions: a primitive element
/// also matches the converted candidate, an enum element matches member
/// names and values. `has` is the container's own exact-match lookup.
pub(crate) fn contains_converted(
    element: &Annotation,
    has: impl Fn(&Value) -> bool,
    candidate: &Value,
) -> bool {
    if has(candidate) {
        return true;
    }

    match element.unwrap_annotated() {
        Annotation::Primitive(ty) => {
            let input = match candidate {
                Value::Primitive(p) => p.to_plain(),
                other => other.clone(),
            };
            ty.construct(input).is_ok_and(|p| has(&Value::Primitive(p)))
        }
        Annotation::Enum(ty) if matches!(candidate, Value::Str(_)) => ty
            .lookup(candidate)
            .is_some_and(|member| has(&Value::Enum(member))),
        _ => false,
    }
}
