mod type_ref;

pub use type_ref::{Builtin, TypeRef};

use crate::{
    class::{Class, EnumType},
    collection::DictType,
    primitive::PrimitiveType,
    value::Value,
};
use std::{fmt, sync::Arc};

///
/// FieldValidator
///
/// Extra check attached to a field through `Annotation::Annotated`.
/// Runs after the inner annotation accepted (and possibly coerced) the value.
///

pub trait FieldValidator: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self, value: &Value) -> Result<(), String>;

    fn violation(&self) -> ViolationKind {
        ViolationKind::Range
    }
}

///
/// ViolationKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViolationKind {
    Range,
    Pattern,
}

///
/// Origin
///
/// Generic origin of an annotation; `Optional` reports as `Union`.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Origin {
    None,
    Union,
    List,
    Dict,
    Set,
    Tuple,
    Type,
    Annotated,
}

///
/// Annotation
///
/// Declared type of a field, a collection element or a method parameter.
///

#[derive(Clone)]
pub enum Annotation {
    Any,
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Decimal,
    DateTime,

    Primitive(PrimitiveType),
    Enum(EnumType),
    Class(Class),

    Optional(Box<Self>),
    Union(Vec<Self>),
    List(Box<Self>),
    Dict(Box<Self>, Box<Self>),
    Set(Box<Self>),
    Tuple(Vec<Self>),
    Type(Box<Self>),

    /// Class named by string, resolved lazily against the owning class.
    ForwardRef(String),

    /// Named dict specialisation with pinned key and value annotations.
    DictSubclass(DictType),

    Annotated(Box<Self>, Vec<Arc<dyn FieldValidator>>),
}

impl Annotation {
    #[must_use]
    pub fn list(element: impl Into<Self>) -> Self {
        Self::List(Box::new(element.into()))
    }

    #[must_use]
    pub fn dict(key: impl Into<Self>, value: impl Into<Self>) -> Self {
        Self::Dict(Box::new(key.into()), Box::new(value.into()))
    }

    #[must_use]
    pub fn set(element: impl Into<Self>) -> Self {
        Self::Set(Box::new(element.into()))
    }

    #[must_use]
    pub const fn tuple(slots: Vec<Self>) -> Self {
        Self::Tuple(slots)
    }

    #[must_use]
    pub fn optional(inner: impl Into<Self>) -> Self {
        Self::Optional(Box::new(inner.into()))
    }

    #[must_use]
    pub const fn union(members: Vec<Self>) -> Self {
        Self::Union(members)
    }

    /// `Type[T]`.
    #[must_use]
    pub fn type_of(target: impl Into<Self>) -> Self {
        Self::Type(Box::new(target.into()))
    }

    #[must_use]
    pub fn forward(name: impl Into<String>) -> Self {
        Self::ForwardRef(name.into())
    }

    #[must_use]
    pub fn annotated(inner: impl Into<Self>, validators: Vec<Arc<dyn FieldValidator>>) -> Self {
        Self::Annotated(Box::new(inner.into()), validators)
    }

    #[must_use]
    pub const fn origin(&self) -> Origin {
        match self {
            Self::Optional(_) | Self::Union(_) => Origin::Union,
            Self::List(_) => Origin::List,
            Self::Dict(..) | Self::DictSubclass(_) => Origin::Dict,
            Self::Set(_) => Origin::Set,
            Self::Tuple(_) => Origin::Tuple,
            Self::Type(_) => Origin::Type,
            Self::Annotated(..) => Origin::Annotated,
            _ => Origin::None,
        }
    }

    /// Whether `None` is an admissible value.
    #[must_use]
    pub fn admits_none(&self) -> bool {
        match self {
            Self::Any | Self::NoneType | Self::Optional(_) => true,
            Self::Union(members) => members.iter().any(Self::admits_none),
            Self::Annotated(inner, _) => inner.admits_none(),
            _ => false,
        }
    }

    /// Whether every value this annotation admits is immutable.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        match self {
            Self::NoneType
            | Self::Bool
            | Self::Int
            | Self::Float
            | Self::Str
            | Self::Bytes
            | Self::Decimal
            | Self::DateTime
            | Self::Primitive(_)
            | Self::Enum(_)
            | Self::Type(_) => true,
            Self::Tuple(slots) | Self::Union(slots) => slots.iter().all(Self::is_immutable),
            Self::Optional(inner) | Self::Annotated(inner, _) => inner.is_immutable(),
            _ => false,
        }
    }

    /// Whether the annotation names a string forward reference anywhere.
    #[must_use]
    pub fn has_forward_ref(&self) -> bool {
        match self {
            Self::ForwardRef(_) => true,
            Self::Optional(inner)
            | Self::List(inner)
            | Self::Set(inner)
            | Self::Type(inner)
            | Self::Annotated(inner, _) => inner.has_forward_ref(),
            Self::Dict(k, v) => k.has_forward_ref() || v.has_forward_ref(),
            Self::Union(members) | Self::Tuple(members) => members.iter().any(Self::has_forward_ref),
            _ => false,
        }
    }

    /// Strip `Annotated` wrappers.
    #[must_use]
    pub fn unwrap_annotated(&self) -> &Self {
        match self {
            Self::Annotated(inner, _) => inner.unwrap_annotated(),
            other => other,
        }
    }
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, Self::Any)
            | (Self::NoneType, Self::NoneType)
            | (Self::Bool, Self::Bool)
            | (Self::Int, Self::Int)
            | (Self::Float, Self::Float)
            | (Self::Str, Self::Str)
            | (Self::Bytes, Self::Bytes)
            | (Self::Decimal, Self::Decimal)
            | (Self::DateTime, Self::DateTime) => true,
            (Self::Primitive(a), Self::Primitive(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::DictSubclass(a), Self::DictSubclass(b)) => a == b,
            (Self::ForwardRef(a), Self::ForwardRef(b)) => a == b,
            (Self::Optional(a), Self::Optional(b))
            | (Self::List(a), Self::List(b))
            | (Self::Set(a), Self::Set(b))
            | (Self::Type(a), Self::Type(b)) => a == b,
            (Self::Dict(ak, av), Self::Dict(bk, bv)) => ak == bk && av == bv,
            (Self::Union(a), Self::Union(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Annotated(a, av), Self::Annotated(b, bv)) => {
                a == b
                    && av.len() == bv.len()
                    && av
                        .iter()
                        .zip(bv)
                        .all(|(x, y)| std::ptr::addr_eq(Arc::as_ptr(x), Arc::as_ptr(y)))
            }
            _ => false,
        }
    }
}

impl Eq for Annotation {}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Annotation]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::NoneType => f.write_str("NoneType"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Bytes => f.write_str("bytes"),
            Self::Decimal => f.write_str("Decimal"),
            Self::DateTime => f.write_str("datetime"),
            Self::Primitive(p) => f.write_str(p.name()),
            Self::Enum(e) => f.write_str(e.name()),
            Self::Class(c) => f.write_str(c.name()),
            Self::DictSubclass(d) => f.write_str(d.name()),
            Self::ForwardRef(name) => f.write_str(name),
            Self::Optional(inner) => write!(f, "Optional[{inner}]"),
            Self::List(inner) => write!(f, "List[{inner}]"),
            Self::Set(inner) => write!(f, "Set[{inner}]"),
            Self::Type(inner) => write!(f, "Type[{inner}]"),
            Self::Dict(k, v) => write!(f, "Dict[{k}, {v}]"),
            Self::Union(members) => {
                f.write_str("Union[")?;
                write_joined(f, members)?;
                f.write_str("]")
            }
            Self::Tuple(slots) => {
                f.write_str("Tuple[")?;
                write_joined(f, slots)?;
                f.write_str("]")
            }
            Self::Annotated(inner, validators) => {
                write!(f, "Annotated[{inner}")?;
                for validator in validators {
                    write!(f, ", {}", validator.name())?;
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<&Class> for Annotation {
    fn from(class: &Class) -> Self {
        Self::Class(class.clone())
    }
}

impl From<Class> for Annotation {
    fn from(class: Class) -> Self {
        Self::Class(class)
    }
}

impl From<&PrimitiveType> for Annotation {
    fn from(ty: &PrimitiveType) -> Self {
        Self::Primitive(ty.clone())
    }
}

impl From<PrimitiveType> for Annotation {
    fn from(ty: PrimitiveType) -> Self {
        Self::Primitive(ty)
    }
}

impl From<&EnumType> for Annotation {
    fn from(ty: &EnumType) -> Self {
        Self::Enum(ty.clone())
    }
}

impl From<EnumType> for Annotation {
    fn from(ty: EnumType) -> Self {
        Self::Enum(ty)
    }
}

impl From<&DictType> for Annotation {
    fn from(ty: &DictType) -> Self {
        Self::DictSubclass(ty.clone())
    }
}

impl From<DictType> for Annotation {
    fn from(ty: DictType) -> Self {
        Self::DictSubclass(ty)
    }
}

impl From<&Self> for Annotation {
    fn from(ann: &Self) -> Self {
        ann.clone()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::safe_id;

    #[test]
    fn display_renders_host_style_names() {
        assert_eq!(Annotation::list(safe_id()).to_string(), "List[Safe_Id]");
        assert_eq!(Annotation::optional(Annotation::Int).to_string(), "Optional[int]");
        assert_eq!(
            Annotation::dict(Annotation::Str, Annotation::list(Annotation::Int)).to_string(),
            "Dict[str, List[int]]"
        );
        assert_eq!(
            Annotation::tuple(vec![Annotation::Int, Annotation::Str]).to_string(),
            "Tuple[int, str]"
        );
        assert_eq!(Annotation::type_of(Annotation::Any).to_string(), "Type[Any]");
    }

    #[test]
    fn optional_and_union_report_union_origin() {
        assert_eq!(Annotation::optional(Annotation::Int).origin(), Origin::Union);
        assert_eq!(
            Annotation::union(vec![Annotation::Int, Annotation::Str]).origin(),
            Origin::Union
        );
        assert_eq!(Annotation::Int.origin(), Origin::None);
    }

    #[test]
    fn admits_none_follows_optional_and_union_members() {
        assert!(Annotation::optional(Annotation::Int).admits_none());
        assert!(Annotation::union(vec![Annotation::Int, Annotation::NoneType]).admits_none());
        assert!(!Annotation::union(vec![Annotation::Int, Annotation::Str]).admits_none());
        assert!(!Annotation::Str.admits_none());
    }

    #[test]
    fn containers_are_not_immutable() {
        assert!(Annotation::Str.is_immutable());
        assert!(Annotation::tuple(vec![Annotation::Int]).is_immutable());
        assert!(!Annotation::list(Annotation::Int).is_immutable());
        assert!(!Annotation::set(Annotation::Int).is_immutable());
    }

    #[test]
    fn forward_refs_are_detected_through_containers() {
        assert!(Annotation::list(Annotation::forward("Node")).has_forward_ref());
        assert!(!Annotation::list(Annotation::Int).has_forward_ref());
    }
}
