use crate::{
    annotation::Annotation,
    class::{Class, EnumType},
    collection::DictType,
    primitive::{PrimitiveType, ScalarKind},
};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

///
/// Builtin
///
/// Built-in classes that can appear as `Type[T]` values.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Builtin {
    Int,
    Float,
    Bool,
    Str,
    Bytes,
    NoneType,
    List,
    Dict,
    Set,
    Tuple,
    Object,
    Type,
    Decimal,
    DateTime,
}

impl Builtin {
    pub const ALL: [Self; 14] = [
        Self::Int,
        Self::Float,
        Self::Bool,
        Self::Str,
        Self::Bytes,
        Self::NoneType,
        Self::List,
        Self::Dict,
        Self::Set,
        Self::Tuple,
        Self::Object,
        Self::Type,
        Self::Decimal,
        Self::DateTime,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::NoneType => "NoneType",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Set => "set",
            Self::Tuple => "tuple",
            Self::Object => "object",
            Self::Type => "type",
            Self::Decimal => "Decimal",
            Self::DateTime => "datetime",
        }
    }

    #[must_use]
    pub const fn module(self) -> &'static str {
        match self {
            Self::Decimal => "decimal",
            Self::DateTime => "datetime",
            _ => "builtins",
        }
    }

    /// Annotation a value of this class is checked against.
    #[must_use]
    pub fn annotation(self) -> Annotation {
        match self {
            Self::Int => Annotation::Int,
            Self::Float => Annotation::Float,
            Self::Bool => Annotation::Bool,
            Self::Str => Annotation::Str,
            Self::Bytes => Annotation::Bytes,
            Self::NoneType => Annotation::NoneType,
            Self::List => Annotation::list(Annotation::Any),
            Self::Dict => Annotation::dict(Annotation::Any, Annotation::Any),
            Self::Set => Annotation::set(Annotation::Any),
            Self::Tuple | Self::Object => Annotation::Any,
            Self::Type => Annotation::type_of(Annotation::Any),
            Self::Decimal => Annotation::Decimal,
            Self::DateTime => Annotation::DateTime,
        }
    }
}

///
/// TypeRef
///
/// A class used as a value, as stored in `Type[T]` fields.
///

#[derive(Clone)]
pub enum TypeRef {
    Builtin(Builtin),
    Class(Class),
    Primitive(PrimitiveType),
    Enum(EnumType),
    Dict(DictType),
}

impl TypeRef {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(b) => b.name(),
            Self::Class(c) => c.name(),
            Self::Primitive(p) => p.name(),
            Self::Enum(e) => e.name(),
            Self::Dict(d) => d.name(),
        }
    }

    #[must_use]
    pub fn module(&self) -> &str {
        match self {
            Self::Builtin(b) => b.module(),
            Self::Class(c) => c.module(),
            Self::Primitive(p) => p.module(),
            Self::Enum(e) => e.module(),
            Self::Dict(d) => d.module(),
        }
    }

    /// `<module>.<name>`, the wire form of a type reference.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module(), self.name())
    }

    /// Subclass test. `bool` is an `int`, every type is an `object`, and a
    /// primitive is a subclass of its lineage and of its base scalar.
    #[must_use]
    pub fn is_subclass_of(&self, other: &Self) -> bool {
        if self == other || matches!(other, Self::Builtin(Builtin::Object)) {
            return true;
        }

        match (self, other) {
            (Self::Builtin(Builtin::Bool), Self::Builtin(Builtin::Int))
            | (Self::Dict(_), Self::Builtin(Builtin::Dict)) => true,
            (Self::Class(a), Self::Class(b)) => a.is_subclass_of(b),
            (Self::Primitive(a), Self::Primitive(b)) => a.is_subtype_of(b),
            (Self::Primitive(p), Self::Builtin(b)) => {
                matches!(
                    (p.scalar_kind(), b),
                    (ScalarKind::Str, Builtin::Str)
                        | (ScalarKind::Int, Builtin::Int)
                        | (ScalarKind::Float, Builtin::Float)
                )
            }
            _ => false,
        }
    }

    /// Type named by an annotation, when it names a single class.
    #[must_use]
    pub fn from_annotation(annotation: &Annotation) -> Option<Self> {
        let ty = match annotation {
            Annotation::Int => Self::Builtin(Builtin::Int),
            Annotation::Float => Self::Builtin(Builtin::Float),
            Annotation::Bool => Self::Builtin(Builtin::Bool),
            Annotation::Str => Self::Builtin(Builtin::Str),
            Annotation::Bytes => Self::Builtin(Builtin::Bytes),
            Annotation::NoneType => Self::Builtin(Builtin::NoneType),
            Annotation::Decimal => Self::Builtin(Builtin::Decimal),
            Annotation::DateTime => Self::Builtin(Builtin::DateTime),
            Annotation::List(_) => Self::Builtin(Builtin::List),
            Annotation::Dict(..) => Self::Builtin(Builtin::Dict),
            Annotation::Set(_) => Self::Builtin(Builtin::Set),
            Annotation::Tuple(_) => Self::Builtin(Builtin::Tuple),
            Annotation::Type(_) => Self::Builtin(Builtin::Type),
            Annotation::Primitive(p) => Self::Primitive(p.clone()),
            Annotation::Enum(e) => Self::Enum(e.clone()),
            Annotation::Class(c) => Self::Class(c.clone()),
            Annotation::DictSubclass(d) => Self::Dict(d.clone()),
            Annotation::Annotated(inner, _) => return Self::from_annotation(inner),
            Annotation::Any
            | Annotation::Optional(_)
            | Annotation::Union(_)
            | Annotation::ForwardRef(_) => return None,
        };

        Some(ty)
    }

    /// Annotation that admits instances of this type.
    #[must_use]
    pub fn to_annotation(&self) -> Annotation {
        match self {
            Self::Builtin(b) => b.annotation(),
            Self::Class(c) => Annotation::Class(c.clone()),
            Self::Primitive(p) => Annotation::Primitive(p.clone()),
            Self::Enum(e) => Annotation::Enum(e.clone()),
            Self::Dict(d) => Annotation::DictSubclass(d.clone()),
        }
    }

    #[must_use]
    pub const fn as_class(&self) -> Option<&Class> {
        match self {
            Self::Class(c) => Some(c),
            _ => None,
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Primitive(a), Self::Primitive(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.qualified_name().hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.qualified_name())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

impl From<&Class> for TypeRef {
    fn from(class: &Class) -> Self {
        Self::Class(class.clone())
    }
}

impl From<Builtin> for TypeRef {
    fn from(builtin: Builtin) -> Self {
        Self::Builtin(builtin)
    }
}

impl From<&PrimitiveType> for TypeRef {
    fn from(ty: &PrimitiveType) -> Self {
        Self::Primitive(ty.clone())
    }
}

///
/// TESTS
///
