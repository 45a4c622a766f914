mod compare;

use crate::{
    annotation::TypeRef,
    class::EnumMember,
    collection::{TypedDict, TypedList, TypedSet, TypedTuple},
    instance::{Deferred, Instance},
    primitive::{PrimitiveValue, Scalar},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

///
/// Value
///
/// Dynamic value stored in instance slots and typed collections.
/// Plain containers (`List`, `Tuple`, `Map`) are caller input; the validator
/// turns them into the typed variants when a field declares a container.
///

#[derive(Clone, Debug)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Decimal(Decimal),
    DateTime(DateTime<Utc>),

    Primitive(PrimitiveValue),
    Enum(EnumMember),
    Type(TypeRef),
    Object(Instance),
    Deferred(Deferred),

    List(Vec<Self>),
    Tuple(Vec<Self>),
    Map(Vec<(Self, Self)>),

    TypedList(TypedList),
    TypedDict(TypedDict),
    TypedSet(TypedSet),
    TypedTuple(TypedTuple),

    /// Leaf with no JSON projection, labelled by its runtime type name.
    Opaque(String),
}

impl Value {
    /// Runtime type label used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Decimal(_) => "Decimal",
            Self::DateTime(_) => "datetime",
            Self::Primitive(p) => p.primitive_type().name(),
            Self::Enum(m) => m.enum_type().name(),
            Self::Type(_) => "type",
            Self::Object(obj) => obj.class().name(),
            Self::Deferred(d) => d.class().name(),
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Map(_) => "dict",
            Self::TypedList(_) => "Type_Safe__List",
            Self::TypedDict(d) => d.dict_type().map_or("Type_Safe__Dict", |ty| ty.name()),
            Self::TypedSet(_) => "Type_Safe__Set",
            Self::TypedTuple(_) => "Type_Safe__Tuple",
            Self::Opaque(label) => label,
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// True for values whose state can change after construction.
    #[must_use]
    pub const fn is_mutable(&self) -> bool {
        matches!(
            self,
            Self::Object(_)
                | Self::Deferred(_)
                | Self::List(_)
                | Self::Map(_)
                | Self::TypedList(_)
                | Self::TypedDict(_)
                | Self::TypedSet(_)
        )
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view; int-based primitives count.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Primitive(p) => p.as_int(),
            _ => None,
        }
    }

    /// Float view; float-based primitives count.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Primitive(p) => p.as_float(),
            _ => None,
        }
    }

    /// String view; string-based primitives count.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Primitive(p) => p.as_str(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Self::Decimal(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Self::Primitive(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_enum(&self) -> Option<&EnumMember> {
        match self {
            Self::Enum(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Self::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Object view; a deferred object is materialized on first access.
    #[must_use]
    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Self::Object(obj) => Some(obj),
            Self::Deferred(d) => d.force().ok().and_then(Self::as_object),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object_mut(&mut self) -> Option<&mut Instance> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_list(&self) -> Option<&TypedList> {
        match self {
            Self::TypedList(list) => Some(list),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_dict(&self) -> Option<&TypedDict> {
        match self {
            Self::TypedDict(dict) => Some(dict),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_set(&self) -> Option<&TypedSet> {
        match self {
            Self::TypedSet(set) => Some(set),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_tuple(&self) -> Option<&TypedTuple> {
        match self {
            Self::TypedTuple(tuple) => Some(tuple),
            _ => None,
        }
    }

    /// Items of any sequence-shaped value: plain list/tuple, typed list/tuple.
    #[must_use]
    pub fn sequence_items(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) | Self::Tuple(items) => Some(items),
            Self::TypedList(list) => Some(list.as_slice()),
            Self::TypedTuple(tuple) => Some(tuple.as_slice()),
            _ => None,
        }
    }

    /// Import plain JSON data. Objects become `Map` with string keys.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            serde_json::Value::String(s) => Self::Str(s.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (Self::Str(k.clone()), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Python-style rendering used inside error messages.
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => format!("'{s}'"),
            Self::Primitive(p) if p.as_str().is_some() => format!("'{p}'"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&float_repr(*x)),
            Self::Str(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "b'{}'", String::from_utf8_lossy(b)),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Enum(m) => write!(f, "{m}"),
            Self::Type(t) => write!(f, "<class '{}'>", t.qualified_name()),
            Self::Object(obj) => write!(f, "<{} object>", obj.class().name()),
            Self::Deferred(d) => write!(f, "<{} object>", d.class().name()),
            Self::List(items) => write_items(f, "[", items.iter(), "]"),
            Self::Tuple(items) => write_items(f, "(", items.iter(), ")"),
            Self::TypedList(list) => write_items(f, "[", list.iter(), "]"),
            Self::TypedTuple(tuple) => write_items(f, "(", tuple.iter(), ")"),
            Self::TypedSet(set) => write_items(f, "{", set.iter(), "}"),
            Self::Map(entries) => write_entries(f, entries.iter().map(|(k, v)| (k, v))),
            Self::TypedDict(dict) => write_entries(f, dict.iter()),
            Self::Opaque(label) => write!(f, "<{label}>"),
        }
    }
}

fn write_items<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Value>,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&item.repr())?;
    }
    f.write_str(close)
}

fn write_entries<'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (&'a Value, &'a Value)>,
) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in entries.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {}", k.repr(), v.repr())?;
    }
    f.write_str("}")
}

/// Render a float the way the host runtime prints it: integral values keep
/// a trailing `.0`, non-finite values print as `nan` / `inf`.
#[must_use]
pub fn float_repr(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        if x > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

///
/// CONVERSIONS
///

macro_rules! impl_value_from {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_value_from! {
    bool          => Bool,
    i8            => Int,
    i16           => Int,
    i32           => Int,
    i64           => Int,
    u8            => Int,
    u16           => Int,
    u32           => Int,
    f32           => Float,
    f64           => Float,
    &str          => Str,
    String        => Str,
    Vec<u8>       => Bytes,
    Decimal       => Decimal,
    DateTime<Utc> => DateTime,
    PrimitiveValue => Primitive,
    EnumMember    => Enum,
    TypeRef       => Type,
    Instance      => Object,
    TypedList     => TypedList,
    TypedDict     => TypedDict,
    TypedSet      => TypedSet,
    TypedTuple    => TypedTuple,
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Str(s.clone())
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<(Self, Self)>> for Value {
    fn from(entries: Vec<(Self, Self)>) -> Self {
        Self::Map(entries)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Str(s) => Self::Str(s),
            Scalar::Int(i) => Self::Int(i),
            Scalar::Float(f) => Self::Float(f),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        Self::from_json(json)
    }
}

///
/// TESTS
///
