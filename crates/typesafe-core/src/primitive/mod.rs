mod float;
mod int;
mod ops;
mod text;

pub use float::FloatRules;
pub use int::IntRules;
pub use ops::ArithOp;
pub use text::{Pattern, RegexMode, StrRules};

use crate::{
    annotation::TypeRef,
    class::{ClassId, DEFAULT_MODULE},
    registry,
    value::{Value, float_repr},
};
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

///
/// PrimitiveErrorKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrimitiveErrorKind {
    Type,
    Range,
    Length,
    Pattern,
    Empty,
}

///
/// PrimitiveError
///
/// Rejection raised by a primitive's own rules; mapped onto `Error` kinds
/// at the call boundary.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct PrimitiveError {
    pub kind: PrimitiveErrorKind,
    pub type_name: String,
    pub message: String,
}

impl PrimitiveError {
    pub fn new(
        kind: PrimitiveErrorKind,
        type_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

///
/// Scalar
///
/// Base representation a primitive projects to.
///

#[derive(Clone, Debug)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::Str(_) => ScalarKind::Str,
            Self::Int(_) => ScalarKind::Int,
            Self::Float(_) => ScalarKind::Float,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&float_repr(*x)),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScalarKind {
    Str,
    Int,
    Float,
}

///
/// PrimitiveRules
///

#[derive(Clone, Debug)]
pub enum PrimitiveRules {
    Str(StrRules),
    Int(IntRules),
    Float(FloatRules),
}

impl PrimitiveRules {
    #[must_use]
    pub const fn scalar_kind(&self) -> ScalarKind {
        match self {
            Self::Str(_) => ScalarKind::Str,
            Self::Int(_) => ScalarKind::Int,
            Self::Float(_) => ScalarKind::Float,
        }
    }

    fn apply(&self, type_name: &str, input: &Value) -> Result<Scalar, PrimitiveError> {
        match self {
            Self::Str(rules) => rules.apply(type_name, input).map(Scalar::Str),
            Self::Int(rules) => rules.apply(type_name, input).map(Scalar::Int),
            Self::Float(rules) => rules.apply(type_name, input).map(Scalar::Float),
        }
    }
}

/// Produces a fresh auto-value for identifier primitives.
pub type Generator = fn() -> Scalar;

/// Pre-processes raw input before the rules run (e.g. ISO date parsing).
pub type InputHook = fn(&PrimitiveType, Value) -> Result<Value, PrimitiveError>;

///
/// DefaultPolicy
///
/// What `construct(None)` starts from.
///

#[derive(Clone, Debug, Default)]
pub enum DefaultPolicy {
    #[default]
    Empty,
    Generate(Generator),
    Value(Scalar),
}

///
/// PrimitiveType
///
/// A constrained scalar class. `construct` is the only way to obtain a
/// `PrimitiveValue`, so every value carries a checked scalar.
///

#[derive(Clone)]
pub struct PrimitiveType(Arc<PrimitiveInner>);

struct PrimitiveInner {
    id: ClassId,
    name: String,
    module: String,
    parent: Option<PrimitiveType>,
    rules: PrimitiveRules,
    default: DefaultPolicy,
    input_hook: Option<InputHook>,
}

impl PrimitiveType {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PrimitiveTypeBuilder {
        PrimitiveTypeBuilder {
            name: name.into(),
            module: None,
            parent: None,
            rules: None,
            default: None,
            input_hook: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> ClassId {
        self.0.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.0.module
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.0.parent.as_ref()
    }

    #[must_use]
    pub fn rules(&self) -> &PrimitiveRules {
        &self.0.rules
    }

    #[must_use]
    pub fn scalar_kind(&self) -> ScalarKind {
        self.0.rules.scalar_kind()
    }

    #[must_use]
    pub fn has_generator(&self) -> bool {
        matches!(self.0.default, DefaultPolicy::Generate(_))
    }

    /// True when `self` is `other` or descends from it.
    #[must_use]
    pub fn is_subtype_of(&self, other: &Self) -> bool {
        self == other || self.0.parent.as_ref().is_some_and(|p| p.is_subtype_of(other))
    }

    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::Primitive(self.clone())
    }

    /// Build a value. `Value::None` means "no input": the default policy
    /// decides what the rules see.
    pub fn construct(&self, input: Value) -> Result<PrimitiveValue, PrimitiveError> {
        let input = match (&input, &self.0.default) {
            (Value::None, DefaultPolicy::Generate(generate)) => Value::from(generate()),
            (Value::None, DefaultPolicy::Value(scalar)) => Value::from(scalar.clone()),
            _ => input,
        };
        let input = match self.0.input_hook {
            Some(hook) => hook(self, input)?,
            None => input,
        };
        let scalar = self.0.rules.apply(self.name(), &input)?;

        Ok(PrimitiveValue {
            ty: self.clone(),
            scalar,
        })
    }

    /// `construct(None)`.
    pub fn default_value(&self) -> Result<PrimitiveValue, PrimitiveError> {
        self.construct(Value::None)
    }
}

impl PartialEq for PrimitiveType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for PrimitiveType {}

impl fmt::Debug for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitiveType({}.{})", self.0.module, self.0.name)
    }
}

///
/// PrimitiveTypeBuilder
///
/// Unset parts are inherited from the parent, as a subclass inherits class
/// attributes. A primitive with neither rules nor parent gets default
/// string rules.
///

pub struct PrimitiveTypeBuilder {
    name: String,
    module: Option<String>,
    parent: Option<PrimitiveType>,
    rules: Option<PrimitiveRules>,
    default: Option<DefaultPolicy>,
    input_hook: Option<Option<InputHook>>,
}

impl PrimitiveTypeBuilder {
    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: &PrimitiveType) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    #[must_use]
    pub fn str_rules(mut self, rules: StrRules) -> Self {
        self.rules = Some(PrimitiveRules::Str(rules));
        self
    }

    #[must_use]
    pub fn int_rules(mut self, rules: IntRules) -> Self {
        self.rules = Some(PrimitiveRules::Int(rules));
        self
    }

    #[must_use]
    pub fn float_rules(mut self, rules: FloatRules) -> Self {
        self.rules = Some(PrimitiveRules::Float(rules));
        self
    }

    #[must_use]
    pub fn generator(mut self, generator: Generator) -> Self {
        self.default = Some(DefaultPolicy::Generate(generator));
        self
    }

    #[must_use]
    pub fn default_scalar(mut self, scalar: Scalar) -> Self {
        self.default = Some(DefaultPolicy::Value(scalar));
        self
    }

    /// Start from the rules' empty value instead of an inherited generator.
    #[must_use]
    pub fn no_generator(mut self) -> Self {
        self.default = Some(DefaultPolicy::Empty);
        self
    }

    #[must_use]
    pub fn input_hook(mut self, hook: InputHook) -> Self {
        self.input_hook = Some(Some(hook));
        self
    }

    #[must_use]
    pub fn no_input_hook(mut self) -> Self {
        self.input_hook = Some(None);
        self
    }

    pub fn build(self) -> PrimitiveType {
        let parent = self.parent;
        let inherited = parent.as_ref().map(|p| &p.0);

        let rules = self
            .rules
            .or_else(|| inherited.map(|p| p.rules.clone()))
            .unwrap_or_else(|| PrimitiveRules::Str(StrRules::default()));
        let default = self
            .default
            .or_else(|| inherited.map(|p| p.default.clone()))
            .unwrap_or_default();
        let input_hook = self
            .input_hook
            .unwrap_or_else(|| inherited.and_then(|p| p.input_hook));
        let module = self
            .module
            .or_else(|| inherited.map(|p| p.module.clone()))
            .unwrap_or_else(|| DEFAULT_MODULE.to_string());

        let ty = PrimitiveType(Arc::new(PrimitiveInner {
            id: ClassId::next(),
            name: self.name,
            module,
            parent,
            rules,
            default,
            input_hook,
        }));
        registry::register_type(ty.type_ref());

        ty
    }
}

///
/// PrimitiveValue
///
/// A scalar that passed its primitive's rules.
///

#[derive(Clone)]
pub struct PrimitiveValue {
    ty: PrimitiveType,
    scalar: Scalar,
}

impl PrimitiveValue {
    #[must_use]
    pub const fn primitive_type(&self) -> &PrimitiveType {
        &self.ty
    }

    #[must_use]
    pub const fn scalar(&self) -> &Scalar {
        &self.scalar
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.scalar {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self.scalar {
            Scalar::Int(i) => Some(i),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self.scalar {
            Scalar::Float(x) => Some(x),
            _ => None,
        }
    }

    /// The base scalar as a plain value.
    #[must_use]
    pub fn to_plain(&self) -> Value {
        Value::from(self.scalar.clone())
    }

    /// Whether this value's type is `ty` or one of its descendants.
    #[must_use]
    pub fn is_a(&self, ty: &PrimitiveType) -> bool {
        self.ty.is_subtype_of(ty)
    }
}

impl PartialEq for PrimitiveValue {
    fn eq(&self, other: &Self) -> bool {
        Value::Primitive(self.clone()) == Value::Primitive(other.clone())
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scalar)
    }
}

impl fmt::Debug for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scalar {
            Scalar::Str(s) => write!(f, "{}('{s}')", self.ty.name()),
            other => write!(f, "{}({other})", self.ty.name()),
        }
    }
}

///
/// TESTS
///
