mod enumeration;

pub use enumeration::{EnumMember, EnumType, EnumTypeBuilder};

use crate::{
    FRAMEWORK_MODULE,
    annotation::{Annotation, TypeRef},
    error::{Error, Site},
    registry,
    validate::{self, Context},
    value::Value,
};
use derive_more::Display;
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc, LazyLock, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

///
/// CONSTANTS
///

/// Name of the root class every Type-Safe class derives from.
pub const ROOT_CLASS_NAME: &str = "Type_Safe";

/// Module given to classes built without an explicit `.module(..)`.
pub const DEFAULT_MODULE: &str = "__main__";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

static ROOT: LazyLock<Class> = LazyLock::new(|| {
    Class(Arc::new(ClassInner {
        id: ClassId::next(),
        name: ROOT_CLASS_NAME.to_string(),
        module: FRAMEWORK_MODULE.to_string(),
        bases: Vec::new(),
        fields: Vec::new(),
        class_vars: Vec::new(),
        members: Vec::new(),
    }))
});

///
/// ClassId
///
/// Process-unique identity of a class, enum, primitive or dict type.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ClassId(u64);

impl ClassId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

///
/// MemberKind
///
/// Callable or descriptor attributes; they are never fields.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemberKind {
    Method,
    ClassMethod,
    StaticMethod,
    Property,
}

///
/// FieldDef
///
/// One declared field. `default` is `Some` only when the class sets an
/// explicit class-level value (which may itself be `None`).
///

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub annotation: Annotation,
    pub default: Option<Value>,
}

///
/// Class
///
/// Cheap-clone handle to a Type-Safe class definition.
///

#[derive(Clone)]
pub struct Class(Arc<ClassInner>);

pub(crate) struct ClassInner {
    id: ClassId,
    name: String,
    module: String,
    bases: Vec<Class>,
    fields: Vec<FieldDef>,
    class_vars: Vec<(String, Value)>,
    members: Vec<(String, MemberKind)>,
}

impl Class {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    /// The `Type_Safe` root class.
    #[must_use]
    pub fn root() -> Self {
        ROOT.clone()
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
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.0.module, self.0.name)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.id == ROOT.id()
    }

    #[must_use]
    pub fn bases(&self) -> &[Self] {
        &self.0.bases
    }

    /// Fields declared on this class only, in declaration order.
    #[must_use]
    pub fn own_fields(&self) -> &[FieldDef] {
        &self.0.fields
    }

    /// Annotation-less class-level values declared on this class only.
    #[must_use]
    pub fn own_class_vars(&self) -> &[(String, Value)] {
        &self.0.class_vars
    }

    #[must_use]
    pub fn own_members(&self) -> &[(String, MemberKind)] {
        &self.0.members
    }

    #[must_use]
    pub fn is_subclass_of(&self, other: &Self) -> bool {
        self == other || self.0.bases.iter().any(|base| base.is_subclass_of(other))
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakClass {
        WeakClass(Arc::downgrade(&self.0))
    }

    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::Class(self.clone())
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.qualified_name())
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

///
/// WeakClass
///
/// Non-owning class handle kept by process-wide registries.
///

#[derive(Clone, Debug)]
pub struct WeakClass(Weak<ClassInner>);

impl WeakClass {
    #[must_use]
    pub fn upgrade(&self) -> Option<Class> {
        self.0.upgrade().map(Class)
    }
}

impl fmt::Debug for ClassInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

///
/// ClassBuilder
///

pub struct ClassBuilder {
    name: String,
    module: String,
    bases: Vec<Class>,
    fields: Vec<FieldDef>,
    class_vars: Vec<(String, Value)>,
    members: Vec<(String, MemberKind)>,
}

impl ClassBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: DEFAULT_MODULE.to_string(),
            bases: Vec::new(),
            fields: Vec::new(),
            class_vars: Vec::new(),
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    #[must_use]
    pub fn base(mut self, base: &Class) -> Self {
        self.bases.push(base.clone());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, annotation: impl Into<Annotation>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            annotation: annotation.into(),
            default: None,
        });
        self
    }

    #[must_use]
    pub fn field_default(
        mut self,
        name: impl Into<String>,
        annotation: impl Into<Annotation>,
        default: impl Into<Value>,
    ) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            annotation: annotation.into(),
            default: Some(default.into()),
        });
        self
    }

    #[must_use]
    pub fn class_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.class_vars.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn method(self, name: impl Into<String>) -> Self {
        self.member(name, MemberKind::Method)
    }

    #[must_use]
    pub fn class_method(self, name: impl Into<String>) -> Self {
        self.member(name, MemberKind::ClassMethod)
    }

    #[must_use]
    pub fn static_method(self, name: impl Into<String>) -> Self {
        self.member(name, MemberKind::StaticMethod)
    }

    #[must_use]
    pub fn property(self, name: impl Into<String>) -> Self {
        self.member(name, MemberKind::Property)
    }

    fn member(mut self, name: impl Into<String>, kind: MemberKind) -> Self {
        self.members.push((name.into(), kind));
        self
    }

    /// Validate the declaration and register the class.
    pub fn build(mut self) -> Result<Class, Error> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(Error::class_definition(
                    &self.name,
                    format!("field '{}' is declared more than once", field.name),
                ));
            }
        }

        let class_name = self.name.clone();
        for field in &mut self.fields {
            if let Some(default) = field.default.take() {
                field.default = Some(check_default(&class_name, field, default)?);
            }
        }

        if self.bases.is_empty() {
            self.bases.push(Class::root());
        }

        let class = Class(Arc::new(ClassInner {
            id: ClassId::next(),
            name: self.name,
            module: self.module,
            bases: self.bases,
            fields: self.fields,
            class_vars: self.class_vars,
            members: self.members,
        }));
        registry::register_class(&class);

        Ok(class)
    }
}

// Explicit defaults are checked once at definition time. Mutable defaults
// would be shared by every instance and are refused.
pub(crate) fn check_default(class: &str, field: &FieldDef, default: Value) -> Result<Value, Error> {
    let name = &field.name;
    let annotation = &field.annotation;

    if default.is_none() || annotation.has_forward_ref() {
        return Ok(default);
    }
    if default.is_mutable() {
        return Err(Error::class_definition(
            class,
            format!(
                "variable '{name}' is defined as type '{annotation}' which is not supported by Type_Safe, \
                 with only immutable types being supported"
            ),
        ));
    }
    if let Annotation::Type(target) = annotation.unwrap_annotated() {
        let Value::Type(ty) = &default else {
            return Err(Error::class_definition(
                class,
                format!(
                    "variable '{name}' is defined as Type[T] but has value '{default}' which is not a type"
                ),
            ));
        };
        if let Some(target) = TypeRef::from_annotation(target)
            && !ty.is_subclass_of(&target)
        {
            return Err(Error::class_definition(
                class,
                format!(
                    "variable '{name}' is defined as {annotation} but value {ty} is not a subclass of {target}"
                ),
            ));
        }

        return Ok(default);
    }

    let ctx = Context::new(None, Site::field(name.clone()));
    let actual = default.type_name().to_string();
    let rendered = default.to_string();
    validate::check_or_coerce(annotation, default, &ctx).map_err(|_| {
        Error::class_definition(
            class,
            format!(
                "variable '{name}' is defined as type '{annotation}' but has value '{rendered}' of type '{actual}'"
            ),
        )
    })
}

///
/// TESTS
///
