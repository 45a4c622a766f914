use crate::{
    annotation::TypeRef,
    class::{ClassId, DEFAULT_MODULE},
    error::Error,
    registry,
    value::Value,
};
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

///
/// EnumType
///
/// Enum class: an ordered list of named members, each carrying a value.
///

#[derive(Clone)]
pub struct EnumType(Arc<EnumInner>);

struct EnumInner {
    id: ClassId,
    name: String,
    module: String,
    members: Vec<(String, Value)>,
}

impl EnumType {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EnumTypeBuilder {
        EnumTypeBuilder {
            name: name.into(),
            module: DEFAULT_MODULE.to_string(),
            members: Vec::new(),
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
    pub fn len(&self) -> usize {
        self.0.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.members.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = EnumMember> + '_ {
        (0..self.0.members.len()).map(|index| EnumMember {
            ty: self.clone(),
            index,
        })
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<EnumMember> {
        self.0
            .members
            .iter()
            .position(|(n, _)| n == name)
            .map(|index| self.member_at(index))
    }

    #[must_use]
    pub fn by_value(&self, value: &Value) -> Option<EnumMember> {
        self.0
            .members
            .iter()
            .position(|(_, v)| v == value)
            .map(|index| self.member_at(index))
    }

    /// Member matching `input` by name first, then by value.
    #[must_use]
    pub fn lookup(&self, input: &Value) -> Option<EnumMember> {
        input
            .as_str()
            .and_then(|name| self.by_name(name))
            .or_else(|| self.by_value(input))
    }

    fn member_at(&self, index: usize) -> EnumMember {
        EnumMember {
            ty: self.clone(),
            index,
        }
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for EnumType {}

impl fmt::Debug for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnumType({}.{})", self.0.module, self.0.name)
    }
}

///
/// EnumTypeBuilder
///

pub struct EnumTypeBuilder {
    name: String,
    module: String,
    members: Vec<(String, Value)>,
}

impl EnumTypeBuilder {
    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    #[must_use]
    pub fn member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<EnumType, Error> {
        if self.members.is_empty() {
            return Err(Error::class_definition(&self.name, "enum has no members"));
        }
        for (i, (name, _)) in self.members.iter().enumerate() {
            if self.members[..i].iter().any(|(n, _)| n == name) {
                return Err(Error::class_definition(
                    &self.name,
                    format!("enum member '{name}' is declared more than once"),
                ));
            }
        }

        let ty = EnumType(Arc::new(EnumInner {
            id: ClassId::next(),
            name: self.name,
            module: self.module,
            members: self.members,
        }));
        registry::register_type(TypeRef::Enum(ty.clone()));

        Ok(ty)
    }
}

///
/// EnumMember
///

#[derive(Clone)]
pub struct EnumMember {
    ty: EnumType,
    index: usize,
}

impl EnumMember {
    #[must_use]
    pub const fn enum_type(&self) -> &EnumType {
        &self.ty
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.ty.0.members[self.index].0
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.ty.0.members[self.index].1
    }
}

impl PartialEq for EnumMember {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.index == other.index
    }
}

impl Eq for EnumMember {}

impl Hash for EnumMember {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.0.id.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for EnumMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.ty.name(), self.name())
    }
}

impl fmt::Display for EnumMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.ty.name(), self.name())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> EnumType {
        EnumType::builder("Status")
            .member("PENDING", "pending")
            .member("ACTIVE", "active")
            .build()
            .expect("enum")
    }

    #[test]
    fn lookup_matches_name_then_value() {
        let status = status();

        let by_name = status.lookup(&"ACTIVE".into()).expect("by name");
        let by_value = status.lookup(&"active".into()).expect("by value");

        assert_eq!(by_name, by_value);
        assert_eq!(by_name.name(), "ACTIVE");
        assert_eq!(by_name.value(), &Value::from("active"));
        assert!(status.lookup(&"bogus".into()).is_none());
    }

    #[test]
    fn members_keep_declaration_order() {
        let names: Vec<String> = status().members().map(|m| m.name().to_string()).collect();

        assert_eq!(names, ["PENDING", "ACTIVE"]);
    }

    #[test]
    fn members_of_different_enums_differ() {
        let a = status().by_name("ACTIVE").expect("a");
        let b = status().by_name("ACTIVE").expect("b");

        assert_ne!(a, b);
        assert_eq!(a.to_string(), "Status.ACTIVE");
    }

    #[test]
    fn duplicate_members_are_rejected() {
        let err = EnumType::builder("Dup")
            .member("A", 1)
            .member("A", 2)
            .build()
            .expect_err("duplicate");

        assert!(err.to_string().contains("declared more than once"));
    }
}
