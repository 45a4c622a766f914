use crate::{
    annotation::{Annotation, TypeRef},
    class::{ClassId, DEFAULT_MODULE},
    collection::{DICT_LABEL, Role, TypedList, check_item},
    error::{Error, Site},
    instance::Instance,
    registry, serialize,
    validate::{self, Context},
    value::Value,
};
use std::{collections::HashMap, fmt, sync::Arc};

///
/// DictType
///
/// A named dict specialisation that pins its key and value annotations.
/// A field declared with a `DictType` always holds a dict of exactly that
/// type, and `union`, `copy` and `from_keys` keep it.
///

#[derive(Clone)]
pub struct DictType(Arc<DictTypeInner>);

struct DictTypeInner {
    id: ClassId,
    name: String,
    module: String,
    key: Annotation,
    value: Annotation,
}

impl DictType {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> DictTypeBuilder {
        DictTypeBuilder {
            name: name.into(),
            module: DEFAULT_MODULE.to_string(),
            key: Annotation::Any,
            value: Annotation::Any,
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
    pub fn key(&self) -> &Annotation {
        &self.0.key
    }

    #[must_use]
    pub fn value(&self) -> &Annotation {
        &self.0.value
    }
}

impl PartialEq for DictType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for DictType {}

impl fmt::Debug for DictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DictType({}.{}: {} -> {})",
            self.0.module, self.0.name, self.0.key, self.0.value
        )
    }
}

///
/// DictTypeBuilder
///

pub struct DictTypeBuilder {
    name: String,
    module: String,
    key: Annotation,
    value: Annotation,
}

impl DictTypeBuilder {
    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<Annotation>) -> Self {
        self.key = key.into();
        self
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<Annotation>) -> Self {
        self.value = value.into();
        self
    }

    /// Build and register the specialisation as a type.
    #[must_use]
    pub fn build(self) -> DictType {
        let ty = DictType(Arc::new(DictTypeInner {
            id: ClassId::next(),
            name: self.name,
            module: self.module,
            key: self.key,
            value: self.value,
        }));
        registry::register_type(TypeRef::Dict(ty.clone()));

        ty
    }
}

///
/// TypedDict
///
/// Insertion-ordered mapping whose keys satisfy `key` and whose values
/// satisfy `value`. Lookups by a plain key also find a converted key, so
/// `"abc"` finds `Safe_Id("abc")`.
///
/// `index` maps each stored key to its position in `entries`.
///

#[derive(Clone, Debug)]
pub struct TypedDict {
    key: Annotation,
    value: Annotation,
    dict_type: Option<DictType>,
    entries: Vec<(Value, Value)>,
    index: HashMap<Value, usize>,
}

impl TypedDict {
    #[must_use]
    pub fn new(key: impl Into<Annotation>, value: impl Into<Annotation>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            dict_type: None,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Empty dict of a named specialisation.
    #[must_use]
    pub fn with_type(ty: &DictType) -> Self {
        Self {
            key: ty.key().clone(),
            value: ty.value().clone(),
            dict_type: Some(ty.clone()),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a dict, checking every entry.
    pub fn from_entries(
        key: impl Into<Annotation>,
        value: impl Into<Annotation>,
        entries: impl IntoIterator<Item = (Value, Value)>,
    ) -> Result<Self, Error> {
        let mut dict = Self::new(key, value);
        dict.update(entries)?;

        Ok(dict)
    }

    /// Build a dict of a named specialisation, checking every entry.
    pub fn from_type_entries(
        ty: &DictType,
        entries: impl IntoIterator<Item = (Value, Value)>,
    ) -> Result<Self, Error> {
        let mut dict = Self::with_type(ty);
        dict.update(entries)?;

        Ok(dict)
    }

    #[must_use]
    pub const fn key(&self) -> &Annotation {
        &self.key
    }

    #[must_use]
    pub const fn value(&self) -> &Annotation {
        &self.value
    }

    #[must_use]
    pub const fn dict_type(&self) -> Option<&DictType> {
        self.dict_type.as_ref()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// `dict[key] = value`. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Result<Option<Value>, Error> {
        let (key, value) = self.check_entry(key.into(), value.into())?;

        Ok(self.store(key, value))
    }

    /// Insert every entry, or none of them.
    pub fn update(&mut self, entries: impl IntoIterator<Item = (Value, Value)>) -> Result<(), Error> {
        let checked = entries
            .into_iter()
            .map(|(k, v)| self.check_entry(k, v))
            .collect::<Result<Vec<_>, _>>()?;
        for (key, value) in checked {
            self.store(key, value);
        }

        Ok(())
    }

    /// `dict | other`: a new dict of the same specialisation.
    pub fn union(&self, other: impl IntoIterator<Item = (Value, Value)>) -> Result<Self, Error> {
        let mut result = self.copy();
        result.update(other)?;

        Ok(result)
    }

    /// `dict |= other`.
    pub fn union_assign(&mut self, other: impl IntoIterator<Item = (Value, Value)>) -> Result<&mut Self, Error> {
        self.update(other)?;

        Ok(self)
    }

    /// A new, empty dict of the same specialisation with every key set to
    /// `value`.
    pub fn from_keys(
        &self,
        keys: impl IntoIterator<Item = Value>,
        value: impl Into<Value>,
    ) -> Result<Self, Error> {
        let value = value.into();
        let mut result = self.empty_like();
        result.update(keys.into_iter().map(|k| (k, value.clone())))?;

        Ok(result)
    }

    /// Value under `key`, inserting the checked `default` first when absent.
    pub fn set_default(&mut self, key: impl Into<Value>, default: impl Into<Value>) -> Result<&Value, Error> {
        let key = key.into();
        let index = match self.position(&key) {
            Some(index) => index,
            None => {
                let (key, value) = self.check_entry(key, default.into())?;
                self.store(key, value);
                self.entries.len() - 1
            }
        };

        Ok(&self.entries[index].1)
    }

    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    /// The object stored under `key`, for editing through its own checked
    /// setters. Replacing a value goes through `insert`.
    pub fn object_mut(&mut self, key: &Value) -> Option<&mut Instance> {
        let index = self.position(key)?;

        self.entries[index].1.as_object_mut()
    }

    #[must_use]
    pub fn contains_key(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let position = self.position(key)?;
        let (stored, value) = self.entries.remove(position);
        self.index.remove(&stored);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }

        Some(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Keys as a typed list over the key annotation.
    #[must_use]
    pub fn keys(&self) -> TypedList {
        TypedList::from_parts(
            self.key.clone(),
            self.entries.iter().map(|(k, _)| k.clone()).collect(),
        )
    }

    /// Values as a typed list over the value annotation.
    #[must_use]
    pub fn values(&self) -> TypedList {
        TypedList::from_parts(
            self.value.clone(),
            self.entries.iter().map(|(_, v)| v.clone()).collect(),
        )
    }

    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Object with stringified keys; class keys use their qualified name.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (serialize::key_to_string(k), serialize::to_json(v)))
                .collect(),
        )
    }

    fn empty_like(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            dict_type: self.dict_type.clone(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn check_entry(&self, key: Value, value: Value) -> Result<(Value, Value), Error> {
        let site = Site::Key(key.to_string());
        let key = check_item(DICT_LABEL, Role::Key, &self.key, key, site.clone())?;
        let value = check_item(DICT_LABEL, Role::Value, &self.value, value, site)?;

        Ok((key, value))
    }

    fn store(&mut self, key: Value, value: Value) -> Option<Value> {
        if let Some(&index) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[index].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));

        None
    }

    // Direct match first, then the key converted to the key annotation.
    fn position(&self, key: &Value) -> Option<usize> {
        if let Some(&index) = self.index.get(key) {
            return Some(index);
        }

        let ctx = Context::new(None, Site::Root);
        let converted = validate::check_or_coerce(&self.key, key.clone(), &ctx).ok()?;
        self.index.get(&converted).copied()
    }
}

impl PartialEq for TypedDict {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

impl IntoIterator for TypedDict {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

///
/// TESTS
///
