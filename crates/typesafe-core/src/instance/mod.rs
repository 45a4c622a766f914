//! Instances of Type-Safe classes.
//!
//! An `Instance` owns its slots in declaration order: merged fields first,
//! class variables after. Every write goes through the setattr path, so a
//! stored value always satisfies its field's annotation unless a config
//! scope turned checking off.

pub(crate) mod init;
mod kwargs;
mod obj;
mod setattr;

pub use kwargs::Kwargs;
pub use obj::ObjView;

use crate::{
    class::Class,
    collection::{TypedDict, TypedList, TypedSet},
    config,
    deserialize::{self, ResolverPolicy},
    error::{Error, Site},
    fast_create,
    resolver::{self, ClassDescriptor},
    serialize,
    value::Value,
};
use std::{
    fmt,
    sync::{Arc, OnceLock},
};

///
/// FromJsonOptions
///

#[derive(Clone, Debug, Default)]
pub struct FromJsonOptions {
    /// Reject incoming keys the class does not declare.
    pub strict: bool,
    /// Gate for `Type[T]` references.
    pub policy: ResolverPolicy,
}

impl FromJsonOptions {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}

///
/// Instance
///

#[derive(Clone)]
pub struct Instance {
    class: Class,
    descriptor: Arc<ClassDescriptor>,
    slots: Vec<(String, Value)>,
}

impl Instance {
    /// Build with class defaults only.
    pub fn new(class: &Class) -> Result<Self, Error> {
        Self::with_kwargs(class, Kwargs::new())
    }

    /// Build with class defaults, then apply `kwargs` through setattr.
    /// Inside a `fast_create` scope the cached schema is used instead and
    /// `kwargs` are stored unchecked.
    pub fn with_kwargs(class: &Class, kwargs: Kwargs) -> Result<Self, Error> {
        if config::current().fast_create {
            return fast_create::cache().create(class, kwargs);
        }

        init::initialize(class, kwargs)
    }

    pub fn from_json(
        class: &Class,
        json: &serde_json::Value,
        options: &FromJsonOptions,
    ) -> Result<Self, Error> {
        deserialize::instance_from_json(class, json, options)
    }

    pub fn from_json_str(class: &Class, text: &str, options: &FromJsonOptions) -> Result<Self, Error> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|err| Error::malformed("a JSON document", err.to_string()))?;

        Self::from_json(class, &json, options)
    }

    pub(crate) const fn from_parts(
        class: Class,
        descriptor: Arc<ClassDescriptor>,
        slots: Vec<(String, Value)>,
    ) -> Self {
        Self {
            class,
            descriptor,
            slots,
        }
    }

    #[must_use]
    pub const fn class(&self) -> &Class {
        &self.class
    }

    #[must_use]
    pub fn descriptor(&self) -> &ClassDescriptor {
        &self.descriptor
    }

    /// Slots in declaration order. Deferred children are reported as is.
    pub fn slots(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Read an attribute. A deferred child is built on first read.
    pub fn get(&self, name: &str) -> Result<&Value, Error> {
        match self.slot(name) {
            Some(Value::Deferred(deferred)) => deferred.force(),
            Some(value) => Ok(value),
            None => Err(self.no_such_attribute(name)),
        }
    }

    /// Assign an attribute through the validator.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        setattr::assign(self, name, value.into())
    }

    /// Mutable access to a nested object, materialising it if deferred.
    pub fn object_mut(&mut self, name: &str) -> Result<&mut Self, Error> {
        let slot = self.slot_mut_forced(name)?;
        let actual = slot.type_name().to_string();

        slot.as_object_mut()
            .ok_or_else(|| Error::type_mismatch(&Site::field(name), "Type_Safe", &actual))
    }

    pub fn list_mut(&mut self, name: &str) -> Result<&mut TypedList, Error> {
        match self.slot_mut_forced(name)? {
            Value::TypedList(list) => Ok(list),
            other => Err(Error::type_mismatch(&Site::field(name), "Type_Safe__List", other.type_name())),
        }
    }

    pub fn dict_mut(&mut self, name: &str) -> Result<&mut TypedDict, Error> {
        match self.slot_mut_forced(name)? {
            Value::TypedDict(dict) => Ok(dict),
            other => Err(Error::type_mismatch(&Site::field(name), "Type_Safe__Dict", other.type_name())),
        }
    }

    pub fn set_mut(&mut self, name: &str) -> Result<&mut TypedSet, Error> {
        match self.slot_mut_forced(name)? {
            Value::TypedSet(set) => Ok(set),
            other => Err(Error::type_mismatch(&Site::field(name), "Type_Safe__Set", other.type_name())),
        }
    }

    ///
    /// JSON
    ///

    /// Plain-data projection; deferred children are materialised.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serialize::instance_to_json(self)
    }

    /// Compact JSON text.
    #[must_use]
    pub fn json_string(&self) -> String {
        self.json().to_string()
    }

    /// UTF-8 bytes of `json_string`.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.json_string().into_bytes()
    }

    /// Attribute-style read-only view over `json()`.
    #[must_use]
    pub fn obj(&self) -> ObjView {
        ObjView::new(self.json())
    }

    ///
    /// BULK OPERATIONS
    ///

    /// Adopt `other`'s values for every field both classes declare; fields
    /// only this instance has keep their values.
    pub fn merge_with(&mut self, other: &Self) -> Result<&mut Self, Error> {
        for (name, value) in &other.slots {
            if self.slot(name).is_some() {
                setattr::assign(self, name, value.clone())?;
            }
        }

        Ok(self)
    }

    /// Put every field back to its class-level starting value.
    pub fn reset(&mut self) -> Result<(), Error> {
        for (name, value) in resolver::class_kwargs(&self.class)? {
            if let Some(slot) = self.slot_mut(&name) {
                *slot = value;
            }
        }

        Ok(())
    }

    /// Every name the class provides a value for (fields and class
    /// variables), with this instance's current values.
    #[must_use]
    pub fn default_kwargs(&self) -> Kwargs {
        self.slots.iter().cloned().collect()
    }

    /// Current values of the declared fields only.
    #[must_use]
    pub fn kwargs(&self) -> Kwargs {
        self.slots
            .iter()
            .filter(|(name, _)| self.descriptor.field(name).is_some())
            .cloned()
            .collect()
    }

    /// Assign every non-`None` value through setattr.
    pub fn update_from_kwargs(&mut self, kwargs: Kwargs) -> Result<&mut Self, Error> {
        for (name, value) in kwargs {
            if !value.is_none() {
                setattr::assign(self, &name, value)?;
            }
        }

        Ok(self)
    }

    ///
    /// SLOTS
    ///

    fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.slots
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    // Replaces a deferred child with its built instance before handing out
    // mutable access.
    fn slot_mut_forced(&mut self, name: &str) -> Result<&mut Value, Error> {
        let error = self.no_such_attribute(name);
        let slot = self.slot_mut(name).ok_or(error)?;

        if let Value::Deferred(deferred) = slot {
            let built = deferred.force()?.clone();
            *slot = built;
        }

        Ok(slot)
    }

    pub(crate) fn store(&mut self, name: &str, value: Value) {
        match self.slot_mut(name) {
            Some(slot) => *slot = value,
            None => self.slots.push((name.to_string(), value)),
        }
    }

    fn no_such_attribute(&self, name: &str) -> Error {
        let class = self.class.name();

        Error::unknown_attribute(
            class,
            name,
            format!("'{class}' object has no attribute '{name}'"),
        )
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.json() == other.json()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.class.name());
        for (name, value) in &self.slots {
            s.field(name, value);
        }
        s.finish()
    }
}

///
/// Deferred
///
/// A nested object that is built the first time it is read. Writing the
/// slot replaces it outright.
///

#[derive(Clone, Debug)]
pub struct Deferred {
    class: Class,
    cell: Box<OnceLock<Value>>,
}

impl Deferred {
    #[must_use]
    pub fn new(class: &Class) -> Self {
        Self {
            class: class.clone(),
            cell: Box::default(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> &Class {
        &self.class
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Build the object if needed and return it.
    pub fn force(&self) -> Result<&Value, Error> {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }

        tracing::trace!(class = %self.class.name(), "materialising deferred object");
        let instance = Instance::new(&self.class)?;

        Ok(self.cell.get_or_init(|| Value::Object(instance)))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annotation::Annotation,
        config::{Config, with_config},
        error::ErrorKind,
        test_support::{node, person, safe_int, safe_str},
    };
    use serde_json::json;
    use std::sync::LazyLock;

    static ADDRESS: LazyLock<Class> = LazyLock::new(|| {
        Class::builder("Address")
            .field("city", Annotation::Str)
            .build()
            .expect("address")
    });

    static CUSTOMER: LazyLock<Class> = LazyLock::new(|| {
        Class::builder("Customer")
            .field("name", safe_str())
            .field("address", &*ADDRESS)
            .field("tags", Annotation::list(Annotation::Str))
            .class_var("version", 2)
            .build()
            .expect("customer")
    });

    #[test]
    fn construction_applies_defaults_then_kwargs() {
        let alice = Instance::with_kwargs(&person(), kwargs! {"name" => "Alice", "age" => 30})
            .expect("alice");

        assert_eq!(alice.json(), json!({"name": "Alice", "age": 30}));
        assert!(matches!(alice.get("name"), Ok(Value::Primitive(_))));

        let blank = Instance::new(&person()).expect("blank");
        assert_eq!(blank.json(), json!({"name": "", "age": 0}));
    }

    #[test]
    fn unknown_kwargs_are_rejected() {
        let err = Instance::with_kwargs(&person(), kwargs! {"height" => 180}).expect_err("unknown");

        assert_eq!(err.kind(), ErrorKind::UnknownAttribute);
        assert_eq!(
            err.to_string(),
            "Person has no attribute 'height' and cannot be assigned the value '180'. \
             Use Person.__default_kwargs__() see what attributes are available"
        );
    }

    #[test]
    fn none_kwargs_keep_the_default() {
        let p = Instance::with_kwargs(&person(), kwargs! {"age" => None::<i64>}).expect("none");

        assert_eq!(p.get("age").expect("age"), &Value::Int(0));
    }

    #[test]
    fn assignment_is_checked() {
        let mut p = Instance::new(&person()).expect("person");

        let err = p.set("age", "thirty").expect_err("str");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(
            err.to_string(),
            "Invalid type for attribute 'age'. Expected 'int' but got 'str'"
        );

        let err = p.set("age", Value::None).expect_err("none");
        assert_eq!(
            err.to_string(),
            "Can't set None, to a variable that is already set. Invalid type for attribute 'age'. \
             Expected 'int' but got '<class 'NoneType'>'"
        );

        let err = p.set("height", 1).expect_err("undeclared");
        assert_eq!(err.kind(), ErrorKind::UnknownAttribute);
        assert_eq!(p.get("age").expect("age"), &Value::Int(0));
    }

    #[test]
    fn primitive_fields_convert_plain_input() {
        let class = Class::builder("Counter")
            .field("count", safe_int())
            .build()
            .expect("counter");
        let mut counter = Instance::new(&class).expect("counter");

        counter.set("count", "42").expect("numeric string");
        assert_eq!(counter.get("count").expect("count").as_int(), Some(42));
    }

    #[test]
    fn skip_validation_stores_raw() {
        let mut p = Instance::new(&person()).expect("person");

        with_config(
            Config {
                skip_validation: true,
                ..Config::default()
            },
            || p.set("age", "raw"),
        )
        .expect("unchecked");
        assert_eq!(p.get("age").expect("age"), &Value::from("raw"));
    }

    #[test]
    fn nested_objects_and_collections_are_mutable_in_place() {
        let mut c = Instance::new(&CUSTOMER).expect("customer");

        c.object_mut("address")
            .expect("address")
            .set("city", "Lisbon")
            .expect("city");
        c.list_mut("tags").expect("tags").push("vip").expect("push");
        assert!(c.list_mut("tags").expect("tags").push(1).is_err());
        assert!(c.dict_mut("tags").is_err());

        assert_eq!(
            c.json(),
            json!({"name": "", "address": {"city": "Lisbon"}, "tags": ["vip"], "version": 2})
        );
    }

    #[test]
    fn mappings_build_nested_objects() {
        let c = Instance::with_kwargs(
            &CUSTOMER,
            kwargs! {"address" => Value::Map(vec![("city".into(), "Porto".into())])},
        )
        .expect("customer");

        let address = c.get("address").expect("address").as_object().expect("object");
        assert_eq!(address.get("city").expect("city"), &Value::from("Porto"));
    }

    #[test]
    fn on_demand_children_build_on_read() {
        let c = with_config(Config::on_demand_mode(), || Instance::new(&CUSTOMER)).expect("lazy");

        assert!(matches!(c.slots().nth(1), Some((_, Value::Deferred(d))) if !d.is_built()));
        assert!(c.get("address").expect("address").as_object().is_some());
        assert_eq!(c.json()["address"], json!({"city": ""}));
    }

    #[test]
    fn self_referencing_fields_start_empty() {
        let n = Instance::new(&node()).expect("node");

        assert_eq!(n.json(), json!({"value": "", "children": []}));
    }

    #[test]
    fn merge_reset_and_kwargs() {
        let mut a = Instance::with_kwargs(&person(), kwargs! {"name" => "A", "age" => 1}).expect("a");
        let b = Instance::with_kwargs(&person(), kwargs! {"name" => "B", "age" => 2}).expect("b");

        a.merge_with(&b).expect("merge");
        assert_eq!(a, b);

        a.reset().expect("reset");
        assert_eq!(a.json(), json!({"name": "", "age": 0}));

        let c = Instance::with_kwargs(&CUSTOMER, kwargs! {"name" => "x"}).expect("c");
        assert_eq!(c.kwargs().len(), 3);
        assert_eq!(c.default_kwargs().len(), 4);
        assert_eq!(c.default_kwargs().get("version"), Some(&Value::Int(2)));
    }

    #[test]
    fn update_from_kwargs_skips_none() {
        let mut p = Instance::with_kwargs(&person(), kwargs! {"age" => 5}).expect("p");

        p.update_from_kwargs(kwargs! {"name" => "Z", "age" => None::<i64>})
            .expect("update");
        assert_eq!(p.json(), json!({"name": "Z", "age": 5}));
        assert!(p.update_from_kwargs(kwargs! {"age" => "x"}).is_err());
    }

    #[test]
    fn json_text_and_obj_view() {
        let p = Instance::with_kwargs(&person(), kwargs! {"name" => "Ann", "age" => 7}).expect("p");

        assert_eq!(p.json_string(), r#"{"name":"Ann","age":7}"#);
        assert_eq!(p.bytes(), p.json_string().into_bytes());
        assert_eq!(p.obj().attr("name").as_deref(), Some(&json!("Ann")));
    }
}
