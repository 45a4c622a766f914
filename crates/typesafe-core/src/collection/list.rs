use crate::{
    annotation::Annotation,
    collection::{LIST_LABEL, Role, check_all, check_item, contains_converted},
    error::{Error, Site},
    instance::Instance,
    serialize,
    value::Value,
};
use derive_more::Deref;

///
/// TypedList
///
/// Ordered list whose items all satisfy one element annotation.
///
/// Every mutator checks first and mutates second; a rejected item leaves
/// the list as it was. Read access goes through `Deref<Target = [Value]>`.
///

#[derive(Clone, Debug, Deref)]
pub struct TypedList {
    element: Annotation,
    #[deref]
    items: Vec<Value>,
}

impl TypedList {
    /// Create an empty list of `element`.
    #[must_use]
    pub fn new(element: impl Into<Annotation>) -> Self {
        Self {
            element: element.into(),
            items: Vec::new(),
        }
    }

    /// Build a list, checking and converting every item.
    pub fn from_items(
        element: impl Into<Annotation>,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Self, Error> {
        let element = element.into();
        let items = check_all(LIST_LABEL, &element, items, 0)?;

        Ok(Self { element, items })
    }

    // Items are already known to satisfy `element`.
    pub(crate) const fn from_parts(element: Annotation, items: Vec<Value>) -> Self {
        Self { element, items }
    }

    #[must_use]
    pub const fn element(&self) -> &Annotation {
        &self.element
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        self.items
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// The object at `index`, for editing through its own checked setters.
    /// Replacing an item goes through `set`.
    pub fn object_mut(&mut self, index: usize) -> Option<&mut Instance> {
        self.items.get_mut(index).and_then(Value::as_object_mut)
    }

    /// Append one item.
    pub fn push(&mut self, item: impl Into<Value>) -> Result<(), Error> {
        let item = self.check(item.into(), self.items.len())?;
        self.items.push(item);

        Ok(())
    }

    /// Insert at `index`, clamping out-of-bounds indices to the tail.
    pub fn insert(&mut self, index: usize, item: impl Into<Value>) -> Result<(), Error> {
        let index = index.min(self.items.len());
        let item = self.check(item.into(), index)?;
        self.items.insert(index, item);

        Ok(())
    }

    /// Append every item, or none of them.
    pub fn extend(&mut self, items: impl IntoIterator<Item = Value>) -> Result<(), Error> {
        let checked = check_all(LIST_LABEL, &self.element, items, self.items.len())?;
        self.items.extend(checked);

        Ok(())
    }

    /// `list += items`.
    pub fn extend_assign(&mut self, items: impl IntoIterator<Item = Value>) -> Result<&mut Self, Error> {
        self.extend(items)?;

        Ok(self)
    }

    /// Replace the item at `index`, returning the old one. Out-of-range
    /// indices change nothing and return `None`.
    pub fn set(&mut self, index: usize, item: impl Into<Value>) -> Result<Option<Value>, Error> {
        let item = self.check(item.into(), index)?;

        Ok(self
            .items
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, item)))
    }

    /// `list + other`: a new list, `other` checked against this element.
    pub fn concat(&self, other: impl IntoIterator<Item = Value>) -> Result<Self, Error> {
        let mut result = self.copy();
        result.extend(other)?;

        Ok(result)
    }

    /// `other + list`.
    pub fn concat_left(&self, other: impl IntoIterator<Item = Value>) -> Result<Self, Error> {
        let mut items = check_all(LIST_LABEL, &self.element, other, 0)?;
        items.extend(self.items.iter().cloned());

        Ok(Self::from_parts(self.element.clone(), items))
    }

    /// `list * n`.
    #[must_use]
    pub fn repeat(&self, n: usize) -> Self {
        Self::from_parts(self.element.clone(), self.repeated(n))
    }

    /// `list *= n`.
    pub fn repeat_assign(&mut self, n: usize) -> &mut Self {
        self.items = self.repeated(n);
        self
    }

    /// A new list with the same element annotation.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Membership, also matching a candidate the element type would convert
    /// (a plain string for a primitive element, a member name for an enum).
    #[must_use]
    pub fn contains(&self, candidate: &Value) -> bool {
        contains_converted(&self.element, |v| self.items.contains(v), candidate)
    }

    /// Remove and return the item at `index`, if it exists.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.items.iter().map(serialize::to_json).collect())
    }

    fn repeated(&self, n: usize) -> Vec<Value> {
        (0..n).flat_map(|_| self.items.iter().cloned()).collect()
    }

    fn check(&self, item: Value, index: usize) -> Result<Value, Error> {
        check_item(LIST_LABEL, Role::Item, &self.element, item, Site::Index(index))
    }
}

impl PartialEq for TypedList {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl IntoIterator for TypedList {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a TypedList {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
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
        test_support::{person, safe_id, status_enum},
    };

    fn ints(items: &[i64]) -> TypedList {
        TypedList::from_items(Annotation::Int, items.iter().map(|&i| Value::Int(i))).expect("ints")
    }

    #[test]
    fn push_rejects_wrong_type_without_mutating() {
        let mut list = ints(&[1, 2]);

        let err = list.push("three").expect_err("str");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(
            err.to_string(),
            "In Type_Safe__List: Invalid type for item: Expected 'int', but got 'str'"
        );
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn extend_is_all_or_nothing() {
        let mut list = ints(&[1]);

        let err = list
            .extend(vec![Value::Int(2), Value::from("x"), Value::Int(4)])
            .expect_err("mixed");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(list.as_slice(), &[Value::Int(1)]);

        list.extend_assign(vec![Value::Int(2), Value::Int(3)]).expect("ints");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn primitive_elements_are_converted() {
        let mut list = TypedList::new(safe_id());
        list.push("abc").expect("convert");

        assert!(matches!(&list[0], Value::Primitive(p) if p.is_a(&safe_id())));
        assert!(list.contains(&"abc".into()));
        assert!(list.contains(&list[0].clone()));

        let err = list.push(Value::Bytes(vec![1])).expect_err("bytes");
        assert!(err.to_string().starts_with("In Type_Safe__List: Could not convert bytes to Safe_Id"));
    }

    #[test]
    fn contains_recognises_enum_names_and_values() {
        let status = status_enum();
        let mut list = TypedList::new(&status);
        list.push("ACTIVE").expect("by name");

        assert!(list.contains(&"ACTIVE".into()));
        assert!(list.contains(&"active".into()));
        assert!(!list.contains(&"PENDING".into()));
    }

    #[test]
    fn arithmetic_returns_new_typed_lists() {
        let list = ints(&[1, 2]);

        let joined = list.concat(vec![Value::Int(3)]).expect("concat");
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.element(), &Annotation::Int);
        assert!(list.concat(vec![Value::from("x")]).is_err());

        let left = list.concat_left(vec![Value::Int(0)]).expect("radd");
        assert_eq!(left[0], Value::Int(0));

        let tripled = list.repeat(3);
        assert_eq!(tripled.as_slice(), ints(&[1, 2, 1, 2, 1, 2]).as_slice());
        assert_eq!(tripled.element(), &Annotation::Int);
        assert!(list.repeat(0).is_empty());

        let mut repeated = list.copy();
        repeated.repeat_assign(2);
        assert_eq!(repeated.as_slice(), ints(&[1, 2, 1, 2]).as_slice());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn repeated_lists_keep_checking_their_items() {
        let mut list = ints(&[7]).repeat(2);

        assert!(list.push("x").is_err());
        list.push(8).expect("int");
        assert_eq!(list.as_slice(), ints(&[7, 7, 8]).as_slice());
    }

    #[test]
    fn nested_objects_are_edited_through_their_own_setters() {
        let mut list = TypedList::new(person());
        list.push(Instance::new(&person()).expect("person")).expect("push");
        list.push(1).expect_err("int");

        let nested = list.object_mut(0).expect("object");
        nested.set("age", 5).expect("age");
        assert!(nested.set("age", "old").is_err());

        assert_eq!(list[0].as_object().expect("object").get("age").expect("age"), &Value::Int(5));
        assert!(ints(&[1]).object_mut(0).is_none());
        assert!(list.object_mut(3).is_none());
    }

    #[test]
    fn mappings_for_object_elements_build_through_the_constructor() {
        let mut list = TypedList::new(person());

        list.push(Value::Map(vec![("name".into(), "Ana".into()), ("age".into(), 3.into())]))
            .expect("known keys");
        assert_eq!(list.json(), serde_json::json!([{"name": "Ana", "age": 3}]));

        let err = list
            .push(Value::Map(vec![("name".into(), "Bo".into()), ("extra".into(), 1.into())]))
            .expect_err("unknown key");
        assert_eq!(err.kind(), ErrorKind::UnknownAttribute);

        let err = list
            .push(Value::Map(vec![("age".into(), "old".into())]))
            .expect_err("bad age");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn set_replaces_in_range_only() {
        let mut list = ints(&[1, 2]);

        assert_eq!(list.set(0, 9).expect("set"), Some(Value::Int(1)));
        assert_eq!(list.set(5, 9).expect("out of range"), None);
        assert!(list.set(1, "x").is_err());
        assert_eq!(list.as_slice(), &[Value::Int(9), Value::Int(2)]);
    }

    #[test]
    fn fast_collections_store_raw_items() {
        let mut list = ints(&[]);

        with_config(
            Config {
                fast_collections: true,
                ..Config::default()
            },
            || list.push("raw"),
        )
        .expect("unchecked");
        assert_eq!(list[0], Value::from("raw"));
    }

    #[test]
    fn json_projects_items() {
        let list = ints(&[1, 2]);

        assert_eq!(list.json(), serde_json::json!([1, 2]));
    }
}
