use crate::{
    annotation::Annotation,
    collection::{SET_LABEL, Role, check_all, check_item, contains_converted},
    error::{Error, Site},
    serialize,
    value::Value,
};
use std::collections::HashMap;

///
/// TypedSet
///
/// Set of values satisfying one element annotation. Iteration follows
/// insertion order so the JSON projection is stable; `index` maps each
/// member to its position.
///
/// Equality uses `Value`'s semantics: a constrained primitive and its base
/// scalar are the same member.
///

#[derive(Clone, Debug)]
pub struct TypedSet {
    element: Annotation,
    items: Vec<Value>,
    index: HashMap<Value, usize>,
}

impl TypedSet {
    #[must_use]
    pub fn new(element: impl Into<Annotation>) -> Self {
        Self {
            element: element.into(),
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a set, checking every item; duplicates collapse.
    pub fn from_items(
        element: impl Into<Annotation>,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Self, Error> {
        let mut set = Self::new(element);
        set.update(items)?;

        Ok(set)
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
    pub fn contains(&self, candidate: &Value) -> bool {
        contains_converted(&self.element, |v| self.index.contains_key(v), candidate)
    }

    /// Add one item. Returns whether it was new.
    pub fn add(&mut self, item: impl Into<Value>) -> Result<bool, Error> {
        let item = check_item(
            SET_LABEL,
            Role::Item,
            &self.element,
            item.into(),
            Site::Index(self.items.len()),
        )?;

        Ok(self.insert_checked(item))
    }

    /// Add every item, or none of them.
    pub fn update(&mut self, items: impl IntoIterator<Item = Value>) -> Result<(), Error> {
        for item in check_all(SET_LABEL, &self.element, items, 0)? {
            self.insert_checked(item);
        }

        Ok(())
    }

    /// `set |= items`.
    pub fn union_assign(&mut self, items: impl IntoIterator<Item = Value>) -> Result<&mut Self, Error> {
        self.update(items)?;

        Ok(self)
    }

    /// `set | items`.
    pub fn union(&self, items: impl IntoIterator<Item = Value>) -> Result<Self, Error> {
        let mut result = self.clone();
        result.update(items)?;

        Ok(result)
    }

    /// `set ^ items`. Incoming items are checked.
    pub fn symmetric_difference(&self, items: impl IntoIterator<Item = Value>) -> Result<Self, Error> {
        let incoming = Self::from_items(self.element.clone(), items)?;
        let mut result = self.difference(&incoming);
        for item in incoming.items {
            if !self.index.contains_key(&item) {
                result.insert_checked(item);
            }
        }

        Ok(result)
    }

    /// `set & other`. Every member already belongs to `self`.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        self.retained(|item| other.index.contains_key(item))
    }

    /// `set - other`. Every member already belongs to `self`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.retained(|item| !other.index.contains_key(item))
    }

    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.items.iter().all(|item| other.index.contains_key(item))
    }

    /// Remove and return the stored member equal to `item`.
    pub fn remove(&mut self, item: &Value) -> Option<Value> {
        let position = self.index.remove(item)?;
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }

        Some(self.items.remove(position))
    }

    /// Remove `item` if present; returns whether anything changed.
    pub fn discard(&mut self, item: &Value) -> bool {
        self.remove(item).is_some()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.items.iter().map(serialize::to_json).collect())
    }

    fn insert_checked(&mut self, item: Value) -> bool {
        if self.index.contains_key(&item) {
            return false;
        }
        self.index.insert(item.clone(), self.items.len());
        self.items.push(item);

        true
    }

    fn retained(&self, keep: impl Fn(&Value) -> bool) -> Self {
        let mut result = Self::new(self.element.clone());
        for item in self.items.iter().filter(|v| keep(v)) {
            result.insert_checked(item.clone());
        }

        result
    }
}

impl PartialEq for TypedSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }
}

impl IntoIterator for TypedSet {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a TypedSet {
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
    use crate::{error::ErrorKind, test_support::safe_id};

    fn strs(items: &[&str]) -> TypedSet {
        TypedSet::from_items(Annotation::Str, items.iter().map(|&s| Value::from(s))).expect("strs")
    }

    #[test]
    fn duplicates_collapse_and_wrong_types_are_rejected() {
        let mut set = strs(&["a", "b", "b", "c"]);
        assert_eq!(set.len(), 3);

        let err = set.add(1).expect_err("int");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(
            err.to_string(),
            "In Type_Safe__Set: Invalid type for item: Expected 'str', but got 'int'"
        );
        assert!(!set.add("a").expect("dup"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn converted_and_plain_forms_are_one_member() {
        let mut set = TypedSet::new(safe_id());
        set.add("abc").expect("convert");

        assert!(!set.add("abc").expect("again"));
        assert!(set.contains(&"abc".into()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn algebra_returns_typed_sets() {
        let left = strs(&["a", "b", "c"]);
        let right = strs(&["b", "c", "d"]);

        assert_eq!(left.intersection(&right), strs(&["b", "c"]));
        assert_eq!(left.difference(&right), strs(&["a"]));
        assert_eq!(
            left.symmetric_difference(right.clone()).expect("xor"),
            strs(&["a", "d"])
        );
        assert_eq!(left.union(right).expect("union").len(), 4);
        assert!(left.union(vec![Value::Int(1)]).is_err());
        assert!(left.symmetric_difference(vec![Value::Int(1)]).is_err());
    }

    #[test]
    fn union_assign_is_all_or_nothing() {
        let mut set = strs(&["a"]);

        assert!(set.union_assign(vec![Value::from("b"), Value::Int(2)]).is_err());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_and_discard() {
        let mut set = strs(&["a", "b"]);

        assert_eq!(set.remove(&"a".into()), Some(Value::from("a")));
        assert!(!set.discard(&"a".into()));
        assert!(set.discard(&"b".into()));
        assert!(set.is_empty());
    }

    #[test]
    fn removal_keeps_order_and_lookups_in_step() {
        let mut set = strs(&["a", "b", "c", "d"]);

        assert!(set.discard(&"b".into()));
        assert!(set.add("b").expect("re-add"));
        assert!(!set.add("c").expect("still present"));

        let order: Vec<Value> = set.iter().cloned().collect();
        assert_eq!(order, ["a", "c", "d", "b"].map(Value::from));
        assert_eq!(set.remove(&"d".into()), Some(Value::from("d")));
        assert!(set.contains(&"b".into()));
        assert!(!set.contains(&"d".into()));
    }

    #[test]
    fn large_sets_build_and_combine() {
        let count: i64 = 50_000;
        let evens = TypedSet::from_items(Annotation::Int, (0..count).map(|i| Value::Int(i * 2)))
            .expect("evens");
        let all = TypedSet::from_items(Annotation::Int, (0..count * 2).map(Value::Int)).expect("all");

        assert_eq!(evens.len(), 50_000);
        assert!(evens.is_subset(&all));
        assert_eq!(all.intersection(&evens), evens);
        assert_eq!(all.difference(&evens).len(), 50_000);
        assert!(evens.contains(&Value::Int(99_998)));
        assert!(!evens.contains(&Value::Int(99_999)));
    }
}
