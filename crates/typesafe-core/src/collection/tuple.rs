use crate::{
    annotation::Annotation,
    collection::{Role, TUPLE_LABEL, check_item},
    error::{Error, Site},
    serialize,
    value::Value,
};
use derive_more::Deref;

///
/// TypedTuple
///
/// Fixed-arity tuple with one annotation per slot. Immutable once built.
///

#[derive(Clone, Debug, Deref)]
pub struct TypedTuple {
    slots: Vec<Annotation>,
    #[deref]
    items: Vec<Value>,
}

impl TypedTuple {
    /// Build a tuple, checking arity and every slot.
    pub fn new(slots: Vec<Annotation>, items: Vec<Value>) -> Result<Self, Error> {
        if slots.len() != items.len() {
            let message = format!(
                "In {TUPLE_LABEL}: Expected {} elements, got {}",
                slots.len(),
                items.len()
            );
            let expected = Annotation::Tuple(slots);

            return Err(Error::type_mismatch_with(&Site::Root, &expected, "tuple", message));
        }

        let items = slots
            .iter()
            .zip(items)
            .enumerate()
            .map(|(i, (slot, item))| check_item(TUPLE_LABEL, Role::Item, slot, item, Site::Index(i)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { slots, items })
    }

    // Items are already known to satisfy their slots.
    pub(crate) const fn from_parts(slots: Vec<Annotation>, items: Vec<Value>) -> Self {
        Self { slots, items }
    }

    #[must_use]
    pub fn slots(&self) -> &[Annotation] {
        &self.slots
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
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
    pub fn json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.items.iter().map(serialize::to_json).collect())
    }
}

impl PartialEq for TypedTuple {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<'a> IntoIterator for &'a TypedTuple {
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

    #[test]
    fn slots_are_checked_positionally() {
        let tuple = TypedTuple::new(
            vec![Annotation::Primitive(safe_id()), Annotation::Int],
            vec!["abc".into(), 2.into()],
        )
        .expect("tuple");

        assert!(matches!(&tuple[0], Value::Primitive(_)));
        assert_eq!(tuple.get(1), Some(&Value::Int(2)));
        assert_eq!(tuple.json(), serde_json::json!(["abc", 2]));

        let err = TypedTuple::new(vec![Annotation::Int, Annotation::Int], vec![1.into(), "x".into()])
            .expect_err("slot 1");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn arity_must_match() {
        let err = TypedTuple::new(vec![Annotation::Int, Annotation::Str], vec![1.into()])
            .expect_err("short");

        assert_eq!(err.to_string(), "In Type_Safe__Tuple: Expected 2 elements, got 1");
    }
}
