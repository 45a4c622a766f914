use crate::value::Value;
use derive_more::{Deref, IntoIterator};

///
/// Kwargs
///
/// Ordered `name => value` pairs handed to a constructor. Inserting an
/// existing name replaces its value in place.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct Kwargs(Vec<(String, Value)>);

impl Kwargs {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();

        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }

        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.0.iter().position(|(n, _)| n == name)?;

        Some(self.0.remove(index).1)
    }

    /// Keyword arguments from a mapping. Fails with the first key that is
    /// not a string.
    pub fn from_entries(entries: Vec<(Value, Value)>) -> Result<Self, Value> {
        let mut kwargs = Self::new();
        for (key, value) in entries {
            match key {
                Value::Str(name) => {
                    kwargs.insert(name, value);
                }
                Value::Primitive(ref p) if p.as_str().is_some() => {
                    kwargs.insert(p.to_string(), value);
                }
                other => return Err(other),
            }
        }

        Ok(kwargs)
    }
}

impl FromIterator<(String, Value)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut kwargs = Self::new();
        for (name, value) in iter {
            kwargs.insert(name, value);
        }

        kwargs
    }
}

impl From<Vec<(String, Value)>> for Kwargs {
    fn from(pairs: Vec<(String, Value)>) -> Self {
        pairs.into_iter().collect()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut kwargs = kwargs! {"a" => 1, "b" => 2};
        kwargs.insert("a", 3);

        let names: Vec<&str> = kwargs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(kwargs.get("a"), Some(&Value::Int(3)));
        assert_eq!(kwargs.remove("b"), Some(Value::Int(2)));
        assert!(!kwargs.contains("b"));
    }

    #[test]
    fn from_entries_reports_the_first_bad_key() {
        let ok = Kwargs::from_entries(vec![("x".into(), 1.into())]).expect("string keys");
        assert_eq!(ok.len(), 1);

        let bad = Kwargs::from_entries(vec![("x".into(), 1.into()), (Value::Int(2), 3.into())])
            .expect_err("int key");
        assert_eq!(bad, Value::Int(2));
    }
}
