use derive_more::Deref;
use std::fmt;

///
/// ObjView
///
/// Read-only, attribute-style navigation over an instance's JSON
/// projection. Missing attributes and out-of-range indices yield `None`.
///

#[derive(Clone, Debug, Deref, PartialEq)]
pub struct ObjView(serde_json::Value);

impl ObjView {
    #[must_use]
    pub const fn new(json: serde_json::Value) -> Self {
        Self(json)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<Self> {
        self.0.get(name).cloned().map(Self)
    }

    #[must_use]
    pub fn at(&self, index: usize) -> Option<Self> {
        self.0.get(index).cloned().map(Self)
    }

    /// Follow a dotted path such as `children.0.value`; numeric segments
    /// index into arrays.
    #[must_use]
    pub fn path(&self, path: &str) -> Option<Self> {
        let mut node = &self.0;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            node = match (node, segment.parse::<usize>()) {
                (serde_json::Value::Array(items), Ok(index)) => items.get(index)?,
                (other, _) => other.get(segment)?,
            };
        }

        Some(Self(node.clone()))
    }

    /// Attribute names, for object nodes.
    #[must_use]
    pub fn attrs(&self) -> Vec<&str> {
        self.0
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

impl fmt::Display for ObjView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn navigates_objects_and_arrays() {
        let view = ObjView::new(json!({"a": {"b": [10, {"c": "x"}]}}));

        assert_eq!(view.attr("a").and_then(|a| a.attr("b")).and_then(|b| b.at(0)), Some(ObjView::new(json!(10))));
        assert_eq!(view.path("a.b.1.c").as_deref(), Some(&json!("x")));
        assert!(view.path("a.z").is_none());
        assert_eq!(view.attrs(), ["a"]);
    }
}
