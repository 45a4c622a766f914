use regex::Regex as Compiled;
use typesafe_core::{
    annotation::{FieldValidator, ViolationKind},
    value::Value,
};

///
/// Regex
///
/// Whole-value match against a pattern.
///

#[derive(Clone, Debug)]
pub struct Regex {
    source: String,
    compiled: Compiled,
}

impl Regex {
    /// Compile `pattern`, anchored at both ends.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let compiled = Compiled::new(&format!("^(?:{pattern})$"))?;

        Ok(Self {
            source: pattern.to_string(),
            compiled,
        })
    }
}

impl FieldValidator for Regex {
    fn name(&self) -> &str {
        "Regex"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        let text = value
            .as_str()
            .ok_or_else(|| format!("expected a string, got {}", value.type_name()))?;

        if self.compiled.is_match(text) {
            Ok(())
        } else {
            Err(format!("'{text}' does not match pattern '{}'", self.source))
        }
    }

    fn violation(&self) -> ViolationKind {
        ViolationKind::Pattern
    }
}

///
/// OneOf
///
/// Value must equal one of a fixed set; primitives compare by their base
/// scalar.
///

#[derive(Clone, Debug)]
pub struct OneOf {
    allowed: Vec<Value>,
}

impl OneOf {
    #[must_use]
    pub fn new<I, V>(allowed: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

impl FieldValidator for OneOf {
    fn name(&self) -> &str {
        "OneOf"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if self.allowed.contains(value) {
            return Ok(());
        }

        let allowed = self
            .allowed
            .iter()
            .map(Value::repr)
            .collect::<Vec<_>>()
            .join(", ");

        Err(format!("{} is not one of [{allowed}]", value.repr()))
    }

    fn violation(&self) -> ViolationKind {
        ViolationKind::Pattern
    }
}

///
/// TESTS
///
