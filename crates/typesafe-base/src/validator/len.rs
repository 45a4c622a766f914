use super::num::collection_len;
use typesafe_core::{annotation::FieldValidator, value::Value};

///
/// Length
///
/// Character count for strings, element count for collections.
///

#[derive(Clone, Debug, Default)]
pub struct Length {
    min: Option<usize>,
    max: Option<usize>,
}

impl Length {
    #[must_use]
    pub const fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    #[must_use]
    pub const fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    #[must_use]
    pub const fn at_most(max: usize) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    #[must_use]
    pub const fn exactly(len: usize) -> Self {
        Self::between(len, len)
    }
}

impl FieldValidator for Length {
    fn name(&self) -> &str {
        "Length"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        let len = value
            .as_str()
            .map(|s| s.chars().count())
            .or_else(|| collection_len(value))
            .ok_or_else(|| format!("value of type {} has no length", value.type_name()))?;

        if let Some(min) = self.min
            && len < min
        {
            return Err(format!("length ({len}) is lower than minimum of {min}"));
        }
        if let Some(max) = self.max
            && len > max
        {
            return Err(format!("length ({len}) is greater than maximum of {max}"));
        }

        Ok(())
    }
}

///
/// TESTS
///
