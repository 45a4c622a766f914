use typesafe_core::{
    annotation::FieldValidator,
    value::{Value, float_repr},
};

// Numbers compare by value; strings and collections by length.
#[allow(clippy::cast_precision_loss)]
fn measure(value: &Value) -> Result<f64, String> {
    match value {
        Value::Bool(_) => Err("boolean values cannot be compared".to_string()),
        _ => value
            .as_int()
            .map(|i| i as f64)
            .or_else(|| value.as_float())
            .or_else(|| value.as_str().map(|s| s.chars().count() as f64))
            .or_else(|| collection_len(value).map(|n| n as f64))
            .ok_or_else(|| format!("cannot compare value of type {}", value.type_name())),
    }
}

pub(super) fn collection_len(value: &Value) -> Option<usize> {
    match value {
        Value::TypedList(list) => Some(list.len()),
        Value::TypedDict(dict) => Some(dict.len()),
        Value::TypedSet(set) => Some(set.len()),
        Value::TypedTuple(tuple) => Some(tuple.len()),
        Value::List(items) | Value::Tuple(items) => Some(items.len()),
        Value::Map(entries) => Some(entries.len()),
        Value::Bytes(bytes) => Some(bytes.len()),
        _ => None,
    }
}

///
/// Min
///
/// Inclusive lower bound.
///

#[derive(Clone, Debug)]
pub struct Min {
    target: f64,
}

impl Min {
    #[must_use]
    pub const fn new(target: f64) -> Self {
        Self { target }
    }
}

impl FieldValidator for Min {
    fn name(&self) -> &str {
        "Min"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        let v = measure(value)?;

        if v >= self.target {
            Ok(())
        } else {
            Err(format!("{} must be >= {}", float_repr(v), float_repr(self.target)))
        }
    }
}

///
/// Max
///
/// Inclusive upper bound.
///

#[derive(Clone, Debug)]
pub struct Max {
    target: f64,
}

impl Max {
    #[must_use]
    pub const fn new(target: f64) -> Self {
        Self { target }
    }
}

impl FieldValidator for Max {
    fn name(&self) -> &str {
        "Max"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        let v = measure(value)?;

        if v <= self.target {
            Ok(())
        } else {
            Err(format!("{} must be <= {}", float_repr(v), float_repr(self.target)))
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        assert!(Min::new(0.0).validate(&Value::Int(0)).is_ok());
        assert!(Max::new(10.0).validate(&Value::Float(10.0)).is_ok());

        assert_eq!(
            Min::new(1.0).validate(&Value::Int(0)).expect_err("below"),
            "0.0 must be >= 1.0"
        );
        assert_eq!(
            Max::new(2.5).validate(&Value::Float(2.75)).expect_err("above"),
            "2.75 must be <= 2.5"
        );
    }

    #[test]
    fn strings_and_collections_use_their_length() {
        assert!(Max::new(3.0).validate(&Value::from("abc")).is_ok());
        assert!(Max::new(3.0).validate(&Value::from("abcd")).is_err());
        assert!(Min::new(2.0).validate(&Value::List(vec![Value::Int(1)])).is_err());
    }

    #[test]
    fn bools_are_not_numbers() {
        assert!(Min::new(0.0).validate(&Value::Bool(true)).is_err());
    }
}
