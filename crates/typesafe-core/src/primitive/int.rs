use crate::{
    primitive::{PrimitiveError, PrimitiveErrorKind, Scalar},
    value::Value,
};

///
/// IntRules
///

#[derive(Clone, Debug)]
pub struct IntRules {
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub allow_bool: bool,
    pub allow_str: bool,
    /// `None` becomes zero.
    pub allow_none: bool,
    /// Only real integers; strings and floats are refused outright.
    pub strict_type: bool,
}

impl Default for IntRules {
    fn default() -> Self {
        Self {
            min_value: None,
            max_value: None,
            allow_bool: false,
            allow_str: true,
            allow_none: true,
            strict_type: false,
        }
    }
}

impl IntRules {
    #[must_use]
    pub fn range(min_value: Option<i64>, max_value: Option<i64>) -> Self {
        Self {
            min_value,
            max_value,
            ..Self::default()
        }
    }

    pub(super) fn apply(&self, type_name: &str, input: &Value) -> Result<i64, PrimitiveError> {
        let fail = |kind, message: String| Err(PrimitiveError::new(kind, type_name, message));

        let value = match input {
            Value::None if self.allow_none => 0,
            Value::None => {
                return fail(
                    PrimitiveErrorKind::Empty,
                    format!("{type_name} does not allow None values"),
                );
            }
            Value::Bool(b) if self.allow_bool => i64::from(*b),
            Value::Bool(_) => {
                return fail(
                    PrimitiveErrorKind::Type,
                    format!("{type_name} does not allow boolean values"),
                );
            }
            Value::Int(i) => *i,
            Value::Str(text) => self.parse(type_name, text)?,
            Value::Primitive(p) => match p.scalar() {
                Scalar::Int(i) => *i,
                Scalar::Str(text) => self.parse(type_name, text)?,
                Scalar::Float(_) => {
                    return fail(
                        PrimitiveErrorKind::Type,
                        format!("{type_name} requires an integer value, got float"),
                    );
                }
            },
            other if self.strict_type => {
                return fail(
                    PrimitiveErrorKind::Type,
                    format!("{type_name} requires int type, got {}", other.type_name()),
                );
            }
            other => {
                return fail(
                    PrimitiveErrorKind::Type,
                    format!(
                        "{type_name} requires an integer value, got {}",
                        base_type_name(other)
                    ),
                );
            }
        };

        self.check_range(type_name, value)
    }

    fn parse(&self, type_name: &str, text: &str) -> Result<i64, PrimitiveError> {
        if self.strict_type || !self.allow_str {
            return Err(PrimitiveError::new(
                PrimitiveErrorKind::Type,
                type_name,
                format!("{type_name} requires int type, got str"),
            ));
        }

        text.trim().parse::<i64>().map_err(|_| {
            PrimitiveError::new(
                PrimitiveErrorKind::Pattern,
                type_name,
                format!("Cannot convert '{text}' to integer"),
            )
        })
    }

    fn check_range(&self, type_name: &str, value: i64) -> Result<i64, PrimitiveError> {
        if let Some(min) = self.min_value
            && value < min
        {
            return Err(PrimitiveError::new(
                PrimitiveErrorKind::Range,
                type_name,
                format!("{type_name} must be >= {min}, got {value}"),
            ));
        }
        if let Some(max) = self.max_value
            && value > max
        {
            return Err(PrimitiveError::new(
                PrimitiveErrorKind::Range,
                type_name,
                format!("{type_name} must be <= {max}, got {value}"),
            ));
        }

        Ok(value)
    }
}

// Typed containers report their host type name.
pub(super) fn base_type_name(value: &Value) -> &str {
    match value {
        Value::TypedList(_) => "list",
        Value::TypedDict(_) => "dict",
        other => other.type_name(),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(rules: &IntRules, input: impl Into<Value>) -> Result<i64, PrimitiveError> {
        rules.apply("Safe_Int", &input.into())
    }

    #[test]
    fn accepts_ints_and_numeric_strings() {
        let rules = IntRules::default();

        assert_eq!(apply(&rules, 123).unwrap(), 123);
        assert_eq!(apply(&rules, "-456").unwrap(), -456);
        assert_eq!(apply(&rules, Value::None).unwrap(), 0);
    }

    #[test]
    fn booleans_are_refused_by_default() {
        let err = apply(&IntRules::default(), true).unwrap_err();

        assert_eq!(err.kind, PrimitiveErrorKind::Type);
        assert_eq!(err.message, "Safe_Int does not allow boolean values");

        let rules = IntRules {
            allow_bool: true,
            ..IntRules::default()
        };
        assert_eq!(apply(&rules, true).unwrap(), 1);
    }

    #[test]
    fn unparseable_strings_and_other_types_fail() {
        let rules = IntRules::default();

        for text in ["abc", "12.34", "1e10"] {
            assert_eq!(
                apply(&rules, text).unwrap_err().message,
                format!("Cannot convert '{text}' to integer")
            );
        }
        assert_eq!(
            apply(&rules, 3.25).unwrap_err().message,
            "Safe_Int requires an integer value, got float"
        );
        assert_eq!(
            apply(&rules, Value::List(vec![])).unwrap_err().message,
            "Safe_Int requires an integer value, got list"
        );
        assert_eq!(
            apply(&rules, Value::Map(vec![])).unwrap_err().message,
            "Safe_Int requires an integer value, got dict"
        );
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let rules = IntRules::range(Some(-100), Some(100));

        assert_eq!(apply(&rules, 100).unwrap(), 100);
        assert_eq!(apply(&rules, -100).unwrap(), -100);
        assert_eq!(
            apply(&rules, -101).unwrap_err().message,
            "Safe_Int must be >= -100, got -101"
        );
        assert_eq!(
            apply(&rules, 101).unwrap_err().message,
            "Safe_Int must be <= 100, got 101"
        );
    }

    #[test]
    fn strict_type_refuses_strings_and_floats() {
        let rules = IntRules {
            strict_type: true,
            allow_str: false,
            ..IntRules::default()
        };

        assert_eq!(
            apply(&rules, "123").unwrap_err().message,
            "Safe_Int requires int type, got str"
        );
        assert_eq!(
            apply(&rules, 3.25).unwrap_err().message,
            "Safe_Int requires int type, got float"
        );
    }

    #[test]
    fn none_can_be_refused() {
        let rules = IntRules {
            allow_none: false,
            ..IntRules::default()
        };

        assert_eq!(
            apply(&rules, Value::None).unwrap_err().message,
            "Safe_Int does not allow None values"
        );
    }
}
