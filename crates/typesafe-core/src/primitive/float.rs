use crate::{
    primitive::{PrimitiveError, PrimitiveErrorKind, Scalar, int::base_type_name},
    value::{Value, float_repr},
};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use std::str::FromStr;

///
/// FloatRules
///

#[derive(Clone, Debug)]
pub struct FloatRules {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub allow_inf: bool,
    pub allow_nan: bool,
    pub decimal_places: Option<u32>,
    pub round_output: bool,
    /// Out-of-range values snap to the nearest bound instead of failing.
    pub clamp_to_range: bool,
    pub allow_bool: bool,
    pub allow_str: bool,
    pub allow_none: bool,
}

impl Default for FloatRules {
    fn default() -> Self {
        Self {
            min_value: None,
            max_value: None,
            allow_inf: false,
            allow_nan: false,
            decimal_places: None,
            round_output: true,
            clamp_to_range: false,
            allow_bool: false,
            allow_str: true,
            allow_none: true,
        }
    }
}

impl FloatRules {
    #[must_use]
    pub fn range(min_value: Option<f64>, max_value: Option<f64>) -> Self {
        Self {
            min_value,
            max_value,
            ..Self::default()
        }
    }

    pub(super) fn apply(&self, type_name: &str, input: &Value) -> Result<f64, PrimitiveError> {
        let value = self.coerce(type_name, input)?;

        if value.is_nan() && !self.allow_nan {
            return Err(not_allowed(type_name, "NaN"));
        }
        if value.is_infinite() && !self.allow_inf {
            return Err(not_allowed(type_name, "infinite"));
        }

        let value = self.round(value);

        self.check_range(type_name, value)
    }

    fn coerce(&self, type_name: &str, input: &Value) -> Result<f64, PrimitiveError> {
        #[allow(clippy::cast_precision_loss)]
        let value = match input {
            Value::None if self.allow_none => 0.0,
            Value::None => {
                return Err(PrimitiveError::new(
                    PrimitiveErrorKind::Empty,
                    type_name,
                    format!("{type_name} does not allow None values"),
                ));
            }
            Value::Bool(b) if self.allow_bool => f64::from(u8::from(*b)),
            Value::Bool(_) => {
                return Err(PrimitiveError::new(
                    PrimitiveErrorKind::Type,
                    type_name,
                    format!("{type_name} does not allow boolean values"),
                ));
            }
            Value::Int(i) => *i as f64,
            Value::Float(x) => *x,
            Value::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            Value::Str(text) => self.parse(type_name, text)?,
            Value::Primitive(p) => match p.scalar() {
                Scalar::Int(i) => *i as f64,
                Scalar::Float(x) => *x,
                Scalar::Str(text) => self.parse(type_name, text)?,
            },
            other => {
                return Err(PrimitiveError::new(
                    PrimitiveErrorKind::Type,
                    type_name,
                    format!(
                        "{type_name} requires a float value, got {}",
                        base_type_name(other)
                    ),
                ));
            }
        };

        Ok(value)
    }

    fn parse(&self, type_name: &str, text: &str) -> Result<f64, PrimitiveError> {
        if !self.allow_str {
            return Err(PrimitiveError::new(
                PrimitiveErrorKind::Type,
                type_name,
                format!("{type_name} requires float type, got str"),
            ));
        }

        // Rejected before parsing so strings like 'NaN123' report the
        // non-finite rule rather than a parse failure.
        let lowered = text.trim().to_ascii_lowercase();
        if lowered.contains("nan") && !self.allow_nan {
            return Err(not_allowed(type_name, "NaN"));
        }
        if lowered.contains("inf") && !self.allow_inf {
            return Err(not_allowed(type_name, "infinite"));
        }

        lowered.parse::<f64>().map_err(|_| {
            PrimitiveError::new(
                PrimitiveErrorKind::Pattern,
                type_name,
                format!("Cannot convert '{text}' to float"),
            )
        })
    }

    /// Round half away from zero on the decimal rendering, so `3.145`
    /// becomes `3.15` and `0.1 + 0.2` becomes `0.3`.
    fn round(&self, value: f64) -> f64 {
        let Some(places) = self.decimal_places.filter(|_| self.round_output) else {
            return value;
        };
        if !value.is_finite() {
            return value;
        }

        round_decimal(value, places)
    }

    fn check_range(&self, type_name: &str, value: f64) -> Result<f64, PrimitiveError> {
        if let Some(min) = self.min_value
            && value < min
        {
            if self.clamp_to_range {
                return Ok(min);
            }
            return Err(PrimitiveError::new(
                PrimitiveErrorKind::Range,
                type_name,
                format!(
                    "{type_name} must be >= {}, got {}",
                    float_repr(min),
                    float_repr(value)
                ),
            ));
        }
        if let Some(max) = self.max_value
            && value > max
        {
            if self.clamp_to_range {
                return Ok(max);
            }
            return Err(PrimitiveError::new(
                PrimitiveErrorKind::Range,
                type_name,
                format!(
                    "{type_name} must be <= {}, got {}",
                    float_repr(max),
                    float_repr(value)
                ),
            ));
        }

        Ok(value)
    }
}

/// Decimal view of a float through its shortest rendering.
pub(super) fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_str(&value.to_string()).ok()
}

pub(super) fn round_decimal(value: f64, places: u32) -> f64 {
    to_decimal(value)
        .map(|d| d.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

fn not_allowed(type_name: &str, what: &str) -> PrimitiveError {
    PrimitiveError::new(
        PrimitiveErrorKind::Range,
        type_name,
        format!("{type_name} does not allow {what} values"),
    )
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(rules: &FloatRules, input: impl Into<Value>) -> Result<f64, PrimitiveError> {
        rules.apply("Safe_Float", &input.into())
    }

    fn two_places() -> FloatRules {
        FloatRules {
            decimal_places: Some(2),
            ..FloatRules::default()
        }
    }

    #[test]
    fn accepts_floats_ints_and_numeric_strings() {
        let rules = FloatRules::default();

        assert_eq!(apply(&rules, 123.45).unwrap(), 123.45);
        assert_eq!(apply(&rules, -456).unwrap(), -456.0);
        assert_eq!(apply(&rules, "1e10").unwrap(), 1e10);
        assert_eq!(apply(&rules, Value::None).unwrap(), 0.0);
    }

    #[test]
    fn rejects_bools_garbage_and_containers() {
        let rules = FloatRules::default();

        assert_eq!(
            apply(&rules, true).unwrap_err().message,
            "Safe_Float does not allow boolean values"
        );
        assert_eq!(
            apply(&rules, "abc").unwrap_err().message,
            "Cannot convert 'abc' to float"
        );
        assert_eq!(
            apply(&rules, "NaN123").unwrap_err().message,
            "Safe_Float does not allow NaN values"
        );
        assert_eq!(
            apply(&rules, Value::List(vec![])).unwrap_err().message,
            "Safe_Float requires a float value, got list"
        );
    }

    #[test]
    fn non_finite_values_need_opt_in() {
        let rules = FloatRules::default();

        assert_eq!(
            apply(&rules, f64::INFINITY).unwrap_err().message,
            "Safe_Float does not allow infinite values"
        );
        assert_eq!(
            apply(&rules, f64::NAN).unwrap_err().message,
            "Safe_Float does not allow NaN values"
        );

        let open = FloatRules {
            allow_inf: true,
            ..FloatRules::default()
        };
        assert!(apply(&open, f64::NEG_INFINITY).unwrap().is_infinite());
    }

    #[test]
    fn decimal_places_round_half_away_from_zero() {
        let rules = two_places();

        assert_eq!(apply(&rules, 3.145).unwrap(), 3.15);
        assert_eq!(apply(&rules, 3.144).unwrap(), 3.14);
        assert_eq!(apply(&rules, 123.456_789).unwrap(), 123.46);
        assert_eq!(apply(&rules, 157.950_000_000_000_02).unwrap(), 157.95);
        assert_eq!(apply(&rules, 0.1 + 0.2).unwrap(), 0.3);
    }

    #[test]
    fn range_messages_use_float_rendering() {
        let rules = FloatRules::range(Some(-100.0), Some(100.0));

        assert_eq!(
            apply(&rules, -101.0).unwrap_err().message,
            "Safe_Float must be >= -100.0, got -101.0"
        );
        assert_eq!(
            apply(&rules, 101.0).unwrap_err().message,
            "Safe_Float must be <= 100.0, got 101.0"
        );
    }

    #[test]
    fn clamping_snaps_to_bounds() {
        let rules = FloatRules {
            clamp_to_range: true,
            ..FloatRules::range(Some(0.0), Some(1.0))
        };

        assert_eq!(apply(&rules, -0.5).unwrap(), 0.0);
        assert_eq!(apply(&rules, 1.5).unwrap(), 1.0);
        assert_eq!(apply(&rules, 0.5).unwrap(), 0.5);
    }
}
