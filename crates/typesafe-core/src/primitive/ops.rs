//! Arithmetic and concatenation that keep the primitive's type.
//!
//! The result of every operation is fed back through the primitive's own
//! rules, so `Safe_UInt(1) - 2` fails the range check instead of producing
//! an unchecked value.

use crate::{
    primitive::{
        PrimitiveError, PrimitiveErrorKind, PrimitiveRules, PrimitiveValue, Scalar,
        float::{round_decimal, to_decimal},
    },
    value::Value,
};
use rust_decimal::prelude::ToPrimitive;

///
/// ArithOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

impl PrimitiveValue {
    /// `self <op> rhs`. Integer division yields a plain float, everything
    /// else stays inside the primitive type.
    pub fn apply_op(&self, op: ArithOp, rhs: &Value) -> Result<Value, PrimitiveError> {
        let ty = self.primitive_type();
        let type_name = ty.name();
        let unsupported = || {
            PrimitiveError::new(
                PrimitiveErrorKind::Type,
                type_name,
                format!(
                    "unsupported operand type(s) for {}: '{type_name}' and '{}'",
                    op.symbol(),
                    rhs.type_name()
                ),
            )
        };

        let result = match (self.scalar(), op) {
            (Scalar::Str(lhs), ArithOp::Add) => {
                let rhs = rhs
                    .as_str()
                    .ok_or_else(|| concat_error(type_name, rhs))?;
                Value::Str(format!("{lhs}{rhs}"))
            }
            (Scalar::Str(_), _) => return Err(unsupported()),

            #[allow(clippy::cast_precision_loss)]
            (Scalar::Int(lhs), ArithOp::Div) => {
                let rhs = number(rhs).ok_or_else(unsupported)?;
                return divide(type_name, *lhs as f64, rhs).map(Value::Float);
            }
            (Scalar::Int(lhs), _) => {
                let rhs = rhs.as_int().ok_or_else(unsupported)?;
                let result = match op {
                    ArithOp::Add => lhs.checked_add(rhs),
                    ArithOp::Sub => lhs.checked_sub(rhs),
                    _ => lhs.checked_mul(rhs),
                };
                Value::Int(result.ok_or_else(|| overflow(type_name))?)
            }

            (Scalar::Float(lhs), _) => {
                let rhs = number(rhs).ok_or_else(unsupported)?;
                Value::Float(float_op(ty.rules(), type_name, op, *lhs, rhs)?)
            }
        };

        ty.construct(result).map(Value::Primitive)
    }

    /// Concatenate text, keeping the primitive type.
    pub fn concat(&self, rhs: &str) -> Result<Self, PrimitiveError> {
        match self.apply_op(ArithOp::Add, &Value::from(rhs))? {
            Value::Primitive(p) => Ok(p),
            other => Err(concat_error(self.primitive_type().name(), &other)),
        }
    }
}

// With decimal places set, compute on decimals so 243 * 0.65 is 157.95.
fn float_op(
    rules: &PrimitiveRules,
    type_name: &str,
    op: ArithOp,
    lhs: f64,
    rhs: f64,
) -> Result<f64, PrimitiveError> {
    if op == ArithOp::Div {
        return divide(type_name, lhs, rhs);
    }

    let places = match rules {
        PrimitiveRules::Float(rules) => rules.decimal_places,
        _ => None,
    };
    if let (Some(places), Some(a), Some(b)) = (places, to_decimal(lhs), to_decimal(rhs)) {
        let exact = match op {
            ArithOp::Add => a.checked_add(b),
            ArithOp::Sub => a.checked_sub(b),
            _ => a.checked_mul(b),
        };
        if let Some(value) = exact.and_then(|d| d.to_f64()) {
            return Ok(round_decimal(value, places));
        }
    }

    Ok(match op {
        ArithOp::Add => lhs + rhs,
        ArithOp::Sub => lhs - rhs,
        _ => lhs * rhs,
    })
}

fn divide(type_name: &str, lhs: f64, rhs: f64) -> Result<f64, PrimitiveError> {
    if rhs == 0.0 {
        return Err(PrimitiveError::new(
            PrimitiveErrorKind::Range,
            type_name,
            "division by zero",
        ));
    }
    if let (Some(a), Some(b)) = (to_decimal(lhs), to_decimal(rhs))
        && let Some(value) = a.checked_div(b).and_then(|d| d.to_f64())
    {
        return Ok(value);
    }

    Ok(lhs / rhs)
}

#[allow(clippy::cast_precision_loss)]
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(x) => Some(*x),
        Value::Primitive(p) => match p.scalar() {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(x) => Some(*x),
            Scalar::Str(_) => None,
        },
        _ => None,
    }
}

fn overflow(type_name: &str) -> PrimitiveError {
    PrimitiveError::new(
        PrimitiveErrorKind::Range,
        type_name,
        format!("{type_name} arithmetic overflowed"),
    )
}

fn concat_error(type_name: &str, rhs: &Value) -> PrimitiveError {
    PrimitiveError::new(
        PrimitiveErrorKind::Type,
        type_name,
        format!(
            "can only concatenate str (not \"{}\") to {type_name}",
            rhs.type_name()
        ),
    )
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{FloatRules, IntRules, PrimitiveType};

    fn uint() -> PrimitiveType {
        PrimitiveType::builder("Ops_UInt")
            .int_rules(IntRules::range(Some(0), None))
            .build()
    }

    fn money() -> PrimitiveType {
        PrimitiveType::builder("Ops_Money")
            .float_rules(FloatRules {
                decimal_places: Some(2),
                ..FloatRules::default()
            })
            .build()
    }

    #[test]
    fn int_ops_keep_type_and_rules() {
        let ten = uint().construct(10.into()).expect("10");

        let sum = ten.apply_op(ArithOp::Add, &5.into()).expect("add");
        assert!(matches!(&sum, Value::Primitive(p) if p.as_int() == Some(15)));

        let err = ten.apply_op(ArithOp::Sub, &11.into()).expect_err("negative");
        assert_eq!(err.message, "Ops_UInt must be >= 0, got -1");

        let half = ten.apply_op(ArithOp::Div, &4.into()).expect("div");
        assert_eq!(half, Value::Float(2.5));
    }

    #[test]
    fn float_ops_with_decimal_places_are_exact() {
        let price = money().construct(243.into()).expect("243");
        let total = price.apply_op(ArithOp::Mul, &0.65.into()).expect("mul");

        assert!(matches!(&total, Value::Primitive(p) if p.as_float() == Some(157.95)));

        let unit = money().construct(19.99.into()).expect("19.99");
        let subtotal = unit.apply_op(ArithOp::Mul, &3.into()).expect("mul");
        assert!(matches!(&subtotal, Value::Primitive(p) if p.as_float() == Some(59.97)));
    }

    #[test]
    fn string_concat_keeps_type_and_refuses_numbers() {
        let text = PrimitiveType::builder("Ops_Str").build();
        let value = text.construct("aaa".into()).expect("aaa");

        let joined = value.concat("xyz").expect("concat");
        assert_eq!(joined.as_str(), Some("aaaxyz"));
        assert_eq!(joined.primitive_type(), &text);

        let err = value.apply_op(ArithOp::Add, &123.into()).expect_err("int");
        assert_eq!(err.kind, PrimitiveErrorKind::Type);
    }

    #[test]
    fn division_by_zero_is_a_range_error() {
        let err = money()
            .construct(1.into())
            .expect("1")
            .apply_op(ArithOp::Div, &0.into())
            .expect_err("zero");

        assert_eq!(err.message, "division by zero");
    }
}
