use crate::{primitive::Scalar, value::Value};
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

///
/// ScalarView
///
/// Canonical form shared by plain scalars and the primitives built on them,
/// so `Safe_Id("a")` and `"a"` land on the same key.
///

#[derive(Debug, Eq, Hash, PartialEq)]
enum ScalarView<'a> {
    Str(&'a str),
    Int(i64),
    Float(u64),
}

// Integral floats collapse onto Int so 1 == 1.0 holds and hashes agree.
#[allow(clippy::cast_possible_truncation)]
fn number_view(x: f64) -> ScalarView<'static> {
    if x.fract() == 0.0 && x.abs() < 9.0e15 {
        return ScalarView::Int(x as i64);
    }

    ScalarView::Float(canonical_bits(x))
}

fn canonical_bits(x: f64) -> u64 {
    if x.is_nan() {
        f64::NAN.to_bits()
    } else if x == 0.0 {
        0.0f64.to_bits()
    } else {
        x.to_bits()
    }
}

fn scalar_view(value: &Value) -> Option<ScalarView<'_>> {
    match value {
        Value::Str(s) => Some(ScalarView::Str(s)),
        Value::Int(i) => Some(ScalarView::Int(*i)),
        Value::Float(x) => Some(number_view(*x)),
        Value::Primitive(p) => Some(match p.scalar() {
            Scalar::Str(s) => ScalarView::Str(s),
            Scalar::Int(i) => ScalarView::Int(*i),
            Scalar::Float(x) => number_view(*x),
        }),
        _ => None,
    }
}

///
/// SeqKind
///
/// Lists and tuples never compare equal to each other, matching the host.
///

#[derive(Clone, Copy, Eq, Hash, PartialEq)]
enum SeqKind {
    List,
    Tuple,
}

fn seq_view(value: &Value) -> Option<(SeqKind, &[Value])> {
    match value {
        Value::List(items) => Some((SeqKind::List, items)),
        Value::TypedList(list) => Some((SeqKind::List, list.as_slice())),
        Value::Tuple(items) => Some((SeqKind::Tuple, items)),
        Value::TypedTuple(tuple) => Some((SeqKind::Tuple, tuple.as_slice())),
        _ => None,
    }
}

fn map_entries(value: &Value) -> Option<Vec<(&Value, &Value)>> {
    match value {
        Value::Map(entries) => Some(entries.iter().map(|(k, v)| (k, v)).collect()),
        Value::TypedDict(dict) => Some(dict.iter().collect()),
        _ => None,
    }
}

fn maps_equal(left: &[(&Value, &Value)], right: &[(&Value, &Value)]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(k, v)| right.iter().any(|(rk, rv)| k == rk && v == rv))
}

fn hash_one(value: &impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (scalar_view(self), scalar_view(other)) {
            return a == b;
        }
        if let (Some((ka, a)), Some((kb, b))) = (seq_view(self), seq_view(other)) {
            return ka == kb && a == b;
        }
        if let (Some(a), Some(b)) = (map_entries(self), map_entries(other)) {
            return maps_equal(&a, &b);
        }

        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::TypedSet(a), Self::TypedSet(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => a == b,
            (Self::Object(_) | Self::Deferred(_), Self::Object(_) | Self::Deferred(_)) => {
                match (self.as_object(), other.as_object()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Some(view) = scalar_view(self) {
            0u8.hash(state);
            view.hash(state);
            return;
        }
        if let Some((kind, items)) = seq_view(self) {
            1u8.hash(state);
            kind.hash(state);
            items.hash(state);
            return;
        }
        if let Some(entries) = map_entries(self) {
            2u8.hash(state);
            entries.len().hash(state);
            let sum = entries
                .iter()
                .fold(0u64, |acc, entry| acc.wrapping_add(hash_one(entry)));
            sum.hash(state);
            return;
        }

        match self {
            Self::None => 3u8.hash(state),
            Self::Bool(b) => {
                4u8.hash(state);
                b.hash(state);
            }
            Self::Bytes(b) => {
                5u8.hash(state);
                b.hash(state);
            }
            Self::Decimal(d) => {
                6u8.hash(state);
                d.normalize().hash(state);
            }
            Self::DateTime(dt) => {
                7u8.hash(state);
                dt.hash(state);
            }
            Self::Enum(m) => {
                8u8.hash(state);
                m.hash(state);
            }
            Self::Type(t) => {
                9u8.hash(state);
                t.hash(state);
            }
            Self::Object(obj) => {
                10u8.hash(state);
                obj.class().id().hash(state);
            }
            Self::Deferred(d) => {
                10u8.hash(state);
                d.class().id().hash(state);
            }
            Self::TypedSet(set) => {
                11u8.hash(state);
                set.len().hash(state);
                let sum = set
                    .iter()
                    .fold(0u64, |acc, item| acc.wrapping_add(hash_one(item)));
                sum.hash(state);
            }
            Self::Opaque(label) => {
                12u8.hash(state);
                label.hash(state);
            }
            // covered by the views above
            _ => 13u8.hash(state),
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::safe_id;
    use std::collections::HashSet;

    #[test]
    fn primitive_equals_and_hashes_like_base_scalar() {
        let id = Value::Primitive(safe_id().construct("abc".into()).expect("valid id"));
        let plain = Value::from("abc");

        assert_eq!(id, plain);
        assert_eq!(hash_one(&id), hash_one(&plain));

        let set: HashSet<Value> = [id, plain].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn bool_never_equals_int() {
        assert_ne!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Bool(false), Value::Int(0));
    }

    #[test]
    fn integral_float_equals_int() {
        assert_eq!(Value::Float(2.0), Value::Int(2));
        assert_eq!(hash_one(&Value::Float(2.0)), hash_one(&Value::Int(2)));
        assert_ne!(Value::Float(2.5), Value::Int(2));
    }

    #[test]
    fn signed_zero_and_nan_are_canonical() {
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn maps_compare_order_insensitively() {
        let a = Value::Map(vec![("x".into(), 1.into()), ("y".into(), 2.into())]);
        let b = Value::Map(vec![("y".into(), 2.into()), ("x".into(), 1.into())]);

        assert_eq!(a, b);
        assert_eq!(hash_one(&a), hash_one(&b));
    }

    #[test]
    fn lists_and_tuples_differ() {
        let list = Value::List(vec![1.into()]);
        let tuple = Value::Tuple(vec![1.into()]);

        assert_ne!(list, tuple);
    }
}
