//! JSON projection of values and instances.
//!
//! The projection is total: anything without a plain-data form becomes
//! `null` instead of failing.

use crate::{
    instance::Instance,
    primitive::Scalar,
    value::{Value, float_repr},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Map, Number, Value as Json};

/// Plain-data form of `value`.
#[must_use]
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::None | Value::Opaque(_) => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(x) => float_to_json(*x),
        Value::Str(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(STANDARD.encode(b)),
        Value::Decimal(d) => Json::String(d.to_string()),
        Value::DateTime(dt) => Json::String(dt.to_rfc3339()),

        Value::Primitive(p) => scalar_to_json(p.scalar()),
        Value::Enum(member) => match member.value() {
            v @ (Value::Str(_) | Value::Int(_) | Value::Float(_) | Value::Bool(_)) => to_json(v),
            _ => Json::String(member.name().to_string()),
        },
        Value::Type(ty) => Json::String(ty.qualified_name()),
        Value::Object(obj) => instance_to_json(obj),
        Value::Deferred(deferred) => deferred.force().map_or(Json::Null, to_json),

        Value::List(items) | Value::Tuple(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| (key_to_string(k), to_json(v)))
                .collect(),
        ),

        Value::TypedList(list) => list.json(),
        Value::TypedDict(dict) => dict.json(),
        Value::TypedSet(set) => set.json(),
        Value::TypedTuple(tuple) => tuple.json(),
    }
}

/// Object mapping each slot name to its projection. Names starting with
/// `__` are internal and skipped.
#[must_use]
pub fn instance_to_json(instance: &Instance) -> Json {
    let mut map = Map::new();
    for (name, value) in instance.slots() {
        if !name.starts_with("__") {
            map.insert(name.to_string(), to_json(value));
        }
    }

    Json::Object(map)
}

/// String form of a dict key. Primitive keys use their scalar, type keys
/// their `<module>.<name>`.
#[must_use]
pub fn key_to_string(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        Value::Primitive(p) => p.scalar().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::None => "null".to_string(),
        Value::Float(x) => float_repr(*x),
        Value::Type(ty) => ty.qualified_name(),
        other => match to_json(other) {
            Json::String(s) => s,
            json => json.to_string(),
        },
    }
}

fn scalar_to_json(scalar: &Scalar) -> Json {
    match scalar {
        Scalar::Str(s) => Json::String(s.clone()),
        Scalar::Int(i) => Json::from(*i),
        Scalar::Float(x) => float_to_json(*x),
    }
}

// JSON has no NaN or infinity.
fn float_to_json(x: f64) -> Json {
    Number::from_f64(x).map_or(Json::Null, Json::Number)
}

///
/// TESTS
///
