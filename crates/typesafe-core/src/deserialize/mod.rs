//! Annotation-directed JSON loading.
//!
//! The declared annotation decides how each node is read. Values are then
//! assigned through setattr, so the validator sees everything that comes
//! in. Failures carry the JSON path of the node that caused them.

mod type_ref;

pub use type_ref::{ALLOWED_MODULES, DENIED_NAMES, ResolverPolicy, resolve as resolve_type};

use crate::{
    annotation::Annotation,
    class::Class,
    collection::{TypedDict, TypedList, TypedSet, TypedTuple},
    error::{Error, PathSegment, Site},
    instance::{FromJsonOptions, Instance},
    primitive::ScalarKind,
    resolver,
    validate::{self, Context},
    value::Value,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use std::str::FromStr;

///
/// DeserializeContext
///
/// Position of the node being read, the class whose annotations are in
/// play, and the caller's options.
///

#[derive(Clone, Debug)]
pub struct DeserializeContext<'a> {
    owner: Option<Class>,
    options: &'a FromJsonOptions,
    path: Vec<PathSegment>,
}

impl<'a> DeserializeContext<'a> {
    #[must_use]
    pub const fn new(options: &'a FromJsonOptions) -> Self {
        Self {
            owner: None,
            options,
            path: Vec::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    fn child(&self, segment: PathSegment) -> Self {
        let mut path = self.path.clone();
        path.push(segment);

        Self {
            owner: self.owner.clone(),
            options: self.options,
            path,
        }
    }

    fn within(mut self, owner: &Class) -> Self {
        self.owner = Some(owner.clone());
        self
    }

    fn fail(&self, err: Error) -> Error {
        err.at_path(&self.path)
    }

    fn malformed(&self, expected: impl Into<String>, found: &Json) -> Error {
        self.fail(Error::malformed(expected, json_kind(found)))
    }
}

/// Build an instance of `class` from a JSON object. `null` and `{}` give a
/// default instance.
pub fn instance_from_json(
    class: &Class,
    json: &Json,
    options: &FromJsonOptions,
) -> Result<Instance, Error> {
    build_instance(class, json, &DeserializeContext::new(options))
}

/// Read `json` as a value of `annotation`.
pub fn from_json(annotation: &Annotation, json: &Json, ctx: &DeserializeContext<'_>) -> Result<Value, Error> {
    match annotation {
        Annotation::Any => Ok(Value::from_json(json)),
        Annotation::Annotated(inner, _) => from_json(inner, json, ctx),
        Annotation::Optional(inner) => {
            if json.is_null() {
                Ok(Value::None)
            } else {
                from_json(inner, json, ctx)
            }
        }
        Annotation::Union(members) => read_union(members, json, ctx),

        _ if json.is_null() => Ok(Value::None),

        Annotation::NoneType
        | Annotation::Bool
        | Annotation::Int
        | Annotation::Float
        | Annotation::Str => Ok(Value::from_json(json)),
        Annotation::Bytes => match json {
            Json::String(s) => STANDARD
                .decode(s)
                .map(Value::Bytes)
                .map_err(|_| ctx.malformed("a base64 string for bytes", json)),
            other => Err(ctx.malformed("a base64 string for bytes", other)),
        },
        Annotation::Decimal => read_decimal(json, ctx),
        Annotation::DateTime => read_datetime(json, ctx),

        Annotation::Primitive(ty) => ty
            .construct(Value::from_json(json))
            .map(Value::Primitive)
            .map_err(|err| ctx.fail(err.into())),
        Annotation::Enum(ty) => {
            let input = Value::from_json(json);
            ty.lookup(&input).map(Value::Enum).ok_or_else(|| {
                ctx.fail(Error::type_mismatch_with(
                    &Site::Root,
                    ty.name(),
                    input.type_name(),
                    format!("Invalid value '{input}' for enum {}", ty.name()),
                ))
            })
        }
        Annotation::Class(class) => build_instance(class, json, ctx).map(Value::Object),
        Annotation::ForwardRef(name) => {
            let class = resolver::resolve_forward(name, ctx.owner.as_ref()).map_err(|e| ctx.fail(e))?;
            build_instance(&class, json, ctx).map(Value::Object)
        }

        Annotation::List(element) => {
            let element = resolve(element, ctx)?;
            let items = read_items(&element, json, ctx)?;
            TypedList::from_items(element, items)
                .map(Value::TypedList)
                .map_err(|e| ctx.fail(e))
        }
        Annotation::Set(element) => {
            let element = resolve(element, ctx)?;
            let items = read_items(&element, json, ctx)?;
            TypedSet::from_items(element, items)
                .map(Value::TypedSet)
                .map_err(|e| ctx.fail(e))
        }
        Annotation::Tuple(slots) => {
            let Json::Array(items) = json else {
                return Err(ctx.malformed("an array for a tuple", json));
            };
            let slots = slots
                .iter()
                .map(|slot| resolve(slot, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            let values = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let slot = slots.get(i).unwrap_or(&Annotation::Any);
                    from_json(slot, item, &ctx.child(PathSegment::Index(i)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            TypedTuple::new(slots, values)
                .map(Value::TypedTuple)
                .map_err(|e| ctx.fail(e))
        }
        Annotation::Dict(key, value) => {
            let key = resolve(key, ctx)?;
            let value = resolve(value, ctx)?;
            let entries = read_entries(&key, &value, json, ctx)?;
            TypedDict::from_entries(key, value, entries)
                .map(Value::TypedDict)
                .map_err(|e| ctx.fail(e))
        }
        Annotation::DictSubclass(ty) => {
            let entries = read_entries(ty.key(), ty.value(), json, ctx)?;
            TypedDict::from_type_entries(ty, entries)
                .map(Value::TypedDict)
                .map_err(|e| ctx.fail(e))
        }

        Annotation::Type(_) => match json {
            Json::String(s) if s.is_empty() => Ok(Value::None),
            Json::String(s) => resolve_type(s, &ctx.options.policy)
                .map(Value::Type)
                .map_err(|e| ctx.fail(e)),
            other => Err(ctx.fail(Error::security(
                &other.to_string(),
                "Type reference must be a string",
            ))),
        },
    }
}

fn build_instance(class: &Class, json: &Json, ctx: &DeserializeContext<'_>) -> Result<Instance, Error> {
    let map = match json {
        Json::Null => return Instance::new(class).map_err(|e| ctx.fail(e)),
        Json::Object(map) => map,
        other => return Err(ctx.malformed(format!("an object for {}", class.name()), other)),
    };

    let mut instance = Instance::new(class).map_err(|e| ctx.fail(e))?;
    let descriptor = resolver::descriptor(class).map_err(|e| ctx.fail(e))?;

    for (name, node) in map {
        let child = ctx.child(PathSegment::Field(name.clone())).within(class);

        let Some(annotation) = descriptor.annotation(name) else {
            if descriptor.has_attribute(name) {
                instance
                    .set(name, Value::from_json(node))
                    .map_err(|e| child.fail(e))?;
            } else if ctx.options.strict {
                return Err(child.fail(Error::unknown_attribute(
                    class.name(),
                    name,
                    format!("Attribute '{name}' not found in '{}'", class.name()),
                )));
            }
            continue;
        };

        let value = from_json(annotation, node, &child)?;
        if value.is_none() && !annotation.admits_none() {
            continue;
        }
        instance.set(name, value).map_err(|e| child.fail(e))?;
    }

    Ok(instance)
}

// First member that reads and validates wins; otherwise the plain value
// is handed to setattr, which reports the mismatch.
fn read_union(members: &[Annotation], json: &Json, ctx: &DeserializeContext<'_>) -> Result<Value, Error> {
    if json.is_null() {
        return Ok(Value::None);
    }

    let check = Context::new(ctx.owner.as_ref(), Site::Root);
    for member in members {
        if let Ok(value) = from_json(member, json, ctx)
            && let Ok(value) = validate::check_or_coerce(member, value, &check)
        {
            return Ok(value);
        }
    }

    Ok(Value::from_json(json))
}

fn read_items(element: &Annotation, json: &Json, ctx: &DeserializeContext<'_>) -> Result<Vec<Value>, Error> {
    let Json::Array(items) = json else {
        return Err(ctx.malformed("an array", json));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| from_json(element, item, &ctx.child(PathSegment::Index(i))))
        .collect()
}

fn read_entries(
    key: &Annotation,
    value: &Annotation,
    json: &Json,
    ctx: &DeserializeContext<'_>,
) -> Result<Vec<(Value, Value)>, Error> {
    let Json::Object(map) = json else {
        return Err(ctx.malformed("an object", json));
    };

    map.iter()
        .map(|(k, v)| {
            let child = ctx.child(PathSegment::Key(k.clone()));
            let key = read_key(key, k, &child)?;
            let value = from_json(value, v, &child)?;
            Ok((key, value))
        })
        .collect()
}

// JSON object keys are always strings; parse them back into the key type.
fn read_key(annotation: &Annotation, key: &str, ctx: &DeserializeContext<'_>) -> Result<Value, Error> {
    let bad_key = |expected: &str| ctx.fail(Error::malformed(format!("{expected} key"), format!("'{key}'")));

    match annotation.unwrap_annotated() {
        Annotation::Optional(inner) => read_key(inner, key, ctx),
        Annotation::Int => key.parse::<i64>().map(Value::Int).map_err(|_| bad_key("an int")),
        Annotation::Float => key.parse::<f64>().map(Value::Float).map_err(|_| bad_key("a float")),
        Annotation::Bool => match key {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            _ => Err(bad_key("a bool")),
        },
        Annotation::Decimal => read_decimal(&Json::String(key.to_string()), ctx),
        Annotation::DateTime => read_datetime(&Json::String(key.to_string()), ctx),
        Annotation::Type(_) => resolve_type(key, &ctx.options.policy)
            .map(Value::Type)
            .map_err(|e| ctx.fail(e)),
        Annotation::Primitive(ty) => {
            // numeric primitives accept the parsed number before the raw text
            let input = match ty.scalar_kind() {
                ScalarKind::Int => key.parse::<i64>().map_or_else(|_| Value::from(key), Value::Int),
                ScalarKind::Float => key.parse::<f64>().map_or_else(|_| Value::from(key), Value::Float),
                ScalarKind::Str => Value::from(key),
            };
            ty.construct(input)
                .map(Value::Primitive)
                .map_err(|err| ctx.fail(err.into()))
        }
        other => from_json(other, &Json::String(key.to_string()), ctx),
    }
}

fn read_decimal(json: &Json, ctx: &DeserializeContext<'_>) -> Result<Value, Error> {
    let text = match json {
        Json::String(s) => s.clone(),
        Json::Number(n) => n.to_string(),
        other => return Err(ctx.malformed("a decimal string", other)),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Value::Decimal)
        .map_err(|_| ctx.fail(Error::malformed("a decimal string", format!("'{text}'"))))
}

// RFC 3339 first; a naive timestamp is taken as UTC.
fn read_datetime(json: &Json, ctx: &DeserializeContext<'_>) -> Result<Value, Error> {
    let Json::String(text) = json else {
        return Err(ctx.malformed("an ISO-8601 datetime string", json));
    };

    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::from_str(text).map(|naive| naive.and_utc()))
        .map(Value::DateTime)
        .map_err(|_| ctx.fail(Error::malformed("an ISO-8601 datetime string", format!("'{text}'"))))
}

fn resolve(annotation: &Annotation, ctx: &DeserializeContext<'_>) -> Result<Annotation, Error> {
    resolver::resolve_annotation(annotation, ctx.owner.as_ref()).map_err(|e| ctx.fail(e))
}

fn json_kind(json: &Json) -> String {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
    .to_string()
}

///
/// TESTS
///
