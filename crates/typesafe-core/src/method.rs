//! Parameter checking for functions that take Type-Safe arguments.
//!
//! A `Signature` binds named or positional arguments, applies defaults and
//! checks each value against its parameter annotation. Basic `int`/`str`
//! inputs may be converted into the annotated type; everything else must
//! already be an instance of it.

use crate::{
    annotation::Annotation,
    error::{Error, Site},
    instance::Kwargs,
    validate::is_instance,
    value::Value,
};
use derive_more::{Deref, IntoIterator};

///
/// Param
///

#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub annotation: Annotation,
    pub default: Option<Value>,
}

impl Param {
    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

///
/// Signature
///

#[derive(Clone, Debug)]
pub struct Signature {
    name: String,
    params: Vec<Param>,
}

impl Signature {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SignatureBuilder {
        SignatureBuilder {
            name: name.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Bind positional arguments in declaration order.
    pub fn bind_positional(&self, args: Vec<Value>) -> Result<BoundArgs, Error> {
        if args.len() > self.params.len() {
            return Err(self.call_error(
                "positional arguments",
                format!(
                    "{}() takes {} positional arguments but {} were given",
                    self.name,
                    self.params.len(),
                    args.len()
                ),
            ));
        }

        let kwargs = self
            .params
            .iter()
            .zip(args)
            .map(|(param, value)| (param.name.clone(), value))
            .collect();

        self.bind(kwargs)
    }

    /// Bind named arguments, apply defaults, then check and convert each
    /// parameter.
    pub fn bind(&self, mut args: Kwargs) -> Result<BoundArgs, Error> {
        if let Some((unexpected, _)) = args.iter().find(|(name, _)| self.param(name).is_none()) {
            return Err(Error::unknown_attribute(
                &self.name,
                unexpected,
                format!("{}() got an unexpected keyword argument '{unexpected}'", self.name),
            ));
        }

        let mut bound = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let value = match (args.remove(&param.name), &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(self.call_error(
                        &param.name,
                        format!("{}() missing a required argument: '{}'", self.name, param.name),
                    ));
                }
            };

            bound.push((param.name.clone(), check_parameter(param, value)?));
        }

        Ok(BoundArgs(bound))
    }

    fn call_error(&self, what: &str, message: String) -> Error {
        Error::type_mismatch_with(&Site::Param(what.to_string()), &self.name, "call", message)
    }
}

///
/// SignatureBuilder
///

#[derive(Debug)]
pub struct SignatureBuilder {
    name: String,
    params: Vec<Param>,
}

impl SignatureBuilder {
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, annotation: impl Into<Annotation>) -> Self {
        self.params.push(Param {
            name: name.into(),
            annotation: annotation.into(),
            default: None,
        });
        self
    }

    #[must_use]
    pub fn param_default(
        mut self,
        name: impl Into<String>,
        annotation: impl Into<Annotation>,
        default: impl Into<Value>,
    ) -> Self {
        self.params.push(Param {
            name: name.into(),
            annotation: annotation.into(),
            default: Some(default.into()),
        });
        self
    }

    #[must_use]
    pub fn build(self) -> Signature {
        Signature {
            name: self.name,
            params: self.params,
        }
    }
}

///
/// BoundArgs
///
/// Checked arguments in parameter order.
///

#[derive(Clone, Debug, Deref, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct BoundArgs(Vec<(String, Value)>);

impl BoundArgs {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn into_kwargs(self) -> Kwargs {
        self.0.into()
    }
}

fn check_parameter(param: &Param, value: Value) -> Result<Value, Error> {
    let name = param.name.as_str();
    let annotation = param.annotation.unwrap_annotated();

    if value.is_none() {
        if annotation.admits_none() || param.has_default() {
            return Ok(value);
        }
        return Err(param_error(
            param,
            &value,
            format!("Parameter '{name}' is not optional but got None"),
        ));
    }

    let expected = match annotation {
        Annotation::Optional(inner) => inner.unwrap_annotated(),
        other => other,
    };

    match expected {
        Annotation::List(element) => check_list(param, element, value),
        Annotation::Union(members) => {
            if members.iter().any(|member| is_instance(member, &value)) {
                Ok(value)
            } else {
                let listing: Vec<String> = members.iter().map(|m| format!("<class '{m}'>")).collect();
                Err(param_error(
                    param,
                    &value,
                    format!(
                        "Parameter '{name}' expected one of types ({}), but got <class '{}'>",
                        listing.join(", "),
                        value.type_name()
                    ),
                ))
            }
        }
        _ => match convert_basic(expected, &value) {
            Some(converted) => Ok(converted),
            None if is_instance(expected, &value) => Ok(value),
            None => Err(param_error(
                param,
                &value,
                format!(
                    "Parameter '{name}' expected type <class '{expected}'>, but got <class '{}'>",
                    value.type_name()
                ),
            )),
        },
    }
}

fn check_list(param: &Param, element: &Annotation, value: Value) -> Result<Value, Error> {
    let items: Vec<&Value> = match &value {
        Value::List(items) => items.iter().collect(),
        Value::TypedList(list) => list.iter().collect(),
        other => {
            return Err(param_error(
                param,
                other,
                format!(
                    "Parameter '{}' expected a list but got <class '{}'>",
                    param.name,
                    other.type_name()
                ),
            ));
        }
    };

    for (i, item) in items.into_iter().enumerate() {
        if !is_instance(element, item) {
            return Err(Error::type_mismatch_with(
                &Site::Index(i),
                element,
                item.type_name(),
                format!(
                    "List item at index {i} expected type <class '{element}'>, but got <class '{}'>",
                    item.type_name()
                ),
            ));
        }
    }

    Ok(value)
}

// Plain ints and strings may be converted into the annotated type, and an
// enum member stands in for its value where a string is expected.
fn convert_basic(expected: &Annotation, value: &Value) -> Option<Value> {
    match (expected, value) {
        (Annotation::Primitive(ty), Value::Int(_) | Value::Str(_)) => {
            ty.construct(value.clone()).ok().map(Value::Primitive)
        }
        (Annotation::Int, Value::Str(s)) => s.trim().parse::<i64>().ok().map(Value::Int),
        #[allow(clippy::cast_precision_loss)]
        (Annotation::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
        (Annotation::Float, Value::Str(s)) => s.trim().parse::<f64>().ok().map(Value::Float),
        (Annotation::Str, Value::Int(i)) => Some(Value::Str(i.to_string())),

        (Annotation::Str, Value::Enum(member)) => match member.value() {
            v @ Value::Str(_) => Some(v.clone()),
            _ => None,
        },
        (Annotation::Primitive(ty), Value::Enum(member)) => match member.value() {
            v @ Value::Str(_) => ty.construct(v.clone()).ok().map(Value::Primitive),
            _ => None,
        },
        _ => None,
    }
}

fn param_error(param: &Param, value: &Value, message: String) -> Error {
    Error::type_mismatch_with(
        &Site::Param(param.name.clone()),
        &param.annotation,
        value.type_name(),
        message,
    )
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        test_support::{safe_id, safe_int, status_enum},
    };

    fn greet() -> Signature {
        Signature::builder("greet")
            .param("name", safe_id())
            .param("times", Annotation::Int)
            .param_default("suffix", Annotation::Str, "!")
            .param_default("label", Annotation::optional(Annotation::Str), Value::None)
            .build()
    }

    #[test]
    fn defaults_are_applied_and_basic_values_converted() {
        let bound = greet()
            .bind(kwargs! {"name" => "abc", "times" => "3"})
            .expect("bind");

        assert!(matches!(bound.get("name"), Some(Value::Primitive(_))));
        assert_eq!(bound.get("times"), Some(&Value::Int(3)));
        assert_eq!(bound.get("suffix"), Some(&Value::from("!")));
        assert_eq!(bound.get("label"), Some(&Value::None));
        assert_eq!(bound.len(), 4);
    }

    #[test]
    fn positional_arguments_bind_in_order() {
        let bound = greet()
            .bind_positional(vec!["abc".into(), 2.into(), "?".into()])
            .expect("bind");
        assert_eq!(bound.get("suffix"), Some(&Value::from("?")));

        let err = greet()
            .bind_positional(vec![Value::None; 5])
            .expect_err("too many");
        assert_eq!(err.to_string(), "greet() takes 4 positional arguments but 5 were given");
    }

    #[test]
    fn none_needs_an_optional_or_defaulted_parameter() {
        let err = greet()
            .bind(kwargs! {"name" => Value::None, "times" => 1})
            .expect_err("none");
        assert_eq!(err.to_string(), "Parameter 'name' is not optional but got None");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);

        assert!(greet()
            .bind(kwargs! {"name" => "a", "times" => 1, "suffix" => Value::None})
            .is_ok());
    }

    #[test]
    fn mismatches_name_the_parameter() {
        let err = greet()
            .bind(kwargs! {"name" => "a", "times" => 1.5})
            .expect_err("float for int");
        assert_eq!(
            err.to_string(),
            "Parameter 'times' expected type <class 'int'>, but got <class 'float'>"
        );

        let err = greet().bind(kwargs! {"name" => "a"}).expect_err("missing");
        assert_eq!(err.to_string(), "greet() missing a required argument: 'times'");

        let err = greet()
            .bind(kwargs! {"name" => "a", "times" => 1, "colour" => "red"})
            .expect_err("unexpected");
        assert_eq!(err.kind(), ErrorKind::UnknownAttribute);
    }

    #[test]
    fn list_items_are_checked_per_index() {
        let sig = Signature::builder("total")
            .param("values", Annotation::list(Annotation::Int))
            .build();

        assert!(sig.bind(kwargs! {"values" => vec![Value::from(1), Value::from(2)]}).is_ok());

        let err = sig
            .bind(kwargs! {"values" => vec![Value::from(1), Value::from("2")]})
            .expect_err("bad item");
        assert_eq!(
            err.to_string(),
            "List item at index 1 expected type <class 'int'>, but got <class 'str'>"
        );

        let err = sig.bind(kwargs! {"values" => 3}).expect_err("not a list");
        assert_eq!(err.to_string(), "Parameter 'values' expected a list but got <class 'int'>");
    }

    #[test]
    fn enum_members_pass_their_value_to_str_parameters() {
        let sig = Signature::builder("show").param("status", Annotation::Str).build();
        let active = status_enum().by_name("ACTIVE").expect("member");

        let bound = sig.bind(kwargs! {"status" => Value::Enum(active)}).expect("bind");
        assert_eq!(bound.get("status"), Some(&Value::from("active")));
    }

    #[test]
    fn unions_accept_any_member() {
        let sig = Signature::builder("pick")
            .param("v", Annotation::union(vec![Annotation::Int, safe_int().into()]))
            .build();

        assert!(sig.bind(kwargs! {"v" => 4}).is_ok());
        let err = sig.bind(kwargs! {"v" => "x"}).expect_err("str");
        assert!(err.to_string().starts_with("Parameter 'v' expected one of types"));
    }
}
