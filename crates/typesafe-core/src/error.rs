use crate::primitive::{PrimitiveError, PrimitiveErrorKind};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Every failure surfaced by constructors, setattr, collections and the
/// JSON layer. Variants map one-to-one onto `ErrorKind`, except
/// `Deserialize`, which wraps a cause with the JSON path it failed at.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{message}")]
    TypeMismatch {
        site: Site,
        expected: String,
        actual: String,
        message: String,
    },

    #[error("{message}")]
    ValueOutOfRange { type_name: String, message: String },

    #[error("{message}")]
    ValuePatternViolation { type_name: String, message: String },

    #[error("{message}")]
    UnknownAttribute {
        class: String,
        name: String,
        message: String,
    },

    #[error("could not resolve forward reference '{name}' from {scope}")]
    ForwardRefUnresolved { name: String, scope: String },

    #[error("{reason}")]
    SecurityViolation { reference: String, reason: String },

    #[error("malformed JSON structure: expected {expected}, found {found}")]
    MalformedJsonStructure { expected: String, found: String },

    #[error("in class {class}: {message}")]
    ClassDefinition { class: String, message: String },

    #[error("at '{path}': {source}")]
    Deserialize {
        path: String,
        #[source]
        source: Box<Self>,
    },
}

impl Error {
    /// Build a type mismatch for a value of runtime type `actual` at `site`.
    pub fn type_mismatch(site: &Site, expected: impl fmt::Display, actual: &str) -> Self {
        let expected = expected.to_string();
        let message = format!("Invalid type for {site}. Expected '{expected}' but got '{actual}'");

        Self::TypeMismatch {
            site: site.clone(),
            expected,
            actual: actual.to_string(),
            message,
        }
    }

    /// Build a type mismatch carrying a caller-formatted message.
    pub fn type_mismatch_with(
        site: &Site,
        expected: impl fmt::Display,
        actual: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            site: site.clone(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            message: message.into(),
        }
    }

    pub fn unknown_attribute(class: &str, name: &str, message: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            class: class.to_string(),
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn security(reference: &str, reason: impl Into<String>) -> Self {
        Self::SecurityViolation {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::MalformedJsonStructure {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn class_definition(class: &str, message: impl Into<String>) -> Self {
        Self::ClassDefinition {
            class: class.to_string(),
            message: message.into(),
        }
    }

    /// Wrap an error with the JSON path of the node that produced it.
    ///
    /// The innermost wrap already carries the full path, so an error that is
    /// wrapped once is returned unchanged.
    #[must_use]
    pub fn at_path(self, path: &[PathSegment]) -> Self {
        if path.is_empty() || matches!(self, Self::Deserialize { .. }) {
            return self;
        }

        Self::Deserialize {
            path: render_path(path),
            source: Box::new(self),
        }
    }

    /// Classification of the root cause.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::ValueOutOfRange { .. } => ErrorKind::ValueOutOfRange,
            Self::ValuePatternViolation { .. } => ErrorKind::ValuePatternViolation,
            Self::UnknownAttribute { .. } => ErrorKind::UnknownAttribute,
            Self::ForwardRefUnresolved { .. } => ErrorKind::ForwardRefUnresolved,
            Self::SecurityViolation { .. } => ErrorKind::SecurityViolation,
            Self::MalformedJsonStructure { .. } => ErrorKind::MalformedJsonStructure,
            Self::ClassDefinition { .. } => ErrorKind::ClassDefinition,
            Self::Deserialize { source, .. } => source.kind(),
        }
    }

    /// Innermost error, skipping path wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Deserialize { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// JSON path attached by the deserializer, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Deserialize { path, .. } => Some(path.as_str()),
            _ => None,
        }
    }
}

impl From<PrimitiveError> for Error {
    fn from(err: PrimitiveError) -> Self {
        let PrimitiveError {
            kind,
            type_name,
            message,
        } = err;

        match kind {
            PrimitiveErrorKind::Type => Self::TypeMismatch {
                site: Site::Root,
                expected: type_name,
                actual: String::new(),
                message,
            },
            PrimitiveErrorKind::Range | PrimitiveErrorKind::Length => {
                Self::ValueOutOfRange { type_name, message }
            }
            PrimitiveErrorKind::Pattern | PrimitiveErrorKind::Empty => {
                Self::ValuePatternViolation { type_name, message }
            }
        }
    }
}

///
/// ErrorKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    TypeMismatch,
    ValueOutOfRange,
    ValuePatternViolation,
    UnknownAttribute,
    ForwardRefUnresolved,
    SecurityViolation,
    MalformedJsonStructure,
    ClassDefinition,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypeMismatch => "type_mismatch",
            Self::ValueOutOfRange => "value_out_of_range",
            Self::ValuePatternViolation => "value_pattern_violation",
            Self::UnknownAttribute => "unknown_attribute",
            Self::ForwardRefUnresolved => "forward_ref_unresolved",
            Self::SecurityViolation => "security_violation",
            Self::MalformedJsonStructure => "malformed_json_structure",
            Self::ClassDefinition => "class_definition",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// Site
///
/// Where inside the value being checked a failure happened.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Site {
    #[default]
    Root,
    Field(String),
    Index(usize),
    Key(String),
    Param(String),
}

impl Site {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("value"),
            Self::Field(name) => write!(f, "attribute '{name}'"),
            Self::Index(index) => write!(f, "item at index {index}"),
            Self::Key(key) => write!(f, "dict key '{key}'"),
            Self::Param(name) => write!(f, "parameter '{name}'"),
        }
    }
}

///
/// PathSegment
///
/// One step of a JSON path recorded while deserializing.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Render a path as `a.b[0]['k']`.
#[must_use]
pub fn render_path(path: &[PathSegment]) -> String {
    let mut out = String::new();

    for segment in path {
        match segment {
            PathSegment::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
            PathSegment::Key(key) => {
                out.push_str("['");
                out.push_str(key);
                out.push_str("']");
            }
        }
    }

    out
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_path_mixes_fields_indexes_and_keys() {
        let path = vec![
            PathSegment::Field("children".into()),
            PathSegment::Index(1),
            PathSegment::Field("mapping".into()),
            PathSegment::Key("a.b".into()),
        ];

        assert_eq!(render_path(&path), "children[1].mapping['a.b']");
    }

    #[test]
    fn first_path_wrap_wins_and_root_kind_survives() {
        let inner = Error::type_mismatch(&Site::field("age"), "int", "str");
        let wrapped = inner
            .at_path(&[
                PathSegment::Field("people".into()),
                PathSegment::Index(0),
                PathSegment::Field("age".into()),
            ])
            .at_path(&[PathSegment::Field("people".into())]);

        assert_eq!(wrapped.kind(), ErrorKind::TypeMismatch);
        assert_eq!(wrapped.path(), Some("people[0].age"));
        assert!(matches!(wrapped.root_cause(), Error::TypeMismatch { .. }));
    }

    #[test]
    fn type_mismatch_message_names_site_and_types() {
        let err = Error::type_mismatch(&Site::field("age"), "int", "str");

        assert_eq!(
            err.to_string(),
            "Invalid type for attribute 'age'. Expected 'int' but got 'str'"
        );
    }

    #[test]
    fn primitive_errors_map_onto_kinds() {
        let err: Error = PrimitiveError::new(PrimitiveErrorKind::Length, "Safe_Str", "too long").into();
        assert_eq!(err.kind(), ErrorKind::ValueOutOfRange);

        let err: Error = PrimitiveError::new(PrimitiveErrorKind::Pattern, "Safe_Str", "bad").into();
        assert_eq!(err.kind(), ErrorKind::ValuePatternViolation);

        let err: Error = PrimitiveError::new(PrimitiveErrorKind::Type, "Safe_Int", "bool").into();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }
}
