use crate::{
    DEFAULT_STR_MAX_LENGTH,
    primitive::{PrimitiveError, PrimitiveErrorKind, Scalar},
    value::{Value, float_repr},
};
use regex::Regex;
use std::{borrow::Cow, fmt, sync::OnceLock};

///
/// Pattern
///
/// Regex compiled on first use. In sanitizing mode it matches the
/// characters to replace; in strict mode any match rejects the value.
///

#[derive(Clone)]
pub struct Pattern {
    source: Cow<'static, str>,
    compiled: OnceLock<Result<Regex, String>>,
}

impl Pattern {
    #[must_use]
    pub const fn new(source: &'static str) -> Self {
        Self {
            source: Cow::Borrowed(source),
            compiled: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn owned(source: impl Into<String>) -> Self {
        Self {
            source: Cow::Owned(source.into()),
            compiled: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn regex(&self, type_name: &str) -> Result<&Regex, PrimitiveError> {
        self.compiled
            .get_or_init(|| Regex::new(&self.source).map_err(|err| err.to_string()))
            .as_ref()
            .map_err(|err| {
                PrimitiveError::new(
                    PrimitiveErrorKind::Pattern,
                    type_name,
                    format!("in {type_name}, invalid pattern '{}': {err}", self.source),
                )
            })
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({})", self.source)
    }
}

///
/// RegexMode
///
/// `Replace` treats the pattern as the set of characters to sanitize (or,
/// with `strict_validation`, to reject). `Match` requires the whole value
/// to match the pattern.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RegexMode {
    #[default]
    Replace,
    Match,
}

///
/// StrRules
///

#[derive(Clone, Debug)]
pub struct StrRules {
    pub regex: Pattern,
    pub regex_mode: RegexMode,
    pub replacement_char: char,
    pub max_length: usize,
    pub min_length: Option<usize>,
    /// Length must equal `max_length` exactly.
    pub exact_length: bool,
    pub trim_whitespace: bool,
    pub to_lower_case: bool,
    pub allow_empty: bool,
    pub allow_all_replacement_char: bool,
    /// Reject instead of sanitize.
    pub strict_validation: bool,
}

impl Default for StrRules {
    fn default() -> Self {
        Self {
            regex: Pattern::new("[^a-zA-Z0-9]"),
            regex_mode: RegexMode::Replace,
            replacement_char: '_',
            max_length: DEFAULT_STR_MAX_LENGTH,
            min_length: None,
            exact_length: false,
            trim_whitespace: false,
            to_lower_case: false,
            allow_empty: true,
            allow_all_replacement_char: true,
            strict_validation: false,
        }
    }
}

impl StrRules {
    pub(super) fn apply(&self, type_name: &str, input: &Value) -> Result<String, PrimitiveError> {
        let fail = |kind, message: String| {
            Err(PrimitiveError::new(
                kind,
                type_name,
                format!("in {type_name}, {message}"),
            ))
        };

        if input.is_none() {
            if !self.allow_empty {
                return fail(
                    PrimitiveErrorKind::Empty,
                    "value cannot be None when allow_empty is False".into(),
                );
            }
            return Ok(String::new());
        }

        let mut text = coerce(type_name, input)?;
        if self.trim_whitespace {
            text = text.trim().to_string();
        }
        if self.to_lower_case {
            text = text.to_lowercase();
        }

        if text.is_empty() {
            if !self.allow_empty {
                return fail(
                    PrimitiveErrorKind::Empty,
                    "value cannot be empty when allow_empty is False".into(),
                );
            }
            return Ok(text);
        }

        let len = text.chars().count();
        if self.exact_length && len != self.max_length {
            return fail(
                PrimitiveErrorKind::Length,
                format!("value must be exactly {} characters long", self.max_length),
            );
        }
        if len > self.max_length {
            return fail(
                PrimitiveErrorKind::Length,
                format!(
                    "value exceeds maximum length of {} characters (was {len})",
                    self.max_length
                ),
            );
        }
        let regex = self.regex.regex(type_name)?;
        let text = if self.regex_mode == RegexMode::Match {
            if !regex.is_match(&text) {
                return fail(
                    PrimitiveErrorKind::Pattern,
                    format!("value does not match required pattern: {}", self.regex.as_str()),
                );
            }
            text
        } else if self.strict_validation {
            if regex.is_match(&text) {
                return fail(
                    PrimitiveErrorKind::Pattern,
                    "value contains invalid characters".into(),
                );
            }
            text
        } else {
            let mut buf = [0u8; 4];
            let replacement: &str = self.replacement_char.encode_utf8(&mut buf);
            regex.replace_all(&text, replacement).into_owned()
        };

        if let Some(min) = self.min_length
            && len < min
        {
            return fail(
                PrimitiveErrorKind::Length,
                format!("value must be at least {min} characters long (was {len})"),
            );
        }

        if !self.allow_all_replacement_char
            && !text.is_empty()
            && text.chars().all(|c| c == self.replacement_char)
        {
            return fail(
                PrimitiveErrorKind::Pattern,
                format!(
                    "sanitized value consists entirely of '{}' characters",
                    self.replacement_char
                ),
            );
        }

        Ok(text)
    }
}

/// Text form of a scalar-like input before sanitizing.
fn coerce(type_name: &str, input: &Value) -> Result<String, PrimitiveError> {
    match input {
        Value::Str(s) => Ok(s.clone()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(x) => Ok(float_repr(*x)),
        Value::Bool(_) | Value::Decimal(_) => Ok(input.to_string()),
        Value::Primitive(p) => Ok(match p.scalar() {
            Scalar::Str(s) => s.clone(),
            other => other.to_string(),
        }),
        other => Err(PrimitiveError::new(
            PrimitiveErrorKind::Type,
            type_name,
            format!(
                "in {type_name}, value must be a string, got {}",
                other.type_name()
            ),
        )),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(rules: &StrRules, input: impl Into<Value>) -> Result<String, PrimitiveError> {
        rules.apply("Custom_Safe_Str", &input.into())
    }

    #[test]
    fn default_rules_sanitize_non_alphanumerics() {
        let rules = StrRules::default();

        assert_eq!(apply(&rules, "aaa-bbb").unwrap(), "aaa_bbb");
        assert_eq!(apply(&rules, "  abc  ").unwrap(), "__abc__");
        assert_eq!(apply(&rules, "a\n\t\rb").unwrap(), "a___b");
        assert_eq!(apply(&rules, 12345).unwrap(), "12345");
        assert_eq!(apply(&rules, 3.14159).unwrap(), "3_14159");
        assert_eq!(apply(&rules, "!@#$%^&*()").unwrap(), "__________");
        assert_eq!(apply(&rules, Value::None).unwrap(), "");
    }

    #[test]
    fn max_length_is_enforced_after_trimming() {
        let rules = StrRules {
            max_length: 10,
            ..StrRules::default()
        };

        let err = apply(&rules, "a".repeat(11)).unwrap_err();
        assert_eq!(err.kind, PrimitiveErrorKind::Length);
        assert!(
            err.message
                .starts_with("in Custom_Safe_Str, value exceeds maximum length of 10")
        );
    }

    #[test]
    fn disallowed_empty_values_are_rejected() {
        let rules = StrRules {
            allow_empty: false,
            allow_all_replacement_char: false,
            trim_whitespace: true,
            ..StrRules::default()
        };

        assert_eq!(
            apply(&rules, Value::None).unwrap_err().message,
            "in Custom_Safe_Str, value cannot be None when allow_empty is False"
        );
        assert_eq!(
            apply(&rules, "    ").unwrap_err().message,
            "in Custom_Safe_Str, value cannot be empty when allow_empty is False"
        );
        assert_eq!(
            apply(&rules, "______").unwrap_err().message,
            "in Custom_Safe_Str, sanitized value consists entirely of '_' characters"
        );
    }

    #[test]
    fn strict_and_exact_rules_reject_instead_of_fixing() {
        let rules = StrRules {
            regex: Pattern::new("[^a-fA-F0-9]"),
            max_length: 10,
            exact_length: true,
            strict_validation: true,
            trim_whitespace: true,
            allow_empty: false,
            ..StrRules::default()
        };

        assert_eq!(apply(&rules, "abcdef0123").unwrap(), "abcdef0123");
        assert!(
            apply(&rules, " 123456789 ")
                .unwrap_err()
                .message
                .contains("value must be exactly 10 characters long")
        );
        let err = apply(&rules, "12345g7890").unwrap_err();
        assert_eq!(err.kind, PrimitiveErrorKind::Pattern);
        assert!(err.message.contains("value contains invalid characters"));
    }

    #[test]
    fn match_mode_requires_a_full_match() {
        let rules = StrRules {
            regex: Pattern::new(r"^v?\d{1,3}(?:\.\d{1,3}){0,2}$"),
            regex_mode: RegexMode::Match,
            trim_whitespace: true,
            max_length: 12,
            ..StrRules::default()
        };

        assert_eq!(apply(&rules, "  v1.2.3 ").unwrap(), "v1.2.3");
        let err = apply(&rules, "v1.2.3.4").unwrap_err();
        assert_eq!(err.kind, PrimitiveErrorKind::Pattern);
        assert_eq!(
            err.message,
            r"in Custom_Safe_Str, value does not match required pattern: ^v?\d{1,3}(?:\.\d{1,3}){0,2}$"
        );
    }

    #[test]
    fn allowed_empty_value_skips_exact_length() {
        let rules = StrRules {
            max_length: 5,
            exact_length: true,
            ..StrRules::default()
        };

        assert_eq!(apply(&rules, "").unwrap(), "");
        assert!(apply(&rules, "abc").is_err());
    }

    #[test]
    fn lower_casing_runs_before_sanitizing() {
        let rules = StrRules {
            to_lower_case: true,
            regex: Pattern::new("[^a-z0-9]"),
            ..StrRules::default()
        };

        assert_eq!(apply(&rules, "AbC-1").unwrap(), "abc_1");
    }

    #[test]
    fn containers_are_not_strings() {
        let err = apply(&StrRules::default(), Value::List(vec![])).unwrap_err();

        assert_eq!(err.kind, PrimitiveErrorKind::Type);
    }
}
