//! Secure resolution of `<module>.<name>` strings into registered types.
//!
//! Nothing is imported: a reference can only name a symbol already in the
//! registry, and the policy decides which of those may be reconstructed.

use crate::{
    FRAMEWORK_MODULE,
    annotation::{Builtin, TypeRef},
    class::Class,
    error::Error,
    registry::{self, Symbol},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, sync::LazyLock};

///
/// CONSTANTS
///

/// Host modules whose types are always reconstructable.
pub const ALLOWED_MODULES: [&str; 8] = [
    "builtins",
    "types",
    "typing",
    "enum",
    "decimal",
    "datetime",
    "collections",
    "collections.abc",
];

/// Names refused whatever module they are looked up in.
pub const DENIED_NAMES: [&str; 12] = [
    "eval",
    "exec",
    "compile",
    "__import__",
    "open",
    "input",
    "breakpoint",
    "help",
    "globals",
    "locals",
    "vars",
    "dir",
];

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
        .expect("type reference pattern is valid")
});

///
/// ResolverPolicy
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ResolverPolicy {
    /// Modules (and their dotted sub-modules) whose types are allowed.
    pub allowed_modules: BTreeSet<String>,
    pub denied_names: BTreeSet<String>,
    /// Also admit Type-Safe classes and primitives from other modules.
    pub allow_type_safe_subclasses: bool,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        let framework = [
            FRAMEWORK_MODULE.to_string(),
            format!("{FRAMEWORK_MODULE}.primitives"),
        ];

        Self {
            allowed_modules: ALLOWED_MODULES
                .iter()
                .map(ToString::to_string)
                .chain(framework)
                .collect(),
            denied_names: DENIED_NAMES.iter().map(ToString::to_string).collect(),
            allow_type_safe_subclasses: true,
        }
    }
}

impl ResolverPolicy {
    /// Allow-list only; Type-Safe classes from other modules are refused.
    #[must_use]
    pub fn allow_list_only() -> Self {
        Self {
            allow_type_safe_subclasses: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn allow_module(mut self, module: impl Into<String>) -> Self {
        self.allowed_modules.insert(module.into());
        self
    }

    /// Exact match or a dotted sub-module of an allowed module.
    #[must_use]
    pub fn is_module_allowed(&self, module: &str) -> bool {
        self.allowed_modules.contains(module)
            || self.allowed_modules.iter().any(|allowed| {
                module
                    .strip_prefix(allowed.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            })
    }

    fn allowed_listing(&self) -> String {
        let quoted: Vec<String> = self.allowed_modules.iter().map(|m| format!("'{m}'")).collect();

        format!("[{}]", quoted.join(", "))
    }
}

/// Resolve `reference` to a registered type, or refuse with
/// `SecurityViolation`.
pub fn resolve(reference: &str, policy: &ResolverPolicy) -> Result<TypeRef, Error> {
    if reference.is_empty() {
        return Err(reject(reference, "Type reference must be a non-empty string"));
    }
    if !reference.contains('.') {
        return Err(reject(
            reference,
            format!("Type reference must include module: '{reference}'"),
        ));
    }
    if !NAME_PATTERN.is_match(reference) {
        return Err(reject(
            reference,
            format!("Invalid type reference format: '{reference}'"),
        ));
    }

    let Some((module, name)) = reference.rsplit_once('.') else {
        return Err(reject(
            reference,
            format!("Type reference must include module: '{reference}'"),
        ));
    };

    if module == "builtins" && name == "NoneType" {
        return Ok(TypeRef::Builtin(Builtin::NoneType));
    }
    if policy.denied_names.contains(name) {
        return Err(reject(reference, format!("Type '{name}' is deny listed for security")));
    }

    let module_allowed = policy.is_module_allowed(module);
    if !module_allowed && !policy.allow_type_safe_subclasses {
        return Err(reject(
            reference,
            format!(
                "Module '{module}' is not in allowed modules. Allowed: {}",
                policy.allowed_listing()
            ),
        ));
    }

    let symbol = match registry::lookup(reference) {
        Some(symbol) => symbol,
        None if !registry::module_exists(module) => {
            return Err(reject(
                reference,
                format!("Could not import module '{module}': No module named '{module}'"),
            ));
        }
        None => {
            return Err(reject(
                reference,
                format!("Type '{name}' not found in module '{module}'"),
            ));
        }
    };

    let ty = match symbol {
        Symbol::Type(ty) => ty,
        other => {
            return Err(reject(
                reference,
                format!(
                    "Security alert, in deserialize_type__using_value only classes are allowed, \
                     got {} for '{reference}'",
                    other.kind_name()
                ),
            ));
        }
    };

    if !module_allowed && !is_type_safe(&ty) {
        return Err(reject(
            reference,
            format!(
                "Module '{module}' is not in allowed modules and '{name}' does not inherit from \
                 Type_Safe. Allowed modules: {}",
                policy.allowed_listing()
            ),
        ));
    }

    tracing::debug!(reference = %reference, "resolved type reference");

    Ok(ty)
}

fn is_type_safe(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Class(class) => class.is_subclass_of(&Class::root()),
        TypeRef::Primitive(_) => true,
        _ => false,
    }
}

fn reject(reference: &str, reason: impl Into<String>) -> Error {
    let reason = reason.into();
    tracing::warn!(reference = %reference, reason = %reason, "rejected type reference");

    Error::security(reference, reason)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, test_support::person};

    fn reason(reference: &str, policy: &ResolverPolicy) -> String {
        let err = resolve(reference, policy).expect_err("rejected");
        assert_eq!(err.kind(), ErrorKind::SecurityViolation);

        err.to_string()
    }

    #[test]
    fn allow_listed_builtins_resolve() {
        let policy = ResolverPolicy::default();

        assert!(matches!(
            resolve("builtins.int", &policy),
            Ok(TypeRef::Builtin(Builtin::Int))
        ));
        assert!(matches!(
            resolve("builtins.NoneType", &policy),
            Ok(TypeRef::Builtin(Builtin::NoneType))
        ));
        assert!(matches!(
            resolve("decimal.Decimal", &policy),
            Ok(TypeRef::Builtin(Builtin::Decimal))
        ));
    }

    #[test]
    fn denied_and_malformed_references_are_refused() {
        let policy = ResolverPolicy::default();

        assert_eq!(reason("builtins.eval", &policy), "Type 'eval' is deny listed for security");
        assert_eq!(reason("os.system.__import__", &policy), "Type '__import__' is deny listed for security");
        assert_eq!(reason("int", &policy), "Type reference must include module: 'int'");
        assert_eq!(reason("builtins.int; rm", &policy), "Invalid type reference format: 'builtins.int; rm'");
        assert_eq!(reason("", &policy), "Type reference must be a non-empty string");
    }

    #[test]
    fn non_class_symbols_are_refused() {
        let policy = ResolverPolicy::default();

        assert_eq!(
            reason("builtins.len", &policy),
            "Security alert, in deserialize_type__using_value only classes are allowed, \
             got builtin_function_or_method for 'builtins.len'"
        );
    }

    #[test]
    fn unknown_modules_and_names() {
        let policy = ResolverPolicy::default();

        assert_eq!(
            reason("no_such_module.Thing", &policy),
            "Could not import module 'no_such_module': No module named 'no_such_module'"
        );
        assert_eq!(reason("builtins.Thing", &policy), "Type 'Thing' not found in module 'builtins'");
    }

    #[test]
    fn type_safe_classes_need_the_subclass_flag_outside_the_allow_list() {
        let reference = person().type_ref().qualified_name();

        assert!(resolve(&reference, &ResolverPolicy::default()).is_ok());

        let strict = ResolverPolicy::allow_list_only();
        assert!(reason(&reference, &strict).starts_with("Module '__main__' is not in allowed modules."));

        let widened = ResolverPolicy::allow_list_only().allow_module("__main__");
        assert!(resolve(&reference, &widened).is_ok());
    }

    #[test]
    fn sub_modules_of_allowed_modules_are_allowed() {
        let policy = ResolverPolicy::default();

        assert!(policy.is_module_allowed("collections.abc"));
        assert!(policy.is_module_allowed("typesafe.primitives.text"));
        assert!(!policy.is_module_allowed("typesafeX"));
    }

    #[test]
    fn policy_round_trips_through_serde() {
        let policy = ResolverPolicy::allow_list_only();
        let json = serde_json::to_string(&policy).expect("serialize");
        let back: ResolverPolicy = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back, policy);

        let partial: ResolverPolicy =
            serde_json::from_str(r#"{"allow_type_safe_subclasses": false}"#).expect("partial");
        assert!(partial.allowed_modules.contains("builtins"));
    }
}
