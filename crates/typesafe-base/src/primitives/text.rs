use crate::PRIMITIVES_MODULE;
use rand::{Rng, distributions::Alphanumeric};
use std::sync::LazyLock;
use typesafe_core::primitive::{Pattern, PrimitiveType, RegexMode, Scalar, StrRules};

///
/// CONSTANTS
///

pub const SAFE_STR_ID_MAX_LENGTH: usize = 128;
pub const SAFE_STR_FILE_PATH_MAX_LENGTH: usize = 1024;
pub const SAFE_STR_FILE_NAME_MAX_LENGTH: usize = 255;
pub const SAFE_STR_SLUG_MAX_LENGTH: usize = 64;
pub const SAFE_STR_DISPLAY_NAME_MAX_LENGTH: usize = 256;
pub const SAFE_STR_URL_MAX_LENGTH: usize = 2048;
pub const SAFE_STR_VERSION_MAX_LENGTH: usize = 12;

/// Alphanumerics only; everything else becomes `_`.
pub static SAFE_STR: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str")
        .module(PRIMITIVES_MODULE)
        .str_rules(StrRules::default())
        .build()
});

pub static SAFE_STR_ID: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str__Id")
        .parent(&SAFE_STR)
        .str_rules(StrRules {
            regex: Pattern::new(r"[^a-zA-Z0-9_\-]"),
            max_length: SAFE_STR_ID_MAX_LENGTH,
            trim_whitespace: true,
            ..StrRules::default()
        })
        .build()
});

/// Identifier that generates `safe-id_<5 chars>` when built without input.
pub static SAFE_ID: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Id")
        .parent(&SAFE_STR)
        .str_rules(StrRules {
            regex: Pattern::new(r"[^a-zA-Z0-9_\-]"),
            trim_whitespace: true,
            ..StrRules::default()
        })
        .generator(short_id)
        .build()
});

pub static SAFE_STR_FILE_PATH: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str__File__Path")
        .parent(&SAFE_STR)
        .str_rules(StrRules {
            regex: Pattern::new(r"[^a-zA-Z0-9_\-./\\ ]"),
            max_length: SAFE_STR_FILE_PATH_MAX_LENGTH,
            trim_whitespace: true,
            ..StrRules::default()
        })
        .build()
});

pub static SAFE_STR_FILE_NAME: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str__File__Name")
        .parent(&SAFE_STR)
        .str_rules(StrRules {
            regex: Pattern::new(r"[^a-zA-Z0-9_\-. ]"),
            max_length: SAFE_STR_FILE_NAME_MAX_LENGTH,
            trim_whitespace: true,
            ..StrRules::default()
        })
        .build()
});

pub static SAFE_STR_SLUG: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str__Slug")
        .parent(&SAFE_STR)
        .str_rules(StrRules {
            regex: Pattern::new(r"[^a-z0-9\-]"),
            max_length: SAFE_STR_SLUG_MAX_LENGTH,
            to_lower_case: true,
            trim_whitespace: true,
            ..StrRules::default()
        })
        .build()
});

pub static SAFE_STR_DISPLAY_NAME: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str__Display_Name")
        .parent(&SAFE_STR)
        .str_rules(StrRules {
            regex: Pattern::new(r"[^a-zA-Z0-9_\- ().'#]"),
            max_length: SAFE_STR_DISPLAY_NAME_MAX_LENGTH,
            trim_whitespace: true,
            ..StrRules::default()
        })
        .build()
});

/// http(s) URL with optional port, path, query and fragment. Rejected, not
/// sanitized, when it does not match.
pub static SAFE_STR_URL: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str__Url")
        .parent(&SAFE_STR)
        .str_rules(StrRules {
            regex: Pattern::new(
                r"^https?://[a-zA-Z0-9.\-]+(:[0-9]{1,5})?(/[a-zA-Z0-9/\-._~%]*)?(\?[a-zA-Z0-9=&\-._~%+]*)?(#[a-zA-Z0-9\-._~%]*)?$",
            ),
            regex_mode: RegexMode::Match,
            max_length: SAFE_STR_URL_MAX_LENGTH,
            trim_whitespace: true,
            strict_validation: true,
            ..StrRules::default()
        })
        .build()
});

/// `v1`, `1.2`, `v1.2.3`; at most three digits per segment.
pub static SAFE_STR_VERSION: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str__Version")
        .parent(&SAFE_STR)
        .str_rules(StrRules {
            regex: Pattern::new(r"^v?\d{1,3}(?:\.\d{1,3}){0,2}$"),
            regex_mode: RegexMode::Match,
            max_length: SAFE_STR_VERSION_MAX_LENGTH,
            trim_whitespace: true,
            strict_validation: true,
            ..StrRules::default()
        })
        .build()
});

fn short_id() -> Scalar {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    Scalar::Str(format!("safe-id_{suffix}"))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use typesafe_core::{
        primitive::{PrimitiveError, PrimitiveErrorKind},
        value::Value,
    };

    fn text(ty: &PrimitiveType, input: impl Into<Value>) -> Result<String, PrimitiveError> {
        ty.construct(input.into())
            .map(|v| v.as_str().unwrap_or_default().to_string())
    }

    #[test]
    fn safe_str_sanitizes() {
        assert_eq!(text(&SAFE_STR, "aaa-bbb").expect("valid"), "aaa_bbb");
        assert_eq!(text(&SAFE_STR, Value::None).expect("empty"), "");

        let err = text(&SAFE_STR, "a".repeat(600)).expect_err("too long");
        assert_eq!(
            err.message,
            "in Safe_Str, value exceeds maximum length of 512 characters (was 600)"
        );
    }

    #[test]
    fn identifiers_keep_hyphens_and_underscores() {
        assert_eq!(text(&SAFE_STR_ID, " user-123 ").expect("id"), "user-123");
        assert_eq!(text(&SAFE_STR_ID, "my/id\\path").expect("id"), "my_id_path");
        assert_eq!(text(&SAFE_STR_ID, "id!@#$%^&*()").expect("id"), "id__________");
    }

    #[test]
    fn safe_id_generates_when_empty() {
        let a = text(&SAFE_ID, Value::None).expect("generated");
        let b = text(&SAFE_ID, Value::None).expect("generated");

        assert!(a.starts_with("safe-id_"));
        assert_eq!(a.len(), 13);
        assert_ne!(a, b);
        assert_eq!(text(&SAFE_ID, "abc").expect("explicit"), "abc");
    }

    #[test]
    fn file_names_slugs_and_display_names() {
        assert_eq!(
            text(&SAFE_STR_FILE_NAME, "  My Spaced  File  ").expect("name"),
            "My Spaced  File"
        );
        assert_eq!(text(&SAFE_STR_FILE_NAME, "file<1>.txt").expect("name"), "file_1_.txt");
        assert_eq!(
            text(&SAFE_STR_FILE_PATH, "dir/sub\\file.txt").expect("path"),
            "dir/sub\\file.txt"
        );
        assert_eq!(text(&SAFE_STR_SLUG, "My Blog-Post").expect("slug"), "my_blog-post");
        assert_eq!(text(&SAFE_STR_DISPLAY_NAME, "O'Brien (Dr.)").expect("display"), "O'Brien (Dr.)");
    }

    #[test]
    fn urls_and_versions_must_match() {
        assert_eq!(
            text(&SAFE_STR_URL, "https://example.com:443/path?q=a+b#top").expect("url"),
            "https://example.com:443/path?q=a+b#top"
        );
        assert_eq!(
            text(&SAFE_STR_URL, "ftp://example.com").expect_err("scheme").kind,
            PrimitiveErrorKind::Pattern
        );

        assert_eq!(text(&SAFE_STR_VERSION, "  v1.2.3  ").expect("version"), "v1.2.3");
        assert_eq!(
            text(&SAFE_STR_VERSION, "v1.1000").expect_err("digits").message,
            r"in Safe_Str__Version, value does not match required pattern: ^v?\d{1,3}(?:\.\d{1,3}){0,2}$"
        );
    }

    #[test]
    fn children_descend_from_safe_str() {
        for ty in [&*SAFE_STR_ID, &*SAFE_ID, &*SAFE_STR_SLUG, &*SAFE_STR_URL] {
            assert!(ty.is_subtype_of(&SAFE_STR), "{} should descend from Safe_Str", ty.name());
            assert_eq!(ty.module(), PRIMITIVES_MODULE);
        }
    }
}
