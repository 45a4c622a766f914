use crate::{PRIMITIVES_MODULE, primitives::identifiers::sha256_hex};
use std::sync::LazyLock;
use typesafe_core::{
    primitive::{Pattern, PrimitiveError, PrimitiveType, PrimitiveValue, RegexMode, StrRules},
    value::Value,
};

///
/// CONSTANTS
///

pub const SAFE_STR_HASH_LENGTH: usize = 10;
pub const CACHE_HASH_MIN_LENGTH: usize = 10;
pub const CACHE_HASH_MAX_LENGTH: usize = 96;

///
/// Safe_Str__Hash
///
/// Exactly ten hex characters, usually a truncated SHA-256. Empty is
/// allowed so the field can start unset.
///

pub static SAFE_STR_HASH: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str__Hash")
        .module(PRIMITIVES_MODULE)
        .str_rules(StrRules {
            regex: Pattern::new("[^a-fA-F0-9]"),
            max_length: SAFE_STR_HASH_LENGTH,
            exact_length: true,
            trim_whitespace: true,
            strict_validation: true,
            ..StrRules::default()
        })
        .build()
});

/// Lowercase hex between ten and ninety-six characters.
pub static SAFE_STR_CACHE_HASH: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str__Cache_Hash")
        .module(PRIMITIVES_MODULE)
        .str_rules(StrRules {
            regex: Pattern::new("^[a-f0-9]{10,96}$"),
            regex_mode: RegexMode::Match,
            max_length: CACHE_HASH_MAX_LENGTH,
            min_length: Some(CACHE_HASH_MIN_LENGTH),
            trim_whitespace: true,
            strict_validation: true,
            ..StrRules::default()
        })
        .build()
});

/// `Safe_Str__Hash` of `text`: the first ten hex characters of its SHA-256.
pub fn safe_str_hash(text: &str) -> Result<PrimitiveValue, PrimitiveError> {
    let hex = sha256_hex(text.as_bytes());

    SAFE_STR_HASH.construct(Value::from(&hex[..SAFE_STR_HASH_LENGTH]))
}

///
/// TESTS
///
