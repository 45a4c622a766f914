use crate::{
    PRIMITIVES_MODULE,
    primitives::{cryptography::SAFE_STR_CACHE_HASH, numeric::SAFE_INT},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use typesafe_core::{
    primitive::{
        Pattern, PrimitiveError, PrimitiveErrorKind, PrimitiveType, PrimitiveValue, RegexMode,
        Scalar, StrRules,
    },
    value::Value,
};

///
/// CONSTANTS
///

pub const OBJ_ID_LENGTH: usize = 8;
pub const RANDOM_HASH_LENGTH: usize = 16;
pub const GUID_LENGTH: usize = 36;

///
/// Obj_Id
///
/// Eight lowercase hex characters, random unless given. `Node_Id` and
/// `Edge_Id` validate the same way but start empty.
///

pub static OBJ_ID: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Obj_Id")
        .module(PRIMITIVES_MODULE)
        .str_rules(StrRules {
            regex: Pattern::new("[^a-f0-9]"),
            max_length: OBJ_ID_LENGTH,
            trim_whitespace: true,
            strict_validation: true,
            ..StrRules::default()
        })
        .generator(random_obj_id)
        .input_hook(check_obj_id)
        .build()
});

pub static NODE_ID: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Node_Id").parent(&OBJ_ID).no_generator().build()
});

pub static EDGE_ID: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Edge_Id").parent(&OBJ_ID).no_generator().build()
});

/// UUID v4 text, generated unless given.
pub static RANDOM_GUID: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Random_Guid")
        .module(PRIMITIVES_MODULE)
        .str_rules(StrRules {
            regex: Pattern::new(
                "^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
            ),
            regex_mode: RegexMode::Match,
            max_length: GUID_LENGTH,
            trim_whitespace: true,
            strict_validation: true,
            ..StrRules::default()
        })
        .generator(|| Scalar::Str(uuid::Uuid::new_v4().to_string()))
        .build()
});

/// Sixteen random hex characters under `Safe_Str__Cache_Hash` rules.
pub static RANDOM_HASH: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Random_Hash")
        .parent(&SAFE_STR_CACHE_HASH)
        .generator(|| Scalar::Str(random_hex(RANDOM_HASH_LENGTH)))
        .build()
});

///
/// Timestamp_Now
///
/// Milliseconds since the epoch, current time unless given. Accepts ints
/// (taken as milliseconds), float seconds, numeric strings and ISO-8601
/// dates; a date without offset is UTC.
///

pub static TIMESTAMP_NOW: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Timestamp_Now")
        .parent(&SAFE_INT)
        .generator(|| Scalar::Int(Utc::now().timestamp_millis()))
        .input_hook(parse_timestamp)
        .build()
});

/// Whether `text` is a well-formed `Obj_Id`.
#[must_use]
pub fn is_obj_id(text: &str) -> bool {
    text.len() == OBJ_ID_LENGTH && text.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

/// Deterministic `Obj_Id`: the first eight hex characters of the SHA-256 of
/// `seed`.
pub fn obj_id_from_seed(seed: &str) -> Result<PrimitiveValue, PrimitiveError> {
    let hex = sha256_hex(seed.as_bytes());

    OBJ_ID.construct(Value::from(&hex[..OBJ_ID_LENGTH]))
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn random_hex(len: usize) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();

    (0..len)
        .map(|_| char::from(HEX[rng.gen_range(0..HEX.len())]))
        .collect()
}

fn random_obj_id() -> Scalar {
    Scalar::Str(random_hex(OBJ_ID_LENGTH))
}

fn check_obj_id(ty: &PrimitiveType, input: Value) -> Result<Value, PrimitiveError> {
    let text = match &input {
        Value::Str(s) => s.trim().to_string(),
        Value::Primitive(p) => p.scalar().to_string(),
        _ => return Ok(input),
    };

    if text.is_empty() || is_obj_id(&text) {
        Ok(Value::Str(text))
    } else {
        let name = ty.name();
        Err(PrimitiveError::new(
            PrimitiveErrorKind::Pattern,
            name,
            format!("in {name}: value provided was not a valid {name}: {text}"),
        ))
    }
}

fn parse_timestamp(ty: &PrimitiveType, input: Value) -> Result<Value, PrimitiveError> {
    match input {
        Value::Float(seconds) => seconds_to_millis(ty, seconds).map(Value::Int),
        Value::DateTime(dt) => Ok(Value::Int(dt.timestamp_millis())),
        Value::Str(text) => {
            let text = text.trim();

            if let Ok(ms) = text.parse::<i64>() {
                return Ok(Value::Int(ms));
            }
            if let Ok(seconds) = text.parse::<f64>() {
                return seconds_to_millis(ty, seconds).map(Value::Int);
            }

            parse_iso(text).map(Value::Int).ok_or_else(|| {
                PrimitiveError::new(
                    PrimitiveErrorKind::Pattern,
                    ty.name(),
                    format!("Could not parse '{text}' as timestamp or ISO date"),
                )
            })
        }
        other => Ok(other),
    }
}

// Truncates toward zero; anything outside i64 milliseconds is refused.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn seconds_to_millis(ty: &PrimitiveType, seconds: f64) -> Result<i64, PrimitiveError> {
    let millis = (seconds * 1000.0).trunc();

    if millis >= i64::MIN as f64 && millis < i64::MAX as f64 {
        Ok(millis as i64)
    } else {
        Err(PrimitiveError::new(
            PrimitiveErrorKind::Range,
            ty.name(),
            format!("in {}, {seconds} seconds is outside the timestamp range", ty.name()),
        ))
    }
}

fn parse_iso(text: &str) -> Option<i64> {
    let text = text.replace('Z', "+00:00");

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }

    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn text(ty: &PrimitiveType, input: impl Into<Value>) -> Result<String, PrimitiveError> {
        ty.construct(input.into())
            .map(|v| v.as_str().unwrap_or_default().to_string())
    }

    fn millis(input: impl Into<Value>) -> i64 {
        TIMESTAMP_NOW
            .construct(input.into())
            .expect("timestamp")
            .as_int()
            .expect("int scalar")
    }

    #[test]
    fn obj_ids_are_random_hex() {
        let a = text(&OBJ_ID, Value::None).expect("generated");
        let b = text(&OBJ_ID, Value::None).expect("generated");

        assert!(is_obj_id(&a));
        assert_ne!(a, b);
        assert_eq!(text(&OBJ_ID, "a1234567").expect("explicit"), "a1234567");
    }

    #[test]
    fn seeded_obj_ids_are_deterministic() {
        let a = obj_id_from_seed("test:node_type:module").expect("seeded");
        let b = obj_id_from_seed("test:node_type:module").expect("seeded");
        let c = obj_id_from_seed("test:node_type:class").expect("seeded");

        assert_eq!(a.as_str(), b.as_str());
        assert_ne!(a.as_str(), c.as_str());
        assert!(is_obj_id(a.as_str().unwrap_or_default()));
    }

    #[test]
    fn node_and_edge_ids_start_empty_and_validate_like_obj_id() {
        assert_eq!(text(&NODE_ID, Value::None).expect("empty"), "");
        assert_eq!(text(&EDGE_ID, "").expect("empty"), "");

        let obj = OBJ_ID.construct(Value::None).expect("obj id");
        assert_eq!(
            text(&NODE_ID, Value::Primitive(obj.clone())).expect("from obj id"),
            obj.as_str().unwrap_or_default()
        );

        for bad in ["aaaa_bbb_cccc", "short", "qqqqqqqq", "not-valid-hex!"] {
            let err = text(&NODE_ID, bad).expect_err("invalid");
            assert_eq!(
                err.message,
                format!("in Node_Id: value provided was not a valid Node_Id: {bad}")
            );
        }
    }

    #[test]
    fn guids_are_uuid_v4() {
        let guids: HashSet<String> = (0..100)
            .map(|_| text(&RANDOM_GUID, Value::None).expect("guid"))
            .collect();
        assert_eq!(guids.len(), 100);

        let guid = guids.iter().next().expect("one guid");
        let parts: Vec<&str> = guid.split('-').collect();
        assert_eq!(parts.iter().map(|p| p.len()).collect::<Vec<_>>(), [8, 4, 4, 4, 12]);
        assert!(parts[2].starts_with('4'));

        let explicit = "a1b2c3d4-e5f6-7890-abcd-ef1234567890";
        assert_eq!(text(&RANDOM_GUID, explicit).expect("explicit"), explicit);
        assert!(text(&RANDOM_GUID, "not-a-guid").is_err());
    }

    #[test]
    fn random_hashes_follow_cache_hash_rules() {
        let hash = text(&RANDOM_HASH, Value::None).expect("generated");
        assert_eq!(hash.len(), RANDOM_HASH_LENGTH);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(
            text(&RANDOM_HASH, "abc").expect_err("short").message,
            "in Random_Hash, value does not match required pattern: ^[a-f0-9]{10,96}$"
        );
        assert_eq!(
            text(&RANDOM_HASH, "abc123def4567890abc".repeat(10)).expect_err("long").message,
            "in Random_Hash, value exceeds maximum length of 96 characters (was 190)"
        );
    }

    #[test]
    fn timestamps_accept_numbers_strings_and_iso_dates() {
        let now = Utc::now().timestamp_millis();
        assert!((millis(Value::None) - now).abs() < 1_000);

        assert_eq!(millis(1_234_567_890), 1_234_567_890);
        assert_eq!(millis(1_234_567_890.123_456), 1_234_567_890_123);
        assert_eq!(millis("1234567890"), 1_234_567_890);
        assert_eq!(millis("1234567890.5"), 1_234_567_890_500);

        let noon = Utc
            .with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
            .single()
            .expect("date")
            .timestamp_millis();
        assert_eq!(millis("2024-01-15T12:00:00"), noon);
        assert_eq!(millis("2024-01-15T12:00:00Z"), noon);
        assert_eq!(millis("2024-01-15T12:00:00-05:00"), noon + 5 * 3_600 * 1_000);
        assert_eq!(millis("2024-01-15"), noon - 12 * 3_600 * 1_000);
    }

    #[test]
    fn out_of_range_timestamps_are_refused() {
        for bad in [Value::Float(1.0e17), Value::Float(-1.0e17), Value::from("1e300"), Value::Float(f64::NAN)] {
            let err = TIMESTAMP_NOW.construct(bad).expect_err("out of range");
            assert_eq!(err.kind, PrimitiveErrorKind::Range);
        }

        assert_eq!(millis(-1.5), -1_500);
        assert_eq!(millis(9.0e15), 9_000_000_000_000_000_000);
    }

    #[test]
    fn unparseable_timestamps_are_rejected() {
        for bad in ["not-a-date", "2024-13-45", "15/01/2024"] {
            let err = TIMESTAMP_NOW.construct(bad.into()).expect_err("bad date");
            assert_eq!(err.message, format!("Could not parse '{bad}' as timestamp or ISO date"));
        }
    }
}
