//! Catalog of constrained primitives and field validators built on
//! `typesafe-core`.
#![warn(unreachable_pub)]

pub mod primitives;
pub mod validator;

use typesafe_core::primitive::PrimitiveType;

///
/// CONSTANTS
///

/// Module every catalog primitive is registered under.
pub const PRIMITIVES_MODULE: &str = "typesafe.primitives";

/// Build every catalog primitive, registering each in the symbol table so
/// `Type[T]` references to it can be resolved. Idempotent.
pub fn register_all() -> Vec<PrimitiveType> {
    let all = primitives::all();
    tracing::debug!(count = all.len(), "registered primitive catalog");

    all
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        primitives::{
            cryptography::{SAFE_STR_CACHE_HASH, SAFE_STR_HASH, safe_str_hash},
            identifiers::{
                EDGE_ID, NODE_ID, OBJ_ID, RANDOM_GUID, RANDOM_HASH, TIMESTAMP_NOW, is_obj_id,
                obj_id_from_seed,
            },
            numeric::{
                SAFE_FLOAT, SAFE_FLOAT_MONEY, SAFE_FLOAT_PERCENTAGE_EXACT, SAFE_INT, SAFE_UINT,
                SAFE_UINT_PORT,
            },
            text::{
                SAFE_ID, SAFE_STR, SAFE_STR_DISPLAY_NAME, SAFE_STR_FILE_NAME, SAFE_STR_FILE_PATH,
                SAFE_STR_ID, SAFE_STR_SLUG, SAFE_STR_URL, SAFE_STR_VERSION,
            },
        },
        validator::{Length, Max, Min, OneOf, Regex},
    };
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use typesafe_core::registry::{self, Symbol};

    #[test]
    fn catalog_is_registered_under_its_module() {
        let all = register_all();
        assert!(all.len() >= 20);

        for ty in &all {
            assert_eq!(ty.module(), PRIMITIVES_MODULE);

            let token = format!("{}.{}", ty.module(), ty.name());
            assert!(
                matches!(registry::lookup(&token), Some(Symbol::Type(_))),
                "{token} should be registered"
            );
        }
    }
}
