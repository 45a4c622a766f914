//! Constrained primitives grouped by domain. Each is a process-wide
//! `LazyLock`, registered in the symbol table the first time it is built.

pub mod cryptography;
pub mod identifiers;
pub mod numeric;
pub mod text;

use std::sync::LazyLock;
use typesafe_core::primitive::PrimitiveType;

/// Every catalog primitive, parents before children.
#[must_use]
pub fn all() -> Vec<PrimitiveType> {
    [
        &text::SAFE_STR,
        &text::SAFE_STR_ID,
        &text::SAFE_ID,
        &text::SAFE_STR_FILE_PATH,
        &text::SAFE_STR_FILE_NAME,
        &text::SAFE_STR_SLUG,
        &text::SAFE_STR_DISPLAY_NAME,
        &text::SAFE_STR_URL,
        &text::SAFE_STR_VERSION,
        &numeric::SAFE_INT,
        &numeric::SAFE_UINT,
        &numeric::SAFE_UINT_PORT,
        &numeric::SAFE_FLOAT,
        &numeric::SAFE_FLOAT_MONEY,
        &numeric::SAFE_FLOAT_PERCENTAGE_EXACT,
        &identifiers::OBJ_ID,
        &identifiers::NODE_ID,
        &identifiers::EDGE_ID,
        &identifiers::RANDOM_GUID,
        &identifiers::RANDOM_HASH,
        &identifiers::TIMESTAMP_NOW,
        &cryptography::SAFE_STR_HASH,
        &cryptography::SAFE_STR_CACHE_HASH,
    ]
    .into_iter()
    .map(|ty: &LazyLock<PrimitiveType>| (**ty).clone())
    .collect()
}
