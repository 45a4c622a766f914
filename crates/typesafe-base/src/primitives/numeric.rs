use crate::PRIMITIVES_MODULE;
use std::sync::LazyLock;
use typesafe_core::primitive::{FloatRules, IntRules, PrimitiveType};

///
/// CONSTANTS
///

pub const PORT_MIN_VALUE: i64 = 0;
pub const PORT_MAX_VALUE: i64 = 65_535;

pub static SAFE_INT: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Int")
        .module(PRIMITIVES_MODULE)
        .int_rules(IntRules::default())
        .build()
});

pub static SAFE_UINT: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_UInt")
        .parent(&SAFE_INT)
        .int_rules(IntRules::range(Some(0), None))
        .build()
});

pub static SAFE_UINT_PORT: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_UInt__Port")
        .parent(&SAFE_UINT)
        .int_rules(IntRules::range(Some(PORT_MIN_VALUE), Some(PORT_MAX_VALUE)))
        .build()
});

pub static SAFE_FLOAT: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Float")
        .module(PRIMITIVES_MODULE)
        .float_rules(FloatRules::default())
        .build()
});

/// Non-negative, rounded half-up to cents.
pub static SAFE_FLOAT_MONEY: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Float__Money")
        .parent(&SAFE_FLOAT)
        .float_rules(FloatRules {
            decimal_places: Some(2),
            ..FloatRules::range(Some(0.0), None)
        })
        .build()
});

pub static SAFE_FLOAT_PERCENTAGE_EXACT: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Float__Percentage_Exact")
        .parent(&SAFE_FLOAT)
        .float_rules(FloatRules {
            decimal_places: Some(2),
            ..FloatRules::range(Some(0.0), Some(100.0))
        })
        .build()
});

///
/// TESTS
///
