//! Shared fixtures for unit tests. Every fixture is built once per process
//! so repeated calls return the same type.

use crate::{
    annotation::Annotation,
    class::{Class, EnumType},
    primitive::{IntRules, Pattern, PrimitiveType, Scalar, StrRules},
};
use std::sync::{
    LazyLock,
    atomic::{AtomicU64, Ordering},
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

static SAFE_STR: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Str")
        .module("typesafe.primitives")
        .str_rules(StrRules::default())
        .build()
});

static SAFE_ID: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Id")
        .parent(&SAFE_STR)
        .str_rules(StrRules {
            regex: Pattern::new("[^a-zA-Z0-9_-]"),
            ..StrRules::default()
        })
        .generator(next_id)
        .build()
});

static SAFE_INT: LazyLock<PrimitiveType> = LazyLock::new(|| {
    PrimitiveType::builder("Safe_Int")
        .module("typesafe.primitives")
        .int_rules(IntRules::default())
        .build()
});

static STATUS: LazyLock<EnumType> = LazyLock::new(|| {
    EnumType::builder("Status")
        .member("PENDING", "pending")
        .member("ACTIVE", "active")
        .build()
        .expect("status enum")
});

static PERSON: LazyLock<Class> = LazyLock::new(|| {
    Class::builder("Person")
        .field("name", &*SAFE_STR)
        .field("age", Annotation::Int)
        .build()
        .expect("person class")
});

static NODE: LazyLock<Class> = LazyLock::new(|| {
    Class::builder("Node")
        .field("value", &*SAFE_STR)
        .field("children", Annotation::list(Annotation::forward("Node")))
        .build()
        .expect("node class")
});

// Eight distinct characters per call.
fn next_id() -> Scalar {
    let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);

    Scalar::Str(format!("{:08x}", n.wrapping_mul(0x9E37_79B9) & 0xFFFF_FFFF))
}

pub(crate) fn safe_str() -> PrimitiveType {
    SAFE_STR.clone()
}

pub(crate) fn safe_id() -> PrimitiveType {
    SAFE_ID.clone()
}

pub(crate) fn safe_int() -> PrimitiveType {
    SAFE_INT.clone()
}

pub(crate) fn status_enum() -> EnumType {
    STATUS.clone()
}

/// `Person { name: Safe_Str, age: int }`.
pub(crate) fn person() -> Class {
    PERSON.clone()
}

/// `Node { value: Safe_Str, children: List['Node'] }`.
pub(crate) fn node() -> Class {
    NODE.clone()
}
