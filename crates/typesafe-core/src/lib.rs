//! Core runtime for typesafe: annotations, class descriptors, the validator,
//! typed collections, constrained primitives, JSON round-tripping and the
//! fast-create path.
#![warn(unreachable_pub)]

#[macro_use]
mod macros;

// public exports are one module level down
pub mod annotation;
pub mod cache;
pub mod class;
pub mod collection;
pub mod config;
pub mod deserialize;
pub mod error;
pub mod fast_create;
pub mod instance;
pub mod method;
pub mod primitive;
pub mod registry;
pub mod resolver;
pub mod serialize;
pub mod validate;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Default maximum length applied by string primitives that do not set one.
pub const DEFAULT_STR_MAX_LENGTH: usize = 512;

/// Module path under which the framework registers its own symbols.
pub const FRAMEWORK_MODULE: &str = "typesafe";

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No caches, resolvers or serializer internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        annotation::{Annotation, FieldValidator, TypeRef},
        class::{Class, EnumMember, EnumType},
        collection::{DictType, TypedDict, TypedList, TypedSet, TypedTuple},
        config::Config,
        error::{Error, ErrorKind},
        instance::{FromJsonOptions, Instance, Kwargs},
        kwargs,
        primitive::{PrimitiveType, PrimitiveValue},
        value::Value,
    };
}
