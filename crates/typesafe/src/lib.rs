//! ## Crate layout
//! - `core`: annotations, classes, instances, typed collections, primitives,
//!   JSON round-tripping and the fast-create path.
//! - `base`: the primitive catalog (`Safe_Str`, `Obj_Id`, `Timestamp_Now`, ...)
//!   and field validators.
//!
//! The `prelude` module is what application code usually needs.

pub use typesafe_base as base;
pub use typesafe_core as core;

pub use typesafe_core::kwargs;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build and register the primitive catalog so serialized `Type[T]`
/// references to catalog primitives resolve before any of them has been
/// touched directly. Idempotent.
pub fn bootstrap() {
    let catalog = typesafe_base::register_all();

    tracing::info!(primitives = catalog.len(), version = VERSION, "typesafe ready");
}

///
/// Prelude
///

pub mod prelude {
    pub use typesafe_base::prelude::*;
    pub use typesafe_core::{
        config::{Config, with_config},
        error::Site,
        fast_create,
        method::{Param, Signature},
        prelude::*,
    };
}
