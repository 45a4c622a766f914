//! Field validators attached through `Annotation::annotated`.
//!
//! Each runs after the field's own annotation accepted the value, so it
//! sees the coerced value (a primitive, a typed collection, a plain scalar).

mod len;
mod num;
mod text;

pub use len::Length;
pub use num::{Max, Min};
pub use text::{OneOf, Regex};

use std::sync::Arc;
use typesafe_core::annotation::FieldValidator;

/// Box a validator for `Annotation::annotated`.
pub fn boxed(validator: impl FieldValidator + 'static) -> Arc<dyn FieldValidator> {
    Arc::new(validator)
}

///
/// TESTS
///
