//! The registry/record pair and its creation strategies.
//!
//! A [`ClassFactory`] owns a collection of [`ClassRecord`]s and an alias
//! table mapping name strings (many-to-one) onto them. Each record pairs a
//! name with one [`ClassCreator`] strategy, a metadata bag, and an optional
//! set of tracked live instances.

mod creator;
mod factory;
mod record;

pub use creator::{ClassCreator, FnCreator};
pub use factory::ClassFactory;
pub use record::{ClassData, ClassRecord};
