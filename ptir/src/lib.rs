//! Immutable SSA intermediate representation consumed by the points-to fact
//! extractor.
//!
//! A [`modules::Module`] owns its globals, functions and an interning
//! [`consts::ConstantPool`]; static types live in a shared
//! [`types::TypeRegistry`]. Every entity that can be referenced by another one
//! is addressed through a [`value::ValueRef`].

pub mod consts;
pub mod modules;
#[cfg(any(test, feature = "test-utils"))]
pub mod tests_utils;
pub mod types;
pub mod utils;
pub mod value;
