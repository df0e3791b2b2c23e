//! Aggregate types
//!
//! Composite types built from [`Typeref`] handles stored in the central
//! [`TypeRegistry`](super::TypeRegistry):
//! - [`ArrayType`]: a fixed-size array of one element type.
//! - [`StructType`]: an ordered sequence of field types.
//!
//! Both carry an `internal_fmt` helper that resolves element types against the
//! registry storage for display.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{AnyType, Typeref};

/// Array type
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrayType {
    pub ty: Typeref,
    pub num_elements: usize,
}

impl ArrayType {
    pub(super) fn internal_fmt<'a>(&'a self, storage: &'a [AnyType]) -> impl std::fmt::Display + 'a {
        struct ArrayTypeFmt<'a> {
            array: &'a ArrayType,
            storage: &'a [AnyType],
        }

        impl std::fmt::Display for ArrayTypeFmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "[{} x ", self.array.num_elements)?;
                match self.storage.get(self.array.ty.index()) {
                    Some(elem) => write!(f, "{}", elem.internal_fmt(self.storage))?,
                    None => write!(f, "<unknown type {}>", self.array.ty.index())?,
                }
                write!(f, "]")
            }
        }

        ArrayTypeFmt {
            array: self,
            storage,
        }
    }
}

/// Structure type
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StructType {
    pub element_types: Vec<Typeref>,
}

impl StructType {
    pub(super) fn internal_fmt<'a>(&'a self, storage: &'a [AnyType]) -> impl std::fmt::Display + 'a {
        struct StructTypeFmt<'a> {
            strukt: &'a StructType,
            storage: &'a [AnyType],
        }

        impl std::fmt::Display for StructTypeFmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{{ ")?;
                for (i, typeref) in self.strukt.element_types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match self.storage.get(typeref.index()) {
                        Some(elem) => write!(f, "{}", elem.internal_fmt(self.storage))?,
                        None => write!(f, "<unknown type {}>", typeref.index())?,
                    }
                }
                write!(f, " }}")
            }
        }

        StructTypeFmt {
            strukt: self,
            storage,
        }
    }
}
