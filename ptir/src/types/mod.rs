//! Types module
//!
//! Canonical representation of the static types attached to IR values. The
//! type system has two layers:
//!
//! - Primary types: integers, floats, opaque pointers, vectors and labels
//!   (see `primary.rs`).
//! - Aggregate types: arrays and structures (see `aggregate.rs`).
//!
//! Types are deduplicated by a [`TypeRegistry`] which hands out dense
//! [`Typeref`] handles. Two structurally identical types always share the same
//! handle, so handle equality is type equality.
use std::collections::HashMap;

use log::debug;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

use crate::types::{
    aggregate::{ArrayType, StructType},
    primary::{IType, PrimaryType, PtrType},
};

pub mod aggregate;
pub mod primary;

/// A stable reference to a type stored inside a [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Typeref(u32);

impl Typeref {
    /// Position of the type inside its registry.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A sum-type representing any type that can be stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnyType {
    /// Integer, floating-point, pointer, vector and label types.
    Primary(PrimaryType),

    /// An array type: element typeref + element count. The number of elements
    /// must be known statically.
    Array(ArrayType),

    /// A structure type: an ordered list of field typerefs.
    Struct(StructType),
}

impl<S: Into<PrimaryType>> From<S> for AnyType {
    fn from(value: S) -> Self {
        AnyType::Primary(value.into())
    }
}

impl From<ArrayType> for AnyType {
    fn from(value: ArrayType) -> Self {
        AnyType::Array(value)
    }
}

impl From<StructType> for AnyType {
    fn from(value: StructType) -> Self {
        AnyType::Struct(value)
    }
}

impl AnyType {
    fn internal_fmt<'a>(&'a self, storage: &'a [AnyType]) -> impl std::fmt::Display + 'a {
        struct AnyTypeFmt<'a> {
            ty: &'a AnyType,
            storage: &'a [AnyType],
        }

        impl std::fmt::Display for AnyTypeFmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.ty {
                    AnyType::Primary(primary_type) => primary_type.fmt(f),
                    AnyType::Array(array_type) => array_type.internal_fmt(self.storage).fmt(f),
                    AnyType::Struct(struct_type) => struct_type.internal_fmt(self.storage).fmt(f),
                }
            }
        }

        AnyTypeFmt { ty: self, storage }
    }

    /// Typerefs directly nested inside this type (array element, struct
    /// fields). Primary types have none.
    pub fn children(&self) -> &[Typeref] {
        match self {
            AnyType::Primary(_) => &[],
            AnyType::Array(array) => std::slice::from_ref(&array.ty),
            AnyType::Struct(strukt) => &strukt.element_types,
        }
    }
}

/// A central registry that stores and deduplicates [`AnyType`] values.
///
/// ```rust
/// # use ptir::types::{TypeRegistry, primary::IType};
/// let reg = TypeRegistry::new();
/// let typeref = reg.search_or_insert(IType::I8.into());
/// assert_eq!(reg.search_or_insert(IType::I8.into()), typeref);
/// assert_eq!(reg.get(typeref).as_deref(), Some(&IType::I8.into()));
/// ```
#[derive(Default)]
pub struct TypeRegistry {
    storage: RwLock<Vec<AnyType>>,
    inverse_lookup: RwLock<HashMap<AnyType, Typeref>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a borrowed [`AnyType`] for the given `typeref`, or [`None`]
    /// if it was not allocated by this registry.
    ///
    /// The returned guard keeps a read lock on the storage. Do not hold it
    /// across a call to [`Self::search_or_insert`].
    pub fn get(&self, typeref: Typeref) -> Option<MappedRwLockReadGuard<'_, AnyType>> {
        let storage = self.storage.read_recursive();
        RwLockReadGuard::try_map(storage, |types| types.get(typeref.index())).ok()
    }

    /// Insert `ty` if no identical type exists yet and return its handle.
    pub fn search_or_insert(&self, ty: AnyType) -> Typeref {
        // Lock order: storage first, then inverse lookup.
        let mut storage = self.storage.upgradable_read();
        let mut inverse_lookup = self.inverse_lookup.upgradable_read();

        if let Some(typeref) = inverse_lookup.get(&ty) {
            return *typeref;
        }

        storage.with_upgraded(|storage| {
            inverse_lookup.with_upgraded(|inverse_lookup| {
                let typeref = Typeref(storage.len() as u32);
                debug!(
                    "New type encountered {}. Registered as #{}.",
                    ty.internal_fmt(storage),
                    typeref.0
                );
                storage.push(ty.clone());
                inverse_lookup.insert(ty, typeref);
                typeref
            })
        })
    }

    /// Shorthand for the opaque pointer type.
    pub fn ptr(&self) -> Typeref {
        self.search_or_insert(PtrType.into())
    }

    /// Shorthand for an integer type of the given width.
    ///
    /// Widths outside `1..=IType::MAX_BITS` are clamped into range.
    pub fn int(&self, num_bits: u32) -> Typeref {
        let ity = IType::new(num_bits.clamp(1, IType::MAX_BITS)).unwrap_or(IType::I64);
        self.search_or_insert(ity.into())
    }

    /// Number of distinct types registered so far.
    pub fn len(&self) -> usize {
        self.storage.read_recursive().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Format a given `Typeref` using this registry.
    pub fn fmt(&self, typeref: Typeref) -> impl std::fmt::Display + '_ {
        struct Fmt<'a> {
            registry: &'a TypeRegistry,
            typeref: Typeref,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let storage = self.registry.storage.read_recursive();
                match storage.get(self.typeref.index()) {
                    Some(ty) => ty.internal_fmt(&storage).fmt(f),
                    None => write!(f, "<unknown type {}>", self.typeref.0),
                }
            }
        }

        Fmt {
            registry: self,
            typeref,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::primary::FType;

    #[test]
    fn identical_types_share_a_handle() {
        let reg = TypeRegistry::new();
        let i32_ty = reg.search_or_insert(IType::I32.into());
        let ptr = reg.ptr();
        let s1 = reg.search_or_insert(
            StructType {
                element_types: vec![i32_ty, ptr],
            }
            .into(),
        );
        let s2 = reg.search_or_insert(
            StructType {
                element_types: vec![i32_ty, ptr],
            }
            .into(),
        );
        assert_eq!(s1, s2);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn formats_nested_aggregates() {
        let reg = TypeRegistry::new();
        let f64_ty = reg.search_or_insert(FType::Fp64.into());
        let arr = reg.search_or_insert(
            ArrayType {
                ty: f64_ty,
                num_elements: 4,
            }
            .into(),
        );
        let strukt = reg.search_or_insert(
            StructType {
                element_types: vec![reg.ptr(), arr],
            }
            .into(),
        );
        assert_eq!(reg.fmt(strukt).to_string(), "{ ptr, [4 x double] }");
    }
}
