//! Memory operations
//!
//! Loads, stores, stack allocation and address computation. Loads and stores
//! carry alignment, volatility and an optional atomic ordering; only the
//! address and value edges matter to the points-to extractor.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    modules::{
        Instruction,
        operand::{Name, Operand},
    },
    types::{TypeRegistry, Typeref},
};

/// Ordering for atomic memory operations, following the C++ memory model.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MemoryOrdering {
    Unordered,
    Monotonic,
    Acquire,
    Release,
    AcqRel,
    SeqCst,
}

/// Load a value of type `ty` from `addr`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MLoad {
    pub dest: Name,
    pub ty: Typeref,
    pub addr: Operand,
    pub alignment: Option<u32>,
    pub ordering: Option<MemoryOrdering>,
    pub volatile: bool,
}

impl Instruction for MLoad {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.addr)
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self, _types: &TypeRegistry) -> Option<Typeref> {
        Some(self.ty)
    }
}

/// Store `value` to `addr`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MStore {
    pub addr: Operand,
    pub value: Operand,
    pub alignment: Option<u32>,
    pub ordering: Option<MemoryOrdering>,
    pub volatile: bool,
}

impl Instruction for MStore {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.addr, &self.value].into_iter()
    }
}

/// Reserve `count` elements of `ty` on the stack frame; the result is a
/// pointer to the reserved region.
///
/// The region itself has no SSA name of its own. Consumers that need to
/// tell the pointer and the region apart have to invent an identity for it.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MAlloca {
    pub dest: Name,
    pub ty: Typeref,
    pub count: Operand,
    pub alignment: Option<u32>,
}

impl Instruction for MAlloca {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.count)
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self, types: &TypeRegistry) -> Option<Typeref> {
        Some(types.ptr())
    }
}

/// Compute the address of an element inside the aggregate `base` points to.
///
/// `ty` is the type the first index steps over.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MGetElementPtr {
    pub dest: Name,
    pub ty: Typeref,
    pub base: Operand,
    pub indices: Vec<Operand>,
}

impl Instruction for MGetElementPtr {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.base).chain(self.indices.iter())
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self, types: &TypeRegistry) -> Option<Typeref> {
        Some(types.ptr())
    }
}
