//! Integer instructions
//!
//! Arithmetic, shifts, bitwise operations and comparisons over integer
//! values. None of them can produce a pointer; they are kept in the IR so
//! that every operand edge of a function is visible to the extractor.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::{
    modules::{
        Instruction,
        operand::{Name, Operand},
    },
    types::{TypeRegistry, Typeref, primary::IType},
};

/// Binary integer operations.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IArithOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

impl IArithOp {
    /// Parse the mnemonic produced by [`Self::to_str`].
    pub fn from_str(s: &str) -> Option<Self> {
        IArithOp::iter().find(|op| op.to_str() == s)
    }

    pub fn to_str(&self) -> &'static str {
        self.into()
    }
}

/// Integer comparison predicates.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ICmpOp {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

/// `%dest = <op> ty lhs, rhs`
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IArith {
    pub dest: Name,
    pub ty: Typeref,
    pub op: IArithOp,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Instruction for IArith {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.lhs, &self.rhs].into_iter()
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self, _types: &TypeRegistry) -> Option<Typeref> {
        Some(self.ty)
    }
}

/// `%dest = icmp <op> ty lhs, rhs`, producing an `i1`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ICmp {
    pub dest: Name,
    /// Type of the compared operands.
    pub ty: Typeref,
    pub op: ICmpOp,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Instruction for ICmp {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.lhs, &self.rhs].into_iter()
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self, types: &TypeRegistry) -> Option<Typeref> {
        Some(types.search_or_insert(IType::I1.into()))
    }
}
