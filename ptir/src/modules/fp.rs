//! Floating-point instructions
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    modules::{
        Instruction,
        operand::{Name, Operand},
    },
    types::{TypeRegistry, Typeref, primary::IType},
};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FArithOp {
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

/// Floating-point comparison predicates (ordered and unordered).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FCmpOp {
    Oeq,
    Ogt,
    Oge,
    Olt,
    Ole,
    One,
    Ord,
    Ueq,
    Ugt,
    Uge,
    Ult,
    Ule,
    Une,
    Uno,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FArith {
    pub dest: Name,
    pub ty: Typeref,
    pub op: FArithOp,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Instruction for FArith {
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

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FCmp {
    pub dest: Name,
    pub ty: Typeref,
    pub op: FCmpOp,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Instruction for FCmp {
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
