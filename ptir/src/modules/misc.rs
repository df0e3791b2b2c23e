use strum::IntoStaticStr;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    modules::{
        Instruction,
        operand::{Label, Name, Operand},
    },
    types::{TypeRegistry, Typeref},
};

/// Function call instruction
///
/// `function` is an operand so that indirect calls through a function pointer
/// are expressed the same way as direct ones (a `FunctionAddr` constant).
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Invoke {
    pub function: Operand,
    pub args: Vec<Operand>,
    /// Destination for the return value, `None` for `void` calls.
    pub dest: Option<Name>,
    /// Return type of the callee. `None` for `void` functions.
    pub ty: Option<Typeref>,
}

impl Instruction for Invoke {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.function).chain(self.args.iter())
    }

    fn destination(&self) -> Option<Name> {
        self.dest
    }

    fn destination_type(&self, _types: &TypeRegistry) -> Option<Typeref> {
        self.ty
    }
}

/// Phi instruction
///
/// Selects a value based on the predecessor block control arrived from.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phi {
    pub dest: Name,
    pub ty: Typeref,
    /// (predecessor block, incoming value)
    pub values: Vec<(Label, Operand)>,
}

impl Instruction for Phi {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.values.iter().map(|(_, op)| op)
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self, _types: &TypeRegistry) -> Option<Typeref> {
        Some(self.ty)
    }
}

/// Select instruction
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Select {
    pub dest: Name,
    pub condition: Operand,
    pub true_value: Operand,
    pub false_value: Operand,
    pub ty: Typeref,
}

impl Instruction for Select {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.condition, &self.true_value, &self.false_value].into_iter()
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self, _types: &TypeRegistry) -> Option<Typeref> {
        Some(self.ty)
    }
}

/// Conversion performed by a [`Cast`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FpToInt,
    IntToFp,
    PtrToInt,
    IntToPtr,
    Bitcast,
}

/// Convert `value` to `ty`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cast {
    pub dest: Name,
    pub op: CastOp,
    pub ty: Typeref,
    pub value: Operand,
}

impl Instruction for Cast {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.value)
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self, _types: &TypeRegistry) -> Option<Typeref> {
        Some(self.ty)
    }
}
