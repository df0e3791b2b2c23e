//! Shared operand types for instructions.
//!
//! An instruction operand is either a reference to another SSA value
//! (`Reg`), a pooled constant (`Imm`) or a code label (`Lbl`).
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

use crate::consts::ConstId;

/// SSA value identifier used to name the destination of an instruction, a
/// function parameter, or a reference to either.
pub type Name = u32;

/// Represents a code label used as a target for control-flow instructions.
///
/// Labels are only valid within the function they are defined in, and their
/// numeric order is the layout order of the blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Label(pub u32);

impl Label {
    /// The function entry label. It should always be present in a defined
    /// function.
    pub const NIL: Label = Label(0);

    pub fn is_nil(&self) -> bool {
        self == &Label::NIL
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "label %block_{}", self.0)
        } else {
            write!(f, "%block_{}", self.0)
        }
    }
}

/// Instruction operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operand {
    /// Reference to a parameter or previously defined SSA value.
    Reg(Name),
    /// Reference to a constant of the module's pool.
    Imm(ConstId),
    /// Code label (used for control-flow).
    Lbl(Label),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Reg(name) => write!(f, "%{}", name),
            Operand::Imm(constant) => write!(f, "{}", constant),
            Operand::Lbl(label) => write!(f, "{:#}", label),
        }
    }
}
