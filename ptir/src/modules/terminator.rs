//! Control flow terminators.
//!
//! Every basic block ends with exactly one terminator which decides the next
//! block to execute (or leaves the function).
use auto_enums::auto_enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumDiscriminants, EnumIs, IntoStaticStr};

use crate::{
    consts::ConstId,
    modules::operand::{Label, Name, Operand},
};

/// Conditional branch instruction
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CBranch {
    /// The condition operand; should evaluate to an `i1`.
    pub cond: Operand,
    pub target_true: Label,
    pub target_false: Label,
}

/// Unconditional jump instruction
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Jump {
    pub target: Label,
}

/// Multi-way branch on an integer value.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Switch {
    pub value: Operand,
    pub default: Label,
    pub cases: Vec<(ConstId, Label)>,
}

/// Return from function instruction. `None` is a `void` return.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ret {
    pub value: Option<Operand>,
}

/// Trap instruction to indicate an unrecoverable error.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trap;

/// Control flow terminator instructions
#[derive(Debug, Clone, Hash, PartialEq, Eq, EnumIs, EnumDiscriminants)]
#[strum_discriminants(name(TerminatorOp), derive(IntoStaticStr))]
#[strum_discriminants(strum(serialize_all = "lowercase"))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Terminator {
    CBranch(CBranch),
    Jump(Jump),
    Switch(Switch),
    Ret(Ret),
    Trap(Trap),
}

impl Terminator {
    pub fn op(&self) -> TerminatorOp {
        self.into()
    }

    /// Mnemonic of the terminator (`cbranch`, `jump`, ...).
    pub fn opcode(&self) -> &'static str {
        self.op().into()
    }

    #[auto_enum(Iterator)]
    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        match self {
            Terminator::CBranch(cbranch) => std::iter::once(&cbranch.cond),
            Terminator::Jump(_) => std::iter::empty(),
            Terminator::Switch(switch) => std::iter::once(&switch.value),
            Terminator::Ret(ret) => ret.value.iter(),
            Terminator::Trap(_) => std::iter::empty(),
        }
    }

    pub fn dependencies(&self) -> impl Iterator<Item = Name> {
        self.operands().filter_map(|op| op.try_as_reg())
    }

    /// Successor blocks in operand order. A label listed twice (e.g. both arms
    /// of a branch) is yielded twice.
    #[auto_enum(Iterator)]
    pub fn successors(&self) -> impl Iterator<Item = Label> + '_ {
        match self {
            Terminator::CBranch(cbranch) => [cbranch.target_true, cbranch.target_false].into_iter(),
            Terminator::Jump(jump) => std::iter::once(jump.target),
            Terminator::Switch(switch) => std::iter::once(switch.default)
                .chain(switch.cases.iter().map(|(_, label)| *label)),
            Terminator::Ret(_) => std::iter::empty(),
            Terminator::Trap(_) => std::iter::empty(),
        }
    }
}

impl std::fmt::Display for Terminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Terminator::CBranch(cbranch) => write!(
                f,
                "branch {}, {:#}, {:#}",
                cbranch.cond, cbranch.target_true, cbranch.target_false
            ),
            Terminator::Jump(jump) => write!(f, "jump {:#}", jump.target),
            Terminator::Switch(switch) => {
                write!(f, "switch {}, {:#} [", switch.value, switch.default)?;
                for (value, label) in &switch.cases {
                    write!(f, " {} -> {:#}", value, label)?;
                }
                write!(f, " ]")
            }
            Terminator::Ret(Ret { value: Some(value) }) => write!(f, "ret {}", value),
            Terminator::Ret(Ret { value: None }) => write!(f, "ret void"),
            Terminator::Trap(_) => write!(f, "trap"),
        }
    }
}

macro_rules! define_terminator_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Terminator {
            fn from(inst: $typ) -> Self {
                Terminator::$variant(inst)
            }
        }
    };
}

define_terminator_from!(CBranch, CBranch);
define_terminator_from!(Jump, Jump);
define_terminator_from!(Switch, Switch);
define_terminator_from!(Ret, Ret);
define_terminator_from!(Trap, Trap);
