use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::{
    consts::ConstId,
    modules::{
        operand::{Label, Name},
        symbol::{FunctionId, GlobalId},
    },
};

#[derive(Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// The same SSA name is defined twice.
    #[error(
        "Multiple operations with shared destination target violate SSA requirements. The name `%{duplicate}` is defined more than once within the same function."
    )]
    DuplicateSSAName { duplicate: Name },

    /// No basic block with the entrypoint label was found.
    #[error(
        "By convention, the entrypoint basic block of a function must have label `%block_0`. No such basic block was found."
    )]
    MissingEntryBlock,

    /// An operand refers to an unresolved name.
    #[error(
        "An operand refers to an undefined name: `%{undefined}`. This name was never defined in the function."
    )]
    UndefinedSSAName { undefined: Name },

    /// The basic block referenced cannot be found within the function.
    #[error(
        "The basic block `{label}` referenced in function `{function}` is not defined within the function."
    )]
    UndefinedBasicBlock { function: String, label: Label },

    /// A basic block with the given label already exists in the function.
    #[error("A basic block with label `{0}` already exists in the function.")]
    BlockLabelAlreadyExists(Label),

    /// A constant id does not belong to the module pool.
    #[error("Constant `{undefined}` is not part of the module constant pool.")]
    UndefinedConstant { undefined: ConstId },

    /// A constant takes the address of a global that does not exist.
    #[error("Global #{} is referenced but not defined within the module.", .undefined.0)]
    UndefinedGlobal { undefined: GlobalId },

    /// A constant takes the address of a function that does not exist.
    #[error("Function #{} is referenced but not defined within the module.", .undefined.0)]
    UndefinedFunction { undefined: FunctionId },
}
