//! Addressing of referenceable IR entities.
//!
//! The IR stores entities in nested containers; [`ValueRef`] is a small
//! `Copy` handle naming one of them from the module root, suitable as a hash
//! key.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumDiscriminants, EnumIs, IntoStaticStr};

use crate::{
    consts::{AnyConst, ConstId},
    modules::{
        BasicBlock, Function, Module, NameDef, instructions::Instr, operand::Label,
        symbol::{FunctionId, GlobalId},
        terminator::Terminator,
    },
};

/// Position of a (non-terminator) instruction inside its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InstrRef {
    pub function: FunctionId,
    pub block: Label,
    pub index: u32,
}

/// Any entity that can be referenced by another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs, EnumDiscriminants)]
#[strum_discriminants(name(ValueKind), derive(IntoStaticStr))]
#[strum_discriminants(strum(serialize_all = "snake_case"))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueRef {
    Global(GlobalId),
    Function(FunctionId),
    /// The n-th parameter of a function.
    Argument(FunctionId, u32),
    Block(FunctionId, Label),
    Instruction(InstrRef),
    /// The terminator of a block.
    Terminator(FunctionId, Label),
    Constant(ConstId),
}

impl ValueRef {
    pub fn kind(&self) -> ValueKind {
        self.into()
    }

    /// Resolve an SSA definition site of `function` to a value.
    pub fn from_def(function: FunctionId, def: NameDef) -> Self {
        match def {
            NameDef::Param(index) => ValueRef::Argument(function, index),
            NameDef::Instr(block, index) => ValueRef::Instruction(InstrRef {
                function,
                block,
                index,
            }),
        }
    }

    /// Canonical value of a pooled constant. The address of a global or of a
    /// function *is* that global or function, so those constants collapse
    /// onto the symbol itself.
    pub fn from_const(module: &Module, id: ConstId) -> Self {
        match module.constants.get(id).map(|pooled| &pooled.value) {
            Some(AnyConst::GlobalAddr(global)) => ValueRef::Global(*global),
            Some(AnyConst::FunctionAddr(function)) => ValueRef::Function(*function),
            _ => ValueRef::Constant(id),
        }
    }
}

impl std::fmt::Display for ValueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueRef::Global(id) => write!(f, "@global.{}", id.0),
            ValueRef::Function(id) => write!(f, "@fn.{}", id.0),
            ValueRef::Argument(func, index) => write!(f, "@fn.{}:arg.{}", func.0, index),
            ValueRef::Block(func, label) => write!(f, "@fn.{}:{}", func.0, label),
            ValueRef::Instruction(instr) => write!(
                f,
                "@fn.{}:{}:{}",
                instr.function.0, instr.block, instr.index
            ),
            ValueRef::Terminator(func, label) => write!(f, "@fn.{}:{}:term", func.0, label),
            ValueRef::Constant(id) => write!(f, "{}", id),
        }
    }
}

/// Lookup helpers resolving handles back to IR nodes.
impl Module {
    pub fn block(&self, function: FunctionId, label: Label) -> Option<&BasicBlock> {
        self.function(function)?.body.get(&label)
    }

    pub fn instruction(&self, instr: InstrRef) -> Option<&Instr> {
        self.block(instr.function, instr.block)?
            .instructions
            .get(instr.index as usize)
    }

    pub fn terminator(&self, function: FunctionId, label: Label) -> Option<&Terminator> {
        self.block(function, label).map(|bb| &bb.terminator)
    }

    /// Human readable name of a value, used in diagnostics.
    pub fn value_name(&self, value: ValueRef) -> String {
        let function_name = |id: FunctionId| {
            self.function(id)
                .map(|function: &Function| function.name.as_str())
                .unwrap_or("?")
        };
        match value {
            ValueRef::Global(id) => self
                .global(id)
                .map_or_else(|| value.to_string(), |global| global.name.clone()),
            ValueRef::Function(id) => function_name(id).to_string(),
            ValueRef::Argument(func, index) => format!("{}:arg.{}", function_name(func), index),
            ValueRef::Block(func, label) => format!("{}:{}", function_name(func), label),
            ValueRef::Instruction(instr) => format!(
                "{}:{}:{}",
                function_name(instr.function),
                instr.block,
                instr.index
            ),
            ValueRef::Terminator(func, label) => {
                format!("{}:{}:term", function_name(func), label)
            }
            ValueRef::Constant(id) => id.to_string(),
        }
    }
}
