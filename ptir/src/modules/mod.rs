//! Module, function and basic block structures plus the instruction set.
//!
//! Each instruction is a small data structure with public fields, making it
//! easy to construct and inspect. Submodules contain families of operations:
//!
//! - `int`: integer arithmetic and comparisons
//! - `fp`: floating-point arithmetic and comparisons
//! - `mem`: loads, stores, stack allocation and address computation
//! - `misc`: calls, phi, select and casts
//! - `terminator`: block terminators
//! - `operand`: shared operand and SSA name types
//! - `symbol`: global/function handles, linkage and visibility
//!
//! Instructions are usually manipulated through the [`instructions::Instr`]
//! enum which is a tagged union of all concrete instruction forms.
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    consts::{AnyConst, ConstId, ConstantPool},
    modules::{
        instructions::Instr,
        operand::{Label, Name, Operand},
        symbol::{FunctionId, GlobalId, Linkage, Visibility},
        terminator::Terminator,
    },
    types::{TypeRegistry, Typeref},
    utils::Error,
};

pub mod fp;
pub mod instructions;
pub mod int;
pub mod mem;
pub mod misc;
pub mod operand;
pub mod symbol;
pub mod terminator;

/// Common interface implemented by every instruction node.
///
/// Provides zero-allocation iteration over an instruction's input operands
/// and exposes its optional destination SSA name and type.
pub trait Instruction {
    /// Iterate over all input operands for this instruction.
    fn operands(&self) -> impl Iterator<Item = &Operand>;

    /// Return the destination SSA name if the instruction produces a result.
    fn destination(&self) -> Option<Name> {
        None
    }

    /// Static type of the destination, if any. Result types that are implied
    /// by the instruction kind (`i1` for comparisons, `ptr` for address
    /// computations) are interned on demand.
    fn destination_type(&self, _types: &TypeRegistry) -> Option<Typeref> {
        None
    }

    /// Referenced SSA names (register operands). Constants and labels are
    /// ignored.
    fn dependencies(&self) -> impl Iterator<Item = Name> {
        self.operands().filter_map(|op| op.try_as_reg())
    }
}

/// A global variable. The global itself denotes the *address* of its storage.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlobalVariable {
    pub name: String,
    /// Type of the stored value.
    pub ty: Typeref,
    pub initializer: Option<ConstId>,
    pub linkage: Linkage,
    pub visibility: Visibility,
    /// Read-only storage.
    pub constant: bool,
}

/// A basic block within a function: a sequence of instructions followed by a
/// control flow terminator.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BasicBlock {
    pub label: Label,
    pub instructions: Vec<Instr>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(label: Label, instructions: Vec<Instr>, terminator: impl Into<Terminator>) -> Self {
        Self {
            label,
            instructions,
            terminator: terminator.into(),
        }
    }
}

/// Where an SSA name is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameDef {
    /// The n-th parameter of the function.
    Param(u32),
    /// The n-th instruction of a block.
    Instr(Label, u32),
}

/// A function made of basic blocks and parameter metadata.
///
/// A function with an empty body is a declaration: it is defined outside the
/// module. By convention the entrypoint is the block labelled
/// [`Label::NIL`]; blocks are laid out in label order.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Function {
    pub name: String,
    pub params: Vec<(Name, Typeref)>,
    pub return_type: Option<Typeref>,
    pub body: BTreeMap<Label, BasicBlock>,
    pub linkage: Linkage,
    pub visibility: Visibility,
}

impl Function {
    /// Declare an external function (no body).
    pub fn declaration(
        name: impl Into<String>,
        params: Vec<(Name, Typeref)>,
        return_type: Option<Typeref>,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            body: BTreeMap::new(),
            linkage: Linkage::External,
            visibility: Visibility::Default,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.body.is_empty()
    }

    /// Insert a block, failing if its label is already used.
    pub fn push_block(&mut self, block: BasicBlock) -> Result<(), Error> {
        if self.body.contains_key(&block.label) {
            return Err(Error::BlockLabelAlreadyExists(block.label));
        }
        self.body.insert(block.label, block);
        Ok(())
    }

    /// Map every SSA name defined in this function to its definition site.
    /// Later definitions of a duplicated name win; see [`Self::check_ssa`].
    pub fn definitions(&self) -> BTreeMap<Name, NameDef> {
        let mut defs = BTreeMap::new();
        for (index, (name, _)) in self.params.iter().enumerate() {
            defs.insert(*name, NameDef::Param(index as u32));
        }
        for bb in self.body.values() {
            for (index, instr) in bb.instructions.iter().enumerate() {
                if let Some(dest) = instr.destination() {
                    defs.insert(dest, NameDef::Instr(bb.label, index as u32));
                }
            }
        }
        defs
    }

    /// Verify SSA form:
    /// 1) The entry block exists (defined functions only).
    /// 2) Each name is defined exactly once.
    /// 3) Each operand refers to a defined name.
    /// 4) Each branch target and phi predecessor is a block of this function.
    pub fn check_ssa(&self) -> Result<(), Error> {
        if self.is_declaration() {
            return Ok(());
        }

        if !self.body.contains_key(&Label::NIL) {
            return Err(Error::MissingEntryBlock);
        }

        let mut defined_names = BTreeSet::new();
        for (name, _) in self.params.iter() {
            if !defined_names.insert(*name) {
                return Err(Error::DuplicateSSAName { duplicate: *name });
            }
        }

        for bb in self.body.values() {
            for instr in &bb.instructions {
                if let Some(dest) = instr.destination() {
                    if !defined_names.insert(dest) {
                        return Err(Error::DuplicateSSAName { duplicate: dest });
                    }
                }
            }
        }

        for bb in self.body.values() {
            let names = bb
                .instructions
                .iter()
                .flat_map(|instr| instr.dependencies())
                .chain(bb.terminator.dependencies());
            for name in names {
                if !defined_names.contains(&name) {
                    return Err(Error::UndefinedSSAName { undefined: name });
                }
            }

            let labels = bb
                .instructions
                .iter()
                .filter_map(|instr| instr.try_as_phi_ref())
                .flat_map(|phi| phi.values.iter().map(|(label, _)| *label))
                .chain(bb.terminator.successors());
            for label in labels {
                if !self.body.contains_key(&label) {
                    return Err(Error::UndefinedBasicBlock {
                        function: self.name.clone(),
                        label,
                    });
                }
            }
        }

        Ok(())
    }
}

/// A compilation unit: globals, functions (defined or declared) and the pool
/// of constants their instructions refer to.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Module {
    pub name: String,
    pub globals: Vec<GlobalVariable>,
    pub functions: Vec<Function>,
    pub constants: ConstantPool,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_global(&mut self, global: GlobalVariable) -> GlobalId {
        self.globals.push(global);
        GlobalId(self.globals.len() as u32 - 1)
    }

    pub fn add_function(&mut self, function: Function) -> FunctionId {
        self.functions.push(function);
        FunctionId(self.functions.len() as u32 - 1)
    }

    /// Intern a constant in the module pool.
    pub fn constant(&mut self, types: &TypeRegistry, value: impl Into<AnyConst>) -> Result<ConstId, Error> {
        self.constants.intern(types, value.into())
    }

    pub fn global(&self, id: GlobalId) -> Option<&GlobalVariable> {
        self.globals.get(id.index())
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    /// Globals in layout order, with their handles.
    pub fn iter_globals(&self) -> impl Iterator<Item = (GlobalId, &GlobalVariable)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(i, global)| (GlobalId(i as u32), global))
    }

    /// Functions in layout order, with their handles.
    pub fn iter_functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, function)| (FunctionId(i as u32), function))
    }

    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.iter_functions()
            .find(|(_, function)| function.name == name)
            .map(|(id, _)| id)
    }

    /// Check that every function is in SSA form and that every symbol and
    /// constant referenced from the module exists.
    pub fn verify(&self) -> Result<(), Error> {
        for (_, pooled) in self.constants.iter() {
            match &pooled.value {
                AnyConst::GlobalAddr(id) if self.global(*id).is_none() => {
                    return Err(Error::UndefinedGlobal { undefined: *id });
                }
                AnyConst::FunctionAddr(id) if self.function(*id).is_none() => {
                    return Err(Error::UndefinedFunction { undefined: *id });
                }
                _ => {}
            }
        }

        for global in &self.globals {
            if let Some(init) = global.initializer {
                self.check_constant(init)?;
            }
        }

        for function in &self.functions {
            function.check_ssa()?;
            for bb in function.body.values() {
                let operands = bb
                    .instructions
                    .iter()
                    .flat_map(|instr| instr.operands())
                    .chain(bb.terminator.operands());
                for operand in operands {
                    if let Operand::Imm(id) = operand {
                        self.check_constant(*id)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn check_constant(&self, id: ConstId) -> Result<(), Error> {
        match self.constants.get(id) {
            Some(_) => Ok(()),
            None => Err(Error::UndefinedConstant { undefined: id }),
        }
    }
}
