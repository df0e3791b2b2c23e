//! Module traversal.
//!
//! A [`FactWalker`] visits a module twice in the same order:
//!
//! 1. registration, performed by [`FactWalker::new`]: every global, function,
//!    argument, block, instruction, terminator and constant receives its
//!    identity, together with the affiliated objects it owns;
//! 2. emission, performed by [`FactWalker::generate_facts`]: facts are
//!    appended to a [`FactProgram`]. Because every identity already exists,
//!    forward references (phi incoming values, branch targets, calls to
//!    functions defined later) resolve directly.
//!
//! Order: module, globals, functions, blocks in layout order, instructions in
//! layout order with the terminator last, constant operands depth-first.
use std::collections::HashMap;

use bit_set::BitSet;
use log::info;
use ptir::{
    modules::Module,
    types::{TypeRegistry, Typeref},
    value::{InstrRef, ValueRef},
};

use crate::{
    FactResult,
    config::FactConfig,
    intrinsic::IntrinsicRegistry,
    object::{IndexError, ObjectId, ObjectIndex},
    program::FactProgram,
};

pub mod classify;
mod emit;
mod register;

use classify::PointerClassifier;

pub struct FactWalker<'m> {
    module: &'m Module,
    types: &'m TypeRegistry,
    config: FactConfig,
    intrinsics: IntrinsicRegistry,
    index: ObjectIndex<ValueRef>,
    classifier: PointerClassifier<'m>,
    /// Calls taken over by an intrinsic, with the matcher's position.
    matched_calls: HashMap<InstrRef, usize>,
    /// Constants whose shape facts were emitted, by pool index.
    visited_constants: BitSet,
}

impl<'m> FactWalker<'m> {
    /// Verify `module` and assign every identity.
    pub fn new(
        module: &'m Module,
        types: &'m TypeRegistry,
        config: FactConfig,
        intrinsics: IntrinsicRegistry,
    ) -> FactResult<Self> {
        config.validate()?;
        module.verify()?;

        let mut walker = Self {
            module,
            types,
            index: ObjectIndex::new(config.num_special_objects()),
            config,
            intrinsics,
            classifier: PointerClassifier::new(types),
            matched_calls: HashMap::new(),
            visited_constants: BitSet::with_capacity(module.constants.len()),
        };
        walker.register_module()?;

        info!(
            "Assigned {} object ids in module `{}` ({} special, {} intrinsic calls)",
            walker.index.len(),
            module.name,
            walker.index.special_count(),
            walker.matched_calls.len()
        );
        Ok(walker)
    }

    /// Append the facts of the whole module to `program`.
    ///
    /// Each call emits the complete fact set, so running it twice into two
    /// programs yields identical programs.
    pub fn generate_facts(&mut self, program: &mut FactProgram) -> FactResult<()> {
        let before = program.len();
        self.visited_constants.clear();
        self.emit_module(program)?;
        info!(
            "Generated {} facts for module `{}`",
            program.len() - before,
            self.module.name
        );
        Ok(())
    }

    pub fn module(&self) -> &'m Module {
        self.module
    }

    pub fn types(&self) -> &'m TypeRegistry {
        self.types
    }

    pub fn config(&self) -> &FactConfig {
        &self.config
    }

    pub fn index(&self) -> &ObjectIndex<ValueRef> {
        &self.index
    }

    pub fn is_valid_object_id(&self, id: ObjectId) -> bool {
        self.index.is_valid(id)
    }

    pub fn has_value(&self, value: ValueRef) -> bool {
        self.index.contains(&value)
    }

    pub fn id_of(&self, value: ValueRef) -> Result<ObjectId, IndexError> {
        self.index.id_of(&value)
    }

    /// Value owning `id`, `None` for an affiliated object.
    pub fn value_of(&self, id: ObjectId) -> Result<Option<ValueRef>, IndexError> {
        self.index.value_of(id).map(|value| value.copied())
    }

    pub fn affiliated_id(&self, base: ObjectId, offset: u32) -> Result<ObjectId, IndexError> {
        self.index.affiliated_id(base, offset)
    }

    pub fn main_value_of(&self, id: ObjectId) -> Result<ValueRef, IndexError> {
        self.index.main_value_of(id).copied()
    }

    /// Reserved id of a configured special object.
    pub fn special_object(&self, name: &str) -> Option<ObjectId> {
        self.config.special_id(name)
    }

    pub fn contains_pointer(&self, ty: Typeref) -> bool {
        self.classifier.contains_pointer(ty)
    }

    /// Memory object behind an allocation site: its first affiliated object,
    /// or the site itself when it reserved none.
    pub fn storage_of(&self, base: ObjectId) -> Result<ObjectId, IndexError> {
        match self.index.affiliated_id(base, 1) {
            Err(IndexError::AffiliatedOverflow { reserved: 0, .. }) => Ok(base),
            other => other,
        }
    }
}
