use log::debug;
use ptir::{
    consts::ConstId,
    modules::{
        Function, Instruction, instructions::Instr, operand::Operand, symbol::FunctionId,
        terminator::Terminator,
    },
    value::{InstrRef, ValueRef},
};

use crate::{FactResult, intrinsic::CallSite, walker::FactWalker};

impl<'m> FactWalker<'m> {
    pub(super) fn register_module(&mut self) -> FactResult<()> {
        let module = self.module;

        // Symbols first, so they get the same ids whatever references them.
        for (id, _) in module.iter_globals() {
            self.index
                .register(ValueRef::Global(id), self.config.affiliated.global);
        }
        for (id, _) in module.iter_functions() {
            self.index.register(ValueRef::Function(id), 0);
        }

        for (_, global) in module.iter_globals() {
            if let Some(initializer) = global.initializer {
                self.register_constant(initializer);
            }
        }
        for (id, function) in module.iter_functions() {
            self.register_function(id, function)?;
        }
        Ok(())
    }

    fn register_function(&mut self, id: FunctionId, function: &'m Function) -> FactResult<()> {
        debug!("Registering function `{}`", function.name);
        for position in 0..function.params.len() as u32 {
            self.index.register(ValueRef::Argument(id, position), 0);
        }

        for bb in function.body.values() {
            self.index.register(ValueRef::Block(id, bb.label), 0);
            for (position, instr) in bb.instructions.iter().enumerate() {
                let at = InstrRef {
                    function: id,
                    block: bb.label,
                    index: position as u32,
                };
                let affiliated = self.affiliated_count(at, instr)?;
                self.index.register(ValueRef::Instruction(at), affiliated);
                self.register_operands(instr.operands());
            }

            self.index.register(ValueRef::Terminator(id, bb.label), 0);
            self.register_operands(bb.terminator.operands());
            if let Terminator::Switch(switch) = &bb.terminator {
                for (case, _) in &switch.cases {
                    self.register_constant(*case);
                }
            }
        }
        Ok(())
    }

    /// Number of objects an instruction owns besides itself. The intrinsic
    /// decision is recorded so that emission uses the same matcher.
    fn affiliated_count(&mut self, at: InstrRef, instr: &'m Instr) -> FactResult<u32> {
        Ok(match instr {
            Instr::MAlloca(_) => self.config.affiliated.alloca,
            Instr::Invoke(invoke) => {
                let site = CallSite::new(self.module, at, invoke);
                match self.intrinsics.resolve(&site)? {
                    Some((position, result)) => {
                        self.matched_calls.insert(at, position);
                        result.affiliated
                    }
                    None => 0,
                }
            }
            _ => 0,
        })
    }

    fn register_operands<'a>(&mut self, operands: impl Iterator<Item = &'a Operand>) {
        for operand in operands {
            if let Operand::Imm(constant) = operand {
                self.register_constant(*constant);
            }
        }
    }

    /// Elements are registered before the aggregate holding them.
    fn register_constant(&mut self, id: ConstId) {
        let value = ValueRef::from_const(self.module, id);
        if self.index.contains(&value) {
            return;
        }
        if let Some(pooled) = self.module.constants.get(id) {
            for child in pooled.value.children() {
                self.register_constant(*child);
            }
        }
        self.index.register(value, 0);
    }
}
