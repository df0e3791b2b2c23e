use std::collections::{BTreeSet, HashMap};

use log::{debug, trace, warn};
use ptir::{
    consts::{AnyConst, ConstId},
    modules::{
        Function, GlobalVariable, Instruction, NameDef,
        instructions::Instr,
        misc::{CastOp, Invoke},
        operand::{Label, Name, Operand},
        symbol::{FunctionId, GlobalId},
        terminator::Terminator,
    },
    types::Typeref,
    utils::Error as IrError,
    value::{InstrRef, ValueRef},
};
use smallvec::SmallVec;

use crate::{
    FactResult,
    config::{NULL_OBJECT, UNKNOWN_OBJECT},
    fact,
    intrinsic::{CallSite, ResolvedCall},
    object::ObjectId,
    program::FactProgram,
    schema::rel,
    walker::{FactWalker, classify::is_free_argument},
};

/// SSA names of the function being emitted, with their static types.
struct Scope {
    function: FunctionId,
    names: HashMap<Name, (ValueRef, Option<Typeref>)>,
}

impl Scope {
    fn new(walker: &FactWalker<'_>, id: FunctionId, function: &Function) -> Self {
        let names = function
            .definitions()
            .into_iter()
            .map(|(name, def)| {
                let ty = match def {
                    NameDef::Param(position) => {
                        function.params.get(position as usize).map(|(_, ty)| *ty)
                    }
                    NameDef::Instr(label, position) => function
                        .body
                        .get(&label)
                        .and_then(|bb| bb.instructions.get(position as usize))
                        .and_then(|instr| instr.destination_type(walker.types)),
                };
                (name, (ValueRef::from_def(id, def), ty))
            })
            .collect();
        Self {
            function: id,
            names,
        }
    }

    fn value(&self, name: Name) -> Result<ValueRef, IrError> {
        self.names
            .get(&name)
            .map(|(value, _)| *value)
            .ok_or(IrError::UndefinedSSAName { undefined: name })
    }
}

impl<'m> FactWalker<'m> {
    pub(super) fn emit_module(&mut self, program: &mut FactProgram) -> FactResult<()> {
        let module = self.module;

        for (position, name) in self.config.special_objects.iter().enumerate() {
            program.append(
                &rel::SPECIAL_OBJECT,
                fact![ObjectId(position as u32), name.as_str()],
            )?;
        }
        program.append(&rel::MODULE, fact![module.name.as_str()])?;

        for (id, global) in module.iter_globals() {
            self.emit_global(program, id, global)?;
        }
        for (id, function) in module.iter_functions() {
            self.emit_function(program, id, function)?;
        }
        Ok(())
    }

    fn emit_global(
        &mut self,
        program: &mut FactProgram,
        id: GlobalId,
        global: &'m GlobalVariable,
    ) -> FactResult<()> {
        let me = self.id_of(ValueRef::Global(id))?;
        program.append(&rel::GLOBAL, fact![me, global.name.as_str()])?;
        self.emit_value_type(program, me, self.types.ptr())?;

        let storage = self.storage_of(me)?;
        program.append(&rel::MEMORY_OBJECT, fact![storage, "global"])?;
        program.append(
            &rel::OBJECT_TYPE,
            fact![storage, self.types.fmt(global.ty).to_string()],
        )?;
        program.append(&rel::ADDRESS_OF, fact![me, storage])?;

        if let Some(initializer) = global.initializer {
            let value = self.visit_constant(program, initializer)?;
            program.append(&rel::GLOBAL_INIT, fact![storage, value])?;
        }
        Ok(())
    }

    fn emit_function(
        &mut self,
        program: &mut FactProgram,
        id: FunctionId,
        function: &'m Function,
    ) -> FactResult<()> {
        let me = self.id_of(ValueRef::Function(id))?;
        program.append(&rel::FUNCTION, fact![me, function.name.as_str()])?;
        program.append(&rel::MEMORY_OBJECT, fact![me, "function"])?;
        program.append(&rel::ADDRESS_OF, fact![me, me])?;
        self.emit_value_type(program, me, self.types.ptr())?;

        for (position, (_, ty)) in function.params.iter().enumerate() {
            let arg = self.id_of(ValueRef::Argument(id, position as u32))?;
            program.append(&rel::ARGUMENT, fact![me, position, arg])?;
            self.emit_value_type(program, arg, *ty)?;

            let holds_pointer = self.contains_pointer(*ty);
            if is_free_argument(self.config.free_arguments, function, holds_pointer) {
                program.append(&rel::FREE_ARGUMENT, fact![arg])?;
            }
        }

        if function.is_declaration() {
            program.append(&rel::FUNCTION_DECL, fact![me])?;
            return Ok(());
        }

        debug!(
            "Emitting facts for function `{}` ({} blocks)",
            function.name,
            function.body.len()
        );
        let entry = self.id_of(ValueRef::Block(id, Label::NIL))?;
        program.append(&rel::FUNCTION_ENTRY, fact![me, entry])?;

        let scope = Scope::new(self, id, function);
        for bb in function.body.values() {
            let block = self.id_of(ValueRef::Block(id, bb.label))?;
            program.append(&rel::BLOCK, fact![block, me])?;

            for (position, instr) in bb.instructions.iter().enumerate() {
                let at = InstrRef {
                    function: id,
                    block: bb.label,
                    index: position as u32,
                };
                self.emit_instruction(program, &scope, block, at, instr)?;
            }
            self.emit_terminator(program, &scope, (block, bb.label), me, &bb.terminator)?;
        }
        Ok(())
    }

    fn emit_instruction(
        &mut self,
        program: &mut FactProgram,
        scope: &Scope,
        block: ObjectId,
        at: InstrRef,
        instr: &'m Instr,
    ) -> FactResult<()> {
        let me = self.id_of(ValueRef::Instruction(at))?;
        program.append(&rel::INSTR, fact![me, instr.opcode(), block])?;
        if let Some(ty) = instr.destination_type(self.types) {
            self.emit_value_type(program, me, ty)?;
        }
        self.emit_operands(program, scope, me, instr.operands())?;

        match instr {
            Instr::MAlloca(alloca) => {
                let region = self.storage_of(me)?;
                program.append(&rel::MEMORY_OBJECT, fact![region, "stack"])?;
                program.append(
                    &rel::OBJECT_TYPE,
                    fact![region, self.types.fmt(alloca.ty).to_string()],
                )?;
                program.append(&rel::ADDRESS_OF, fact![me, region])?;
            }
            Instr::MLoad(load) if self.contains_pointer(load.ty) => {
                let address = self.operand_id(scope, &load.addr)?;
                program.append(&rel::LOAD, fact![me, address])?;
            }
            Instr::MStore(store) if self.holds_pointer(scope, &store.value) => {
                let address = self.operand_id(scope, &store.addr)?;
                let value = self.operand_id(scope, &store.value)?;
                program.append(&rel::STORE, fact![me, address, value])?;
            }
            Instr::MGetElementPtr(gep) => {
                let base = self.operand_id(scope, &gep.base)?;
                program.append(&rel::ELEMENT_ADDR, fact![me, base])?;
            }
            Instr::Phi(phi) if self.contains_pointer(phi.ty) => {
                for (label, value) in &phi.values {
                    let predecessor = self.id_of(ValueRef::Block(scope.function, *label))?;
                    let value = self.operand_id(scope, value)?;
                    program.append(&rel::PHI, fact![me, predecessor, value])?;
                }
            }
            Instr::Select(select) if self.contains_pointer(select.ty) => {
                for value in [&select.true_value, &select.false_value] {
                    let value = self.operand_id(scope, value)?;
                    program.append(&rel::MOVE, fact![me, value])?;
                }
            }
            Instr::Cast(cast) => match cast.op {
                CastOp::Bitcast if self.contains_pointer(cast.ty) => {
                    let value = self.operand_id(scope, &cast.value)?;
                    program.append(&rel::MOVE, fact![me, value])?;
                }
                CastOp::IntToPtr => {
                    self.emit_unknown_source(program, ValueRef::Instruction(at), "inttoptr")?
                }
                _ => {}
            },
            Instr::Invoke(invoke) => self.emit_call(program, scope, me, at, invoke)?,
            _ => {}
        }
        Ok(())
    }

    fn emit_call(
        &mut self,
        program: &mut FactProgram,
        scope: &Scope,
        me: ObjectId,
        at: InstrRef,
        invoke: &'m Invoke,
    ) -> FactResult<()> {
        let call = ResolvedCall {
            id: me,
            callee: self.operand_id(scope, &invoke.function)?,
            args: invoke
                .args
                .iter()
                .map(|arg| self.operand_id(scope, arg))
                .collect::<FactResult<_>>()?,
        };

        let matched = self.matched_calls.get(&at).copied();
        if let Some(intrinsic) = matched.and_then(|position| self.intrinsics.get(position)) {
            let site = CallSite::new(self.module, at, invoke);
            trace!("Call {} handled by intrinsic `{}`", me, intrinsic.name());
            return intrinsic.generate(self, program, &site, &call);
        }

        program.append(&rel::CALL, fact![me, call.callee])?;
        for (position, (arg, operand)) in call.args.iter().zip(&invoke.args).enumerate() {
            if self.holds_pointer(scope, operand) {
                program.append(&rel::CALL_ARG, fact![me, position, *arg])?;
            }
        }
        if invoke.ty.is_some_and(|ty| self.contains_pointer(ty)) {
            program.append(&rel::CALL_RETURN, fact![me])?;
        }
        Ok(())
    }

    fn emit_terminator(
        &mut self,
        program: &mut FactProgram,
        scope: &Scope,
        (block, label): (ObjectId, Label),
        function: ObjectId,
        terminator: &'m Terminator,
    ) -> FactResult<()> {
        let me = self.id_of(ValueRef::Terminator(scope.function, label))?;
        program.append(&rel::INSTR, fact![me, terminator.opcode(), block])?;
        let count = self.emit_operands(program, scope, me, terminator.operands())?;

        // A target reached through several arms is still a single edge.
        let successors: BTreeSet<Label> = terminator.successors().collect();
        for successor in successors {
            let successor = self.id_of(ValueRef::Block(scope.function, successor))?;
            program.append(&rel::SUCCESSOR, fact![block, successor])?;
        }

        match terminator {
            Terminator::Ret(ret) => {
                if let Some(value) = ret.value.as_ref().filter(|v| self.holds_pointer(scope, v)) {
                    let value = self.operand_id(scope, value)?;
                    program.append(&rel::RETURN, fact![function, value])?;
                }
            }
            // Case values follow the scrutinee in operand order.
            Terminator::Switch(switch) => {
                for (position, (case, _)) in switch.cases.iter().enumerate() {
                    let case = self.visit_constant(program, *case)?;
                    program.append(&rel::OPERAND, fact![me, count + position, case])?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// `operand` facts for every operand of `user`, visiting constants on
    /// the way. Returns the number of operands.
    fn emit_operands<'a>(
        &mut self,
        program: &mut FactProgram,
        scope: &Scope,
        user: ObjectId,
        operands: impl Iterator<Item = &'a Operand>,
    ) -> FactResult<usize> {
        let mut count = 0;
        for (position, operand) in operands.enumerate() {
            let value = match operand {
                Operand::Imm(constant) => self.visit_constant(program, *constant)?,
                operand => self.operand_id(scope, operand)?,
            };
            program.append(&rel::OPERAND, fact![user, position, value])?;
            count += 1;
        }
        Ok(count)
    }

    /// Emit the shape facts of a constant once, elements first, and return
    /// its id. Global and function addresses are the symbols themselves and
    /// carry no constant facts.
    fn visit_constant(&mut self, program: &mut FactProgram, id: ConstId) -> FactResult<ObjectId> {
        let value = ValueRef::from_const(self.module, id);
        let me = self.id_of(value)?;
        if !value.is_constant() || self.visited_constants.contains(id.index()) {
            return Ok(me);
        }

        let module = self.module;
        let pooled = module
            .constants
            .get(id)
            .ok_or(IrError::UndefinedConstant { undefined: id })?;
        trace!("Visiting constant {} as {}", id, me);

        let elements = pooled
            .value
            .children()
            .iter()
            .map(|child| self.visit_constant(program, *child))
            .collect::<FactResult<SmallVec<[ObjectId; 4]>>>()?;

        let kind: &'static str = pooled.value.kind().into();
        program.append(&rel::CONSTANT, fact![me, kind])?;
        self.emit_value_type(program, me, pooled.ty)?;

        match &pooled.value {
            AnyConst::Aggregate(_) => {
                for (position, element) in elements.iter().enumerate() {
                    program.append(&rel::CONST_ELEMENT, fact![me, position, *element])?;
                }
            }
            AnyConst::ElementAddr(_) => {
                if let Some(base) = elements.first() {
                    program.append(&rel::ELEMENT_ADDR, fact![me, *base])?;
                }
            }
            AnyConst::Null => {
                if let Some(null) = self.special_object(NULL_OBJECT) {
                    program.append(&rel::ADDRESS_OF, fact![me, null])?;
                }
            }
            _ => {}
        }

        self.visited_constants.insert(id.index());
        Ok(me)
    }

    fn emit_value_type(
        &self,
        program: &mut FactProgram,
        value: ObjectId,
        ty: Typeref,
    ) -> FactResult<()> {
        program.append(&rel::VALUE_TYPE, fact![value, self.types.fmt(ty).to_string()])?;
        if self.contains_pointer(ty) {
            program.append(&rel::POINTER_VALUE, fact![value])?;
        }
        Ok(())
    }

    /// Conservative fallback for pointers the extractor cannot trace.
    fn emit_unknown_source(
        &self,
        program: &mut FactProgram,
        value: ValueRef,
        origin: &str,
    ) -> FactResult<()> {
        let id = self.id_of(value)?;
        let name = self.module.value_name(value);
        match self.special_object(UNKNOWN_OBJECT) {
            Some(unknown) => {
                warn!("Pointer `{}` ({}) produced by `{}` may point anywhere", name, id, origin);
                program.append(&rel::UNKNOWN_SOURCE, fact![id, unknown])?;
            }
            None => debug!(
                "No `{}` special object configured, `{}` left untraced",
                UNKNOWN_OBJECT, name
            ),
        }
        Ok(())
    }

    fn operand_id(&self, scope: &Scope, operand: &Operand) -> FactResult<ObjectId> {
        let value = match operand {
            Operand::Reg(name) => scope.value(*name)?,
            Operand::Imm(constant) => ValueRef::from_const(self.module, *constant),
            Operand::Lbl(label) => ValueRef::Block(scope.function, *label),
        };
        Ok(self.id_of(value)?)
    }

    fn holds_pointer(&self, scope: &Scope, operand: &Operand) -> bool {
        let ty = match operand {
            Operand::Reg(name) => scope.names.get(name).and_then(|(_, ty)| *ty),
            Operand::Imm(constant) => self.module.constants.get(*constant).map(|c| c.ty),
            Operand::Lbl(_) => None,
        };
        ty.is_some_and(|ty| self.contains_pointer(ty))
    }
}
