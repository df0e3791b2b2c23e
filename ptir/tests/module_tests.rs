use ptir::{
    consts::{AggregateConst, AnyConst, ConstId, int::IConst},
    modules::{
        BasicBlock, Instruction, Module, NameDef,
        instructions::Instr,
        int::{IArith, IArithOp},
        operand::{Label, Operand},
        terminator::{Jump, Ret},
    },
    tests_utils::{
        alloca_load_module, define, external_call_module, linked_list_module, self_loop_function,
    },
    types::{TypeRegistry, primary::IType},
    utils::Error,
    value::{InstrRef, ValueRef},
};

#[test]
fn fixtures_verify() {
    let types = TypeRegistry::new();
    for module in [
        alloca_load_module(&types),
        external_call_module(&types, "malloc"),
        linked_list_module(&types),
    ] {
        assert_eq!(module.verify(), Ok(()), "module `{}`", module.name);
    }
}

#[test]
fn identical_constants_are_interned_once() {
    let types = TypeRegistry::new();
    let mut module = Module::new("pool");
    let a = module.constant(&types, IConst::from(7u32)).unwrap();
    let b = module.constant(&types, IConst::from(7u32)).unwrap();
    let c = module.constant(&types, IConst::from(7u64)).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c, "same value but different width is a different constant");
    assert_eq!(module.constants.len(), 2);
    assert_eq!(
        module.constants.get(a).map(|pooled| pooled.ty),
        Some(types.search_or_insert(IType::I32.into()))
    );
}

#[test]
fn aggregate_constant_requires_existing_elements() {
    let types = TypeRegistry::new();
    let mut module = Module::new("pool");
    let err = module
        .constant(
            &types,
            AnyConst::Aggregate(AggregateConst {
                ty: types.ptr(),
                elements: vec![ConstId(42)],
            }),
        )
        .unwrap_err();
    assert_eq!(err, Error::UndefinedConstant { undefined: ConstId(42) });
}

#[test]
fn definitions_map_names_to_sites() {
    let types = TypeRegistry::new();
    let module = linked_list_module(&types);
    let walk = module.find_function("walk").expect("walk is defined");
    let function = module.function(walk).unwrap();
    let defs = function.definitions();

    assert_eq!(defs.get(&0), Some(&NameDef::Param(0)));
    assert_eq!(defs.get(&1), Some(&NameDef::Param(1)));
    assert_eq!(defs.get(&4), Some(&NameDef::Instr(Label(1), 0)));
    assert_eq!(defs.keys().next_back(), Some(&9));
    assert_eq!(
        ValueRef::from_def(walk, defs[&6]),
        ValueRef::Instruction(InstrRef {
            function: walk,
            block: Label(1),
            index: 2,
        })
    );
}

#[test]
fn global_address_constants_collapse_onto_the_global() {
    let types = TypeRegistry::new();
    let module = linked_list_module(&types);
    let (id, _) = module
        .constants
        .iter()
        .find(|(_, pooled)| pooled.value.is_global_addr())
        .expect("fixture takes a global address");
    assert!(matches!(ValueRef::from_const(&module, id), ValueRef::Global(_)));
}

#[test]
fn check_ssa_rejects_duplicate_and_undefined_names() {
    let types = TypeRegistry::new();
    let i32_ty = types.int(32);
    let add = |dest: u32, rhs: u32| -> Instr {
        IArith {
            dest,
            ty: i32_ty,
            op: IArithOp::Add,
            lhs: Operand::Reg(0),
            rhs: Operand::Reg(rhs),
        }
        .into()
    };

    let duplicate = define(
        "dup",
        vec![(0, i32_ty)],
        None,
        vec![BasicBlock::new(Label::NIL, vec![add(1, 0), add(1, 0)], Ret { value: None })],
    );
    assert_eq!(
        duplicate.check_ssa(),
        Err(Error::DuplicateSSAName { duplicate: 1 })
    );

    let undefined = define(
        "undef",
        vec![(0, i32_ty)],
        None,
        vec![BasicBlock::new(Label::NIL, vec![add(1, 5)], Ret { value: None })],
    );
    assert_eq!(
        undefined.check_ssa(),
        Err(Error::UndefinedSSAName { undefined: 5 })
    );
}

#[test]
fn check_ssa_rejects_missing_blocks() {
    let no_entry = define(
        "no_entry",
        vec![],
        None,
        vec![BasicBlock::new(Label(3), vec![], Ret { value: None })],
    );
    assert_eq!(no_entry.check_ssa(), Err(Error::MissingEntryBlock));

    let dangling = define(
        "dangling",
        vec![],
        None,
        vec![BasicBlock::new(Label::NIL, vec![], Jump { target: Label(9) })],
    );
    assert!(matches!(
        dangling.check_ssa(),
        Err(Error::UndefinedBasicBlock { label: Label(9), .. })
    ));
}

#[test]
fn push_block_rejects_duplicate_labels() {
    let mut function = self_loop_function("spin");
    let err = function
        .push_block(BasicBlock::new(Label::NIL, vec![], Ret { value: None }))
        .unwrap_err();
    assert_eq!(err, Error::BlockLabelAlreadyExists(Label::NIL));
}

#[test]
fn terminators_report_successors_in_operand_order() {
    let types = TypeRegistry::new();
    let module = linked_list_module(&types);
    let walk = module.find_function("walk").unwrap();
    let entry = module.terminator(walk, Label::NIL).unwrap();
    assert_eq!(entry.opcode(), "cbranch");
    assert_eq!(entry.successors().collect::<Vec<_>>(), vec![Label(1), Label(2)]);

    let spin = self_loop_function("spin");
    let term = &spin.body[&Label::NIL].terminator;
    assert_eq!(term.successors().collect::<Vec<_>>(), vec![Label::NIL]);
}

#[test]
fn instruction_metadata() {
    let types = TypeRegistry::new();
    let module = alloca_load_module(&types);
    let main = module.find_function("main").unwrap();
    let alloca = module
        .instruction(InstrRef {
            function: main,
            block: Label::NIL,
            index: 0,
        })
        .unwrap();
    assert_eq!(alloca.opcode(), "malloca");
    assert_eq!(alloca.destination(), Some(0));
    assert_eq!(alloca.destination_type(&types), Some(types.ptr()));
    assert_eq!(module.value_name(ValueRef::Function(main)), "main");
}
