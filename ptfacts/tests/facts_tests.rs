use ptfacts::{
    FactError,
    config::{ConflictPolicy, FactConfig, FreeArgumentPolicy},
    fact,
    intrinsic::{CallSite, HeapAllocator, IntrinsicError, IntrinsicRegistry, MatchResult},
    object::ObjectId,
    program::{Fact, FactProgram, Term},
    walker::FactWalker,
};
use ptir::{
    consts::{AnyConst, int::IConst},
    modules::{
        BasicBlock, Module,
        misc::{Cast, CastOp},
        operand::{Label, Operand},
        symbol::{FunctionId, GlobalId},
        terminator::Ret,
    },
    tests_utils::{
        alloca_load_module, branching_module, define, external_call_module, linked_list_module,
        shared_constant_module,
    },
    types::TypeRegistry,
    value::{InstrRef, ValueRef},
};

fn generate(module: &Module, types: &TypeRegistry, config: FactConfig) -> (FactProgram, Vec<ObjectId>) {
    let intrinsics = IntrinsicRegistry::with_defaults(&config);
    let mut walker = FactWalker::new(module, types, config, intrinsics).expect("fixture registers");
    let mut program = FactProgram::default();
    walker.generate_facts(&mut program).expect("fixture emits");
    let ids = walker.index().iter().map(|(id, _)| id).collect();
    (program, ids)
}

fn id_of(module: &Module, types: &TypeRegistry, value: ValueRef) -> ObjectId {
    let config = FactConfig::default();
    let intrinsics = IntrinsicRegistry::with_defaults(&config);
    FactWalker::new(module, types, config, intrinsics)
        .unwrap()
        .id_of(value)
        .unwrap()
}

fn instr(function: u32, block: u32, index: u32) -> ValueRef {
    ValueRef::Instruction(InstrRef {
        function: FunctionId(function),
        block: Label(block),
        index,
    })
}

fn count_referencing(facts: &[Fact], column: usize, id: ObjectId) -> usize {
    facts
        .iter()
        .filter(|fact| fact[column] == Term::Object(id))
        .count()
}

#[test]
fn load_refers_to_the_allocation_site() {
    let types = TypeRegistry::new();
    let module = alloca_load_module(&types);
    let (program, _) = generate(&module, &types, FactConfig::default());
    let alloca = id_of(&module, &types, instr(0, 0, 0));
    let store = id_of(&module, &types, instr(0, 0, 1));
    let load = id_of(&module, &types, instr(0, 0, 2));
    let region = ObjectId(alloca.0 + 1);

    assert!(program.relation("operand").contains(&fact![load, 0u32, alloca]));
    assert_eq!(program.relation("load"), &[fact![load, alloca]]);
    assert!(program.relation("address_of").contains(&fact![alloca, region]));
    assert!(program.relation("memory_object").contains(&fact![region, "stack"]));
    assert!(program.relation("object_type").contains(&fact![region, "ptr"]));
    assert!(program.relation("pointer_value").contains(&fact![load]));

    let [stored] = program.relation("store") else {
        panic!("exactly one store of a pointer");
    };
    assert_eq!(stored[0], Term::Object(store));
    assert_eq!(stored[1], Term::Object(alloca));
}

#[test]
fn shared_constants_are_described_once() {
    let types = TypeRegistry::new();
    let module = shared_constant_module(&types);
    let (program, _) = generate(&module, &types, FactConfig::default());

    let null = program
        .relation("constant")
        .iter()
        .find(|fact| fact[1] == Term::Str("null".into()))
        .and_then(|fact| fact[0].try_as_object_ref().copied())
        .expect("null is described");

    assert_eq!(
        program.relation("constant").len(),
        2,
        "one fact for `1`, one for `null`"
    );
    assert_eq!(count_referencing(program.relation("operand"), 2, null), 2);
    assert_eq!(count_referencing(program.relation("value_type"), 0, null), 1);
    assert!(program.relation("address_of").contains(&fact![null, ObjectId(1)]));
}

#[test]
fn special_objects_are_listed_first() {
    let types = TypeRegistry::new();
    let module = alloca_load_module(&types);
    let config = FactConfig {
        special_objects: vec!["unknown".into(), "null".into(), "universal".into()],
        ..Default::default()
    };
    let (program, ids) = generate(&module, &types, config);

    assert_eq!(
        program.relation("special_object"),
        &[
            fact![ObjectId(0), "unknown"],
            fact![ObjectId(1), "null"],
            fact![ObjectId(2), "universal"],
        ]
    );
    assert_eq!(ids.first(), Some(&ObjectId(3)));
}

#[test]
fn linked_list_shapes() {
    let types = TypeRegistry::new();
    let module = linked_list_module(&types);
    let (program, _) = generate(&module, &types, FactConfig::default());
    let tail = id_of(&module, &types, ValueRef::Global(GlobalId(0)));
    let head = id_of(&module, &types, ValueRef::Global(GlobalId(1)));
    let walk = id_of(&module, &types, ValueRef::Function(FunctionId(0)));
    let head_storage = ObjectId(head.0 + 1);

    // `@head = { @tail, 1 }`: the first element is the global itself.
    let [_, head_init] = program.relation("global_init") else {
        panic!("both globals are initialized");
    };
    assert_eq!(head_init[0], Term::Object(head_storage));
    let Term::Object(aggregate) = head_init[1] else {
        panic!("initializer is an object");
    };
    assert!(program.relation("const_element").contains(&fact![aggregate, 0u32, tail]));
    assert!(program.relation("object_type").contains(&fact![head_storage, "{ ptr, i64 }"]));

    let phi = id_of(&module, &types, instr(0, 1, 0));
    assert_eq!(count_referencing(program.relation("phi"), 0, phi), 2);
    let select = id_of(&module, &types, instr(0, 0, 1));
    assert!(program.relation("move").contains(&fact![select, head]));
    assert_eq!(program.relation("element_addr").len(), 1);
    let block = |label| id_of(&module, &types, ValueRef::Block(FunctionId(0), Label(label)));
    assert_eq!(
        program.relation("successor"),
        &[
            fact![block(0), block(1)],
            fact![block(0), block(2)],
            fact![block(1), block(1)],
            fact![block(1), block(2)],
        ]
    );
    assert!(program.relation("return").is_empty(), "walk returns an integer");
    assert!(program.relation("unknown_source").is_empty());

    let entry = id_of(&module, &types, ValueRef::Block(FunctionId(0), Label::NIL));
    assert_eq!(program.relation("function_entry"), &[fact![walk, entry]]);
    let ret = id_of(&module, &types, ValueRef::Terminator(FunctionId(0), Label(2)));
    assert!(
        program
            .relation("instr")
            .iter()
            .any(|fact| fact[0] == Term::Object(ret) && fact[1] == Term::Str("ret".into()))
    );
}

#[test]
fn free_arguments_follow_the_policy() {
    let types = TypeRegistry::new();
    let module = linked_list_module(&types);
    let list = id_of(&module, &types, ValueRef::Argument(FunctionId(0), 0));

    let (program, _) = generate(&module, &types, FactConfig::default());
    assert_eq!(program.relation("free_argument"), &[fact![list]]);

    let never = FactConfig {
        free_arguments: FreeArgumentPolicy::Never,
        ..Default::default()
    };
    let (program, _) = generate(&module, &types, never);
    assert!(program.relation("free_argument").is_empty());
    assert_eq!(program.relation("argument").len(), 2);
}

#[test]
fn integer_to_pointer_is_an_unknown_source() {
    let types = TypeRegistry::new();
    let mut module = Module::new("forge");
    let ptr = types.ptr();
    module.add_function(define(
        "forge",
        vec![(0, types.int(64))],
        Some(ptr),
        vec![BasicBlock::new(
            Label::NIL,
            vec![
                Cast {
                    dest: 1,
                    op: CastOp::IntToPtr,
                    ty: ptr,
                    value: Operand::Reg(0),
                }
                .into(),
            ],
            Ret {
                value: Some(Operand::Reg(1)),
            },
        )],
    ));

    let (program, _) = generate(&module, &types, FactConfig::default());
    let cast = id_of(&module, &types, instr(0, 0, 0));
    let forge = id_of(&module, &types, ValueRef::Function(FunctionId(0)));
    assert_eq!(program.relation("unknown_source"), &[fact![cast, ObjectId(0)]]);
    assert_eq!(program.relation("return"), &[fact![forge, cast]]);

    let untraced = FactConfig {
        special_objects: vec!["null".into()],
        ..Default::default()
    };
    let (program, _) = generate(&module, &types, untraced);
    assert!(program.relation("unknown_source").is_empty());
}

#[test]
fn heap_allocations_get_their_own_object() {
    let types = TypeRegistry::new();
    let module = external_call_module(&types, "malloc");
    let (program, _) = generate(&module, &types, FactConfig::default());
    let call = id_of(&module, &types, instr(1, 0, 0));
    let object = ObjectId(call.0 + 1);

    assert_eq!(program.relation("heap_alloc"), &[fact![call, object]]);
    assert!(program.relation("memory_object").contains(&fact![object, "heap"]));
    assert!(program.relation("address_of").contains(&fact![call, object]));
    assert!(program.relation("call").is_empty());
}

#[test]
fn declarations_are_marked() {
    let types = TypeRegistry::new();
    let module = external_call_module(&types, "malloc");
    let (program, _) = generate(&module, &types, FactConfig::default());
    let malloc = id_of(&module, &types, ValueRef::Function(FunctionId(0)));
    assert_eq!(program.relation("function_decl"), &[fact![malloc]]);
    assert!(
        program.relation("free_argument").is_empty(),
        "declared parameters are never observed"
    );
}

#[test]
fn identities_and_facts_are_deterministic() {
    let types = TypeRegistry::new();
    let module = linked_list_module(&types);
    let (first, first_ids) = generate(&module, &types, FactConfig::default());
    let (second, second_ids) = generate(&module, &types, FactConfig::default());
    assert_eq!(first_ids, second_ids);
    assert_eq!(first.iter().collect::<Vec<_>>(), second.iter().collect::<Vec<_>>());

    // A second emission from the same walker describes constants again.
    let config = FactConfig::default();
    let intrinsics = IntrinsicRegistry::with_defaults(&config);
    let mut walker = FactWalker::new(&module, &types, config, intrinsics).unwrap();
    let mut again = FactProgram::default();
    walker.generate_facts(&mut again).unwrap();
    walker.generate_facts(&mut again).unwrap();
    assert_eq!(again.len(), 2 * first.len());
}

#[test]
fn overlapping_matchers_follow_the_conflict_policy() {
    let types = TypeRegistry::new();
    let module = external_call_module(&types, "malloc");
    let invoke = module.functions[1].body[&Label::NIL].instructions[0]
        .try_as_invoke_ref()
        .unwrap();
    let site = CallSite::new(
        &module,
        InstrRef {
            function: FunctionId(1),
            block: Label::NIL,
            index: 0,
        },
        invoke,
    );
    assert_eq!(site.callee_name(), Some("malloc"));

    let first = IntrinsicRegistry::new(ConflictPolicy::FirstMatch)
        .with(HeapAllocator::new(["calloc"]))
        .with(HeapAllocator::new(["malloc"]))
        .with(HeapAllocator::new(["malloc", "free"]));
    assert_eq!(
        first.resolve(&site),
        Ok(Some((1, MatchResult { affiliated: 1 })))
    );

    let strict = IntrinsicRegistry::new(ConflictPolicy::RejectAmbiguous)
        .with(HeapAllocator::new(["malloc"]))
        .with(HeapAllocator::new(["malloc"]));
    assert!(matches!(
        strict.resolve(&site),
        Err(IntrinsicError::Ambiguous { matchers, .. }) if matchers.len() == 2
    ));
    let result = FactWalker::new(&module, &types, FactConfig::default(), strict);
    assert!(matches!(result, Err(FactError::Intrinsic(_))));
}

#[test]
fn facts_export_as_tab_separated_files() {
    let types = TypeRegistry::new();
    let module = alloca_load_module(&types);
    let (program, _) = generate(&module, &types, FactConfig::default());
    let load = id_of(&module, &types, instr(0, 0, 2));
    let alloca = id_of(&module, &types, instr(0, 0, 0));

    let dir = std::env::temp_dir().join(format!("ptfacts-export-{}", std::process::id()));
    program.write_facts_dir(&dir).unwrap();

    let loads = std::fs::read_to_string(dir.join("load.facts")).unwrap();
    assert_eq!(loads, format!("{}\t{}\n", load.0, alloca.0));
    let calls = std::fs::read_to_string(dir.join("call.facts")).unwrap();
    assert!(calls.is_empty());
    let modules = std::fs::read_to_string(dir.join("module.facts")).unwrap();
    assert_eq!(modules, "alloca_load\n");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn global_address_constants_are_not_described() {
    let types = TypeRegistry::new();
    let module = linked_list_module(&types);
    let (program, _) = generate(&module, &types, FactConfig::default());
    let head = id_of(&module, &types, ValueRef::Global(GlobalId(1)));

    assert!(module.constants.iter().any(|(_, c)| c.value == AnyConst::GlobalAddr(GlobalId(1))));
    assert_eq!(count_referencing(program.relation("constant"), 0, head), 0);
    assert_eq!(program.relation("global").len(), 2);
}

#[test]
fn shared_branch_targets_are_a_single_edge() {
    let types = TypeRegistry::new();
    let module = branching_module(&types);
    let (program, _) = generate(&module, &types, FactConfig::default());
    let block = |label| id_of(&module, &types, ValueRef::Block(FunctionId(0), Label(label)));

    assert_eq!(
        program.relation("successor"),
        &[
            fact![block(0), block(1)],
            fact![block(1), block(2)],
            fact![block(1), block(3)],
        ]
    );

    let trap = id_of(&module, &types, ValueRef::Terminator(FunctionId(0), Label(3)));
    assert!(program.relation("instr").contains(&fact![trap, "trap", block(3)]));
    assert_eq!(count_referencing(program.relation("operand"), 0, trap), 0);
}

#[test]
fn switch_cases_are_referenced_on_every_use() {
    let types = TypeRegistry::new();
    let module = branching_module(&types);
    let (program, _) = generate(&module, &types, FactConfig::default());
    let constant = |value: u64| {
        let (id, _) = module
            .constants
            .iter()
            .find(|(_, pooled)| pooled.value == AnyConst::from(IConst::from(value)))
            .expect("case value is pooled");
        id_of(&module, &types, ValueRef::Constant(id))
    };
    let (seven, nine) = (constant(7), constant(9));
    let add = id_of(&module, &types, instr(0, 0, 2));
    let switch = id_of(&module, &types, ValueRef::Terminator(FunctionId(0), Label(1)));

    let switch_operands: Vec<_> = program
        .relation("operand")
        .iter()
        .filter(|fact| fact[0] == Term::Object(switch))
        .cloned()
        .collect();
    assert_eq!(
        switch_operands,
        vec![
            fact![switch, 0u32, add],
            fact![switch, 1u32, seven],
            fact![switch, 2u32, nine],
        ]
    );

    // `7` is also an operand of the `add`: described once, referenced twice.
    assert_eq!(count_referencing(program.relation("operand"), 2, seven), 2);
    assert_eq!(count_referencing(program.relation("constant"), 0, seven), 1);
    assert_eq!(count_referencing(program.relation("constant"), 0, nine), 1);
}

#[test]
fn float_values_are_typed_but_never_pointers() {
    let types = TypeRegistry::new();
    let module = branching_module(&types);
    let (program, _) = generate(&module, &types, FactConfig::default());
    let entry = id_of(&module, &types, ValueRef::Block(FunctionId(0), Label::NIL));
    let arg = |position| id_of(&module, &types, ValueRef::Argument(FunctionId(0), position));
    let fadd = id_of(&module, &types, instr(0, 0, 0));
    let fcmp = id_of(&module, &types, instr(0, 0, 1));

    assert!(program.relation("instr").contains(&fact![fadd, "farith", entry]));
    assert!(program.relation("instr").contains(&fact![fcmp, "fcmp", entry]));
    assert!(program.relation("value_type").contains(&fact![fadd, "double"]));
    assert!(program.relation("value_type").contains(&fact![fcmp, "i1"]));
    assert!(program.relation("operand").contains(&fact![fadd, 0u32, arg(1)]));
    assert!(program.relation("operand").contains(&fact![fadd, 1u32, arg(2)]));
    assert!(program.relation("operand").contains(&fact![fcmp, 0u32, fadd]));

    for value in [fadd, fcmp, arg(1), arg(2)] {
        assert_eq!(count_referencing(program.relation("pointer_value"), 0, value), 0);
    }
    assert!(program.relation("free_argument").is_empty());
    assert!(program.relation("move").is_empty());
}
