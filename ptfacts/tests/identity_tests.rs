use ptfacts::{
    FactError, FactResult,
    config::{AffiliatedLayout, FactConfig},
    fact,
    intrinsic::{CallSite, IntrinsicCall, IntrinsicRegistry, MatchResult, ResolvedCall},
    object::{IndexError, ObjectId},
    program::{FactProgram, Term},
    schema::rel,
    walker::FactWalker,
};
use ptir::{
    modules::{
        BasicBlock, Module,
        operand::Label,
        symbol::{FunctionId, GlobalId},
        terminator::Trap,
    },
    tests_utils::{alloca_load_module, external_call_module, linked_list_module},
    types::TypeRegistry,
    value::{InstrRef, ValueRef},
};

fn walker<'m>(module: &'m Module, types: &'m TypeRegistry, config: FactConfig) -> FactWalker<'m> {
    let intrinsics = IntrinsicRegistry::with_defaults(&config);
    FactWalker::new(module, types, config, intrinsics).expect("fixture registers")
}

fn instr(function: u32, block: u32, index: u32) -> ValueRef {
    ValueRef::Instruction(InstrRef {
        function: FunctionId(function),
        block: Label(block),
        index,
    })
}

/// Allocates two affiliated objects per matched call.
struct PairAllocator;

impl IntrinsicCall for PairAllocator {
    fn name(&self) -> &str {
        "pair_allocator"
    }

    fn matches(&self, site: &CallSite<'_>) -> Option<MatchResult> {
        (site.callee_name() == Some("pair_alloc")).then_some(MatchResult { affiliated: 2 })
    }

    fn generate(
        &self,
        walker: &FactWalker<'_>,
        program: &mut FactProgram,
        _site: &CallSite<'_>,
        call: &ResolvedCall,
    ) -> FactResult<()> {
        for offset in 1..=2 {
            let object = walker.affiliated_id(call.id, offset)?;
            program.append(&rel::HEAP_ALLOC, fact![call.id, object])?;
        }
        Ok(())
    }
}

#[test]
fn ids_start_after_special_objects() {
    let types = TypeRegistry::new();
    let module = alloca_load_module(&types);
    let walker = walker(&module, &types, FactConfig::default());

    let main = walker.id_of(ValueRef::Function(FunctionId(0))).unwrap();
    assert_eq!(main, ObjectId(2));
    assert!(!walker.is_valid_object_id(ObjectId(0)));
    assert!(!walker.is_valid_object_id(ObjectId(1)));
    assert!(walker.is_valid_object_id(main));
}

#[test]
fn alloca_reserves_its_region() {
    let types = TypeRegistry::new();
    let module = alloca_load_module(&types);
    let walker = walker(&module, &types, FactConfig::default());

    let alloca = walker.id_of(instr(0, 0, 0)).unwrap();
    let region = walker.affiliated_id(alloca, 1).unwrap();
    assert_eq!(region, ObjectId(alloca.0 + 1));
    assert_eq!(walker.value_of(region), Ok(None));
    assert_eq!(walker.main_value_of(region), Ok(instr(0, 0, 0)));
    assert_eq!(walker.value_of(alloca), Ok(Some(instr(0, 0, 0))));
    assert_eq!(
        walker.affiliated_id(alloca, 0),
        Err(IndexError::AffiliatedBase { base: alloca })
    );

    // The store right after the alloca skips the region.
    let store = walker.id_of(instr(0, 0, 1)).unwrap();
    assert!(store.0 > region.0);
}

#[test]
fn affiliated_layout_is_configurable() {
    let types = TypeRegistry::new();
    let module = alloca_load_module(&types);
    let config = FactConfig {
        affiliated: AffiliatedLayout {
            alloca: 0,
            global: 0,
        },
        ..Default::default()
    };
    let mut walker = walker(&module, &types, config);

    let alloca = walker.id_of(instr(0, 0, 0)).unwrap();
    assert_eq!(walker.storage_of(alloca), Ok(alloca));
    assert!(walker.affiliated_id(alloca, 1).is_err());

    let mut program = FactProgram::default();
    walker.generate_facts(&mut program).unwrap();
    assert!(
        program
            .relation("address_of")
            .contains(&fact![alloca, alloca])
    );
}

#[test]
fn every_allocated_id_resolves_to_a_registered_value() {
    let types = TypeRegistry::new();
    let module = linked_list_module(&types);
    let walker = walker(&module, &types, FactConfig::default());
    let index = walker.index();

    for (id, _) in index.iter() {
        assert!(walker.is_valid_object_id(id));
        let main = walker.main_value_of(id).unwrap();
        let base = walker.id_of(main).unwrap();
        assert!(base <= id);
    }
    let end = ObjectId(index.special_count() + index.len() as u32);
    assert!(!walker.is_valid_object_id(end));
}

#[test]
fn globals_own_their_storage() {
    let types = TypeRegistry::new();
    let module = linked_list_module(&types);
    let walker = walker(&module, &types, FactConfig::default());

    let tail = walker.id_of(ValueRef::Global(GlobalId(0))).unwrap();
    let head = walker.id_of(ValueRef::Global(GlobalId(1))).unwrap();
    assert_eq!(tail, ObjectId(2));
    assert_eq!(head, ObjectId(4), "one storage object sits between the globals");
    assert_eq!(walker.main_value_of(ObjectId(3)), Ok(ValueRef::Global(GlobalId(0))));
}

#[test]
fn lookups_outside_the_index_fail() {
    let types = TypeRegistry::new();
    let module = alloca_load_module(&types);
    let walker = walker(&module, &types, FactConfig::default());
    let end = walker.index().special_count() + walker.index().len() as u32;

    assert!(matches!(
        walker.value_of(ObjectId(end)),
        Err(IndexError::OutOfRange { .. })
    ));
    assert!(matches!(
        walker.main_value_of(ObjectId(0)),
        Err(IndexError::OutOfRange { .. })
    ));
    assert!(!walker.has_value(ValueRef::Global(GlobalId(9))));
    assert!(matches!(
        walker.id_of(ValueRef::Global(GlobalId(9))),
        Err(IndexError::Unregistered { .. })
    ));
}

#[test]
fn intrinsic_reserves_contiguous_objects() {
    let types = TypeRegistry::new();
    let module = external_call_module(&types, "pair_alloc");
    let config = FactConfig::default();
    let intrinsics = IntrinsicRegistry::new(config.conflict_policy).with(PairAllocator);
    let mut walker = FactWalker::new(&module, &types, config, intrinsics).unwrap();

    let call_value = instr(1, 0, 0);
    let call = walker.id_of(call_value).unwrap();
    for offset in 1..=2 {
        let object = walker.affiliated_id(call, offset).unwrap();
        assert_eq!(object, ObjectId(call.0 + offset));
        assert_eq!(walker.main_value_of(object), Ok(call_value));
    }
    assert!(matches!(
        walker.affiliated_id(call, 3),
        Err(IndexError::AffiliatedOverflow { reserved: 2, .. })
    ));

    let mut program = FactProgram::default();
    walker.generate_facts(&mut program).unwrap();
    assert_eq!(
        program.relation("heap_alloc"),
        &[
            fact![call, ObjectId(call.0 + 1)],
            fact![call, ObjectId(call.0 + 2)]
        ]
    );
    assert!(program.relation("call").is_empty(), "generic call facts are skipped");
    assert_eq!(
        program.relation("operand")[0],
        fact![call, 0u32, walker.id_of(ValueRef::Function(FunctionId(0))).unwrap()]
    );
}

#[test]
fn unmatched_calls_take_the_generic_path() {
    let types = TypeRegistry::new();
    let module = external_call_module(&types, "opaque");
    let mut walker = walker(&module, &types, FactConfig::default());
    let call = walker.id_of(instr(1, 0, 0)).unwrap();
    let callee = walker.id_of(ValueRef::Function(FunctionId(0))).unwrap();
    assert!(walker.affiliated_id(call, 1).is_err());

    let mut program = FactProgram::default();
    walker.generate_facts(&mut program).unwrap();
    assert_eq!(program.relation("call"), &[fact![call, callee]]);
    assert_eq!(program.relation("call_return"), &[fact![call]]);
    assert!(program.relation("call_arg").is_empty(), "the size argument is an integer");
    assert!(program.relation("heap_alloc").is_empty());
    assert!(
        program
            .relation("return")
            .iter()
            .any(|fact| fact[1] == Term::Object(call))
    );
}

#[test]
fn invalid_modules_are_rejected() {
    let types = TypeRegistry::new();
    let mut module = alloca_load_module(&types);
    module.functions[0].body.clear();
    module.functions[0]
        .body
        .insert(Label(4), BasicBlock::new(Label(4), vec![], Trap));

    let config = FactConfig::default();
    let intrinsics = IntrinsicRegistry::with_defaults(&config);
    assert!(matches!(
        FactWalker::new(&module, &types, config, intrinsics),
        Err(FactError::Ir(ptir::utils::Error::MissingEntryBlock))
    ));
}
