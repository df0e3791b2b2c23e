//! Small hand-built modules shared by the test suites of this workspace.
use std::collections::BTreeMap;

use crate::{
    consts::{AggregateConst, AnyConst, int::IConst},
    modules::{
        BasicBlock, Function, GlobalVariable, Module,
        fp::{FArith, FArithOp, FCmp, FCmpOp},
        instructions::Instr,
        int::{IArith, IArithOp, ICmp, ICmpOp},
        mem::{MAlloca, MGetElementPtr, MLoad, MStore},
        misc::{Cast, CastOp, Invoke, Phi, Select},
        operand::{Label, Operand},
        symbol::{Linkage, Visibility},
        terminator::{CBranch, Jump, Ret, Switch, Trap},
    },
    types::{TypeRegistry, Typeref, aggregate::StructType, primary::FType},
};

/// Defined function with the given blocks, external linkage.
pub fn define(
    name: &str,
    params: Vec<(u32, Typeref)>,
    return_type: Option<Typeref>,
    blocks: Vec<BasicBlock>,
) -> Function {
    Function {
        name: name.to_string(),
        params,
        return_type,
        body: blocks
            .into_iter()
            .map(|bb| (bb.label, bb))
            .collect::<BTreeMap<_, _>>(),
        linkage: Linkage::External,
        visibility: Visibility::Default,
    }
}

/// ```text
/// define void @main() {
/// block_0:
///   %0 = alloca ptr, i64 1
///   store null, %0
///   %1 = load ptr, %0
///   ret void
/// }
/// ```
pub fn alloca_load_module(types: &TypeRegistry) -> Module {
    let mut module = Module::new("alloca_load");
    let ptr = types.ptr();
    let one = module
        .constant(types, IConst::from(1u64))
        .expect("pool accepts scalar constants");
    let null = module
        .constant(types, AnyConst::Null)
        .expect("pool accepts null");

    module.add_function(define(
        "main",
        vec![],
        None,
        vec![BasicBlock::new(
            Label::NIL,
            vec![
                MAlloca {
                    dest: 0,
                    ty: ptr,
                    count: Operand::Imm(one),
                    alignment: Some(8),
                }
                .into(),
                MStore {
                    addr: Operand::Reg(0),
                    value: Operand::Imm(null),
                    alignment: None,
                    ordering: None,
                    volatile: false,
                }
                .into(),
                MLoad {
                    dest: 1,
                    ty: ptr,
                    addr: Operand::Reg(0),
                    alignment: None,
                    ordering: None,
                    volatile: false,
                }
                .into(),
            ],
            Ret { value: None },
        )],
    ));
    module
}

/// Two stores in different instructions writing the very same pooled
/// constant (`null`) into two stack slots.
pub fn shared_constant_module(types: &TypeRegistry) -> Module {
    let mut module = Module::new("shared_constant");
    let ptr = types.ptr();
    let one = module
        .constant(types, IConst::from(1u64))
        .expect("pool accepts scalar constants");
    let null = module
        .constant(types, AnyConst::Null)
        .expect("pool accepts null");

    let alloca = |dest: u32| -> Instr {
        MAlloca {
            dest,
            ty: ptr,
            count: Operand::Imm(one),
            alignment: None,
        }
        .into()
    };
    let store = |addr: u32| -> Instr {
        MStore {
            addr: Operand::Reg(addr),
            value: Operand::Imm(null),
            alignment: None,
            ordering: None,
            volatile: false,
        }
        .into()
    };

    module.add_function(define(
        "main",
        vec![],
        None,
        vec![BasicBlock::new(
            Label::NIL,
            vec![alloca(0), alloca(1), store(0), store(1)],
            Ret { value: None },
        )],
    ));
    module
}

/// `main` calls the external `callee(i64) -> ptr` once and returns the result.
pub fn external_call_module(types: &TypeRegistry, callee: &str) -> Module {
    let mut module = Module::new("external_call");
    let ptr = types.ptr();
    let i64_ty = types.int(64);
    let callee_id = module.add_function(Function::declaration(callee, vec![(0, i64_ty)], Some(ptr)));
    let callee_addr = module
        .constant(types, AnyConst::FunctionAddr(callee_id))
        .expect("pool accepts function addresses");
    let size = module
        .constant(types, IConst::from(16u64))
        .expect("pool accepts scalar constants");

    module.add_function(define(
        "main",
        vec![],
        Some(ptr),
        vec![BasicBlock::new(
            Label::NIL,
            vec![
                Invoke {
                    function: Operand::Imm(callee_addr),
                    args: vec![Operand::Imm(size)],
                    dest: Some(0),
                    ty: Some(ptr),
                }
                .into(),
            ],
            Ret {
                value: Some(Operand::Reg(0)),
            },
        )],
    ));
    module
}

/// A module exercising every instruction family, aggregate initializers and
/// a loop:
///
/// ```text
/// %node = type { ptr, i64 }
/// @tail = internal global %node { null, 0 }
/// @head = global %node { @tail, 1 }
///
/// define i64 @walk(ptr %0, i64 %1) {
/// block_0:
///   %2 = icmp eq i64 %1, 0
///   %3 = select %2, ptr %0, ptr @head
///   branch %2, block_1, block_2
/// block_1:
///   %4 = phi ptr [ %3, block_0 ], [ %6, block_1 ]
///   %5 = getelementptr %node, %4, i64 0
///   %6 = load ptr, %5
///   %7 = ptrtoint i64 %6
///   %8 = add i64 %7, %1
///   %9 = icmp eq ptr %6, null
///   branch %9, block_2, block_1
/// block_2:
///   ret %1
/// }
/// ```
pub fn linked_list_module(types: &TypeRegistry) -> Module {
    let mut module = Module::new("linked_list");
    let ptr = types.ptr();
    let i64_ty = types.int(64);
    let node = types.search_or_insert(
        StructType {
            element_types: vec![ptr, i64_ty],
        }
        .into(),
    );

    let tail = module.add_global(GlobalVariable {
        name: "tail".to_string(),
        ty: node,
        initializer: None,
        linkage: Linkage::Internal,
        visibility: Visibility::Default,
        constant: false,
    });
    let head = module.add_global(GlobalVariable {
        name: "head".to_string(),
        ty: node,
        initializer: None,
        linkage: Linkage::External,
        visibility: Visibility::Default,
        constant: false,
    });

    let null = module.constant(types, AnyConst::Null).expect("null");
    let zero = module.constant(types, IConst::from(0u64)).expect("zero");
    let one = module.constant(types, IConst::from(1u64)).expect("one");
    let tail_addr = module
        .constant(types, AnyConst::GlobalAddr(tail))
        .expect("tail address");
    let head_addr = module
        .constant(types, AnyConst::GlobalAddr(head))
        .expect("head address");
    let tail_init = module
        .constant(
            types,
            AnyConst::Aggregate(AggregateConst {
                ty: node,
                elements: vec![null, zero],
            }),
        )
        .expect("tail initializer");
    let head_init = module
        .constant(
            types,
            AnyConst::Aggregate(AggregateConst {
                ty: node,
                elements: vec![tail_addr, one],
            }),
        )
        .expect("head initializer");
    module.globals[tail.index()].initializer = Some(tail_init);
    module.globals[head.index()].initializer = Some(head_init);

    let entry = BasicBlock::new(
        Label::NIL,
        vec![
            ICmp {
                dest: 2,
                ty: i64_ty,
                op: ICmpOp::Eq,
                lhs: Operand::Reg(1),
                rhs: Operand::Imm(zero),
            }
            .into(),
            Select {
                dest: 3,
                condition: Operand::Reg(2),
                true_value: Operand::Reg(0),
                false_value: Operand::Imm(head_addr),
                ty: ptr,
            }
            .into(),
        ],
        CBranch {
            cond: Operand::Reg(2),
            target_true: Label(1),
            target_false: Label(2),
        },
    );
    let body = BasicBlock::new(
        Label(1),
        vec![
            Phi {
                dest: 4,
                ty: ptr,
                values: vec![(Label::NIL, Operand::Reg(3)), (Label(1), Operand::Reg(6))],
            }
            .into(),
            MGetElementPtr {
                dest: 5,
                ty: node,
                base: Operand::Reg(4),
                indices: vec![Operand::Imm(zero)],
            }
            .into(),
            MLoad {
                dest: 6,
                ty: ptr,
                addr: Operand::Reg(5),
                alignment: Some(8),
                ordering: None,
                volatile: false,
            }
            .into(),
            Cast {
                dest: 7,
                op: CastOp::PtrToInt,
                ty: i64_ty,
                value: Operand::Reg(6),
            }
            .into(),
            IArith {
                dest: 8,
                ty: i64_ty,
                op: IArithOp::Add,
                lhs: Operand::Reg(7),
                rhs: Operand::Reg(1),
            }
            .into(),
            ICmp {
                dest: 9,
                ty: ptr,
                op: ICmpOp::Eq,
                lhs: Operand::Reg(6),
                rhs: Operand::Imm(null),
            }
            .into(),
        ],
        CBranch {
            cond: Operand::Reg(9),
            target_true: Label(2),
            target_false: Label(1),
        },
    );
    let exit = BasicBlock::new(
        Label(2),
        vec![],
        Ret {
            value: Some(Operand::Reg(1)),
        },
    );

    module.add_function(define(
        "walk",
        vec![(0, ptr), (1, i64_ty)],
        Some(i64_ty),
        vec![entry, body, exit],
    ));
    module
}

/// Float arithmetic feeding every multi-target terminator shape:
///
/// ```text
/// define void @dispatch(i64 %0, double %1, double %2) {
/// block_0:
///   %3 = fadd double %1, %2
///   %4 = fcmp olt double %3, %1
///   %5 = add i64 %0, 7
///   branch %4, block_1, block_1
/// block_1:
///   switch i64 %5, block_2 [ 7 -> block_2, 9 -> block_3 ]
/// block_2:
///   ret void
/// block_3:
///   trap
/// }
/// ```
pub fn branching_module(types: &TypeRegistry) -> Module {
    let mut module = Module::new("branching");
    let i64_ty = types.int(64);
    let double = types.search_or_insert(FType::Fp64.into());
    let seven = module.constant(types, IConst::from(7u64)).expect("seven");
    let nine = module.constant(types, IConst::from(9u64)).expect("nine");

    let entry = BasicBlock::new(
        Label::NIL,
        vec![
            FArith {
                dest: 3,
                ty: double,
                op: FArithOp::FAdd,
                lhs: Operand::Reg(1),
                rhs: Operand::Reg(2),
            }
            .into(),
            FCmp {
                dest: 4,
                ty: double,
                op: FCmpOp::Olt,
                lhs: Operand::Reg(3),
                rhs: Operand::Reg(1),
            }
            .into(),
            IArith {
                dest: 5,
                ty: i64_ty,
                op: IArithOp::Add,
                lhs: Operand::Reg(0),
                rhs: Operand::Imm(seven),
            }
            .into(),
        ],
        CBranch {
            cond: Operand::Reg(4),
            target_true: Label(1),
            target_false: Label(1),
        },
    );
    let dispatch = BasicBlock::new(
        Label(1),
        vec![],
        Switch {
            value: Operand::Reg(5),
            default: Label(2),
            cases: vec![(seven, Label(2)), (nine, Label(3))],
        },
    );

    module.add_function(define(
        "dispatch",
        vec![(0, i64_ty), (1, double), (2, double)],
        None,
        vec![
            entry,
            dispatch,
            BasicBlock::new(Label(2), vec![], Ret { value: None }),
            BasicBlock::new(Label(3), vec![], Trap),
        ],
    ));
    module
}

/// A function whose only block jumps to itself; used to check successor
/// edges of an unconditional terminator.
pub fn self_loop_function(name: &str) -> Function {
    define(
        name,
        vec![],
        None,
        vec![BasicBlock::new(Label::NIL, vec![], Jump { target: Label::NIL })],
    )
}
