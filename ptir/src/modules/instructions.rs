use auto_enums::auto_enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumDiscriminants, EnumIs, EnumTryAs, IntoStaticStr};

use crate::{
    modules::{
        Instruction, fp, int, mem, misc,
        operand::{Name, Operand},
    },
    types::{TypeRegistry, Typeref},
};

/// Discriminated union covering all non-terminator instruction kinds.
///
/// The generated [`InstrOp`] discriminant (via `strum`) is used for fast
/// classification and provides the opcode mnemonic.
#[derive(Debug, Clone, Hash, PartialEq, Eq, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(InstrOp), derive(Hash, IntoStaticStr))]
#[strum_discriminants(strum(serialize_all = "lowercase"))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Instr {
    // Integer instructions
    IArith(int::IArith),
    ICmp(int::ICmp),

    // Floating-point instructions
    FArith(fp::FArith),
    FCmp(fp::FCmp),

    // Memory instructions
    MLoad(mem::MLoad),
    MStore(mem::MStore),
    MAlloca(mem::MAlloca),
    MGetElementPtr(mem::MGetElementPtr),

    // Other instructions
    Invoke(misc::Invoke),
    Phi(misc::Phi),
    Select(misc::Select),
    Cast(misc::Cast),
}

impl Instr {
    pub fn op(&self) -> InstrOp {
        self.into()
    }

    /// Mnemonic of the instruction (`malloca`, `invoke`, ...).
    pub fn opcode(&self) -> &'static str {
        self.op().into()
    }
}

macro_rules! define_instr_any_instr {
    (
        $($variant:ident),*
    ) => {
        impl Instruction for Instr {
            #[auto_enum(Iterator)]
            fn operands(&self) -> impl Iterator<Item = &Operand> {
                match self {
                    $(
                        Instr::$variant(instr) => instr.operands(),
                    )*
                }
            }

            fn destination(&self) -> Option<Name> {
                match self {
                    $(
                        Instr::$variant(instr) => instr.destination(),
                    )*
                }
            }

            fn destination_type(&self, types: &TypeRegistry) -> Option<Typeref> {
                match self {
                    $(
                        Instr::$variant(instr) => instr.destination_type(types),
                    )*
                }
            }
        }
    };
}

define_instr_any_instr! {
    IArith,
    ICmp,
    FArith,
    FCmp,
    MLoad,
    MStore,
    MAlloca,
    MGetElementPtr,
    Invoke,
    Phi,
    Select,
    Cast
}

macro_rules! define_instr_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Instr {
            fn from(inst: $typ) -> Self {
                Instr::$variant(inst)
            }
        }
    };
}

define_instr_from!(int::IArith, IArith);
define_instr_from!(int::ICmp, ICmp);
define_instr_from!(fp::FArith, FArith);
define_instr_from!(fp::FCmp, FCmp);
define_instr_from!(mem::MLoad, MLoad);
define_instr_from!(mem::MStore, MStore);
define_instr_from!(mem::MAlloca, MAlloca);
define_instr_from!(mem::MGetElementPtr, MGetElementPtr);
define_instr_from!(misc::Invoke, Invoke);
define_instr_from!(misc::Phi, Phi);
define_instr_from!(misc::Select, Select);
define_instr_from!(misc::Cast, Cast);
