use num_bigint::BigInt;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::primary::IType;

/// Integer literal paired with its `IType`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IConst {
    pub ty: IType,
    pub value: BigInt,
}

impl IConst {
    pub fn new(ty: IType, value: impl Into<BigInt>) -> Self {
        Self {
            ty,
            value: value.into(),
        }
    }
}

macro_rules! iconst_from {
    ($prim:ty, $ity:expr) => {
        impl From<$prim> for IConst {
            fn from(value: $prim) -> Self {
                Self {
                    ty: $ity,
                    value: value.into(),
                }
            }
        }
    };
}

iconst_from!(u8, IType::I8);
iconst_from!(u16, IType::I16);
iconst_from!(u32, IType::I32);
iconst_from!(u64, IType::I64);
iconst_from!(i32, IType::I32);
iconst_from!(i64, IType::I64);

impl From<bool> for IConst {
    fn from(value: bool) -> Self {
        Self {
            ty: IType::I1,
            value: u8::from(value).into(),
        }
    }
}

impl std::fmt::Display for IConst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.ty, self.value)
    }
}
