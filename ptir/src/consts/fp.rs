//! Floating-point constants used as immediate operands.
use crate::types::primary::FType;
use bigdecimal::{BigDecimal, FromPrimitive};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A floating-point literal paired with its `FType`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FConst {
    pub ty: FType,

    /// Literal payload stored as an arbitrary-precision decimal.
    pub value: BigDecimal,
}

impl FConst {
    pub fn new(ty: FType, value: BigDecimal) -> Self {
        Self { ty, value }
    }

    /// Build a double literal. Non-finite inputs collapse to zero.
    pub fn from_f64(value: f64) -> Self {
        Self {
            ty: FType::Fp64,
            value: BigDecimal::from_f64(value).unwrap_or_else(|| BigDecimal::from(0)),
        }
    }
}

impl std::fmt::Display for FConst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.ty, self.value)
    }
}
