#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

/// Represents an integer type with a specific bit width.
///
/// Signedness is not represented here; instructions that operate on signed
/// integers interpret the bits accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct IType {
    num_bits: u32,
}

impl IType {
    pub const I1: Self = Self { num_bits: 1 };
    pub const I8: Self = Self { num_bits: 8 };
    pub const I16: Self = Self { num_bits: 16 };
    pub const I32: Self = Self { num_bits: 32 };
    pub const I64: Self = Self { num_bits: 64 };
    pub const I128: Self = Self { num_bits: 128 };
    pub const MAX_BITS: u32 = (1 << 23) - 1;

    /// Creates a new `IType` with the specified number of bits.
    #[inline]
    pub const fn new(num_bits: u32) -> Option<Self> {
        if num_bits >= 1 && num_bits <= Self::MAX_BITS {
            Some(Self { num_bits })
        } else {
            None
        }
    }

    #[inline]
    pub const fn num_bits(&self) -> u32 {
        self.num_bits
    }
}

impl std::fmt::Display for IType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.num_bits)
    }
}

/// Represents a floating-point type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FType {
    /// IEEE-754 binary16
    Fp16,
    /// 16-bit "brain" float, same exponent range as `Fp32`.
    Bf16,
    /// IEEE-754 binary32
    Fp32,
    /// IEEE-754 binary64
    Fp64,
    /// IEEE-754 binary128
    Fp128,
    /// X87 extended precision
    X86Fp80,
}

impl std::fmt::Display for FType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FType::Fp16 => "half",
            FType::Bf16 => "bfloat",
            FType::Fp32 => "float",
            FType::Fp64 => "double",
            FType::Fp128 => "fp128",
            FType::X86Fp80 => "x86_fp80",
        };
        write!(f, "{}", s)
    }
}

/// Opaque pointer type.
///
/// Pointers carry no pointee type; instructions that dereference them state
/// the accessed type themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PtrType;

impl std::fmt::Display for PtrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ptr")
    }
}

/// Element type of a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumTryAs, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PrimaryBasicType {
    Int(IType),
    Float(FType),
    Ptr(PtrType),
}

impl std::fmt::Display for PrimaryBasicType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryBasicType::Int(itype) => itype.fmt(f),
            PrimaryBasicType::Float(ftype) => ftype.fmt(f),
            PrimaryBasicType::Ptr(ptrtype) => ptrtype.fmt(f),
        }
    }
}

/// Fixed-size SIMD vector of a basic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VcType {
    pub ty: PrimaryBasicType,
    pub size: u16,
}

impl std::fmt::Display for VcType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} x {}>", self.size, self.ty)
    }
}

/// The label type represents code labels (basic block addresses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LblType;

impl std::fmt::Display for LblType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "label")
    }
}

/// Represents any non-composite type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PrimaryType {
    Int(IType),
    Float(FType),
    Ptr(PtrType),
    Vc(VcType),
    Lbl(LblType),
}

macro_rules! primary_type_from {
    ($typ:ty, $lbl:ident) => {
        impl From<$typ> for PrimaryType {
            fn from(value: $typ) -> Self {
                PrimaryType::$lbl(value)
            }
        }
    };
}

primary_type_from! { IType, Int }
primary_type_from! { FType, Float }
primary_type_from! { PtrType, Ptr }
primary_type_from! { VcType, Vc }
primary_type_from! { LblType, Lbl }

impl std::fmt::Display for PrimaryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryType::Int(itype) => itype.fmt(f),
            PrimaryType::Float(ftype) => ftype.fmt(f),
            PrimaryType::Ptr(ptr_type) => ptr_type.fmt(f),
            PrimaryType::Vc(vc_type) => vc_type.fmt(f),
            PrimaryType::Lbl(lbl_type) => lbl_type.fmt(f),
        }
    }
}
