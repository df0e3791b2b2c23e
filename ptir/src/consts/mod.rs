//! Constants
//!
//! Constants are interned in a per-module [`ConstantPool`]: structurally
//! identical constants share one [`ConstId`], so a constant referenced from
//! many instructions is still a single entity. Aggregate constants refer to
//! their elements by id, which makes every constant a node of a DAG rooted in
//! the pool.
use std::collections::HashMap;

use log::trace;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumDiscriminants, EnumIs, EnumTryAs, IntoStaticStr};

use crate::{
    consts::{fp::FConst, int::IConst},
    modules::symbol::{FunctionId, GlobalId},
    types::{TypeRegistry, Typeref},
    utils::Error,
};

pub mod fp;
pub mod int;

/// Handle of a constant inside its module's [`ConstantPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstId(pub u32);

impl ConstId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ConstId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@const.{}", self.0)
    }
}

/// Aggregate initializer (`{ ... }` for structs, `[ ... ]` for arrays).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggregateConst {
    pub ty: Typeref,
    pub elements: Vec<ConstId>,
}

/// Constant address computation into an aggregate, the constant-expression
/// form of `getelementptr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementAddrConst {
    pub base: ConstId,
    /// Type the indices step through.
    pub ty: Typeref,
    pub indices: Vec<u64>,
}

/// Any constant value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(ConstKind), derive(IntoStaticStr))]
#[strum_discriminants(strum(serialize_all = "snake_case"))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnyConst {
    Int(IConst),
    Float(FConst),
    /// The null pointer.
    Null,
    /// Undefined value of the given type.
    Undef(Typeref),
    /// All-zero value of the given type.
    Zero(Typeref),
    /// Address of a global variable.
    GlobalAddr(GlobalId),
    /// Address of a function.
    FunctionAddr(FunctionId),
    Aggregate(AggregateConst),
    ElementAddr(ElementAddrConst),
}

impl AnyConst {
    pub fn kind(&self) -> ConstKind {
        self.into()
    }

    /// Constants this constant is built from.
    pub fn children(&self) -> &[ConstId] {
        match self {
            AnyConst::Aggregate(aggregate) => &aggregate.elements,
            AnyConst::ElementAddr(addr) => std::slice::from_ref(&addr.base),
            _ => &[],
        }
    }
}

impl From<IConst> for AnyConst {
    fn from(value: IConst) -> Self {
        AnyConst::Int(value)
    }
}

impl From<FConst> for AnyConst {
    fn from(value: FConst) -> Self {
        AnyConst::Float(value)
    }
}

/// A constant together with its static type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PooledConst {
    pub value: AnyConst,
    pub ty: Typeref,
}

/// Interning storage for the constants of one module.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstantPool {
    entries: Vec<PooledConst>,
    lookup: HashMap<AnyConst, ConstId>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `value`, inserting it if needed.
    ///
    /// Fails if `value` refers to a constant id not allocated by this pool.
    pub fn intern(&mut self, types: &TypeRegistry, value: AnyConst) -> Result<ConstId, Error> {
        if let Some(id) = self.lookup.get(&value) {
            return Ok(*id);
        }

        if let Some(missing) = value.children().iter().find(|c| c.index() >= self.entries.len()) {
            return Err(Error::UndefinedConstant { undefined: *missing });
        }

        let ty = match &value {
            AnyConst::Int(iconst) => types.search_or_insert(iconst.ty.into()),
            AnyConst::Float(fconst) => types.search_or_insert(fconst.ty.into()),
            AnyConst::Null
            | AnyConst::GlobalAddr(_)
            | AnyConst::FunctionAddr(_)
            | AnyConst::ElementAddr(_) => types.ptr(),
            AnyConst::Undef(ty) | AnyConst::Zero(ty) => *ty,
            AnyConst::Aggregate(aggregate) => aggregate.ty,
        };

        let id = ConstId(self.entries.len() as u32);
        trace!("Interned constant {:?} as {}", value, id);
        self.lookup.insert(value.clone(), id);
        self.entries.push(PooledConst { value, ty });
        Ok(id)
    }

    pub fn get(&self, id: ConstId) -> Option<&PooledConst> {
        self.entries.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstId, &PooledConst)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (ConstId(i as u32), entry))
    }
}
