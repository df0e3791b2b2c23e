//! Module-level symbols: handles for globals and functions plus their linkage
//! and visibility.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle of a global variable in its module (position in `Module::globals`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlobalId(pub u32);

/// Handle of a function in its module (position in `Module::functions`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionId(pub u32);

impl GlobalId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FunctionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// All global variables and functions have one of the following linkages.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Linkage {
    /// Only directly accessible by objects in the current module, and absent
    /// from the object file symbol table.
    #[default]
    Private,

    /// Like `Private`, but shows up as a local symbol (C `static`).
    Internal,

    /// May be referenced by, and defined in, other modules.
    External,
}

impl Linkage {
    /// Whether code outside the module can name the symbol.
    pub fn is_externally_visible(self) -> bool {
        matches!(self, Linkage::External)
    }
}

/// Symbol visibility styles. A symbol with private or internal linkage must
/// have default visibility.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Visibility {
    /// Visible to other modules and, in shared libraries, overridable.
    #[default]
    Default,

    /// Not placed in the dynamic symbol table.
    Hidden,

    /// In the dynamic symbol table, but local references bind locally.
    Protected,
}
