//! Analysis configuration.
//!
//! Everything the extractor leaves to the analysis configuration lives here:
//! which special objects occupy the reserved id range, how many affiliated
//! objects an allocation site owns, which arguments are treated as free and
//! how intrinsic matcher conflicts are resolved. A configuration can be built
//! in code or loaded from TOML:
//!
//! ```toml
//! special_objects = ["unknown", "null"]
//! free_arguments = "externally_visible"
//! conflict_policy = "first_match"
//! heap_allocators = ["malloc", "calloc", "realloc"]
//!
//! [affiliated]
//! alloca = 1
//! global = 1
//! ```
use serde::Deserialize;
use strum::EnumIs;
use thiserror::Error;

use crate::object::ObjectId;

/// Name of the special object standing for "any memory the analysis cannot
/// see".
pub const UNKNOWN_OBJECT: &str = "unknown";
/// Name of the special object the null pointer points to.
pub const NULL_OBJECT: &str = "null";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse fact extraction configuration: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    #[error("Special object `{0}` is declared more than once.")]
    DuplicateSpecialObject(String),
}

/// Number of affiliated objects reserved after the base id of an allocation
/// site.
///
/// With a count of zero the allocation site doubles as its own memory object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AffiliatedLayout {
    /// Stack allocations (`alloca`).
    pub alloca: u32,
    /// Global variables.
    pub global: u32,
}

impl Default for AffiliatedLayout {
    fn default() -> Self {
        Self {
            alloca: 1,
            global: 1,
        }
    }
}

/// Which function arguments are considered to originate outside the analyzed
/// unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, EnumIs)]
#[serde(rename_all = "snake_case")]
pub enum FreeArgumentPolicy {
    /// Pointer arguments of defined functions with external linkage: any
    /// caller outside the module may pass anything.
    #[default]
    ExternallyVisible,
    /// Every pointer argument of every defined function.
    AllPointers,
    /// No argument is free.
    Never,
}

/// How the intrinsic registry resolves a call matched by several matchers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, EnumIs)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The first matcher in registration order wins.
    #[default]
    FirstMatch,
    /// A call matched by more than one matcher is an error.
    RejectAmbiguous,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactConfig {
    /// Names of the special objects, in id order. Their count is the size of
    /// the reserved id range.
    pub special_objects: Vec<String>,
    pub affiliated: AffiliatedLayout,
    pub free_arguments: FreeArgumentPolicy,
    pub conflict_policy: ConflictPolicy,
    /// Symbols whose calls return a fresh heap object.
    pub heap_allocators: Vec<String>,
}

impl Default for FactConfig {
    fn default() -> Self {
        Self {
            special_objects: vec![UNKNOWN_OBJECT.to_string(), NULL_OBJECT.to_string()],
            affiliated: AffiliatedLayout::default(),
            free_arguments: FreeArgumentPolicy::default(),
            conflict_policy: ConflictPolicy::default(),
            heap_allocators: ["malloc", "calloc", "realloc", "_Znwm", "_Znam"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl FactConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: FactConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, name) in self.special_objects.iter().enumerate() {
            if self.special_objects[..i].contains(name) {
                return Err(ConfigError::DuplicateSpecialObject(name.clone()));
            }
        }
        Ok(())
    }

    /// Size of the reserved id range.
    pub fn num_special_objects(&self) -> u32 {
        self.special_objects.len() as u32
    }

    /// Reserved id of the special object called `name`, if configured.
    pub fn special_id(&self, name: &str) -> Option<ObjectId> {
        self.special_objects
            .iter()
            .position(|special| special == name)
            .map(|index| ObjectId(index as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_toml_over_defaults() {
        let config = FactConfig::from_toml_str(
            r#"
            free_arguments = "all_pointers"

            [affiliated]
            alloca = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.free_arguments, FreeArgumentPolicy::AllPointers);
        assert_eq!(config.affiliated.alloca, 2);
        assert_eq!(config.affiliated.global, 1);
        assert_eq!(config.num_special_objects(), 2);
        assert_eq!(config.special_id(NULL_OBJECT), Some(ObjectId(1)));
    }

    #[test]
    fn rejects_unknown_keys_and_duplicates() {
        assert!(matches!(
            FactConfig::from_toml_str("bogus = 1"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            FactConfig::from_toml_str(r#"special_objects = ["unknown", "unknown"]"#),
            Err(ConfigError::DuplicateSpecialObject(name)) if name == "unknown"
        ));
    }
}
