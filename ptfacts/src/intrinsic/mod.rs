//! Call matchers taking over fact emission for well-known functions.
//!
//! The walker consults an [`IntrinsicRegistry`] for every call. A matcher
//! recognizing the call decides how many affiliated objects the call owns
//! (an allocator returns one fresh heap object, for instance) and later emits
//! the facts of the call in place of the generic `call` facts.
//!
//! Registries are built explicitly and handed to the walker:
//!
//! ```rust
//! # use ptfacts::{config::{ConflictPolicy, FactConfig}, intrinsic::{IntrinsicRegistry, HeapAllocator}};
//! let registry = IntrinsicRegistry::new(ConflictPolicy::RejectAmbiguous)
//!     .with(HeapAllocator::new(["my_alloc"]));
//! assert_eq!(registry.len(), 1);
//!
//! let defaults = IntrinsicRegistry::with_defaults(&FactConfig::default());
//! assert_eq!(defaults.names().collect::<Vec<_>>(), vec!["heap_allocator", "memory_copy"]);
//! ```
use log::debug;
use ptir::{
    consts::AnyConst,
    modules::{Function, Module, misc::Invoke, operand::Operand, symbol::FunctionId},
    value::InstrRef,
};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    FactResult,
    config::{ConflictPolicy, FactConfig},
    object::ObjectId,
    program::FactProgram,
    walker::FactWalker,
};

mod heap;
mod memcpy;

pub use heap::HeapAllocator;
pub use memcpy::MemoryCopy;

/// A call as seen by the matchers.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'m> {
    pub at: InstrRef,
    pub invoke: &'m Invoke,
    /// Statically known callee, for direct calls.
    pub callee: Option<(FunctionId, &'m Function)>,
}

impl<'m> CallSite<'m> {
    pub fn new(module: &'m Module, at: InstrRef, invoke: &'m Invoke) -> Self {
        let callee = match invoke.function {
            Operand::Imm(constant) => match module.constants.get(constant).map(|c| &c.value) {
                Some(AnyConst::FunctionAddr(id)) => module.function(*id).map(|f| (*id, f)),
                _ => None,
            },
            _ => None,
        };
        Self { at, invoke, callee }
    }

    /// Name of the direct callee.
    pub fn callee_name(&self) -> Option<&'m str> {
        self.callee.map(|(_, function)| function.name.as_str())
    }

    pub fn is_direct(&self) -> bool {
        self.callee.is_some()
    }
}

/// Outcome of a successful match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchResult {
    /// Number of affiliated objects reserved after the call's id.
    pub affiliated: u32,
}

/// Identities of a call and of its operands, resolved by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCall {
    pub id: ObjectId,
    pub callee: ObjectId,
    pub args: SmallVec<[ObjectId; 4]>,
}

pub trait IntrinsicCall {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Decide whether this matcher handles `site`. Called once per call,
    /// before any identity is assigned.
    fn matches(&self, site: &CallSite<'_>) -> Option<MatchResult>;

    /// Emit the facts of a call previously accepted by [`Self::matches`].
    /// The generic operand facts have already been emitted.
    fn generate(
        &self,
        walker: &FactWalker<'_>,
        program: &mut FactProgram,
        site: &CallSite<'_>,
        call: &ResolvedCall,
    ) -> FactResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntrinsicError {
    #[error("Call `{call}` is matched by several intrinsics: {}.", .matchers.join(", "))]
    Ambiguous { call: String, matchers: Vec<String> },
}

/// Ordered collection of matchers plus the policy resolving overlaps.
pub struct IntrinsicRegistry {
    policy: ConflictPolicy,
    matchers: Vec<Box<dyn IntrinsicCall>>,
}

impl std::fmt::Debug for IntrinsicRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntrinsicRegistry")
            .field("policy", &self.policy)
            .field("matchers", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for IntrinsicRegistry {
    fn default() -> Self {
        Self::new(ConflictPolicy::default())
    }
}

impl IntrinsicRegistry {
    /// Empty registry: every call takes the generic path.
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            matchers: Vec::new(),
        }
    }

    /// Registry holding the bundled matchers, configured from `config`.
    pub fn with_defaults(config: &FactConfig) -> Self {
        Self::new(config.conflict_policy)
            .with(HeapAllocator::new(config.heap_allocators.iter().cloned()))
            .with(MemoryCopy::default())
    }

    /// Append a matcher. Earlier matchers take precedence under
    /// [`ConflictPolicy::FirstMatch`].
    pub fn register(&mut self, matcher: Box<dyn IntrinsicCall>) -> &mut Self {
        self.matchers.push(matcher);
        self
    }

    pub fn with(mut self, matcher: impl IntrinsicCall + 'static) -> Self {
        self.register(Box::new(matcher));
        self
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn get(&self, position: usize) -> Option<&dyn IntrinsicCall> {
        self.matchers.get(position).map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.matchers.iter().map(|matcher| matcher.name())
    }

    /// Find the matcher handling `site`, returning its position in the
    /// registry.
    pub fn resolve(&self, site: &CallSite<'_>) -> Result<Option<(usize, MatchResult)>, IntrinsicError> {
        let mut found: Option<(usize, MatchResult)> = None;
        for (position, matcher) in self.matchers.iter().enumerate() {
            let Some(result) = matcher.matches(site) else {
                continue;
            };
            if found.is_some() {
                return Err(IntrinsicError::Ambiguous {
                    call: site.callee_name().unwrap_or("<indirect>").to_string(),
                    matchers: self
                        .matchers
                        .iter()
                        .filter(|m| m.matches(site).is_some())
                        .map(|m| m.name().to_string())
                        .collect(),
                });
            }
            found = Some((position, result));
            if self.policy.is_first_match() {
                break;
            }
        }

        if let Some((position, _)) = found {
            debug!(
                "Call to `{}` matched intrinsic `{}`",
                site.callee_name().unwrap_or("<indirect>"),
                self.matchers[position].name()
            );
        }
        Ok(found)
    }
}
