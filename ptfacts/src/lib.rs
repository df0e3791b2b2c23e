//! Points-to fact extraction.
//!
//! Turns a [`ptir`] module into a database of relational facts for a
//! Datalog-style points-to solver. Identities are assigned by an
//! [`object::ObjectIndex`] during a registration pass, then a single
//! [`walker::FactWalker`] traversal appends facts to a
//! [`program::FactProgram`]:
//!
//! ```rust
//! # use ptfacts::{config::FactConfig, intrinsic::IntrinsicRegistry, program::FactProgram, walker::FactWalker};
//! # use ptir::{modules::Module, types::TypeRegistry};
//! let types = TypeRegistry::new();
//! let module = Module::new("empty");
//! let config = FactConfig::default();
//! let intrinsics = IntrinsicRegistry::with_defaults(&config);
//!
//! let mut walker = FactWalker::new(&module, &types, config, intrinsics)?;
//! let mut program = FactProgram::default();
//! walker.generate_facts(&mut program)?;
//! assert_eq!(program.relation("special_object").len(), 2);
//! # Ok::<(), ptfacts::FactError>(())
//! ```
use thiserror::Error;

pub mod config;
pub mod intrinsic;
pub mod object;
pub mod program;
pub mod schema;
pub mod walker;

#[doc(hidden)]
pub use smallvec;

#[derive(Debug, Error)]
pub enum FactError {
    #[error(transparent)]
    Index(#[from] object::IndexError),

    #[error(transparent)]
    Program(#[from] program::ProgramError),

    #[error(transparent)]
    Intrinsic(#[from] intrinsic::IntrinsicError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("Invalid module: {0}")]
    Ir(#[from] ptir::utils::Error),
}

pub type FactResult<T> = Result<T, FactError>;
