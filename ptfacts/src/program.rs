//! Append-only fact storage.
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::{debug, trace};
use smallvec::SmallVec;
use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::{
    object::ObjectId,
    schema::{Column, Relation, RelationSchema},
};

/// One column of a fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum Term {
    Object(ObjectId),
    Int(i64),
    Str(String),
}

impl Term {
    pub fn column(&self) -> Column {
        match self {
            Term::Object(_) => Column::Object,
            Term::Int(_) => Column::Int,
            Term::Str(_) => Column::Str,
        }
    }
}

impl From<ObjectId> for Term {
    fn from(value: ObjectId) -> Self {
        Term::Object(value)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Int(value)
    }
}

impl From<u32> for Term {
    fn from(value: u32) -> Self {
        Term::Int(value as i64)
    }
}

impl From<usize> for Term {
    fn from(value: usize) -> Self {
        Term::Int(value as i64)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::Str(value.to_string())
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Term::Str(value)
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Object(id) => write!(f, "{}", id.0),
            Term::Int(value) => write!(f, "{}", value),
            // Tabs and newlines would break the row layout.
            Term::Str(value) => {
                for c in value.chars() {
                    match c {
                        '\t' => write!(f, "\\t")?,
                        '\n' => write!(f, "\\n")?,
                        '\\' => write!(f, "\\\\")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// A tuple of terms.
pub type Fact = SmallVec<[Term; 4]>;

/// Build a [`Fact`] from heterogeneous terms.
#[macro_export]
macro_rules! fact {
    ($($term:expr),* $(,)?) => {
        {
            let fact: $crate::program::Fact =
                $crate::smallvec::smallvec![$($crate::program::Term::from($term)),*];
            fact
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("Relation `{name}` is not declared in the schema.")]
    UndeclaredRelation { name: &'static str },

    #[error("Relation `{relation}` expects {expected} column(s) but the fact has {found}.")]
    Arity {
        relation: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Column {position} of relation `{relation}` expects a value of kind {expected:?}, found {found:?}.")]
    ColumnKind {
        relation: &'static str,
        position: usize,
        expected: Column,
        found: Column,
    },
}

/// Relations and their facts, in insertion order per relation.
#[derive(Debug, Clone)]
pub struct FactProgram {
    schema: RelationSchema,
    facts: BTreeMap<&'static str, Vec<Fact>>,
}

impl Default for FactProgram {
    fn default() -> Self {
        Self::new(RelationSchema::standard())
    }
}

impl FactProgram {
    pub fn new(schema: RelationSchema) -> Self {
        Self {
            schema,
            facts: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &RelationSchema {
        &self.schema
    }

    /// Append `fact` to `relation`. The relation must be declared and the
    /// fact must match its columns.
    pub fn append(&mut self, relation: &Relation, fact: Fact) -> Result<(), ProgramError> {
        if !self.schema.contains(relation) {
            return Err(ProgramError::UndeclaredRelation {
                name: relation.name,
            });
        }
        if fact.len() != relation.arity() {
            return Err(ProgramError::Arity {
                relation: relation.name,
                expected: relation.arity(),
                found: fact.len(),
            });
        }
        for (position, (term, expected)) in fact.iter().zip(relation.columns).enumerate() {
            if term.column() != *expected {
                return Err(ProgramError::ColumnKind {
                    relation: relation.name,
                    position,
                    expected: *expected,
                    found: term.column(),
                });
            }
        }

        trace!("{}{:?}", relation.name, fact.as_slice());
        self.facts.entry(relation.name).or_default().push(fact);
        Ok(())
    }

    /// Facts of the relation called `name`, empty if none was appended.
    pub fn relation(&self, name: &str) -> &[Fact] {
        self.facts.get(name).map_or(&[], Vec::as_slice)
    }

    /// Total number of facts.
    pub fn len(&self) -> usize {
        self.facts.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-empty relations in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[Fact])> {
        self.facts
            .iter()
            .map(|(name, facts)| (*name, facts.as_slice()))
    }

    /// Write the facts of `name` as tab-separated rows.
    pub fn write_tsv<W: Write>(&self, name: &str, out: &mut W) -> std::io::Result<()> {
        for fact in self.relation(name) {
            for (i, term) in fact.iter().enumerate() {
                if i > 0 {
                    out.write_all(b"\t")?;
                }
                write!(out, "{}", term)?;
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Write one `<relation>.facts` file per declared relation into `dir`.
    /// Relations without facts get an empty file.
    pub fn write_facts_dir(&self, dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        for relation in self.schema.iter() {
            let path = dir.join(format!("{}.facts", relation.name));
            let mut out = BufWriter::new(File::create(&path)?);
            self.write_tsv(relation.name, &mut out)?;
            out.flush()?;
        }
        debug!(
            "Wrote {} facts for {} relations into {}",
            self.len(),
            self.schema.len(),
            dir.display()
        );
        Ok(())
    }
}
