//! Relation declarations.
//!
//! Every relation the walker may emit is declared here with its column
//! layout. A [`FactProgram`](crate::program::FactProgram) only accepts
//! tuples for declared relations, with matching arity and column kinds.
use std::collections::BTreeMap;

use strum::IntoStaticStr;

/// Kind of value stored in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Column {
    /// An [`ObjectId`](crate::object::ObjectId).
    Object,
    Int,
    Str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Relation {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Relation {
    pub fn arity(&self) -> usize {
        self.columns.len()
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let column: &'static str = column.into();
            write!(f, "{}", column)?;
        }
        write!(f, ")")
    }
}

macro_rules! declare_relations {
    (
        $(
            $(#[$doc:meta])*
            $ident:ident = $name:literal ( $($column:ident),* );
        )*
    ) => {
        $(
            $(#[$doc])*
            pub const $ident: Relation = Relation {
                name: $name,
                columns: &[$(Column::$column),*],
            };
        )*

        /// Every relation emitted by the walker, in declaration order.
        pub const STANDARD: &[Relation] = &[$($ident),*];
    };
}

/// The relations emitted by [`FactWalker`](crate::walker::FactWalker).
pub mod rel {
    use super::{Column, Relation};

    declare_relations! {
        /// `special_object(id, name)`
        SPECIAL_OBJECT = "special_object"(Object, Str);
        /// `module(name)`
        MODULE = "module"(Str);

        /// `global(global, name)`
        GLOBAL = "global"(Object, Str);
        /// `global_init(storage, value)`: initial content of a global's
        /// storage.
        GLOBAL_INIT = "global_init"(Object, Object);
        /// `function(function, name)`
        FUNCTION = "function"(Object, Str);
        /// `function_decl(function)`: defined outside the module.
        FUNCTION_DECL = "function_decl"(Object);
        /// `function_entry(function, block)`
        FUNCTION_ENTRY = "function_entry"(Object, Object);
        /// `argument(function, position, argument)`
        ARGUMENT = "argument"(Object, Int, Object);
        /// `free_argument(argument)`: may point to anything the analyzed
        /// unit cannot see.
        FREE_ARGUMENT = "free_argument"(Object);
        /// `block(block, function)`
        BLOCK = "block"(Object, Object);
        /// `successor(block, successor)`
        SUCCESSOR = "successor"(Object, Object);

        /// `instr(instr, opcode, block)`
        INSTR = "instr"(Object, Str, Object);
        /// `value_type(value, type)`
        VALUE_TYPE = "value_type"(Object, Str);
        /// `pointer_value(value)`: the value's type holds a pointer.
        POINTER_VALUE = "pointer_value"(Object);
        /// `operand(user, position, value)`
        OPERAND = "operand"(Object, Int, Object);

        /// `constant(constant, kind)`
        CONSTANT = "constant"(Object, Str);
        /// `const_element(aggregate, position, element)`
        CONST_ELEMENT = "const_element"(Object, Int, Object);

        /// `memory_object(object, kind)`: `stack`, `global`, `heap` or
        /// `function`.
        MEMORY_OBJECT = "memory_object"(Object, Str);
        /// `object_type(object, type)`
        OBJECT_TYPE = "object_type"(Object, Str);
        /// `address_of(pointer, object)`: `pointer` holds the address of
        /// `object`.
        ADDRESS_OF = "address_of"(Object, Object);

        /// `load(dest, address)`
        LOAD = "load"(Object, Object);
        /// `store(instr, address, value)`
        STORE = "store"(Object, Object, Object);
        /// `element_addr(dest, base)`: address derived from `base`.
        ELEMENT_ADDR = "element_addr"(Object, Object);
        /// `move(dest, source)`: `dest` holds the same pointer as `source`.
        MOVE = "move"(Object, Object);
        /// `phi(dest, block, incoming)`
        PHI = "phi"(Object, Object, Object);
        /// `unknown_source(value, object)`: the pointer came from somewhere
        /// the extractor cannot follow.
        UNKNOWN_SOURCE = "unknown_source"(Object, Object);

        /// `call(instr, callee)`
        CALL = "call"(Object, Object);
        /// `call_arg(instr, position, value)`
        CALL_ARG = "call_arg"(Object, Int, Object);
        /// `call_return(instr)`: the call produces a pointer.
        CALL_RETURN = "call_return"(Object);
        /// `return(function, value)`
        RETURN = "return"(Object, Object);

        /// `heap_alloc(instr, object)`
        HEAP_ALLOC = "heap_alloc"(Object, Object);
        /// `mem_copy(instr, destination, source)`
        MEM_COPY = "mem_copy"(Object, Object, Object);
    }
}

/// Set of declared relations, by name.
#[derive(Debug, Clone, Default)]
pub struct RelationSchema {
    relations: BTreeMap<&'static str, Relation>,
}

impl RelationSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema holding every relation the walker emits.
    pub fn standard() -> Self {
        let mut schema = Self::new();
        for relation in rel::STANDARD {
            schema.declare(*relation);
        }
        schema
    }

    /// Declare `relation`, replacing any previous declaration with the same
    /// name.
    pub fn declare(&mut self, relation: Relation) -> &mut Self {
        self.relations.insert(relation.name, relation);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn contains(&self, relation: &Relation) -> bool {
        self.relations.get(relation.name) == Some(relation)
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Declared relations in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_schema_declares_unique_names() {
        let schema = RelationSchema::standard();
        assert_eq!(schema.len(), rel::STANDARD.len());
        assert_eq!(schema.get("store").map(Relation::arity), Some(3));
        assert!(schema.contains(&rel::ADDRESS_OF));
    }

    #[test]
    fn relations_display_their_columns() {
        assert_eq!(rel::ARGUMENT.to_string(), "argument(object, int, object)");
    }
}
