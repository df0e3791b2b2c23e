//! Type and argument classification.
use std::{cell::RefCell, collections::HashMap};

use ptir::{
    modules::Function,
    types::{
        AnyType, TypeRegistry, Typeref,
        primary::{PrimaryBasicType, PrimaryType, VcType},
    },
};

use crate::config::FreeArgumentPolicy;

/// Answers "can a value of this type hold a pointer?", memoised per type.
pub struct PointerClassifier<'t> {
    types: &'t TypeRegistry,
    memo: RefCell<HashMap<Typeref, bool>>,
}

impl<'t> PointerClassifier<'t> {
    pub fn new(types: &'t TypeRegistry) -> Self {
        Self {
            types,
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// Pointers, vectors of pointers, and arrays or structs with such an
    /// element anywhere inside.
    pub fn contains_pointer(&self, ty: Typeref) -> bool {
        if let Some(known) = self.memo.borrow().get(&ty) {
            return *known;
        }

        // Clone so the registry lock is released before recursing.
        let resolved = self.types.get(ty).map(|guard| (*guard).clone());
        let result = match resolved {
            Some(AnyType::Primary(PrimaryType::Ptr(_))) => true,
            Some(AnyType::Primary(PrimaryType::Vc(VcType {
                ty: PrimaryBasicType::Ptr(_),
                ..
            }))) => true,
            Some(AnyType::Primary(_)) | None => false,
            Some(aggregate) => aggregate
                .children()
                .iter()
                .any(|child| self.contains_pointer(*child)),
        };

        self.memo.borrow_mut().insert(ty, result);
        result
    }
}

/// Whether a parameter of `function` whose type may hold a pointer is an
/// unconstrained points-to source under `policy`. Parameters of declarations
/// never are, their values are not observed.
pub fn is_free_argument(policy: FreeArgumentPolicy, function: &Function, holds_pointer: bool) -> bool {
    if function.is_declaration() || !holds_pointer {
        return false;
    }
    match policy {
        FreeArgumentPolicy::ExternallyVisible => function.linkage.is_externally_visible(),
        FreeArgumentPolicy::AllPointers => true,
        FreeArgumentPolicy::Never => false,
    }
}

#[cfg(test)]
mod tests {
    use ptir::{
        modules::symbol::Linkage,
        tests_utils::self_loop_function,
        types::{
            aggregate::{ArrayType, StructType},
            primary::{FType, IType, PtrType},
        },
    };

    use super::*;

    #[test]
    fn pointers_are_found_through_nested_aggregates() {
        let types = TypeRegistry::new();
        let i64_ty = types.int(64);
        let f32_ty = types.search_or_insert(FType::Fp32.into());
        let flat = types.search_or_insert(
            StructType {
                element_types: vec![i64_ty, f32_ty],
            }
            .into(),
        );
        let inner = types.search_or_insert(
            StructType {
                element_types: vec![i64_ty, types.ptr()],
            }
            .into(),
        );
        let nested = types.search_or_insert(
            ArrayType {
                ty: inner,
                num_elements: 3,
            }
            .into(),
        );
        let ptr_vector = types.search_or_insert(
            VcType {
                ty: PrimaryBasicType::Ptr(PtrType),
                size: 4,
            }
            .into(),
        );
        let int_vector = types.search_or_insert(
            VcType {
                ty: PrimaryBasicType::Int(IType::I8),
                size: 16,
            }
            .into(),
        );

        let classifier = PointerClassifier::new(&types);
        assert!(classifier.contains_pointer(types.ptr()));
        assert!(classifier.contains_pointer(nested));
        assert!(classifier.contains_pointer(ptr_vector));
        assert!(!classifier.contains_pointer(flat));
        assert!(!classifier.contains_pointer(int_vector));
        assert!(classifier.contains_pointer(nested), "memoised answer is stable");
    }

    #[test]
    fn free_argument_policies() {
        let mut exported = self_loop_function("exported");
        let declared = Function::declaration("declared", vec![], None);

        use FreeArgumentPolicy::*;
        assert!(is_free_argument(ExternallyVisible, &exported, true));
        assert!(!is_free_argument(ExternallyVisible, &exported, false));
        assert!(!is_free_argument(Never, &exported, true));
        assert!(!is_free_argument(AllPointers, &declared, true));

        exported.linkage = Linkage::Internal;
        assert!(!is_free_argument(ExternallyVisible, &exported, true));
        assert!(is_free_argument(AllPointers, &exported, true));
    }
}
