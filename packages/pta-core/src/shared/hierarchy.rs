//! Class-hierarchy and virtual-dispatch oracle
//!
//! A cheap read-only view over [`Program`] answering the two questions the
//! solver asks: "is `sub` assignable to `sup`?" and "which concrete method
//! does this receiver type dispatch `sig` to?". Dispatch returning `None`
//! is tolerated by the solver (the call edge is skipped), so an incomplete
//! class universe degrades soundness, never crashes.

use crate::shared::ir::{ClassId, MethodId, Program, TypeId, TypeKind};

#[derive(Debug, Clone, Copy)]
pub struct ClassHierarchy<'p> {
    program: &'p Program,
}

impl<'p> ClassHierarchy<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// Resolve the concrete method a call with signature `sig` dispatches
    /// to on a receiver of type `ty`, walking the superclass chain.
    pub fn dispatch(&self, ty: TypeId, sig: &str) -> Option<MethodId> {
        let class = match self.program.type_kind(ty) {
            TypeKind::Class(c) => c,
            // Arrays inherit their methods from the hierarchy root
            TypeKind::Array(_) => self.root_class()?,
        };
        self.dispatch_in_class(class, sig)
    }

    fn dispatch_in_class(&self, class: ClassId, sig: &str) -> Option<MethodId> {
        let mut current = Some(class);
        while let Some(c) = current {
            let data = self.program.class(c);
            for &m in &data.methods {
                let method = self.program.method(m);
                if method.sig == sig && !method.is_abstract {
                    return Some(m);
                }
            }
            current = data.superclass;
        }
        None
    }

    /// Subtype check, including interface implementation and array element
    /// covariance. Arrays are subtypes of the hierarchy root class.
    pub fn is_subtype(&self, sup: TypeId, sub: TypeId) -> bool {
        if sup == sub {
            return true;
        }
        match (self.program.type_kind(sup), self.program.type_kind(sub)) {
            (TypeKind::Class(sup_c), TypeKind::Class(sub_c)) => self.is_subclass(sup_c, sub_c),
            (TypeKind::Array(sup_elem), TypeKind::Array(sub_elem)) => {
                self.is_subtype(sup_elem, sub_elem)
            }
            (TypeKind::Class(sup_c), TypeKind::Array(_)) => Some(sup_c) == self.root_class(),
            (TypeKind::Array(_), TypeKind::Class(_)) => false,
        }
    }

    fn is_subclass(&self, sup: ClassId, sub: ClassId) -> bool {
        if sup == sub {
            return true;
        }
        let data = self.program.class(sub);
        if data.interfaces.iter().any(|i| self.is_subclass(sup, *i)) {
            return true;
        }
        match data.superclass {
            Some(parent) => self.is_subclass(sup, parent),
            None => false,
        }
    }

    /// The root of the class hierarchy: the unique non-interface class
    /// with no superclass, if the program declares exactly one.
    fn root_class(&self) -> Option<ClassId> {
        let mut root = None;
        for (id, data) in self.program.classes() {
            if data.superclass.is_none() && !data.is_interface {
                if root.is_some() {
                    return None;
                }
                root = Some(id);
            }
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::ProgramBuilder;

    fn diamond() -> (Program, TypeId, TypeId, TypeId, MethodId, MethodId) {
        // Object <- B (abstract foo) <- C, D (override foo)
        let mut b = ProgramBuilder::new();
        let object = b.class("Object", None);
        let base = b.class("B", Some(object));
        let c = b.class("C", Some(base));
        let d = b.class("D", Some(base));
        b.abstract_method(base, "foo()");
        let c_foo = b.method(c, "foo()", false);
        let d_foo = b.method(d, "foo()", false);
        let b_ty = b.class_type(base);
        let c_ty = b.class_type(c);
        let d_ty = b.class_type(d);
        (b.build(), b_ty, c_ty, d_ty, c_foo, d_foo)
    }

    #[test]
    fn test_dispatch_picks_override() {
        let (program, _b_ty, c_ty, d_ty, c_foo, d_foo) = diamond();
        let hierarchy = ClassHierarchy::new(&program);
        assert_eq!(hierarchy.dispatch(c_ty, "foo()"), Some(c_foo));
        assert_eq!(hierarchy.dispatch(d_ty, "foo()"), Some(d_foo));
    }

    #[test]
    fn test_dispatch_skips_abstract() {
        let (program, b_ty, _, _, _, _) = diamond();
        let hierarchy = ClassHierarchy::new(&program);
        // No concrete implementor on the static type itself
        assert_eq!(hierarchy.dispatch(b_ty, "foo()"), None);
    }

    #[test]
    fn test_subtype_chain() {
        let (program, b_ty, c_ty, d_ty, _, _) = diamond();
        let hierarchy = ClassHierarchy::new(&program);
        assert!(hierarchy.is_subtype(b_ty, c_ty));
        assert!(hierarchy.is_subtype(b_ty, d_ty));
        assert!(!hierarchy.is_subtype(c_ty, b_ty));
        assert!(!hierarchy.is_subtype(c_ty, d_ty));
    }

    #[test]
    fn test_interface_subtype() {
        let mut b = ProgramBuilder::new();
        let object = b.class("Object", None);
        let iface = b.interface("I");
        let impl_class = b.class("Impl", Some(object));
        b.implements(impl_class, iface);
        let i_ty = b.class_type(iface);
        let impl_ty = b.class_type(impl_class);
        let program = b.build();
        let hierarchy = ClassHierarchy::new(&program);
        assert!(hierarchy.is_subtype(i_ty, impl_ty));
    }

    #[test]
    fn test_array_covariance() {
        let mut b = ProgramBuilder::new();
        let object = b.class("Object", None);
        let a = b.class("A", Some(object));
        let obj_ty = b.class_type(object);
        let a_ty = b.class_type(a);
        let obj_arr = b.array_type(obj_ty);
        let a_arr = b.array_type(a_ty);
        let program = b.build();
        let hierarchy = ClassHierarchy::new(&program);
        assert!(hierarchy.is_subtype(obj_arr, a_arr));
        assert!(!hierarchy.is_subtype(a_arr, obj_arr));
        // Arrays sit under the hierarchy root
        assert!(hierarchy.is_subtype(obj_ty, a_arr));
    }
}
