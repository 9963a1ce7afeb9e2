//! Typed three-address IR consumed by the analysis
//!
//! Classes, fields, methods, locals, statements, call-site descriptors and
//! allocation sites live in arenas with stable `u32` ids; composite-key
//! side indexes make repeated lookups cheap. All locals modeled here are
//! reference-typed: the frontend is expected to drop primitive locals
//! before handing a program to the engine.
//!
//! The analysis is flow-insensitive, so statement order inside a method
//! body carries no meaning beyond iteration order.

use rustc_hash::FxHashMap;

/// Interned type id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Class (or interface) id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

/// Field id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

/// Method id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u32);

/// Local variable id (globally unique, not per-method)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// Call-site descriptor id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteId(pub u32);

/// Allocation-site id (one per syntactic `new`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocSiteId(pub u32);

/// Type structure: either a class type or an array of an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class(ClassId),
    Array(TypeId),
}

#[derive(Debug, Clone)]
pub struct ClassData {
    pub name: String,
    pub superclass: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    /// Static initializer, run once when the class is first touched
    pub clinit: Option<MethodId>,
    /// The class type interned for this class
    pub ty: TypeId,
    /// Methods declared by this class, in declaration order
    pub methods: Vec<MethodId>,
}

#[derive(Debug, Clone)]
pub struct FieldData {
    pub name: String,
    pub owner: ClassId,
    pub ty: TypeId,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct MethodData {
    /// Signature name used for virtual dispatch, e.g. `"foo()"`
    pub sig: String,
    pub owner: ClassId,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<VarId>,
    pub this_var: Option<VarId>,
    pub return_vars: Vec<VarId>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct VarData {
    pub name: String,
    pub ty: TypeId,
    pub method: MethodId,
}

/// Call-site kinds of the consumed IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Static,
    Virtual,
    Interface,
    Special,
}

#[derive(Debug, Clone)]
pub struct CallSiteData {
    pub kind: CallKind,
    /// Method containing this call site
    pub container: MethodId,
    /// Receiver variable; `None` for static calls
    pub base: Option<VarId>,
    /// Signature name resolved against the receiver type at dispatch
    pub sig: String,
    /// Directly resolved target for static/special calls
    pub target: Option<MethodId>,
    pub args: Vec<VarId>,
    pub result: Option<VarId>,
}

#[derive(Debug, Clone)]
pub struct AllocSiteData {
    pub container: MethodId,
    pub ty: TypeId,
}

/// Statements of the consumed IR.
///
/// Closed on purpose: the solver matches exhaustively, so a construct
/// without a transfer rule cannot slip through at runtime.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `lhs = new T()`
    New { lhs: VarId, site: AllocSiteId },
    /// `lhs = "literal"` (string constant)
    AssignLiteral { lhs: VarId, literal: String },
    /// `lhs = rhs`
    Copy { lhs: VarId, rhs: VarId },
    /// `lhs = (T) rhs`
    Cast { lhs: VarId, rhs: VarId, ty: TypeId },
    /// `lhs = base.field`
    LoadField {
        lhs: VarId,
        base: VarId,
        field: FieldId,
    },
    /// `base.field = rhs`
    StoreField {
        base: VarId,
        field: FieldId,
        rhs: VarId,
    },
    /// `lhs = C.field`
    LoadStatic { lhs: VarId, field: FieldId },
    /// `C.field = rhs`
    StoreStatic { field: FieldId, rhs: VarId },
    /// `lhs = array[*]` (indices merged)
    LoadArray { lhs: VarId, array: VarId },
    /// `array[*] = rhs`
    StoreArray { array: VarId, rhs: VarId },
    /// Any invocation; see [`CallSiteData`]
    Call(CallSiteId),
}

/// Statements relevant to a variable, indexed once at build time so the
/// solver can reprocess only the sites anchored on a variable whose
/// points-to set changed.
#[derive(Debug, Clone, Default)]
pub struct RelevantStmts {
    /// Call sites where the variable is the receiver
    pub invokes: Vec<CallSiteId>,
    /// Instance loads with the variable as base: `(lhs, field)`
    pub load_fields: Vec<(VarId, FieldId)>,
    /// Instance stores with the variable as base: `(field, rhs)`
    pub store_fields: Vec<(FieldId, VarId)>,
    /// Array loads with the variable as array: `lhs`
    pub load_arrays: Vec<VarId>,
    /// Array stores with the variable as array: `rhs`
    pub store_arrays: Vec<VarId>,
}

/// The consumed whole program.
#[derive(Debug, Clone)]
pub struct Program {
    types: Vec<TypeKind>,
    classes: Vec<ClassData>,
    fields: Vec<FieldData>,
    methods: Vec<MethodData>,
    vars: Vec<VarData>,
    call_sites: Vec<CallSiteData>,
    alloc_sites: Vec<AllocSiteData>,
    relevant: Vec<RelevantStmts>,
    class_by_name: FxHashMap<String, ClassId>,
    entry_points: Vec<MethodId>,
}

impl Program {
    pub fn type_kind(&self, ty: TypeId) -> TypeKind {
        self.types[ty.0 as usize]
    }

    pub fn class(&self, class: ClassId) -> &ClassData {
        &self.classes[class.0 as usize]
    }

    pub fn field(&self, field: FieldId) -> &FieldData {
        &self.fields[field.0 as usize]
    }

    pub fn method(&self, method: MethodId) -> &MethodData {
        &self.methods[method.0 as usize]
    }

    pub fn var(&self, var: VarId) -> &VarData {
        &self.vars[var.0 as usize]
    }

    pub fn call_site(&self, site: CallSiteId) -> &CallSiteData {
        &self.call_sites[site.0 as usize]
    }

    pub fn alloc_site(&self, site: AllocSiteId) -> &AllocSiteData {
        &self.alloc_sites[site.0 as usize]
    }

    pub fn relevant(&self, var: VarId) -> &RelevantStmts {
        &self.relevant[var.0 as usize]
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_by_name.get(name).copied()
    }

    pub fn entry_points(&self) -> &[MethodId] {
        &self.entry_points
    }

    /// Class a type belongs to (element class for arrays), if any.
    pub fn base_class(&self, ty: TypeId) -> Option<ClassId> {
        match self.type_kind(ty) {
            TypeKind::Class(c) => Some(c),
            TypeKind::Array(elem) => self.base_class(elem),
        }
    }

    /// Human-readable type name, for diagnostics.
    pub fn type_name(&self, ty: TypeId) -> String {
        match self.type_kind(ty) {
            TypeKind::Class(c) => self.class(c).name.clone(),
            TypeKind::Array(elem) => format!("{}[]", self.type_name(elem)),
        }
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassData)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (ClassId(i as u32), c))
    }

    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodData)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(i, m)| (MethodId(i as u32), m))
    }
}

/// Builder standing in for the out-of-scope binary frontend.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    types: Vec<TypeKind>,
    array_index: FxHashMap<TypeId, TypeId>,
    classes: Vec<ClassData>,
    fields: Vec<FieldData>,
    methods: Vec<MethodData>,
    vars: Vec<VarData>,
    call_sites: Vec<CallSiteData>,
    alloc_sites: Vec<AllocSiteData>,
    class_by_name: FxHashMap<String, ClassId>,
    entry_points: Vec<MethodId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a class; its class type is interned alongside.
    pub fn class(&mut self, name: &str, superclass: Option<ClassId>) -> ClassId {
        self.declare(name, superclass, false)
    }

    pub fn interface(&mut self, name: &str) -> ClassId {
        self.declare(name, None, true)
    }

    fn declare(&mut self, name: &str, superclass: Option<ClassId>, is_interface: bool) -> ClassId {
        let class = ClassId(self.classes.len() as u32);
        let ty = TypeId(self.types.len() as u32);
        self.types.push(TypeKind::Class(class));
        self.classes.push(ClassData {
            name: name.to_string(),
            superclass,
            interfaces: Vec::new(),
            is_interface,
            clinit: None,
            ty,
            methods: Vec::new(),
        });
        self.class_by_name.insert(name.to_string(), class);
        class
    }

    pub fn implements(&mut self, class: ClassId, iface: ClassId) {
        self.classes[class.0 as usize].interfaces.push(iface);
    }

    pub fn class_type(&self, class: ClassId) -> TypeId {
        self.classes[class.0 as usize].ty
    }

    pub fn array_type(&mut self, elem: TypeId) -> TypeId {
        if let Some(ty) = self.array_index.get(&elem) {
            return *ty;
        }
        let ty = TypeId(self.types.len() as u32);
        self.types.push(TypeKind::Array(elem));
        self.array_index.insert(elem, ty);
        ty
    }

    pub fn field(&mut self, owner: ClassId, name: &str, ty: TypeId, is_static: bool) -> FieldId {
        let field = FieldId(self.fields.len() as u32);
        self.fields.push(FieldData {
            name: name.to_string(),
            owner,
            ty,
            is_static,
        });
        field
    }

    pub fn method(&mut self, owner: ClassId, sig: &str, is_static: bool) -> MethodId {
        let method = MethodId(self.methods.len() as u32);
        self.methods.push(MethodData {
            sig: sig.to_string(),
            owner,
            is_static,
            is_abstract: false,
            params: Vec::new(),
            this_var: None,
            return_vars: Vec::new(),
            stmts: Vec::new(),
        });
        self.classes[owner.0 as usize].methods.push(method);
        method
    }

    pub fn abstract_method(&mut self, owner: ClassId, sig: &str) -> MethodId {
        let method = self.method(owner, sig, false);
        self.methods[method.0 as usize].is_abstract = true;
        method
    }

    pub fn clinit(&mut self, class: ClassId) -> MethodId {
        let method = self.method(class, "<clinit>()", true);
        self.classes[class.0 as usize].clinit = Some(method);
        method
    }

    pub fn var(&mut self, method: MethodId, name: &str, ty: TypeId) -> VarId {
        let var = VarId(self.vars.len() as u32);
        self.vars.push(VarData {
            name: name.to_string(),
            ty,
            method,
        });
        var
    }

    pub fn this_var(&mut self, method: MethodId, ty: TypeId) -> VarId {
        let var = self.var(method, "this", ty);
        self.methods[method.0 as usize].this_var = Some(var);
        var
    }

    pub fn param(&mut self, method: MethodId, name: &str, ty: TypeId) -> VarId {
        let var = self.var(method, name, ty);
        self.methods[method.0 as usize].params.push(var);
        var
    }

    pub fn return_var(&mut self, method: MethodId, var: VarId) {
        self.methods[method.0 as usize].return_vars.push(var);
    }

    pub fn alloc_site(&mut self, container: MethodId, ty: TypeId) -> AllocSiteId {
        let site = AllocSiteId(self.alloc_sites.len() as u32);
        self.alloc_sites.push(AllocSiteData { container, ty });
        site
    }

    pub fn stmt(&mut self, method: MethodId, stmt: Stmt) {
        self.methods[method.0 as usize].stmts.push(stmt);
    }

    /// Shorthand for `lhs = new T()` at a fresh allocation site.
    pub fn new_stmt(&mut self, method: MethodId, lhs: VarId, ty: TypeId) -> AllocSiteId {
        let site = self.alloc_site(method, ty);
        self.stmt(method, Stmt::New { lhs, site });
        site
    }

    pub fn virtual_call(
        &mut self,
        method: MethodId,
        base: VarId,
        sig: &str,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        self.call(method, CallKind::Virtual, Some(base), sig, None, args, result)
    }

    pub fn static_call(
        &mut self,
        method: MethodId,
        target: MethodId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        let sig = self.methods[target.0 as usize].sig.clone();
        self.call(method, CallKind::Static, None, &sig, Some(target), args, result)
    }

    pub fn special_call(
        &mut self,
        method: MethodId,
        base: VarId,
        target: MethodId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        let sig = self.methods[target.0 as usize].sig.clone();
        self.call(method, CallKind::Special, Some(base), &sig, Some(target), args, result)
    }

    pub fn interface_call(
        &mut self,
        method: MethodId,
        base: VarId,
        sig: &str,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        self.call(method, CallKind::Interface, Some(base), sig, None, args, result)
    }

    #[allow(clippy::too_many_arguments)]
    fn call(
        &mut self,
        container: MethodId,
        kind: CallKind,
        base: Option<VarId>,
        sig: &str,
        target: Option<MethodId>,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        let site = CallSiteId(self.call_sites.len() as u32);
        self.call_sites.push(CallSiteData {
            kind,
            container,
            base,
            sig: sig.to_string(),
            target,
            args,
            result,
        });
        self.stmt(container, Stmt::Call(site));
        site
    }

    pub fn entry_point(&mut self, method: MethodId) {
        self.entry_points.push(method);
    }

    /// Finalize the program, computing the per-variable relevant-statement
    /// indexes the solver drives incremental processing with.
    pub fn build(self) -> Program {
        let mut relevant = vec![RelevantStmts::default(); self.vars.len()];
        for method in &self.methods {
            for stmt in &method.stmts {
                match stmt {
                    Stmt::LoadField { lhs, base, field } => {
                        relevant[base.0 as usize].load_fields.push((*lhs, *field));
                    }
                    Stmt::StoreField { base, field, rhs } => {
                        relevant[base.0 as usize].store_fields.push((*field, *rhs));
                    }
                    Stmt::LoadArray { lhs, array } => {
                        relevant[array.0 as usize].load_arrays.push(*lhs);
                    }
                    Stmt::StoreArray { array, rhs } => {
                        relevant[array.0 as usize].store_arrays.push(*rhs);
                    }
                    Stmt::Call(site) => {
                        if let Some(base) = self.call_sites[site.0 as usize].base {
                            relevant[base.0 as usize].invokes.push(*site);
                        }
                    }
                    _ => {}
                }
            }
        }
        Program {
            types: self.types,
            classes: self.classes,
            fields: self.fields,
            methods: self.methods,
            vars: self.vars,
            call_sites: self.call_sites,
            alloc_sites: self.alloc_sites,
            relevant,
            class_by_name: self.class_by_name,
            entry_points: self.entry_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevant_stmt_index() {
        let mut b = ProgramBuilder::new();
        let object = b.class("Object", None);
        let a = b.class("A", Some(object));
        let a_ty = b.class_type(a);
        let f = b.field(a, "f", a_ty, false);
        let main_class = b.class("Main", Some(object));
        let main = b.method(main_class, "main()", true);
        let x = b.var(main, "x", a_ty);
        let y = b.var(main, "y", a_ty);
        b.stmt(main, Stmt::StoreField { base: x, field: f, rhs: y });
        b.stmt(main, Stmt::LoadField { lhs: y, base: x, field: f });
        b.virtual_call(main, x, "foo()", vec![], None);
        let program = b.build();

        let rel = program.relevant(x);
        assert_eq!(rel.store_fields, vec![(f, y)]);
        assert_eq!(rel.load_fields, vec![(y, f)]);
        assert_eq!(rel.invokes.len(), 1);
        assert!(program.relevant(y).invokes.is_empty());
    }

    #[test]
    fn test_array_type_interned() {
        let mut b = ProgramBuilder::new();
        let object = b.class("Object", None);
        let obj_ty = b.class_type(object);
        let arr1 = b.array_type(obj_ty);
        let arr2 = b.array_type(obj_ty);
        assert_eq!(arr1, arr2);
    }
}
