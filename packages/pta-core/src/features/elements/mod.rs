//! Context-sensitive analysis elements
//!
//! Pairs a context with a base element (object, call site, method) and
//! interns the pair, so the solver moves `u32` ids around instead of
//! composite keys. Every pointer node of the flow graph also lives here,
//! next to its points-to set.
//!
//! Interning is total: asking twice for the same (context, element) pair
//! always yields the same id.

pub mod points_to_set;

pub use points_to_set::PointsToSet;

use crate::features::context::CtxId;
use crate::features::heap::ObjId;
use crate::shared::ir::{CallSiteId, FieldId, MethodId, VarId};
use rustc_hash::FxHashMap;

/// Context-sensitive abstract object id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsObjId(pub u32);

/// Context-sensitive call-site id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsCallSiteId(pub u32);

/// Context-sensitive method id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsMethodId(pub u32);

/// Pointer node id in the flow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CsObjData {
    pub ctx: CtxId,
    pub obj: ObjId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CsCallSiteData {
    pub ctx: CtxId,
    pub site: CallSiteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CsMethodData {
    pub ctx: CtxId,
    pub method: MethodId,
}

/// The four pointer kinds of the flow graph.
///
/// Instance fields and array elements key on the context-sensitive base
/// object alone, so two aliased bases share one pointer node and field
/// stores through either are visible to loads through both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Var { ctx: CtxId, var: VarId },
    InstanceField { base: CsObjId, field: FieldId },
    StaticField { field: FieldId },
    ArrayIndex { array: CsObjId },
}

/// Arena and interner for all context-sensitive elements and pointers.
#[derive(Debug, Default)]
pub struct ElementManager {
    objs: Vec<CsObjData>,
    obj_index: FxHashMap<CsObjData, CsObjId>,
    call_sites: Vec<CsCallSiteData>,
    call_site_index: FxHashMap<CsCallSiteData, CsCallSiteId>,
    methods: Vec<CsMethodData>,
    method_index: FxHashMap<CsMethodData, CsMethodId>,
    pointers: Vec<PointerKind>,
    pointer_index: FxHashMap<PointerKind, PointerId>,
    /// Indexed by `PointerId`, grown in lockstep with `pointers`
    points_to: Vec<PointsToSet>,
}

impl ElementManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_obj(&mut self, ctx: CtxId, obj: ObjId) -> CsObjId {
        let data = CsObjData { ctx, obj };
        if let Some(id) = self.obj_index.get(&data) {
            return *id;
        }
        let id = CsObjId(self.objs.len() as u32);
        self.objs.push(data);
        self.obj_index.insert(data, id);
        id
    }

    pub fn get_call_site(&mut self, ctx: CtxId, site: CallSiteId) -> CsCallSiteId {
        let data = CsCallSiteData { ctx, site };
        if let Some(id) = self.call_site_index.get(&data) {
            return *id;
        }
        let id = CsCallSiteId(self.call_sites.len() as u32);
        self.call_sites.push(data);
        self.call_site_index.insert(data, id);
        id
    }

    pub fn get_method(&mut self, ctx: CtxId, method: MethodId) -> CsMethodId {
        let data = CsMethodData { ctx, method };
        if let Some(id) = self.method_index.get(&data) {
            return *id;
        }
        let id = CsMethodId(self.methods.len() as u32);
        self.methods.push(data);
        self.method_index.insert(data, id);
        id
    }

    pub fn get_var_pointer(&mut self, ctx: CtxId, var: VarId) -> PointerId {
        self.get_pointer(PointerKind::Var { ctx, var })
    }

    pub fn get_instance_field_pointer(&mut self, base: CsObjId, field: FieldId) -> PointerId {
        self.get_pointer(PointerKind::InstanceField { base, field })
    }

    pub fn get_static_field_pointer(&mut self, field: FieldId) -> PointerId {
        self.get_pointer(PointerKind::StaticField { field })
    }

    pub fn get_array_pointer(&mut self, array: CsObjId) -> PointerId {
        self.get_pointer(PointerKind::ArrayIndex { array })
    }

    fn get_pointer(&mut self, kind: PointerKind) -> PointerId {
        if let Some(id) = self.pointer_index.get(&kind) {
            return *id;
        }
        let id = PointerId(self.pointers.len() as u32);
        self.pointers.push(kind);
        self.pointer_index.insert(kind, id);
        self.points_to.push(PointsToSet::new());
        id
    }

    /// Read-only lookup, for result queries after solving.
    pub fn find_var_pointer(&self, ctx: CtxId, var: VarId) -> Option<PointerId> {
        self.pointer_index.get(&PointerKind::Var { ctx, var }).copied()
    }

    pub fn obj(&self, id: CsObjId) -> CsObjData {
        self.objs[id.0 as usize]
    }

    pub fn call_site(&self, id: CsCallSiteId) -> CsCallSiteData {
        self.call_sites[id.0 as usize]
    }

    pub fn method(&self, id: CsMethodId) -> CsMethodData {
        self.methods[id.0 as usize]
    }

    pub fn pointer(&self, id: PointerId) -> PointerKind {
        self.pointers[id.0 as usize]
    }

    pub fn points_to(&self, id: PointerId) -> &PointsToSet {
        &self.points_to[id.0 as usize]
    }

    pub fn points_to_mut(&mut self, id: PointerId) -> &mut PointsToSet {
        &mut self.points_to[id.0 as usize]
    }

    pub fn num_objs(&self) -> usize {
        self.objs.len()
    }

    pub fn num_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn pointers(&self) -> impl Iterator<Item = (PointerId, PointerKind)> + '_ {
        self.pointers
            .iter()
            .enumerate()
            .map(|(i, k)| (PointerId(i as u32), *k))
    }

    pub fn methods(&self) -> impl Iterator<Item = (CsMethodId, CsMethodData)> + '_ {
        self.methods
            .iter()
            .enumerate()
            .map(|(i, m)| (CsMethodId(i as u32), *m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::context::CtxId;

    #[test]
    fn test_interning_is_total() {
        let mut mgr = ElementManager::new();
        let ctx = CtxId(1);
        let o = mgr.get_obj(ctx, ObjId(5));
        assert_eq!(o, mgr.get_obj(ctx, ObjId(5)));
        assert_ne!(o, mgr.get_obj(CtxId::EMPTY, ObjId(5)));

        let m = mgr.get_method(ctx, MethodId(2));
        assert_eq!(m, mgr.get_method(ctx, MethodId(2)));

        let p = mgr.get_var_pointer(ctx, VarId(0));
        assert_eq!(p, mgr.get_var_pointer(ctx, VarId(0)));
        assert_eq!(mgr.find_var_pointer(ctx, VarId(0)), Some(p));
        assert_eq!(mgr.find_var_pointer(CtxId(9), VarId(0)), None);
    }

    #[test]
    fn test_aliased_bases_share_field_pointer() {
        let mut mgr = ElementManager::new();
        let base = mgr.get_obj(CtxId::EMPTY, ObjId(0));
        let f = FieldId(0);
        let p1 = mgr.get_instance_field_pointer(base, f);
        let p2 = mgr.get_instance_field_pointer(base, f);
        assert_eq!(p1, p2);
        mgr.points_to_mut(p1).insert(CsObjId(3));
        assert!(mgr.points_to(p2).contains(CsObjId(3)));
    }
}
