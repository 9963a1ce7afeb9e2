//! Context selection strategies
//!
//! A selector decides the callee context at each discovered call edge and
//! the heap context at each allocation. Strategies are interchangeable
//! behind [`ContextSelector`]; the solver never inspects which one it
//! holds.

use crate::config::{AnalysisOptions, CsVariant};
use crate::errors::Result;
use crate::features::context::trie::{ContextElem, ContextTrie, CtxId};
use crate::features::heap::ObjId;
use crate::shared::ir::{CallSiteId, MethodId, TypeId};

/// Picks callee and heap contexts for newly discovered edges and objects.
pub trait ContextSelector {
    /// Callee context for a call resolved without a receiver object
    /// (static and special calls).
    fn select_context(
        &self,
        ctxs: &mut ContextTrie,
        caller_ctx: CtxId,
        call_site: CallSiteId,
        callee: MethodId,
    ) -> CtxId;

    /// Callee context for a dynamically dispatched call, with the
    /// receiver object and its context in hand.
    #[allow(clippy::too_many_arguments)]
    fn select_context_dispatched(
        &self,
        ctxs: &mut ContextTrie,
        caller_ctx: CtxId,
        call_site: CallSiteId,
        recv_ctx: CtxId,
        recv_obj: ObjId,
        recv_type: TypeId,
        callee: MethodId,
    ) -> CtxId;

    /// Heap context for an object allocated under `method_ctx`. Special
    /// objects always get the empty context.
    fn select_heap_context(
        &self,
        ctxs: &mut ContextTrie,
        method_ctx: CtxId,
        obj_is_special: bool,
    ) -> CtxId;
}

/// Every method and object shares the empty context.
pub struct ContextInsensitiveSelector;

impl ContextSelector for ContextInsensitiveSelector {
    fn select_context(
        &self,
        _ctxs: &mut ContextTrie,
        _caller_ctx: CtxId,
        _call_site: CallSiteId,
        _callee: MethodId,
    ) -> CtxId {
        CtxId::EMPTY
    }

    fn select_context_dispatched(
        &self,
        _ctxs: &mut ContextTrie,
        _caller_ctx: CtxId,
        _call_site: CallSiteId,
        _recv_ctx: CtxId,
        _recv_obj: ObjId,
        _recv_type: TypeId,
        _callee: MethodId,
    ) -> CtxId {
        CtxId::EMPTY
    }

    fn select_heap_context(
        &self,
        _ctxs: &mut ContextTrie,
        _method_ctx: CtxId,
        _obj_is_special: bool,
    ) -> CtxId {
        CtxId::EMPTY
    }
}

/// Call-site sensitivity: contexts are the most recent `k` call sites.
pub struct KCallSelector {
    k: u32,
    heap_k: u32,
}

impl ContextSelector for KCallSelector {
    fn select_context(
        &self,
        ctxs: &mut ContextTrie,
        caller_ctx: CtxId,
        call_site: CallSiteId,
        _callee: MethodId,
    ) -> CtxId {
        ctxs.append(caller_ctx, ContextElem::Call(call_site), self.k)
    }

    fn select_context_dispatched(
        &self,
        ctxs: &mut ContextTrie,
        caller_ctx: CtxId,
        call_site: CallSiteId,
        _recv_ctx: CtxId,
        _recv_obj: ObjId,
        _recv_type: TypeId,
        _callee: MethodId,
    ) -> CtxId {
        ctxs.append(caller_ctx, ContextElem::Call(call_site), self.k)
    }

    fn select_heap_context(
        &self,
        ctxs: &mut ContextTrie,
        method_ctx: CtxId,
        obj_is_special: bool,
    ) -> CtxId {
        heap_context(ctxs, method_ctx, obj_is_special, self.heap_k)
    }
}

/// Object sensitivity: contexts are the most recent `k` receiver objects.
///
/// Builds on the receiver's own context, not the caller's, so static
/// calls inherit the caller context unchanged.
pub struct KObjSelector {
    k: u32,
    heap_k: u32,
}

impl ContextSelector for KObjSelector {
    fn select_context(
        &self,
        _ctxs: &mut ContextTrie,
        caller_ctx: CtxId,
        _call_site: CallSiteId,
        _callee: MethodId,
    ) -> CtxId {
        caller_ctx
    }

    fn select_context_dispatched(
        &self,
        ctxs: &mut ContextTrie,
        _caller_ctx: CtxId,
        _call_site: CallSiteId,
        recv_ctx: CtxId,
        recv_obj: ObjId,
        _recv_type: TypeId,
        _callee: MethodId,
    ) -> CtxId {
        ctxs.append(recv_ctx, ContextElem::Obj(recv_obj), self.k)
    }

    fn select_heap_context(
        &self,
        ctxs: &mut ContextTrie,
        method_ctx: CtxId,
        obj_is_special: bool,
    ) -> CtxId {
        heap_context(ctxs, method_ctx, obj_is_special, self.heap_k)
    }
}

/// Type sensitivity: like object sensitivity, but receiver objects are
/// abstracted to the type declaring their allocation.
pub struct KTypeSelector {
    k: u32,
    heap_k: u32,
}

impl ContextSelector for KTypeSelector {
    fn select_context(
        &self,
        _ctxs: &mut ContextTrie,
        caller_ctx: CtxId,
        _call_site: CallSiteId,
        _callee: MethodId,
    ) -> CtxId {
        caller_ctx
    }

    fn select_context_dispatched(
        &self,
        ctxs: &mut ContextTrie,
        _caller_ctx: CtxId,
        _call_site: CallSiteId,
        recv_ctx: CtxId,
        _recv_obj: ObjId,
        recv_type: TypeId,
        _callee: MethodId,
    ) -> CtxId {
        ctxs.append(recv_ctx, ContextElem::Type(recv_type), self.k)
    }

    fn select_heap_context(
        &self,
        ctxs: &mut ContextTrie,
        method_ctx: CtxId,
        obj_is_special: bool,
    ) -> CtxId {
        heap_context(ctxs, method_ctx, obj_is_special, self.heap_k)
    }
}

fn heap_context(
    ctxs: &mut ContextTrie,
    method_ctx: CtxId,
    obj_is_special: bool,
    heap_k: u32,
) -> CtxId {
    if obj_is_special {
        return CtxId::EMPTY;
    }
    ctxs.last_k(method_ctx, heap_k)
}

/// Selector for the configured variant. Fails on malformed options.
pub fn make_selector(options: &AnalysisOptions) -> Result<Box<dyn ContextSelector>> {
    let variant = options.variant()?;
    let heap_k = options.effective_heap_k()?;
    Ok(match variant {
        CsVariant::Insensitive => Box::new(ContextInsensitiveSelector),
        CsVariant::KCallSite(k) => Box::new(KCallSelector { k, heap_k }),
        CsVariant::KObject(k) => Box::new(KObjSelector { k, heap_k }),
        CsVariant::KType(k) => Box::new(KTypeSelector { k, heap_k }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k_call_options(k: u32) -> AnalysisOptions {
        AnalysisOptions {
            context_sensitivity: format!("{k}-call"),
            ..Default::default()
        }
    }

    #[test]
    fn test_insensitive_selector_stays_empty() {
        let mut ctxs = ContextTrie::new();
        let sel = make_selector(&AnalysisOptions::default()).unwrap();
        let parent = ctxs.get(&[ContextElem::Call(CallSiteId(7))]);
        let ctx = sel.select_context(&mut ctxs, parent, CallSiteId(1), MethodId(0));
        assert_eq!(ctx, CtxId::EMPTY);
        assert_eq!(sel.select_heap_context(&mut ctxs, parent, false), CtxId::EMPTY);
    }

    #[test]
    fn test_k_call_appends_and_truncates() {
        let mut ctxs = ContextTrie::new();
        let sel = make_selector(&k_call_options(2)).unwrap();
        let c1 = sel.select_context(&mut ctxs, CtxId::EMPTY, CallSiteId(1), MethodId(0));
        let c2 = sel.select_context(&mut ctxs, c1, CallSiteId(2), MethodId(0));
        let c3 = sel.select_context(&mut ctxs, c2, CallSiteId(3), MethodId(0));
        assert_eq!(
            ctxs.elements(c3),
            vec![ContextElem::Call(CallSiteId(2)), ContextElem::Call(CallSiteId(3))]
        );
    }

    #[test]
    fn test_heap_context_defaults_to_k_minus_one() {
        let mut ctxs = ContextTrie::new();
        let sel = make_selector(&k_call_options(2)).unwrap();
        let c = ctxs.get(&[
            ContextElem::Call(CallSiteId(1)),
            ContextElem::Call(CallSiteId(2)),
        ]);
        let h = sel.select_heap_context(&mut ctxs, c, false);
        assert_eq!(ctxs.elements(h), vec![ContextElem::Call(CallSiteId(2))]);
    }

    #[test]
    fn test_special_objects_get_empty_heap_context() {
        let mut ctxs = ContextTrie::new();
        let sel = make_selector(&k_call_options(2)).unwrap();
        let c = ctxs.get(&[ContextElem::Call(CallSiteId(1))]);
        assert_eq!(sel.select_heap_context(&mut ctxs, c, true), CtxId::EMPTY);
    }

    #[test]
    fn test_object_sensitivity_uses_receiver_context() {
        let mut ctxs = ContextTrie::new();
        let sel = make_selector(&AnalysisOptions {
            context_sensitivity: "1-obj".into(),
            ..Default::default()
        })
        .unwrap();
        let caller = ctxs.get(&[ContextElem::Obj(ObjId(9))]);
        let recv_ctx = CtxId::EMPTY;
        let ctx = sel.select_context_dispatched(
            &mut ctxs,
            caller,
            CallSiteId(0),
            recv_ctx,
            ObjId(4),
            TypeId(0),
            MethodId(0),
        );
        assert_eq!(ctxs.elements(ctx), vec![ContextElem::Obj(ObjId(4))]);
        // static calls keep the caller context
        assert_eq!(sel.select_context(&mut ctxs, caller, CallSiteId(0), MethodId(0)), caller);
    }
}
