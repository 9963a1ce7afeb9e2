//! Solver extension points
//!
//! Plugins observe solver events (new points-to facts, new call edges,
//! newly reachable methods) and may feed seed facts back through
//! [`SolverApi`]. Environment modeling (e.g. the implicit main thread
//! object) lives outside the core transfer rules, behind this trait.

use crate::features::call_graph::CallEdge;
use crate::features::context::{ContextTrie, CtxId};
use crate::features::elements::{CsMethodId, ElementManager, PointerId, PointsToSet};
use crate::features::heap::HeapModel;
use crate::features::solver::work_list::WorkList;
use crate::shared::ir::{MethodId, Program, VarId};

/// Mutation surface handed to plugin hooks.
///
/// Seeds are queued on the work list, never written directly, so plugin
/// facts go through the same propagation path as solver facts.
pub struct SolverApi<'a> {
    pub program: &'a Program,
    pub ctxs: &'a mut ContextTrie,
    pub heap: &'a mut HeapModel,
    pub elements: &'a mut ElementManager,
    work_list: &'a mut WorkList,
}

impl<'a> SolverApi<'a> {
    pub(crate) fn new(
        program: &'a Program,
        ctxs: &'a mut ContextTrie,
        heap: &'a mut HeapModel,
        elements: &'a mut ElementManager,
        work_list: &'a mut WorkList,
    ) -> Self {
        Self { program, ctxs, heap, elements, work_list }
    }

    /// Seed a pointer with a points-to set.
    pub fn add_points_to(&mut self, pointer: PointerId, pts: PointsToSet) {
        self.work_list.push_pointer_entry(pointer, pts);
    }

    /// Seed one object into a variable under a context.
    pub fn add_var_points_to(
        &mut self,
        ctx: CtxId,
        var: VarId,
        heap_ctx: CtxId,
        obj: crate::features::heap::ObjId,
    ) {
        let cs_obj = self.elements.get_obj(heap_ctx, obj);
        let pointer = self.elements.get_var_pointer(ctx, var);
        self.work_list.push_pointer_entry(pointer, PointsToSet::singleton(cs_obj));
    }
}

/// Observer of solver events. All hooks default to no-ops.
pub trait Plugin {
    /// Before solving, once the program is known.
    fn on_preprocess(&mut self, _api: &mut SolverApi<'_>) {}

    /// After entry points are seeded, before the main loop.
    fn on_initialize(&mut self, _api: &mut SolverApi<'_>) {}

    /// A pointer gained `delta` (objects it did not have before).
    fn on_new_points_to(
        &mut self,
        _pointer: PointerId,
        _delta: &PointsToSet,
        _api: &mut SolverApi<'_>,
    ) {
    }

    /// A call edge entered the call graph.
    fn on_new_call_edge(&mut self, _edge: &CallEdge, _api: &mut SolverApi<'_>) {}

    /// A (context, method) pair became reachable.
    fn on_new_cs_method(&mut self, _method: CsMethodId, _api: &mut SolverApi<'_>) {}

    /// A method became reachable in some context for the first time.
    fn on_new_method(&mut self, _method: MethodId, _api: &mut SolverApi<'_>) {}

    /// After the fixed point (or budget exhaustion).
    fn on_finish(&mut self, _api: &mut SolverApi<'_>) {}
}

/// Fans every event out to an ordered list of plugins.
#[derive(Default)]
pub struct CompositePlugin {
    plugins: Vec<Box<dyn Plugin>>,
}

impl CompositePlugin {
    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }
}

impl Plugin for CompositePlugin {
    fn on_preprocess(&mut self, api: &mut SolverApi<'_>) {
        for p in &mut self.plugins {
            p.on_preprocess(api);
        }
    }

    fn on_initialize(&mut self, api: &mut SolverApi<'_>) {
        for p in &mut self.plugins {
            p.on_initialize(api);
        }
    }

    fn on_new_points_to(
        &mut self,
        pointer: PointerId,
        delta: &PointsToSet,
        api: &mut SolverApi<'_>,
    ) {
        for p in &mut self.plugins {
            p.on_new_points_to(pointer, delta, api);
        }
    }

    fn on_new_call_edge(&mut self, edge: &CallEdge, api: &mut SolverApi<'_>) {
        for p in &mut self.plugins {
            p.on_new_call_edge(edge, api);
        }
    }

    fn on_new_cs_method(&mut self, method: CsMethodId, api: &mut SolverApi<'_>) {
        for p in &mut self.plugins {
            p.on_new_cs_method(method, api);
        }
    }

    fn on_new_method(&mut self, method: MethodId, api: &mut SolverApi<'_>) {
        for p in &mut self.plugins {
            p.on_new_method(method, api);
        }
    }

    fn on_finish(&mut self, api: &mut SolverApi<'_>) {
        for p in &mut self.plugins {
            p.on_finish(api);
        }
    }
}
