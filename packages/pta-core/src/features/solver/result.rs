//! Analysis result surface
//!
//! Owns the interners and the call graph after solving, so points-to
//! queries and call-graph traversal stay cheap id lookups. The
//! name-based snapshot helpers describe facts in source terms, stable
//! across runs whose internal id assignment differs (e.g. under a
//! different scheduling).

use crate::features::call_graph::{CallEdge, CsCallGraph};
use crate::features::context::{ContextElem, ContextTrie, CtxId};
use crate::features::elements::{
    CsObjId, ElementManager, PointerKind, PointsToSet,
};
use crate::features::heap::HeapModel;
use crate::shared::ir::{Program, VarId};
use serde::Serialize;
use std::collections::BTreeSet;

/// Counters collected during a solve.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SolverStats {
    pub contexts: usize,
    pub objects: usize,
    pub pointers: usize,
    pub flow_edges: usize,
    pub reachable_methods: usize,
    pub call_edges: usize,
    /// Objects pushed across flow edges, counted per (edge, object)
    pub propagations: u64,
    /// Work-list items processed
    pub steps: u64,
}

/// Everything a solve produces.
#[derive(Debug)]
pub struct PointerAnalysisResult {
    pub(crate) ctxs: ContextTrie,
    pub(crate) heap: HeapModel,
    pub(crate) elements: ElementManager,
    pub(crate) call_graph: CsCallGraph,
    pub(crate) stats: SolverStats,
    pub(crate) complete: bool,
}

impl PointerAnalysisResult {
    /// `false` when the step budget ran out before the fixed point.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn call_graph(&self) -> &CsCallGraph {
        &self.call_graph
    }

    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    pub fn elements(&self) -> &ElementManager {
        &self.elements
    }

    pub fn contexts(&self) -> &ContextTrie {
        &self.ctxs
    }

    /// Points-to set of a variable under a context; empty if the pointer
    /// never materialized.
    pub fn points_to_of_var(&self, ctx: CtxId, var: VarId) -> PointsToSet {
        self.elements
            .find_var_pointer(ctx, var)
            .map(|p| self.elements.points_to(p).clone())
            .unwrap_or_default()
    }

    /// Context-insensitive points-to set of a variable: the union over
    /// all contexts the variable was analyzed under.
    pub fn points_to_of_var_ci(&self, var: VarId) -> PointsToSet {
        let mut out = PointsToSet::new();
        for (id, kind) in self.elements.pointers() {
            if let PointerKind::Var { var: v, .. } = kind {
                if v == var {
                    out.union_with(self.elements.points_to(id));
                }
            }
        }
        out
    }

    /// Source-level names of the objects a variable may point to,
    /// contexts collapsed. Sorted, deduplicated.
    pub fn var_points_to_names(&self, program: &Program, var: VarId) -> Vec<String> {
        let pts = self.points_to_of_var_ci(var);
        self.describe_set(program, &pts)
    }

    fn describe_set(&self, program: &Program, pts: &PointsToSet) -> Vec<String> {
        let names: BTreeSet<String> = pts
            .iter()
            .map(|o| self.describe_cs_obj(program, o))
            .collect();
        names.into_iter().collect()
    }

    pub fn describe_cs_obj(&self, program: &Program, obj: CsObjId) -> String {
        let data = self.elements.obj(obj);
        let obj_name = self.heap.describe(program, data.obj);
        if data.ctx == CtxId::EMPTY {
            obj_name
        } else {
            format!("{}:{}", self.describe_ctx(program, data.ctx), obj_name)
        }
    }

    pub fn describe_ctx(&self, program: &Program, ctx: CtxId) -> String {
        let parts: Vec<String> = self
            .ctxs
            .elements(ctx)
            .iter()
            .map(|e| match e {
                ContextElem::Call(site) => {
                    let data = program.call_site(*site);
                    format!("call@{}#{}", program.method(data.container).sig, site.0)
                }
                ContextElem::Obj(obj) => self.heap.describe(program, *obj),
                ContextElem::Type(ty) => program.type_name(*ty),
            })
            .collect();
        format!("[{}]", parts.join(","))
    }

    /// Name-based call-graph snapshot: sorted `caller -> callee` lines,
    /// contexts collapsed.
    pub fn call_edge_names(&self, program: &Program) -> Vec<String> {
        let lines: BTreeSet<String> = self
            .call_graph
            .edges()
            .iter()
            .map(|edge| self.describe_edge(program, edge))
            .collect();
        lines.into_iter().collect()
    }

    fn describe_edge(&self, program: &Program, edge: &CallEdge) -> String {
        let site = self.elements.call_site(edge.call_site);
        let callee = self.elements.method(edge.callee);
        let caller = program.call_site(site.site).container;
        let caller_class = &program.class(program.method(caller).owner).name;
        let callee_data = program.method(callee.method);
        let callee_class = &program.class(callee_data.owner).name;
        format!(
            "{caller_class}.{} -> {callee_class}.{}",
            program.method(caller).sig,
            callee_data.sig
        )
    }

    /// Name-based snapshot of every variable's points-to facts, for
    /// comparing runs whose internal ids differ. Sorted lines of the
    /// form `Class.method/var -> {obj, ...}`.
    pub fn snapshot(&self, program: &Program) -> Vec<String> {
        let mut lines = BTreeSet::new();
        for (id, kind) in self.elements.pointers() {
            let PointerKind::Var { var, .. } = kind else {
                continue;
            };
            let pts = self.elements.points_to(id);
            if pts.is_empty() {
                continue;
            }
            let data = program.var(var);
            let owner = program.method(data.method);
            let class = &program.class(owner.owner).name;
            let names = self.describe_set(program, pts);
            lines.insert(format!(
                "{class}.{}/{} -> {{{}}}",
                owner.sig,
                data.name,
                names.join(", ")
            ));
        }
        lines.into_iter().collect()
    }

    /// Two variables may alias if their points-to sets intersect in any
    /// pair of contexts.
    pub fn may_alias(&self, a: VarId, b: VarId) -> bool {
        let pa = self.points_to_of_var_ci(a);
        let pb = self.points_to_of_var_ci(b);
        // bound to a local so the iterator drops before pa and pb
        let aliased = pa.iter().any(|o| pb.contains(o));
        aliased
    }
}
