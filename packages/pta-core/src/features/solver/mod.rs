//! Work-list fixed-point solver
//!
//! Andersen-style inclusion-based propagation with an on-the-fly call
//! graph: methods are analyzed only once some context-sensitive path
//! reaches them, and virtual call sites resolve per receiver object as
//! receiver sets grow. Transfer rules are monotone over the points-to
//! lattice, so the loop terminates at the least fixed point regardless
//! of scheduling.
//!
//! The solver is a single-use session: construct, attach plugins, call
//! [`Solver::solve`].

pub mod plugin;
pub mod pointer_flow_graph;
pub mod result;
pub mod work_list;

pub use plugin::{CompositePlugin, Plugin, SolverApi};
pub use result::{PointerAnalysisResult, SolverStats};

use crate::config::AnalysisOptions;
use crate::errors::{AnalysisError, Result};
use crate::features::call_graph::{CallEdge, CsCallGraph};
use crate::features::context::{ContextSelector, ContextTrie, CtxId};
use crate::features::elements::{
    CsObjId, ElementManager, PointerId, PointerKind, PointsToSet,
};
use crate::features::heap::HeapModel;
use crate::shared::hierarchy::ClassHierarchy;
use crate::shared::ir::{CallKind, ClassId, MethodId, Program, Stmt, TypeId, TypeKind, VarId};
use pointer_flow_graph::{FlowKind, PointerFlowGraph};
use rustc_hash::FxHashSet;
use tracing::{debug, info, trace};
use work_list::WorkList;

/// One pointer analysis run over a program.
pub struct Solver<'p> {
    program: &'p Program,
    options: AnalysisOptions,
    selector: Box<dyn ContextSelector>,
    ctxs: ContextTrie,
    heap: HeapModel,
    elements: ElementManager,
    call_graph: CsCallGraph,
    pfg: PointerFlowGraph,
    work_list: WorkList,
    plugins: CompositePlugin,
    /// Methods reachable in at least one context
    reachable_methods: FxHashSet<MethodId>,
    initialized_classes: FxHashSet<ClassId>,
    stats: result::SolverStats,
}

impl<'p> Solver<'p> {
    /// Fails fast on malformed options.
    pub fn new(program: &'p Program, options: AnalysisOptions) -> Result<Self> {
        let selector = crate::features::context::make_selector(&options)?;
        let heap = HeapModel::new(program, &options);
        let work_list = WorkList::new(options.scheduling);
        Ok(Self {
            program,
            options,
            selector,
            ctxs: ContextTrie::new(),
            heap,
            elements: ElementManager::new(),
            call_graph: CsCallGraph::new(),
            pfg: PointerFlowGraph::new(),
            work_list,
            plugins: CompositePlugin::default(),
            reachable_methods: FxHashSet::default(),
            initialized_classes: FxHashSet::default(),
            stats: result::SolverStats::default(),
        })
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.add(plugin);
    }

    /// Run to the fixed point and hand back the result. On budget
    /// exhaustion the sound-so-far facts travel inside the error.
    pub fn solve(mut self) -> Result<PointerAnalysisResult> {
        info!(
            context_sensitivity = %self.options.context_sensitivity,
            entry_points = self.program.entry_points().len(),
            "pointer analysis started"
        );
        let mut plugins = std::mem::take(&mut self.plugins);

        self.with_api(|api| plugins.on_preprocess(api));
        self.initialize(&mut plugins)?;
        self.with_api(|api| plugins.on_initialize(api));

        let complete = self.run_loop(&mut plugins)?;
        self.with_api(|api| plugins.on_finish(api));

        info!(
            steps = self.stats.steps,
            reachable = self.call_graph.num_reachable(),
            complete,
            "pointer analysis finished"
        );
        if complete {
            Ok(self.into_result(true))
        } else {
            let steps = self.stats.steps;
            Err(AnalysisError::Timeout {
                steps,
                partial: Box::new(self.into_result(false)),
            })
        }
    }

    fn with_api<F: FnOnce(&mut SolverApi<'_>)>(&mut self, f: F) {
        let mut api = SolverApi::new(
            self.program,
            &mut self.ctxs,
            &mut self.heap,
            &mut self.elements,
            &mut self.work_list,
        );
        f(&mut api);
    }

    fn initialize(&mut self, plugins: &mut CompositePlugin) -> Result<()> {
        let program = self.program;
        for &entry in program.entry_points() {
            let cs_entry = self.elements.get_method(CtxId::EMPTY, entry);
            self.call_graph.add_entry_method(cs_entry);
            self.process_new_cs_method(cs_entry, plugins)?;
        }
        Ok(())
    }

    /// Main loop. `Ok(false)` means the step budget ran out with work
    /// still pending.
    fn run_loop(&mut self, plugins: &mut CompositePlugin) -> Result<bool> {
        loop {
            if self.work_list.is_empty() {
                return Ok(true);
            }
            if let Some(budget) = self.options.step_budget {
                if self.stats.steps >= budget {
                    return Ok(false);
                }
            }
            // settle pointer facts before binding new call edges
            if let Some((pointer, pts)) = self.work_list.poll_pointer_entry() {
                self.stats.steps += 1;
                self.process_pointer_entry(pointer, pts, plugins)?;
                continue;
            }
            if let Some(edge) = self.work_list.poll_call_edge() {
                self.stats.steps += 1;
                self.process_call_edge(edge, plugins)?;
            }
        }
    }

    fn process_pointer_entry(
        &mut self,
        pointer: PointerId,
        pts: PointsToSet,
        plugins: &mut CompositePlugin,
    ) -> Result<()> {
        let delta = self.propagate(pointer, &pts);
        if delta.is_empty() {
            return Ok(());
        }
        if let PointerKind::Var { ctx, var } = self.elements.pointer(pointer) {
            for obj in delta.iter() {
                self.process_instance_accesses(ctx, var, obj);
                self.process_array_accesses(ctx, var, obj);
                self.process_call(ctx, var, obj);
            }
        }
        self.with_api(|api| plugins.on_new_points_to(pointer, &delta, api));
        Ok(())
    }

    /// Merge `pts` into the pointer's set and forward the growth along
    /// outgoing flow edges. Returns the growth.
    fn propagate(&mut self, pointer: PointerId, pts: &PointsToSet) -> PointsToSet {
        let delta = pts.difference(self.elements.points_to(pointer));
        if delta.is_empty() {
            return delta;
        }
        trace!(pointer = pointer.0, growth = delta.len(), "propagate");
        self.elements.points_to_mut(pointer).union_with(&delta);
        for edge in self.pfg.out_edges_of(pointer) {
            let out = match edge.filter {
                Some(ty) => {
                    filter_assignable(self.program, &self.heap, &self.elements, &delta, ty)
                }
                None => delta.clone(),
            };
            if !out.is_empty() {
                self.stats.propagations += out.len() as u64;
                self.work_list.push_pointer_entry(edge.target, out);
            }
        }
        delta
    }

    /// Field stores and loads anchored on `var`, now that `obj` is a
    /// possible base.
    fn process_instance_accesses(&mut self, ctx: CtxId, var: VarId, obj: CsObjId) {
        let rel = self.program.relevant(var);
        for &(field, rhs) in &rel.store_fields {
            let source = self.elements.get_var_pointer(ctx, rhs);
            let target = self.elements.get_instance_field_pointer(obj, field);
            self.add_pfg_edge(source, target, FlowKind::InstanceStore, None);
        }
        for &(lhs, field) in &rel.load_fields {
            let source = self.elements.get_instance_field_pointer(obj, field);
            let target = self.elements.get_var_pointer(ctx, lhs);
            self.add_pfg_edge(source, target, FlowKind::InstanceLoad, None);
        }
    }

    /// Array stores and loads anchored on `var`. Stores filter on the
    /// array object's element type, so a `String[]` reached through an
    /// `Object[]` variable never holds non-strings.
    fn process_array_accesses(&mut self, ctx: CtxId, var: VarId, obj: CsObjId) {
        let program = self.program;
        let obj_ty = self.heap.obj(self.elements.obj(obj).obj).ty;
        let TypeKind::Array(elem) = program.type_kind(obj_ty) else {
            return;
        };
        let rel = program.relevant(var);
        for &rhs in &rel.store_arrays {
            let source = self.elements.get_var_pointer(ctx, rhs);
            let target = self.elements.get_array_pointer(obj);
            self.add_pfg_edge(source, target, FlowKind::ArrayStore, Some(elem));
        }
        for &lhs in &rel.load_arrays {
            let source = self.elements.get_array_pointer(obj);
            let target = self.elements.get_var_pointer(ctx, lhs);
            self.add_pfg_edge(source, target, FlowKind::ArrayLoad, None);
        }
    }

    /// Resolve call sites with `var` as receiver against the new
    /// receiver object `obj` and queue the resulting edges.
    fn process_call(&mut self, ctx: CtxId, var: VarId, obj: CsObjId) {
        let program = self.program;
        let recv = self.elements.obj(obj);
        let recv_ty = self.heap.obj(recv.obj).ty;
        let hierarchy = ClassHierarchy::new(program);
        for &site in &program.relevant(var).invokes {
            let cs = program.call_site(site);
            let callee = match cs.kind {
                CallKind::Virtual | CallKind::Interface => hierarchy.dispatch(recv_ty, &cs.sig),
                CallKind::Special => cs.target,
                // static sites carry no receiver and never land here
                CallKind::Static => None,
            };
            let Some(callee) = callee else {
                debug!(sig = %cs.sig, ty = %program.type_name(recv_ty), "dispatch failed");
                continue;
            };
            let recv_type = self.heap.container_type(program, recv.obj);
            let callee_ctx = self.selector.select_context_dispatched(
                &mut self.ctxs,
                ctx,
                site,
                recv.ctx,
                recv.obj,
                recv_type,
                callee,
            );
            if let Some(this) = program.method(callee).this_var {
                let this_ptr = self.elements.get_var_pointer(callee_ctx, this);
                self.work_list
                    .push_pointer_entry(this_ptr, PointsToSet::singleton(obj));
            }
            let cs_site = self.elements.get_call_site(ctx, site);
            let cs_callee = self.elements.get_method(callee_ctx, callee);
            self.work_list.push_call_edge(CallEdge {
                kind: cs.kind,
                call_site: cs_site,
                callee: cs_callee,
            });
        }
    }

    /// Admit an edge into the call graph; on first sight, make the
    /// callee reachable and wire argument and return flow.
    fn process_call_edge(&mut self, edge: CallEdge, plugins: &mut CompositePlugin) -> Result<()> {
        if !self.call_graph.add_edge(edge) {
            return Ok(());
        }
        let program = self.program;
        let site = self.elements.call_site(edge.call_site);
        let callee = self.elements.method(edge.callee);
        trace!(
            site = %program.method(program.call_site(site.site).container).sig,
            callee = %program.method(callee.method).sig,
            "call edge"
        );
        self.process_new_cs_method(edge.callee, plugins)?;

        let cs = program.call_site(site.site);
        let callee_data = program.method(callee.method);
        for (&arg, &param) in cs.args.iter().zip(&callee_data.params) {
            let source = self.elements.get_var_pointer(site.ctx, arg);
            let target = self.elements.get_var_pointer(callee.ctx, param);
            self.add_pfg_edge(source, target, FlowKind::ParameterPassing, None);
        }
        if let Some(result) = cs.result {
            let target = self.elements.get_var_pointer(site.ctx, result);
            for &ret in &callee_data.return_vars {
                let source = self.elements.get_var_pointer(callee.ctx, ret);
                self.add_pfg_edge(source, target, FlowKind::Return, None);
            }
        }
        self.with_api(|api| plugins.on_new_call_edge(&edge, api));
        Ok(())
    }

    /// First visit of a (context, method) pair: run the context-free
    /// transfer rules of its body.
    fn process_new_cs_method(
        &mut self,
        cs_method: crate::features::elements::CsMethodId,
        plugins: &mut CompositePlugin,
    ) -> Result<()> {
        if !self.call_graph.add_reachable_method(cs_method) {
            return Ok(());
        }
        let program = self.program;
        let data = self.elements.method(cs_method);
        let (ctx, method) = (data.ctx, data.method);
        debug!(method = %program.method(method).sig, "reachable");
        if self.reachable_methods.insert(method) {
            self.with_api(|api| plugins.on_new_method(method, api));
        }
        self.with_api(|api| plugins.on_new_cs_method(cs_method, api));
        self.initialize_class(program.method(method).owner, plugins)?;

        for stmt in &program.method(method).stmts {
            match stmt {
                Stmt::New { lhs, site } => {
                    let obj = self.heap.get_obj(program, *site);
                    let special = self.heap.is_special(obj);
                    let heap_ctx = self.selector.select_heap_context(&mut self.ctxs, ctx, special);
                    let cs_obj = self.elements.get_obj(heap_ctx, obj);
                    let lhs_ptr = self.elements.get_var_pointer(ctx, *lhs);
                    self.work_list
                        .push_pointer_entry(lhs_ptr, PointsToSet::singleton(cs_obj));
                    if let Some(class) = program.base_class(self.heap.obj(obj).ty) {
                        self.initialize_class(class, plugins)?;
                    }
                }
                Stmt::AssignLiteral { lhs, literal } => {
                    let obj = self.heap.get_constant_obj(literal).ok_or_else(|| {
                        AnalysisError::UnsupportedIr(format!(
                            "string literal \"{literal}\" but no {} class declared",
                            crate::features::heap::STRING
                        ))
                    })?;
                    // constants always live in the default context
                    let cs_obj = self.elements.get_obj(CtxId::EMPTY, obj);
                    let lhs_ptr = self.elements.get_var_pointer(ctx, *lhs);
                    self.work_list
                        .push_pointer_entry(lhs_ptr, PointsToSet::singleton(cs_obj));
                }
                Stmt::Copy { lhs, rhs } => {
                    let source = self.elements.get_var_pointer(ctx, *rhs);
                    let target = self.elements.get_var_pointer(ctx, *lhs);
                    self.add_pfg_edge(source, target, FlowKind::LocalAssign, None);
                }
                Stmt::Cast { lhs, rhs, ty } => {
                    let source = self.elements.get_var_pointer(ctx, *rhs);
                    let target = self.elements.get_var_pointer(ctx, *lhs);
                    self.add_pfg_edge(source, target, FlowKind::Cast, Some(*ty));
                }
                Stmt::LoadStatic { lhs, field } => {
                    self.initialize_class(program.field(*field).owner, plugins)?;
                    let source = self.elements.get_static_field_pointer(*field);
                    let target = self.elements.get_var_pointer(ctx, *lhs);
                    self.add_pfg_edge(source, target, FlowKind::StaticLoad, None);
                }
                Stmt::StoreStatic { field, rhs } => {
                    self.initialize_class(program.field(*field).owner, plugins)?;
                    let source = self.elements.get_var_pointer(ctx, *rhs);
                    let target = self.elements.get_static_field_pointer(*field);
                    self.add_pfg_edge(source, target, FlowKind::StaticStore, None);
                }
                Stmt::Call(site) => {
                    let cs = program.call_site(*site);
                    if cs.kind != CallKind::Static {
                        // resolved per receiver object instead
                        continue;
                    }
                    let target = cs.target.ok_or_else(|| {
                        AnalysisError::UnsupportedIr(format!(
                            "static call site '{}' without a resolved target",
                            cs.sig
                        ))
                    })?;
                    self.initialize_class(program.method(target).owner, plugins)?;
                    let callee_ctx =
                        self.selector
                            .select_context(&mut self.ctxs, ctx, *site, target);
                    let cs_site = self.elements.get_call_site(ctx, *site);
                    let cs_callee = self.elements.get_method(callee_ctx, target);
                    self.work_list.push_call_edge(CallEdge {
                        kind: CallKind::Static,
                        call_site: cs_site,
                        callee: cs_callee,
                    });
                }
                // anchored on base/array variables; handled as their
                // points-to sets grow
                Stmt::LoadField { .. }
                | Stmt::StoreField { .. }
                | Stmt::LoadArray { .. }
                | Stmt::StoreArray { .. } => {}
            }
        }
        Ok(())
    }

    /// Run `<clinit>` of a class once it is first touched, superclasses
    /// first; always under the default context.
    fn initialize_class(
        &mut self,
        class: ClassId,
        plugins: &mut CompositePlugin,
    ) -> Result<()> {
        if !self.initialized_classes.insert(class) {
            return Ok(());
        }
        let data = self.program.class(class);
        if let Some(sup) = data.superclass {
            self.initialize_class(sup, plugins)?;
        }
        if let Some(clinit) = data.clinit {
            let cs = self.elements.get_method(CtxId::EMPTY, clinit);
            self.process_new_cs_method(cs, plugins)?;
        }
        Ok(())
    }

    /// Add a flow edge and replay the source's current set across it, so
    /// edges discovered late still see earlier facts.
    fn add_pfg_edge(
        &mut self,
        source: PointerId,
        target: PointerId,
        kind: FlowKind,
        filter: Option<TypeId>,
    ) {
        if !self.pfg.add_edge(source, target, kind, filter) {
            return;
        }
        let pts = self.elements.points_to(source);
        if pts.is_empty() {
            return;
        }
        let seed = match filter {
            Some(ty) => filter_assignable(self.program, &self.heap, &self.elements, pts, ty),
            None => pts.clone(),
        };
        if !seed.is_empty() {
            self.stats.propagations += seed.len() as u64;
            self.work_list.push_pointer_entry(target, seed);
        }
    }

    fn into_result(self, complete: bool) -> PointerAnalysisResult {
        let stats = result::SolverStats {
            contexts: self.ctxs.num_contexts(),
            objects: self.heap.objects().count(),
            pointers: self.elements.num_pointers(),
            flow_edges: self.pfg.num_edges(),
            reachable_methods: self.call_graph.num_reachable(),
            call_edges: self.call_graph.edges().len(),
            ..self.stats
        };
        PointerAnalysisResult {
            ctxs: self.ctxs,
            heap: self.heap,
            elements: self.elements,
            call_graph: self.call_graph,
            stats,
            complete,
        }
    }
}

/// Objects of `pts` whose type is assignable to `ty`.
fn filter_assignable(
    program: &Program,
    heap: &HeapModel,
    elements: &ElementManager,
    pts: &PointsToSet,
    ty: TypeId,
) -> PointsToSet {
    let hierarchy = ClassHierarchy::new(program);
    pts.iter()
        .filter(|o| {
            let obj_ty = heap.obj(elements.obj(*o).obj).ty;
            hierarchy.is_subtype(ty, obj_ty)
        })
        .collect()
}
