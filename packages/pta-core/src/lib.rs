/*
 * pta-core - Context-Sensitive Pointer Analysis Engine
 *
 * Feature-First layout:
 * - shared/     : Common models (typed IR, class hierarchy)
 * - config/     : Analysis options and variant parsing
 * - features/   : Vertical slices (context -> heap -> elements -> call_graph -> solver)
 *
 * The engine computes whole-program, flow-insensitive points-to sets and
 * a context-sensitive call graph in one fixed point: call edges are
 * discovered from points-to facts, and points-to facts flow across
 * discovered edges. Context sensitivity (call-site, object, type, or
 * none) is a constructor-time strategy choice.
 */

pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

pub use config::{AnalysisOptions, CsVariant};
pub use errors::{AnalysisError, Result};
pub use features::call_graph::{CallEdge, CsCallGraph};
pub use features::context::{ContextElem, ContextSelector, ContextTrie, CtxId};
pub use features::elements::{
    CsCallSiteId, CsMethodId, CsObjId, ElementManager, PointerId, PointerKind, PointsToSet,
};
pub use features::heap::{HeapModel, ObjId, ObjKind};
pub use features::solver::work_list::Scheduling;
pub use features::solver::{
    CompositePlugin, Plugin, PointerAnalysisResult, Solver, SolverApi, SolverStats,
};
pub use shared::ir::{Program, ProgramBuilder};
