//! Shared models consumed by the analysis
//!
//! The typed three-address IR (`ir`) and the class-hierarchy dispatch
//! oracle (`hierarchy`). The frontend that would populate these from
//! program binaries is an external collaborator; [`ir::ProgramBuilder`]
//! stands in for it.

pub mod hierarchy;
pub mod ir;

pub use hierarchy::ClassHierarchy;
pub use ir::{
    AllocSiteId, CallKind, CallSiteId, ClassId, FieldId, MethodId, Program, ProgramBuilder, Stmt,
    TypeId, VarId,
};
