//! Pointer flow graph
//!
//! Directed subset-constraint edges between pointer nodes. An edge may
//! carry a type filter (casts, array-element stores); objects failing the
//! filter do not flow across it.

use crate::features::elements::PointerId;
use crate::shared::ir::TypeId;
use rustc_hash::{FxHashMap, FxHashSet};

/// What a flow edge models; for diagnostics and dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    LocalAssign,
    Cast,
    InstanceLoad,
    InstanceStore,
    ArrayLoad,
    ArrayStore,
    StaticLoad,
    StaticStore,
    ParameterPassing,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerFlowEdge {
    pub target: PointerId,
    pub kind: FlowKind,
    /// Objects must be assignable to this type to flow across
    pub filter: Option<TypeId>,
}

#[derive(Debug, Default)]
pub struct PointerFlowGraph {
    out_edges: FxHashMap<PointerId, Vec<PointerFlowEdge>>,
    /// Keyed on the filter too: two casts between the same variables
    /// with different target types are distinct flows
    edge_set: FxHashSet<(PointerId, PointerId, FlowKind, Option<TypeId>)>,
    num_edges: usize,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge. Returns `true` if the edge is new.
    pub fn add_edge(
        &mut self,
        source: PointerId,
        target: PointerId,
        kind: FlowKind,
        filter: Option<TypeId>,
    ) -> bool {
        if !self.edge_set.insert((source, target, kind, filter)) {
            return false;
        }
        self.out_edges
            .entry(source)
            .or_default()
            .push(PointerFlowEdge { target, kind, filter });
        self.num_edges += 1;
        true
    }

    pub fn out_edges_of(&self, source: PointerId) -> &[PointerFlowEdge] {
        self.out_edges.get(&source).map_or(&[], Vec::as_slice)
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_dedup_by_kind_and_filter() {
        let mut pfg = PointerFlowGraph::new();
        let (a, b) = (PointerId(0), PointerId(1));
        assert!(pfg.add_edge(a, b, FlowKind::LocalAssign, None));
        assert!(!pfg.add_edge(a, b, FlowKind::LocalAssign, None));
        // a different kind between the same nodes is a distinct edge
        assert!(pfg.add_edge(a, b, FlowKind::Cast, Some(TypeId(0))));
        assert!(!pfg.add_edge(a, b, FlowKind::Cast, Some(TypeId(0))));
        // so is the same kind with a different type filter
        assert!(pfg.add_edge(a, b, FlowKind::Cast, Some(TypeId(1))));
        assert_eq!(pfg.out_edges_of(a).len(), 3);
        assert_eq!(pfg.num_edges(), 3);
        assert!(pfg.out_edges_of(b).is_empty());
    }
}
