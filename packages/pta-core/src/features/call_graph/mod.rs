//! Context-sensitive call graph, built on the fly
//!
//! Nodes are context-sensitive methods, edges connect context-sensitive
//! call sites to their resolved callees. Reachability and edge insertion
//! are idempotent; insertion order is kept so result iteration is
//! deterministic for a fixed schedule.

use crate::features::elements::{CsCallSiteId, CsMethodId};
use crate::shared::ir::CallKind;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEdge {
    pub kind: CallKind,
    pub call_site: CsCallSiteId,
    pub callee: CsMethodId,
}

#[derive(Debug, Default)]
pub struct CsCallGraph {
    entry_methods: Vec<CsMethodId>,
    reachable: FxHashSet<CsMethodId>,
    /// Discovery order of reachable methods
    reachable_order: Vec<CsMethodId>,
    edges: Vec<CallEdge>,
    edge_set: FxHashSet<(CsCallSiteId, CsMethodId)>,
    callees: FxHashMap<CsCallSiteId, Vec<CsMethodId>>,
    callers: FxHashMap<CsMethodId, Vec<CsCallSiteId>>,
}

impl CsCallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry_method(&mut self, method: CsMethodId) {
        if !self.entry_methods.contains(&method) {
            self.entry_methods.push(method);
        }
    }

    /// Mark a method reachable. Returns `true` on first discovery.
    pub fn add_reachable_method(&mut self, method: CsMethodId) -> bool {
        if self.reachable.insert(method) {
            self.reachable_order.push(method);
            true
        } else {
            false
        }
    }

    pub fn is_reachable(&self, method: CsMethodId) -> bool {
        self.reachable.contains(&method)
    }

    /// Insert a call edge. Returns `true` if the edge is new.
    pub fn add_edge(&mut self, edge: CallEdge) -> bool {
        if !self.edge_set.insert((edge.call_site, edge.callee)) {
            return false;
        }
        self.edges.push(edge);
        self.callees.entry(edge.call_site).or_default().push(edge.callee);
        self.callers.entry(edge.callee).or_default().push(edge.call_site);
        true
    }

    pub fn entry_methods(&self) -> &[CsMethodId] {
        &self.entry_methods
    }

    pub fn reachable_methods(&self) -> &[CsMethodId] {
        &self.reachable_order
    }

    pub fn num_reachable(&self) -> usize {
        self.reachable.len()
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    pub fn callees_of(&self, site: CsCallSiteId) -> &[CsMethodId] {
        self.callees.get(&site).map_or(&[], Vec::as_slice)
    }

    pub fn callers_of(&self, method: CsMethodId) -> &[CsCallSiteId] {
        self.callers.get(&method).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reachability_idempotent() {
        let mut cg = CsCallGraph::new();
        let m = CsMethodId(0);
        assert!(cg.add_reachable_method(m));
        assert!(!cg.add_reachable_method(m));
        assert!(cg.is_reachable(m));
        assert_eq!(cg.reachable_methods(), &[m]);
    }

    #[test]
    fn test_edge_dedup_and_indexes() {
        let mut cg = CsCallGraph::new();
        let edge = CallEdge {
            kind: CallKind::Virtual,
            call_site: CsCallSiteId(1),
            callee: CsMethodId(2),
        };
        assert!(cg.add_edge(edge));
        assert!(!cg.add_edge(edge));
        assert_eq!(cg.edges().len(), 1);
        assert_eq!(cg.callees_of(CsCallSiteId(1)), &[CsMethodId(2)]);
        assert_eq!(cg.callers_of(CsMethodId(2)), &[CsCallSiteId(1)]);
        assert!(cg.callees_of(CsCallSiteId(9)).is_empty());
    }
}
