//! Solver work list
//!
//! Two queues: pending points-to deltas and pending call edges. Pointer
//! entries drain before call edges each round, so argument binding for a
//! new edge sees settled receiver sets. The scheduling knob flips pop
//! order within each queue; any order reaches the same fixed point.

use crate::features::call_graph::CallEdge;
use crate::features::elements::{PointerId, PointsToSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Work-list pop order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheduling {
    Fifo,
    Lifo,
}

#[derive(Debug)]
pub struct WorkList {
    scheduling: Scheduling,
    pointer_entries: VecDeque<(PointerId, PointsToSet)>,
    call_edges: VecDeque<CallEdge>,
}

impl WorkList {
    pub fn new(scheduling: Scheduling) -> Self {
        Self {
            scheduling,
            pointer_entries: VecDeque::new(),
            call_edges: VecDeque::new(),
        }
    }

    pub fn push_pointer_entry(&mut self, pointer: PointerId, pts: PointsToSet) {
        self.pointer_entries.push_back((pointer, pts));
    }

    pub fn push_call_edge(&mut self, edge: CallEdge) {
        self.call_edges.push_back(edge);
    }

    pub fn poll_pointer_entry(&mut self) -> Option<(PointerId, PointsToSet)> {
        match self.scheduling {
            Scheduling::Fifo => self.pointer_entries.pop_front(),
            Scheduling::Lifo => self.pointer_entries.pop_back(),
        }
    }

    pub fn poll_call_edge(&mut self) -> Option<CallEdge> {
        match self.scheduling {
            Scheduling::Fifo => self.call_edges.pop_front(),
            Scheduling::Lifo => self.call_edges.pop_back(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pointer_entries.is_empty() && self.call_edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::elements::CsObjId;

    #[test]
    fn test_fifo_and_lifo_order() {
        for (scheduling, expected) in [
            (Scheduling::Fifo, [PointerId(0), PointerId(1)]),
            (Scheduling::Lifo, [PointerId(1), PointerId(0)]),
        ] {
            let mut wl = WorkList::new(scheduling);
            wl.push_pointer_entry(PointerId(0), PointsToSet::singleton(CsObjId(0)));
            wl.push_pointer_entry(PointerId(1), PointsToSet::singleton(CsObjId(1)));
            let order: Vec<_> = std::iter::from_fn(|| wl.poll_pointer_entry())
                .map(|(p, _)| p)
                .collect();
            assert_eq!(order, expected);
            assert!(wl.is_empty());
        }
    }
}
