//! Interned context trie
//!
//! Contexts are sequences of context elements (call sites, objects or
//! types), stored as a trie so that equal sequences share one node and
//! one id. Comparing contexts is then an integer compare, and a child
//! context costs one hash lookup.
//!
//! Node 0 is always the empty context.

use crate::features::heap::ObjId;
use crate::shared::ir::{CallSiteId, TypeId};
use rustc_hash::FxHashMap;

/// One element of a context string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextElem {
    Call(CallSiteId),
    Obj(ObjId),
    Type(TypeId),
}

/// Interned context id; `CtxId::EMPTY` is the empty context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CtxId(pub u32);

impl CtxId {
    pub const EMPTY: CtxId = CtxId(0);
}

#[derive(Debug, Clone)]
struct CtxNode {
    parent: CtxId,
    /// `None` only for the root
    elem: Option<ContextElem>,
    depth: u32,
}

/// Arena of interned contexts.
#[derive(Debug)]
pub struct ContextTrie {
    nodes: Vec<CtxNode>,
    children: FxHashMap<(CtxId, ContextElem), CtxId>,
}

impl Default for ContextTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![CtxNode {
                parent: CtxId::EMPTY,
                elem: None,
                depth: 0,
            }],
            children: FxHashMap::default(),
        }
    }

    pub fn empty(&self) -> CtxId {
        CtxId::EMPTY
    }

    /// Context extending `parent` by one element, interned.
    pub fn child(&mut self, parent: CtxId, elem: ContextElem) -> CtxId {
        if let Some(ctx) = self.children.get(&(parent, elem)) {
            return *ctx;
        }
        let ctx = CtxId(self.nodes.len() as u32);
        self.nodes.push(CtxNode {
            parent,
            elem: Some(elem),
            depth: self.nodes[parent.0 as usize].depth + 1,
        });
        self.children.insert((parent, elem), ctx);
        ctx
    }

    /// Context for an explicit element sequence, oldest first.
    pub fn get(&mut self, elems: &[ContextElem]) -> CtxId {
        let mut ctx = CtxId::EMPTY;
        for elem in elems {
            ctx = self.child(ctx, *elem);
        }
        ctx
    }

    /// Extend `parent` by `elem` under a length limit: when full, the
    /// oldest element falls off the front. A limit of zero always yields
    /// the empty context.
    pub fn append(&mut self, parent: CtxId, elem: ContextElem, limit: u32) -> CtxId {
        if limit == 0 {
            return CtxId::EMPTY;
        }
        if self.depth(parent) < limit {
            return self.child(parent, elem);
        }
        let suffix = self.last_k(parent, limit - 1);
        self.child(suffix, elem)
    }

    /// Context holding only the newest `k` elements of `ctx`.
    pub fn last_k(&mut self, ctx: CtxId, k: u32) -> CtxId {
        let elems = self.elements(ctx);
        let skip = elems.len().saturating_sub(k as usize);
        let mut out = CtxId::EMPTY;
        for elem in &elems[skip..] {
            out = self.child(out, *elem);
        }
        out
    }

    pub fn depth(&self, ctx: CtxId) -> u32 {
        self.nodes[ctx.0 as usize].depth
    }

    /// Elements of a context, oldest first.
    pub fn elements(&self, ctx: CtxId) -> Vec<ContextElem> {
        let mut elems = Vec::with_capacity(self.depth(ctx) as usize);
        let mut cur = ctx;
        while let Some(elem) = self.nodes[cur.0 as usize].elem {
            elems.push(elem);
            cur = self.nodes[cur.0 as usize].parent;
        }
        elems.reverse();
        elems
    }

    /// Number of distinct contexts interned so far, the root included.
    pub fn num_contexts(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(n: u32) -> ContextElem {
        ContextElem::Call(CallSiteId(n))
    }

    #[test]
    fn test_equal_sequences_intern_to_same_id() {
        let mut trie = ContextTrie::new();
        let a = trie.get(&[call(1), call(2)]);
        let b = trie.get(&[call(1), call(2)]);
        assert_eq!(a, b);
        let c = trie.get(&[call(2), call(1)]);
        assert_ne!(a, c);
        assert_eq!(trie.elements(a), vec![call(1), call(2)]);
    }

    #[test]
    fn test_empty_context_is_root() {
        let mut trie = ContextTrie::new();
        assert_eq!(trie.empty(), CtxId::EMPTY);
        assert_eq!(trie.get(&[]), CtxId::EMPTY);
        assert_eq!(trie.depth(CtxId::EMPTY), 0);
        assert!(trie.elements(CtxId::EMPTY).is_empty());
    }

    #[test]
    fn test_append_truncates_oldest_first() {
        let mut trie = ContextTrie::new();
        let c12 = trie.get(&[call(1), call(2)]);
        let c = trie.append(c12, call(3), 2);
        // [1, 2] + 3 under limit 2 keeps the newest two
        assert_eq!(trie.elements(c), vec![call(2), call(3)]);
        assert_eq!(c, trie.get(&[call(2), call(3)]));
    }

    #[test]
    fn test_append_below_limit_extends() {
        let mut trie = ContextTrie::new();
        let c1 = trie.get(&[call(1)]);
        let c = trie.append(c1, call(2), 3);
        assert_eq!(trie.elements(c), vec![call(1), call(2)]);
    }

    #[test]
    fn test_append_limit_zero_is_empty() {
        let mut trie = ContextTrie::new();
        let c1 = trie.get(&[call(1)]);
        assert_eq!(trie.append(c1, call(2), 0), CtxId::EMPTY);
    }

    #[test]
    fn test_last_k() {
        let mut trie = ContextTrie::new();
        let c = trie.get(&[call(1), call(2), call(3)]);
        assert_eq!(trie.last_k(c, 2), trie.get(&[call(2), call(3)]));
        assert_eq!(trie.last_k(c, 0), CtxId::EMPTY);
        assert_eq!(trie.last_k(c, 5), c);
    }
}
