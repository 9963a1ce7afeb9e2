//! Context machinery: interned context trie and pluggable selection
//! strategies.

pub mod selector;
pub mod trie;

pub use selector::{make_selector, ContextSelector};
pub use trie::{ContextElem, ContextTrie, CtxId};
