//! Analysis features
//!
//! - `context`: interned context trie and selection strategies
//! - `heap`: allocation-site heap model with merge policies
//! - `elements`: context-sensitive element interning and points-to sets
//! - `call_graph`: on-the-fly context-sensitive call graph
//! - `solver`: work-list fixed-point engine, plugins, results

pub mod call_graph;
pub mod context;
pub mod elements;
pub mod heap;
pub mod solver;
