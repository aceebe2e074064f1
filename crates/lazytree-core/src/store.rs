//! Per-document mapping from canonical path → lazy node.
//!
//! `get`/`intern` tolerate the benign race described in the design notes:
//! two threads discovering the same path simultaneously both build a node,
//! but only one's is kept — the loser silently adopts the winner's.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::node::LazyNode;

#[derive(Default)]
pub struct NodeStore {
    nodes: RwLock<HashMap<String, Arc<LazyNode>>>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, canonical_path: &str) -> Option<Arc<LazyNode>> {
        self.nodes.read().unwrap().get(canonical_path).cloned()
    }

    /// Returns the existing node at `canonical_path`, or builds one with
    /// `make` and interns it. If another thread won the race to intern
    /// first, `make`'s result is discarded and the winner's node returned.
    pub fn get_or_intern(
        &self,
        canonical_path: &str,
        make: impl FnOnce() -> Arc<LazyNode>,
    ) -> Arc<LazyNode> {
        if let Some(existing) = self.get(canonical_path) {
            return existing;
        }
        let candidate = make();
        let mut guard = self.nodes.write().unwrap();
        guard
            .entry(canonical_path.to_string())
            .or_insert(candidate)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
