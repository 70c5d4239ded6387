//! Index-keyed group lists.
//!
//! Repeating groups register under a caller-supplied item index so that
//! nested groups can be joined to them at build time. Keys iterate in the
//! order they were first registered.

use crate::arena::NodeId;

/// Nodes grouped by item index, in first-registration order.
#[derive(Debug, Clone, Default)]
pub struct Keyed {
    entries: Vec<(u32, Vec<NodeId>)>,
}

impl Keyed {
    /// Add a node under `key`, after any already registered there.
    pub fn push(&mut self, key: u32, id: NodeId) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, ids)) => ids.push(id),
            None => self.entries.push((key, vec![id])),
        }
    }

    /// Make `id` the only node under `key`, keeping the key's original
    /// position. Returns the nodes it displaced.
    pub fn replace(&mut self, key: u32, id: NodeId) -> Vec<NodeId> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, ids)) => std::mem::replace(ids, vec![id]),
            None => {
                self.entries.push((key, vec![id]));
                Vec::new()
            }
        }
    }

    /// Nodes under `key`.
    pub fn get(&self, key: u32) -> &[NodeId] {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Whether anything is registered under `key`.
    pub fn contains(&self, key: u32) -> bool {
        self.entries.iter().any(|(k, _)| *k == key)
    }

    /// `(key, nodes)` pairs in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[NodeId])> {
        self.entries.iter().map(|(k, ids)| (*k, ids.as_slice()))
    }

    /// Total number of nodes across all keys.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, ids)| ids.len()).sum()
    }

    /// Whether no node is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
