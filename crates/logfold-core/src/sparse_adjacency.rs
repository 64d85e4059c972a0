//! Sparse edge storage keyed by `(source, destination)` node indices.
//!
//! Edges live in a forward map (`source → destination → label`) and a
//! reverse map (`destination → sources`), so membership, child enumeration
//! and parent enumeration are all proportional to the node's degree rather
//! than to the total node count.
//!
//! The store never allocates per node up front; nodes exist only through the
//! edges that mention them.
//!
//! # Re-parenting
//!
//! Merging node `B` into node `A` is two bulk operations:
//!
//! ```text
//! change_parent_of_children(A, B)   every B→x becomes A→x
//! change_children_of_parents(B, A)  every x→B becomes x→A
//! ```
//!
//! Edges that would duplicate an existing pair are dropped (the existing
//! label wins), so an `A→B` edge collapses into at most one `A→A` self-loop.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Sparse directed adjacency with a payload per edge.
#[derive(Debug, Clone)]
pub struct SparseAdjacency<E> {
    outgoing: HashMap<u64, BTreeMap<u64, E>>,
    incoming: HashMap<u64, BTreeSet<u64>>,
    edge_count: usize,
}

impl<E> Default for SparseAdjacency<E> {
    fn default() -> Self {
        Self {
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            edge_count: 0,
        }
    }
}

impl<E: Clone> SparseAdjacency<E> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edge_count
    }

    /// Whether the store holds no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// Whether an edge `source → destination` exists.
    #[must_use]
    pub fn contains(&self, source: u64, destination: u64) -> bool {
        self.outgoing
            .get(&source)
            .is_some_and(|row| row.contains_key(&destination))
    }

    /// Label of the edge `source → destination`, if present.
    #[must_use]
    pub fn get(&self, source: u64, destination: u64) -> Option<&E> {
        self.outgoing.get(&source)?.get(&destination)
    }

    /// Insert a labeled edge.
    ///
    /// Returns `false` (and leaves the store untouched) if the pair already
    /// exists.
    pub fn insert(&mut self, source: u64, destination: u64, label: E) -> bool {
        let row = self.outgoing.entry(source).or_default();
        if row.contains_key(&destination) {
            return false;
        }
        row.insert(destination, label);
        self.incoming.entry(destination).or_default().insert(source);
        self.edge_count += 1;
        true
    }

    /// Remove the edge `source → destination`, returning its label.
    pub fn remove(&mut self, source: u64, destination: u64) -> Option<E> {
        let row = self.outgoing.get_mut(&source)?;
        let label = row.remove(&destination)?;
        if row.is_empty() {
            self.outgoing.remove(&source);
        }
        if let Some(parents) = self.incoming.get_mut(&destination) {
            parents.remove(&source);
            if parents.is_empty() {
                self.incoming.remove(&destination);
            }
        }
        self.edge_count -= 1;
        Some(label)
    }

    /// All `(destination, label)` pairs for edges leaving `source`, ordered
    /// by destination.
    #[must_use]
    pub fn children(&self, source: u64) -> Vec<(u64, &E)> {
        self.outgoing
            .get(&source)
            .map(|row| row.iter().map(|(&dst, label)| (dst, label)).collect())
            .unwrap_or_default()
    }

    /// All sources with an edge into `destination`, ascending.
    #[must_use]
    pub fn parents(&self, destination: u64) -> Vec<u64> {
        self.incoming
            .get(&destination)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every edge `old_parent → x` becomes `new_parent → x`.
    pub fn change_parent_of_children(&mut self, new_parent: u64, old_parent: u64) {
        if new_parent == old_parent {
            return;
        }
        let Some(row) = self.outgoing.get(&old_parent) else {
            return;
        };
        let moved: Vec<(u64, E)> = row.iter().map(|(&d, l)| (d, l.clone())).collect();
        for (destination, label) in moved {
            self.remove(old_parent, destination);
            self.insert(new_parent, destination, label);
        }
    }

    /// Every edge `x → old_child` becomes `x → new_child`.
    pub fn change_children_of_parents(&mut self, old_child: u64, new_child: u64) {
        if old_child == new_child {
            return;
        }
        for source in self.parents(old_child) {
            if let Some(label) = self.remove(source, old_child) {
                self.insert(source, new_child, label);
            }
        }
    }

    /// Iterate every edge as `(source, destination, label)`.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64, &E)> {
        self.outgoing
            .iter()
            .flat_map(|(&src, row)| row.iter().map(move |(&dst, label)| (src, dst, label)))
    }
}
