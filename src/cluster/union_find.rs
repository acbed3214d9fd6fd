//! Disjoint-set structure used to merge pairwise duplicate judgments.

use std::collections::HashMap;
use std::hash::Hash;

/// Union-find over arbitrary hashable identities.
///
/// Elements are registered lazily: the first `find` or `union` touching an
/// identity adds it as its own root. Path compression runs on every lookup,
/// so repeated finds are effectively constant time.
#[derive(Debug, Clone, Default)]
pub struct UnionFind<T>
where
    T: Eq + Hash + Clone,
{
    parent: HashMap<T, T>,
}

impl<T> UnionFind<T>
where
    T: Eq + Hash + Clone,
{
    /// Create an empty structure.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: HashMap::new(),
        }
    }

    /// Whether this identity has ever been registered.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.parent.contains_key(item)
    }

    /// Number of registered identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether no identities are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// The representative root of this identity's class.
    ///
    /// Registers the identity as a fresh singleton class if unseen.
    /// Compresses the walked path so every visited node points at the root.
    pub fn find(&mut self, item: &T) -> T {
        if !self.parent.contains_key(item) {
            self.parent.insert(item.clone(), item.clone());
            return item.clone();
        }

        // First pass: walk up to the root.
        let mut root = item.clone();
        while self.parent[&root] != root {
            root = self.parent[&root].clone();
        }

        // Second pass: repoint everything on the path at the root.
        let mut current = item.clone();
        while current != root {
            let next = self.parent[&current].clone();
            self.parent.insert(current, root.clone());
            current = next;
        }

        root
    }

    /// Merge the classes of two identities.
    ///
    /// The first identity's root becomes the root of the merged class, so
    /// union order decides which representative survives.
    pub fn union(&mut self, a: &T, b: &T) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent.insert(root_b, root_a);
        }
    }

    /// Whether two identities share a class.
    pub fn same(&mut self, a: &T, b: &T) -> bool {
        self.find(a) == self.find(b)
    }
}
