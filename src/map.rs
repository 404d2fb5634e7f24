use std::fmt;
use std::hash::Hash;

use crate::path::Path;
use crate::tree::{Keys, Leaves, LevelTree, Lookup, Slot};

/// A map addressed by key paths.
///
/// Intermediate levels are created on insert and pruned as soon as a removal leaves them
/// empty. A path shorter than the stored depth resolves to the intermediate level it names.
///
/// ```rust
/// use nestmap::PathMap;
///
/// let mut balances: PathMap<&str, u64> = PathMap::new();
/// balances.insert(&["john", "checking"], 100);
/// balances.insert(&["john", "savings"], 250);
///
/// assert_eq!(balances.get(&["john", "checking"]).value(), Some(&100));
/// assert_eq!(balances.get(&["john"]).level().map(|l| l.len()), Some(2));
/// assert_eq!(balances.len(), 2);
/// ```
pub struct PathMap<K, V> {
    tree: LevelTree<K, V>,
    count: usize,
}

impl<K, V> PathMap<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty map with room for `levels` levels before the arena reallocates.
    pub fn with_capacity(levels: usize) -> Self {
        Self {
            tree: LevelTree::with_capacity(levels, |_| 1),
            count: 0,
        }
    }

    /// Number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn clear(&mut self) {
        self.tree.clear();
        self.count = 0;
    }

    /// Every stored value with its full path, depth first, children in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            leaves: self.tree.leaves(),
        }
    }
}

impl<K: Hash + Eq, V> PathMap<K, V> {
    /// Resolves `path`: the value at a full path, the intermediate level at a shorter one
    /// (the root for the empty path), or [`Lookup::Absent`].
    pub fn get<'p, P>(&self, path: P) -> Lookup<'_, K, V>
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        self.tree.lookup(path.into().as_slice())
    }

    pub fn get_mut<'p, P>(&mut self, path: P) -> Option<&mut V>
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        self.tree.leaf_mut(path.into().as_slice())
    }

    /// True if `path` resolves to a value or to an existing intermediate level.
    pub fn contains<'p, P>(&self, path: P) -> bool
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        !self.get(path).is_absent()
    }

    /// Child keys of the level at `path`, in the order they were created.
    pub fn keys<'p, P>(&self, path: P) -> Keys<'_, K, V>
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        self.get(path).keys()
    }

    /// Removes the value stored at exactly `path`, then frees every ancestor level the
    /// removal left empty. A path ending at an intermediate level removes nothing; use
    /// [`delete`](Self::delete) to drop a whole subtree.
    pub fn remove<'p, P>(&mut self, path: P) -> Option<V>
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        let (last, prefix) = path.into().as_slice().split_last()?;
        let chain = self.tree.find_chain(prefix)?;
        let level = self.tree.level_mut(chain[chain.len() - 1]);
        let Some(Slot::Leaf(_)) = level.get(last) else {
            return None;
        };
        let value = match level.shift_remove(last) {
            Some(Slot::Leaf(value)) => value,
            _ => unreachable!("slot was checked to hold a value"),
        };
        self.count -= 1;
        self.tree.prune(&chain, prefix);
        Some(value)
    }

    /// Removes whatever `path` names: the value at a full path, or the intermediate level at
    /// a shorter one together with every value below it. Ancestor levels left empty are
    /// freed. Returns false if nothing was stored there; the root path is never removed.
    pub fn delete<'p, P>(&mut self, path: P) -> bool
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        let Some((last, prefix)) = path.into().as_slice().split_last() else {
            return false;
        };
        let Some(chain) = self.tree.find_chain(prefix) else {
            return false;
        };
        let parent = chain[chain.len() - 1];
        let Some(slot) = self.tree.level_mut(parent).shift_remove(last) else {
            return false;
        };
        self.count -= self.tree.release(slot);
        self.tree.prune(&chain, prefix);
        true
    }

    pub fn shrink_to_fit(&mut self) {
        self.tree.shrink_to_fit();
    }
}

impl<K: Hash + Eq + Clone, V> PathMap<K, V> {
    /// Stores `value` at `path`, creating intermediate levels as needed. Returns the value
    /// previously stored at that exact path.
    ///
    /// Writing through a position that holds a value replaces that value with a level, and
    /// writing at a position that holds a level replaces the whole subtree. Displaced values
    /// are dropped and no longer counted.
    ///
    /// # Panics
    ///
    /// Panics if `path` is empty.
    pub fn insert<'p, P>(&mut self, path: P, value: V) -> Option<V>
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        let (last, prefix) = path
            .into()
            .as_slice()
            .split_last()
            .expect("cannot insert at the root path");
        let (parent, dropped) = self.tree.find_or_create(prefix);
        self.count -= dropped;

        let level = self.tree.level_mut(parent);
        if let Some(Slot::Leaf(old)) = level.get_mut(last) {
            return Some(std::mem::replace(old, value));
        }
        if let Some(displaced) = level.insert(last.clone(), Slot::Leaf(value)) {
            self.count -= self.tree.release(displaced);
        }
        self.count += 1;
        None
    }
}

#[cfg(test)]
impl<K: Hash + Eq, V> PathMap<K, V> {
    pub(crate) fn validate(&self) {
        assert_eq!(
            self.tree.validate(),
            self.count,
            "reachable value count must match PathMap::len"
        );
    }

    pub(crate) fn live_levels(&self) -> usize {
        self.tree.live_levels()
    }
}

impl<K, V> Default for PathMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for PathMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            count: self.count,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PathMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, K, V> {
    leaves: Leaves<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Vec<&'a K>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.leaves.next()
    }
}
