use std::fmt;
use std::hash::Hash;

use indexmap::IndexSet;

use crate::path::Path;
use crate::tree::{Keys, Leaves, LevelTree, Lookup, Slot};

/// A multi-map from key paths to insertion-ordered sets of values.
///
/// Each full path owns one set. A set that loses its last member is removed together with
/// every ancestor level left empty, so no empty set or level is ever observable.
///
/// ```rust
/// use nestmap::PathSet;
///
/// let mut subscribers: PathSet<&str, u32> = PathSet::new();
/// subscribers.add(&["orders", "created"], 7);
/// subscribers.add(&["orders", "created"], 9);
/// subscribers.add(&["orders", "cancelled"], 7);
///
/// assert_eq!(subscribers.len(), 3);
/// assert!(subscribers.contains(&["orders", "created"], &9));
/// assert_eq!(subscribers.keys(&["orders"]).collect::<Vec<_>>(), [&"created", &"cancelled"]);
///
/// subscribers.remove(&["orders", "cancelled"], &7);
/// assert!(!subscribers.contains_path(&["orders", "cancelled"]));
/// ```
pub struct PathSet<K, T> {
    tree: LevelTree<K, IndexSet<T>>,
    count: usize,
}

impl<K, T> PathSet<K, T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty set with room for `levels` levels before the arena reallocates.
    pub fn with_capacity(levels: usize) -> Self {
        Self {
            tree: LevelTree::with_capacity(levels, IndexSet::len),
            count: 0,
        }
    }

    /// Number of memberships across all paths.
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

    /// Every membership with its full path, depth first.
    pub fn iter(&self) -> Iter<'_, K, T> {
        Iter {
            leaves: self.tree.leaves(),
            current: None,
        }
    }
}

impl<K: Hash + Eq, T: Hash + Eq> PathSet<K, T> {
    /// Resolves `path`: the set at a full path, the intermediate level at a shorter one
    /// (the root for the empty path), or [`Lookup::Absent`].
    pub fn get<'p, P>(&self, path: P) -> Lookup<'_, K, IndexSet<T>>
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        self.tree.lookup(path.into().as_slice())
    }

    fn terminal<'p>(&self, path: Path<'p, K>) -> Option<&IndexSet<T>> {
        self.tree.lookup(path.as_slice()).value()
    }

    /// True if the set at `path` holds `value`.
    pub fn contains<'p, P>(&self, path: P, value: &T) -> bool
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        self.terminal(path.into()).is_some_and(|set| set.contains(value))
    }

    /// True if `path` names an existing set or intermediate level. The root always exists.
    pub fn contains_path<'p, P>(&self, path: P) -> bool
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        !self.get(path).is_absent()
    }

    /// Child keys of the level at `path`, in the order they were created.
    pub fn keys<'p, P>(&self, path: P) -> Keys<'_, K, IndexSet<T>>
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        self.get(path).keys()
    }

    /// Members of the set at `path` in insertion order; empty if there is no such set.
    pub fn values<'p, P>(&self, path: P) -> Values<'_, T>
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        Values {
            inner: self.terminal(path.into()).map(IndexSet::iter),
        }
    }

    /// Like [`values`](Self::values), yielding each member paired with itself.
    pub fn entries<'p, P>(&self, path: P) -> Entries<'_, T>
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        Entries {
            inner: self.values(path),
        }
    }

    /// Calls `f(value, value, set)` for each member of the set at `path`, in insertion order.
    pub fn for_each<'p, P, F>(&self, path: P, mut f: F)
    where
        P: Into<Path<'p, K>>,
        K: 'p,
        F: FnMut(&T, &T, &IndexSet<T>),
    {
        if let Some(set) = self.terminal(path.into()) {
            for value in set {
                f(value, value, set);
            }
        }
    }

    /// Removes `value` from the set at `path`. A set left empty is removed along with every
    /// ancestor level left empty.
    pub fn remove<'p, P>(&mut self, path: P, value: &T) -> bool
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
        let level = self.tree.level_mut(chain[chain.len() - 1]);
        let Some(Slot::Leaf(set)) = level.get_mut(last) else {
            return false;
        };
        if !set.shift_remove(value) {
            return false;
        }
        self.count -= 1;

        if set.is_empty() {
            level.shift_remove(last);
            self.tree.prune(&chain, prefix);
        }
        true
    }

    pub fn shrink_to_fit(&mut self) {
        self.tree.shrink_to_fit();
    }
}

impl<K: Hash + Eq + Clone, T: Hash + Eq> PathSet<K, T> {
    /// Adds `value` to the set at `path`, creating the set and any intermediate levels.
    /// Returns the set after insertion.
    ///
    /// Writing through a position that holds a set replaces that set with a level, and
    /// writing at a position that holds a level replaces the whole subtree. Displaced
    /// members are dropped and no longer counted.
    ///
    /// # Panics
    ///
    /// Panics if `path` is empty.
    pub fn add<'p, P>(&mut self, path: P, value: T) -> &IndexSet<T>
    where
        P: Into<Path<'p, K>>,
        K: 'p,
    {
        let (last, prefix) = path
            .into()
            .as_slice()
            .split_last()
            .expect("cannot add at the root path");
        let (parent, dropped) = self.tree.find_or_create(prefix);
        self.count -= dropped;

        let level = self.tree.level_mut(parent);
        if !matches!(level.get(last), Some(Slot::Leaf(_))) {
            if let Some(displaced) = level.insert(last.clone(), Slot::Leaf(IndexSet::new())) {
                self.count -= self.tree.release(displaced);
            }
        }

        let set = match self.tree.level_mut(parent).get_mut(last) {
            Some(Slot::Leaf(set)) => set,
            _ => unreachable!("terminal set was just ensured"),
        };
        if set.insert(value) {
            self.count += 1;
        }
        set
    }
}

#[cfg(test)]
impl<K: Hash + Eq, T> PathSet<K, T> {
    pub(crate) fn validate(&self) {
        assert_eq!(
            self.tree.validate(),
            self.count,
            "reachable membership count must match PathSet::len"
        );
    }

    pub(crate) fn live_levels(&self) -> usize {
        self.tree.live_levels()
    }
}

impl<K, T> Default for PathSet<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, T: Clone> Clone for PathSet<K, T> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            count: self.count,
        }
    }
}

impl<K: fmt::Debug, T: fmt::Debug> fmt::Debug for PathSet<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.tree.leaves()).finish()
    }
}

/// Members of one terminal set.
pub struct Values<'a, T> {
    inner: Option<indexmap::set::Iter<'a, T>>,
}

impl<'a, T> Iterator for Values<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.as_ref().map_or((0, Some(0)), |it| it.size_hint())
    }
}

impl<T> ExactSizeIterator for Values<'_, T> {}

/// Members of one terminal set, each paired with itself.
pub struct Entries<'a, T> {
    inner: Values<'a, T>,
}

impl<'a, T> Iterator for Entries<'a, T> {
    type Item = (&'a T, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|value| (value, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Entries<'_, T> {}

pub struct Iter<'a, K, T> {
    leaves: Leaves<'a, K, IndexSet<T>>,
    current: Option<(Vec<&'a K>, indexmap::set::Iter<'a, T>)>,
}

impl<'a, K, T> Iterator for Iter<'a, K, T> {
    type Item = (Vec<&'a K>, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((path, members)) = &mut self.current {
                if let Some(value) = members.next() {
                    return Some((path.clone(), value));
                }
            }
            let (path, set) = self.leaves.next()?;
            self.current = Some((path, set.iter()));
        }
    }
}
