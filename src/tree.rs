//! Level tree shared by [`PathMap`](crate::PathMap) and [`PathSet`](crate::PathSet).
//!
//! Every level is an insertion-ordered map from one key component to a [`Slot`]: either a
//! child level or a terminal (the stored value for a map, the member set for a set). Levels
//! live in an arena and are addressed by [`LevelId`]; the root is always id 0 and is never
//! freed. Each non-root level is referenced by exactly one parent slot.
//!
//! Writes create levels on the way down. Removals record the chain of levels they visited
//! and walk it back up afterwards, freeing every level that was left empty.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use smallvec::SmallVec;

// =============================================================================
// Arena
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct LevelId(u32);

impl LevelId {
    pub(crate) const ROOT: LevelId = LevelId(0);

    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone)]
pub(crate) enum Slot<L> {
    Level(LevelId),
    Leaf(L),
}

pub(crate) type Level<K, L> = IndexMap<K, Slot<L>>;

/// Levels visited while descending, root first. Entry `i + 1` hangs off entry `i` under
/// path component `i`.
pub(crate) type Chain = SmallVec<[LevelId; 8]>;

#[derive(Clone)]
pub(crate) struct LevelTree<K, L> {
    /// Arena slots; `None` marks a freed level.
    levels: Vec<Option<Level<K, L>>>,
    /// Freed arena indices, reused before the arena grows.
    free: Vec<u32>,
    /// Number of terminal values a leaf accounts for.
    weight: fn(&L) -> usize,
}

impl<K, L> LevelTree<K, L> {
    pub(crate) fn with_capacity(levels: usize, weight: fn(&L) -> usize) -> Self {
        let mut arena = Vec::with_capacity(levels.max(1));
        arena.push(Some(IndexMap::new()));
        Self {
            levels: arena,
            free: Vec::new(),
            weight,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.levels.truncate(1);
        self.levels[0] = Some(IndexMap::new());
        self.free.clear();
    }

    /// Number of levels currently allocated, root included.
    #[cfg(test)]
    pub(crate) fn live_levels(&self) -> usize {
        self.levels.len() - self.free.len()
    }

    #[inline]
    pub(crate) fn level(&self, id: LevelId) -> &Level<K, L> {
        self.levels[id.idx()]
            .as_ref()
            .expect("level id must refer to a live level")
    }

    #[inline]
    pub(crate) fn level_mut(&mut self, id: LevelId) -> &mut Level<K, L> {
        self.levels[id.idx()]
            .as_mut()
            .expect("level id must refer to a live level")
    }

    fn alloc(&mut self) -> LevelId {
        if let Some(idx) = self.free.pop() {
            debug_assert!(self.levels[idx as usize].is_none());
            self.levels[idx as usize] = Some(IndexMap::new());
            return LevelId(idx);
        }
        let idx = u32::try_from(self.levels.len()).expect("level arena exceeds u32::MAX levels");
        self.levels.push(Some(IndexMap::new()));
        LevelId(idx)
    }

    fn free_level(&mut self, id: LevelId) -> Level<K, L> {
        debug_assert_ne!(id, LevelId::ROOT, "the root level is never freed");
        let level = self.levels[id.idx()]
            .take()
            .expect("freed level must be live");
        self.free.push(id.0);
        level
    }

    /// Frees every level below `slot` and returns how many terminal values were dropped.
    pub(crate) fn release(&mut self, slot: Slot<L>) -> usize {
        let mut dropped = 0;
        let mut stack = vec![slot];
        while let Some(slot) = stack.pop() {
            match slot {
                Slot::Leaf(leaf) => dropped += (self.weight)(&leaf),
                Slot::Level(id) => stack.extend(self.free_level(id).into_values()),
            }
        }
        dropped
    }

    pub(crate) fn leaves(&self) -> Leaves<'_, K, L> {
        Leaves {
            tree: self,
            stack: vec![self.level(LevelId::ROOT).iter()],
            path: Vec::new(),
        }
    }
}

impl<K: Hash + Eq, L> LevelTree<K, L> {
    /// Follows `prefix` from the root without creating anything.
    pub(crate) fn find_level(&self, prefix: &[K]) -> Option<LevelId> {
        let mut current = LevelId::ROOT;
        for key in prefix {
            match self.level(current).get(key)? {
                Slot::Level(id) => current = *id,
                Slot::Leaf(_) => return None,
            }
        }
        Some(current)
    }

    /// Like [`find_level`](Self::find_level), but records every level visited.
    pub(crate) fn find_chain(&self, prefix: &[K]) -> Option<Chain> {
        let mut chain = Chain::new();
        chain.push(LevelId::ROOT);
        let mut current = LevelId::ROOT;
        for key in prefix {
            match self.level(current).get(key)? {
                Slot::Level(id) => {
                    current = *id;
                    chain.push(current);
                }
                Slot::Leaf(_) => return None,
            }
        }
        Some(chain)
    }

    /// Walks `chain` back towards the root, freeing each level left empty and unlinking it
    /// from its parent. Stops at the first level that still has entries; the root is never
    /// freed.
    pub(crate) fn prune(&mut self, chain: &Chain, prefix: &[K]) {
        debug_assert_eq!(chain.len(), prefix.len() + 1);
        for depth in (1..chain.len()).rev() {
            let id = chain[depth];
            if !self.level(id).is_empty() {
                break;
            }
            self.free_level(id);
            let unlinked = self.level_mut(chain[depth - 1]).shift_remove(&prefix[depth - 1]);
            debug_assert!(matches!(unlinked, Some(Slot::Level(child)) if child == id));
        }
    }

    pub(crate) fn lookup(&self, path: &[K]) -> Lookup<'_, K, L> {
        let Some((last, prefix)) = path.split_last() else {
            return Lookup::Level(LevelRef {
                tree: self,
                id: LevelId::ROOT,
            });
        };
        match self.find_level(prefix) {
            Some(parent) => match self.level(parent).get(last) {
                Some(slot) => Lookup::from_slot(self, slot),
                None => Lookup::Absent,
            },
            None => Lookup::Absent,
        }
    }

    pub(crate) fn leaf_mut(&mut self, path: &[K]) -> Option<&mut L> {
        let (last, prefix) = path.split_last()?;
        let parent = self.find_level(prefix)?;
        match self.level_mut(parent).get_mut(last)? {
            Slot::Leaf(leaf) => Some(leaf),
            Slot::Level(_) => None,
        }
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        while matches!(self.levels.last(), Some(None)) {
            self.levels.pop();
        }
        let len = self.levels.len();
        self.free.retain(|&idx| (idx as usize) < len);
        self.levels.shrink_to_fit();
        self.free.shrink_to_fit();
        for level in self.levels.iter_mut().flatten() {
            level.shrink_to_fit();
        }
    }
}

impl<K: Hash + Eq + Clone, L> LevelTree<K, L> {
    /// Follows `prefix` from the root, creating missing levels.
    ///
    /// A terminal met on the way is replaced by a fresh level. Returns the level reached and
    /// how many terminal values were dropped by such replacements.
    pub(crate) fn find_or_create(&mut self, prefix: &[K]) -> (LevelId, usize) {
        let mut current = LevelId::ROOT;
        let mut dropped = 0;
        for key in prefix {
            current = match self.level(current).get(key) {
                Some(Slot::Level(id)) => *id,
                Some(Slot::Leaf(_)) | None => {
                    let id = self.alloc();
                    let displaced = self.level_mut(current).insert(key.clone(), Slot::Level(id));
                    if let Some(displaced) = displaced {
                        dropped += self.release(displaced);
                    }
                    id
                }
            };
        }
        (current, dropped)
    }
}

#[cfg(test)]
impl<K: Hash + Eq, L> LevelTree<K, L> {
    /// Checks the structural invariants and returns the number of reachable terminal values.
    pub(crate) fn validate(&self) -> usize {
        let mut seen = vec![false; self.levels.len()];
        let mut stack = vec![LevelId::ROOT];
        let mut values = 0usize;
        while let Some(id) = stack.pop() {
            assert!(
                !std::mem::replace(&mut seen[id.idx()], true),
                "level {} reachable twice",
                id.0
            );
            let level = self.level(id);
            if id != LevelId::ROOT {
                assert!(!level.is_empty(), "non-root level {} stored empty", id.0);
            }
            for slot in level.values() {
                match slot {
                    Slot::Level(child) => stack.push(*child),
                    Slot::Leaf(leaf) => {
                        let weight = (self.weight)(leaf);
                        assert_ne!(weight, 0, "terminal stored empty");
                        values += weight;
                    }
                }
            }
        }

        for (idx, level) in self.levels.iter().enumerate() {
            assert_eq!(
                level.is_some(),
                seen[idx],
                "arena slot {idx} must be live exactly when reachable"
            );
        }
        let mut free = self.free.clone();
        free.sort_unstable();
        free.dedup();
        assert_eq!(free.len(), self.free.len(), "free list holds duplicates");
        assert_eq!(
            self.live_levels(),
            seen.iter().filter(|&&s| s).count(),
            "free list must cover exactly the dead arena slots"
        );
        values
    }
}

// =============================================================================
// Views
// =============================================================================

/// Result of resolving a path.
///
/// A path as long as the stored depth resolves to the terminal ([`Lookup::Value`]); a shorter
/// one resolves to the intermediate level it names ([`Lookup::Level`]).
pub enum Lookup<'a, K, L> {
    Value(&'a L),
    Level(LevelRef<'a, K, L>),
    Absent,
}

impl<'a, K, L> Lookup<'a, K, L> {
    fn from_slot(tree: &'a LevelTree<K, L>, slot: &'a Slot<L>) -> Self {
        match slot {
            Slot::Leaf(leaf) => Lookup::Value(leaf),
            Slot::Level(id) => Lookup::Level(LevelRef { tree, id: *id }),
        }
    }

    pub fn value(self) -> Option<&'a L> {
        match self {
            Lookup::Value(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn level(self) -> Option<LevelRef<'a, K, L>> {
        match self {
            Lookup::Level(level) => Some(level),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Lookup::Value(_))
    }

    pub fn is_level(&self) -> bool {
        matches!(self, Lookup::Level(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    /// Child keys of the level this lookup resolved to; empty for terminals and absent paths.
    pub fn keys(self) -> Keys<'a, K, L> {
        match self {
            Lookup::Level(level) => level.keys(),
            _ => Keys { inner: None },
        }
    }
}

impl<K, L> Clone for Lookup<'_, K, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, L> Copy for Lookup<'_, K, L> {}

impl<K: fmt::Debug, L: fmt::Debug> fmt::Debug for Lookup<'_, K, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Value(leaf) => f.debug_tuple("Value").field(leaf).finish(),
            Lookup::Level(level) => f.debug_tuple("Level").field(level).finish(),
            Lookup::Absent => f.write_str("Absent"),
        }
    }
}

/// Read-only view of one intermediate level.
pub struct LevelRef<'a, K, L> {
    tree: &'a LevelTree<K, L>,
    id: LevelId,
}

impl<'a, K, L> LevelRef<'a, K, L> {
    #[inline]
    fn entries(&self) -> &'a Level<K, L> {
        self.tree.level(self.id)
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Only ever true for the root level.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn keys(&self) -> Keys<'a, K, L> {
        Keys {
            inner: Some(self.entries().keys()),
        }
    }

    pub fn iter(&self) -> LevelIter<'a, K, L> {
        LevelIter {
            tree: self.tree,
            inner: self.entries().iter(),
        }
    }
}

impl<'a, K: Hash + Eq, L> LevelRef<'a, K, L> {
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries().contains_key(key)
    }

    pub fn get(&self, key: &K) -> Lookup<'a, K, L> {
        match self.entries().get(key) {
            Some(slot) => Lookup::from_slot(self.tree, slot),
            None => Lookup::Absent,
        }
    }
}

impl<K, L> Clone for LevelRef<'_, K, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, L> Copy for LevelRef<'_, K, L> {}

impl<K: fmt::Debug, L: fmt::Debug> fmt::Debug for LevelRef<'_, K, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Child keys of a level, in the order they were first written.
pub struct Keys<'a, K, L> {
    inner: Option<indexmap::map::Keys<'a, K, Slot<L>>>,
}

impl<'a, K, L> Iterator for Keys<'a, K, L> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner
            .as_ref()
            .map_or((0, Some(0)), |keys| keys.size_hint())
    }
}

/// Direct children of a level, in insertion order.
pub struct LevelIter<'a, K, L> {
    tree: &'a LevelTree<K, L>,
    inner: indexmap::map::Iter<'a, K, Slot<L>>,
}

impl<'a, K, L> Iterator for LevelIter<'a, K, L> {
    type Item = (&'a K, Lookup<'a, K, L>);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, slot) = self.inner.next()?;
        Some((key, Lookup::from_slot(self.tree, slot)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Depth-first walk over every terminal, with the full path leading to it.
pub(crate) struct Leaves<'a, K, L> {
    tree: &'a LevelTree<K, L>,
    stack: Vec<indexmap::map::Iter<'a, K, Slot<L>>>,
    /// Keys leading to the level on top of `stack`.
    path: Vec<&'a K>,
}

impl<'a, K, L> Iterator for Leaves<'a, K, L> {
    type Item = (Vec<&'a K>, &'a L);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.last_mut()?.next() {
                None => {
                    self.stack.pop();
                    self.path.pop();
                }
                Some((key, Slot::Leaf(leaf))) => {
                    let mut full = Vec::with_capacity(self.path.len() + 1);
                    full.extend_from_slice(&self.path);
                    full.push(key);
                    return Some((full, leaf));
                }
                Some((key, Slot::Level(id))) => {
                    self.path.push(key);
                    self.stack.push(self.tree.level(*id).iter());
                }
            }
        }
    }
}
