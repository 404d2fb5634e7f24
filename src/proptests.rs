use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Arbitrary)]
enum Component {
    A,
    B,
    C,
}

type FullPath = [Component; 3];

fn prefix_strategy() -> impl Strategy<Value = Vec<Component>> {
    prop::collection::vec(any::<Component>(), 0..=3)
}

fn member_strategy() -> impl Strategy<Value = u8> {
    0u8..4
}

#[derive(Clone, Debug, Arbitrary)]
enum MapOp {
    #[proptest(weight = 5)]
    Insert(FullPath, u8),
    #[proptest(weight = 3)]
    Remove(FullPath),
    #[proptest(weight = 2)]
    Get(FullPath),
    #[proptest(weight = 2)]
    Probe(#[proptest(strategy = "prefix_strategy()")] Vec<Component>),
    #[proptest(weight = 1)]
    DeleteSubtree(#[proptest(strategy = "prefix_strategy()")] Vec<Component>),
}

#[derive(Clone, Debug, Arbitrary)]
enum SetOp {
    #[proptest(weight = 5)]
    Add(FullPath, #[proptest(strategy = "member_strategy()")] u8),
    #[proptest(weight = 4)]
    Remove(FullPath, #[proptest(strategy = "member_strategy()")] u8),
    #[proptest(weight = 2)]
    Contains(FullPath, #[proptest(strategy = "member_strategy()")] u8),
    #[proptest(weight = 2)]
    Probe(#[proptest(strategy = "prefix_strategy()")] Vec<Component>),
}

fn flatten(path: Vec<&Component>) -> FullPath {
    assert_eq!(path.len(), 3, "every stored path has full depth");
    [*path[0], *path[1], *path[2]]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_map_equivalence(ops in prop::collection::vec(any::<MapOp>(), 0..=400)) {
        let mut t: PathMap<Component, u8> = PathMap::new();
        let mut m: HashMap<FullPath, u8> = HashMap::new();

        for op in ops {
            match op {
                MapOp::Insert(path, value) => {
                    prop_assert_eq!(t.insert(&path, value), m.insert(path, value));
                }
                MapOp::Remove(path) => {
                    prop_assert_eq!(t.remove(&path), m.remove(&path));
                }
                MapOp::Get(path) => {
                    prop_assert_eq!(t.get(&path).value().copied(), m.get(&path).copied());
                }
                MapOp::Probe(prefix) => {
                    let levels = t.live_levels();
                    let expected = prefix.is_empty() || m.keys().any(|k| k.starts_with(&prefix));
                    prop_assert_eq!(t.contains(&prefix), expected);
                    prop_assert_eq!(t.live_levels(), levels);
                }
                MapOp::DeleteSubtree(prefix) => {
                    let stored = m.keys().any(|k| k.starts_with(&prefix));
                    let expected = !prefix.is_empty() && stored;
                    prop_assert_eq!(t.delete(&prefix), expected);
                    if expected {
                        m.retain(|k, _| !k.starts_with(&prefix));
                    }
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        t.validate();
        let mut got: Vec<(FullPath, u8)> = t.iter().map(|(p, v)| (flatten(p), *v)).collect();
        let mut expected: Vec<(FullPath, u8)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        got.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(got, expected);

        for path in m.keys() {
            prop_assert!(t.delete(path));
        }
        prop_assert!(t.is_empty());
        prop_assert_eq!(t.live_levels(), 1);
    }

    #[test]
    fn prop_set_equivalence(ops in prop::collection::vec(any::<SetOp>(), 0..=400)) {
        let mut t: PathSet<Component, u8> = PathSet::new();
        let mut m: HashSet<(FullPath, u8)> = HashSet::new();

        for op in ops {
            match op {
                SetOp::Add(path, value) => {
                    let set_len = t.add(&path, value).len();
                    m.insert((path, value));
                    prop_assert_eq!(set_len, m.iter().filter(|(p, _)| *p == path).count());
                }
                SetOp::Remove(path, value) => {
                    prop_assert_eq!(t.remove(&path, &value), m.remove(&(path, value)));
                }
                SetOp::Contains(path, value) => {
                    prop_assert_eq!(t.contains(&path, &value), m.contains(&(path, value)));
                }
                SetOp::Probe(prefix) => {
                    let levels = t.live_levels();
                    let stored = m.iter().any(|(p, _)| p.starts_with(&prefix));
                    let expected = prefix.is_empty() || stored;
                    prop_assert_eq!(t.contains_path(&prefix), expected);
                    prop_assert_eq!(t.values(&prefix).count() > 0, prefix.len() == 3 && expected);
                    prop_assert_eq!(t.live_levels(), levels);
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        t.validate();
        let mut got: Vec<(FullPath, u8)> = t.iter().map(|(p, v)| (flatten(p), *v)).collect();
        let mut expected: Vec<(FullPath, u8)> = m.iter().copied().collect();
        got.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(got, expected);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_remove_order_map() {
    use Component::*;

    let paths: Vec<FullPath> = vec![
        [A, A, A],
        [A, A, B],
        [A, B, A],
        [B, A, A],
        [B, A, B],
        [C, C, C],
    ];

    let mut base: PathMap<Component, usize> = PathMap::new();
    for (i, path) in paths.iter().enumerate() {
        assert_eq!(base.insert(path, i), None);
    }
    // root, A, A/A, A/B, B, B/A, C, C/C
    assert_eq!(base.live_levels(), 8);

    for_each_permutation(&paths, |perm| {
        let mut t = base.clone();
        let mut remaining: Vec<FullPath> = paths.clone();

        for path in perm {
            assert!(t.delete(&path));
            remaining.retain(|p| *p != path);
            assert_eq!(t.len(), remaining.len());
            t.validate();

            // Every proper prefix survives exactly while some remaining path runs through it.
            for depth in 1..3 {
                let prefix = &path[..depth];
                let expected = remaining.iter().any(|p| p.starts_with(prefix));
                assert_eq!(t.contains(prefix), expected, "prefix {prefix:?}");
            }
        }

        assert!(t.is_empty());
        assert_eq!(t.live_levels(), 1);
        assert_eq!(t.keys(Path::root()).count(), 0);
    });
}

#[test]
fn exhaustive_remove_order_set() {
    use Component::*;

    let members: Vec<(FullPath, u8)> = vec![
        ([A, A, A], 0),
        ([A, A, A], 1),
        ([A, B, C], 0),
        ([B, B, B], 2),
        ([B, B, C], 2),
    ];

    let mut base: PathSet<Component, u8> = PathSet::new();
    for (path, value) in &members {
        base.add(path, *value);
    }
    assert_eq!(base.len(), members.len());

    for_each_permutation(&members, |perm| {
        let mut t = base.clone();
        let mut remaining = members.clone();

        for (path, value) in perm {
            assert!(t.remove(&path, &value));
            remaining.retain(|m| *m != (path, value));
            assert_eq!(t.len(), remaining.len());
            t.validate();

            let set_expected = remaining.iter().any(|(p, _)| *p == path);
            assert_eq!(t.contains_path(&path), set_expected);
            for depth in 1..3 {
                let prefix = &path[..depth];
                let expected = remaining.iter().any(|(p, _)| p.starts_with(prefix));
                assert_eq!(t.contains_path(prefix), expected, "prefix {prefix:?}");
            }
        }

        assert!(t.is_empty());
        assert_eq!(t.live_levels(), 1);
    });
}
