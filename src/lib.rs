//! # nestmap
//!
//! Containers addressed by key paths instead of flat keys.
//!
//! - [`PathMap`] maps a path of key components to one value.
//! - [`PathSet`] maps a path of key components to an insertion-ordered set of values.
//!
//! Both keep a tree of levels, one per path component. Levels are created on the first
//! write through them and freed the moment a removal leaves them empty, cascading up to the
//! root. A path shorter than the stored depth resolves to the intermediate level it names,
//! so whole subtrees can be inspected.
//!
//! ## Example
//!
//! ```rust
//! use nestmap::{Lookup, Path, PathMap};
//!
//! // (resource, operation, user) -> grant id
//! let mut grants: PathMap<&str, u32> = PathMap::new();
//! grants.insert(&["report", "read", "alice"], 1);
//! grants.insert(&["report", "write", "alice"], 2);
//!
//! assert_eq!(grants.get(&["report", "read", "alice"]).value(), Some(&1));
//! match grants.get(&["report"]) {
//!     Lookup::Level(ops) => assert_eq!(ops.len(), 2),
//!     _ => unreachable!(),
//! }
//!
//! assert!(grants.delete(&["report", "read", "alice"]));
//! assert!(!grants.contains(&["report", "read"]));
//! assert!(grants.contains(Path::single(&"report")));
//! ```

mod map;
mod path;
mod set;
mod tree;

pub use indexmap::IndexSet;

pub use map::{Iter as MapIter, PathMap};
pub use path::Path;
pub use set::{Entries, Iter as SetIter, PathSet, Values};
pub use tree::{Keys, LevelIter, LevelRef, Lookup};

#[cfg(test)]
mod proptests;
