//! Key paths.

/// A path of key components addressing a position in a [`PathMap`](crate::PathMap) or
/// [`PathSet`](crate::PathSet).
///
/// A bare key is a path of length one. An empty sequence is the root path, which addresses
/// the top level itself.
///
/// Paths are built from borrowed keys, so lookups never clone:
///
/// ```rust
/// use nestmap::Path;
///
/// let single = Path::single(&"user");
/// assert_eq!(single.as_slice(), &["user"]);
///
/// let nested: Path<'_, &str> = Path::from(&["user", "read"]);
/// assert_eq!(nested.len(), 2);
///
/// assert!(Path::<&str>::root().is_root());
/// ```
#[derive(Debug)]
pub enum Path<'a, K> {
    Single(&'a K),
    Sequence(&'a [K]),
}

impl<'a, K> Path<'a, K> {
    pub fn single(key: &'a K) -> Self {
        Path::Single(key)
    }

    pub fn root() -> Self {
        Path::Sequence(&[])
    }

    /// The components of this path, outermost first.
    #[inline]
    pub fn as_slice(&self) -> &'a [K] {
        match *self {
            Path::Single(key) => std::slice::from_ref(key),
            Path::Sequence(keys) => keys,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<K> Clone for Path<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Path<'_, K> {}

impl<K> Default for Path<'_, K> {
    fn default() -> Self {
        Path::root()
    }
}

impl<'a, K> From<&'a [K]> for Path<'a, K> {
    fn from(keys: &'a [K]) -> Self {
        Path::Sequence(keys)
    }
}

impl<'a, K, const N: usize> From<&'a [K; N]> for Path<'a, K> {
    fn from(keys: &'a [K; N]) -> Self {
        Path::Sequence(keys.as_slice())
    }
}

impl<'a, K> From<&'a Vec<K>> for Path<'a, K> {
    fn from(keys: &'a Vec<K>) -> Self {
        Path::Sequence(keys.as_slice())
    }
}
