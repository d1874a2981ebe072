use core::fmt::Debug;
use core::hash::Hash;

use crate::hash::{Entry, HashMap, NoOpHashState};

// -----------------------------------------------------------------------------
// KeyMap

/// A map container keyed by a `u64`-backed identity.
///
/// Keys are expected to hash through a single `write_u64` call
/// (e.g. `#[derive(Hash)]` on a `u64` newtype), so the map uses
/// [`NoOpHashState`] and skips hashing entirely.
///
/// The container's interface is fully abstracted, exposing no [`HashMap`]
/// specific APIs.
pub struct KeyMap<K, V>(HashMap<K, V, NoOpHashState>);

impl<K: Copy + Eq + Hash, V> KeyMap<K, V> {
    /// Creates an empty `KeyMap`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dc_utils::KeyMap;
    /// let map = KeyMap::<u64, i32>::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    pub const fn new() -> Self {
        Self(HashMap::with_hasher(NoOpHashState))
    }

    /// Creates an empty `KeyMap` with the specified capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(HashMap::with_capacity_and_hasher(capacity, NoOpHashState))
    }

    /// Attempts to insert a key-value pair into the map.
    ///
    /// - Returns `true` if the key was not present and the pair was successfully inserted.
    /// - Returns `false` if the key already exists, leaving the map unchanged.
    ///
    /// The closure `f` is only called if the key is not present.
    #[inline]
    pub fn try_insert(&mut self, key: K, f: impl FnOnce() -> V) -> bool {
        match self.0.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(f());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Gets a mutable reference to the value associated with the given key,
    /// inserting the result of `f` if the key is not present.
    #[inline]
    pub fn get_or_insert(&mut self, key: K, f: impl FnOnce() -> V) -> &mut V {
        match self.0.entry(key) {
            Entry::Vacant(entry) => entry.insert(f()),
            Entry::Occupied(entry) => entry.into_mut(),
        }
    }

    /// Returns a reference to the value corresponding to the key.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.0.get(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.0.get_mut(key)
    }

    /// Inserts a key-value pair into the map.
    #[inline]
    pub fn insert(&mut self, key: K, v: V) -> Option<V> {
        self.0.insert(key, v)
    }

    /// Removes a key from the map, returning the value at the key if the key was previously in the map.
    #[inline]
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.0.remove(key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of elements in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// An iterator visiting all key-value pairs in arbitrary order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&K, &V)> {
        self.0.iter()
    }

    /// An iterator visiting all values in arbitrary order.
    #[inline]
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.0.values()
    }

    /// An iterator visiting all keys in arbitrary order.
    #[inline]
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> {
        self.0.keys()
    }
}

// -----------------------------------------------------------------------------
// Traits

impl<K: Copy + Eq + Hash, V> Default for KeyMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for KeyMap<K, V> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<K: Debug, V: Debug> Debug for KeyMap<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::KeyMap;

    #[test]
    fn try_insert_keeps_first_value() {
        let mut map = KeyMap::<u64, &str>::new();
        assert!(map.try_insert(7, || "first"));
        assert!(!map.try_insert(7, || unreachable!()));
        assert_eq!(map.get(&7), Some(&"first"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn get_or_insert_returns_existing() {
        let mut map = KeyMap::<u64, i32>::new();
        *map.get_or_insert(1, || 10) += 1;
        assert_eq!(*map.get_or_insert(1, || 0), 11);
        assert_eq!(map.remove(&1), Some(11));
        assert!(map.is_empty());
    }
}
