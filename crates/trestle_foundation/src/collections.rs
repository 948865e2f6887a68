//! Persistent collections with structural sharing.
//!
//! Thin wrappers around the `im` crate's persistent data structures,
//! providing Trestle-specific semantics and future-proofing the API.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;

use crate::error::{Error, Result};

/// Persistent vector with structural sharing.
///
/// Cloning is O(1). Modifications return a new vector sharing structure
/// with the original.
#[derive(Clone)]
pub struct TrVec<T>(im::Vector<T>)
where
    T: Clone;

impl<T: Clone> Default for TrVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> TrVec<T> {
    /// Creates an empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self(im::Vector::new())
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets an element by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.0.get(index)
    }

    /// Returns a new vector with the element appended.
    #[must_use]
    pub fn push_back(&self, value: T) -> Self {
        let mut new = self.0.clone();
        new.push_back(value);
        Self(new)
    }

    /// Returns a new vector with the element at `index` replaced.
    ///
    /// Returns `None` if `index` is out of bounds.
    #[must_use]
    pub fn update(&self, index: usize, value: T) -> Option<Self> {
        if index >= self.len() {
            return None;
        }
        let mut new = self.0.clone();
        new.set(index, value);
        Some(Self(new))
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for TrVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Clone + PartialEq> PartialEq for TrVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: Clone + Eq> Eq for TrVec<T> {}

impl<T: Clone + Hash> Hash for TrVec<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for item in self.iter() {
            item.hash(state);
        }
    }
}

impl<T: Clone> FromIterator<T> for TrVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(im::Vector::from_iter(iter))
    }
}

/// Persistent hash set with structural sharing.
#[derive(Clone)]
pub struct TrSet<T>(im::HashSet<T>)
where
    T: Clone + Eq + Hash;

impl<T: Clone + Eq + Hash> Default for TrSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash> TrSet<T> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self(im::HashSet::new())
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the set contains the value.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.0.contains(value)
    }

    /// Returns a new set with the value inserted.
    #[must_use]
    pub fn insert(&self, value: T) -> Self {
        let mut new = self.0.clone();
        new.insert(value);
        Self(new)
    }

    /// Returns a new set with the value removed.
    #[must_use]
    pub fn remove(&self, value: &T) -> Self {
        let mut new = self.0.clone();
        new.remove(value);
        Self(new)
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T: Clone + Eq + Hash + fmt::Debug> fmt::Debug for TrSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Clone + Eq + Hash> PartialEq for TrSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: Clone + Eq + Hash> Eq for TrSet<T> {}

impl<T: Clone + Eq + Hash> FromIterator<T> for TrSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(im::HashSet::from_iter(iter))
    }
}

/// Persistent hash map with structural sharing.
#[derive(Clone)]
pub struct TrMap<K, V>(im::HashMap<K, V>)
where
    K: Clone + Eq + Hash,
    V: Clone;

impl<K: Clone + Eq + Hash, V: Clone> Default for TrMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash, V: Clone> TrMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(im::HashMap::new())
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets a value by key.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.0.get(key)
    }

    /// Returns true if the map contains the key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.0.contains_key(key)
    }

    /// Returns a new map with the key-value pair inserted.
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let mut new = self.0.clone();
        new.insert(key, value);
        Self(new)
    }

    /// Returns a new map with the key removed.
    #[must_use]
    pub fn remove(&self, key: &K) -> Self {
        let mut new = self.0.clone();
        new.remove(key);
        Self(new)
    }

    /// Returns an iterator over key-value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.0.iter()
    }

    /// Returns an iterator over values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.0.values()
    }
}

impl<K: Clone + Eq + Hash + fmt::Debug, V: Clone + fmt::Debug> fmt::Debug for TrMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone + Eq + Hash, V: Clone + PartialEq> PartialEq for TrMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<K: Clone + Eq + Hash, V: Clone + Eq> Eq for TrMap<K, V> {}

impl<K: Clone + Eq + Hash, V: Clone + Hash> Hash for TrMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for (k, v) in self.iter() {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl<K: Clone + Eq + Hash, V: Clone> FromIterator<(K, V)> for TrMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(im::HashMap::from_iter(iter))
    }
}

/// A set with a declared subset of required members.
///
/// Required members are fixed at construction and cannot be removed;
/// attempting to do so is an error. Members added through
/// [`RequiredSet::add_optional`] may be freely retracted. This
/// distinguishes entries the system depends on structurally from entries a
/// caller may retract at will.
#[derive(Clone, Default)]
pub struct RequiredSet<T>
where
    T: Clone + Eq + Hash,
{
    required: TrSet<T>,
    optional: TrSet<T>,
}

impl<T: Clone + Eq + Hash + fmt::Debug> RequiredSet<T> {
    /// Creates a set whose required members are taken from `required`.
    #[must_use]
    pub fn new(required: impl IntoIterator<Item = T>) -> Self {
        Self {
            required: required.into_iter().collect(),
            optional: TrSet::new(),
        }
    }

    /// Returns a new set with `value` added as an optional member.
    ///
    /// Adding a value that is already required has no effect.
    #[must_use]
    pub fn add_optional(&self, value: T) -> Self {
        if self.required.contains(&value) {
            return self.clone();
        }
        Self {
            required: self.required.clone(),
            optional: self.optional.insert(value),
        }
    }

    /// Returns a new set with every value in `values` added as optional.
    #[must_use]
    pub fn add_all_optional(&self, values: impl IntoIterator<Item = T>) -> Self {
        let mut result = self.clone();
        for value in values {
            result = result.add_optional(value);
        }
        result
    }

    /// Returns a new set with `value` removed.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is a required member.
    pub fn remove(&self, value: &T) -> Result<Self> {
        if self.required.contains(value) {
            return Err(Error::required_member_removal(format!("{value:?}")));
        }
        Ok(Self {
            required: self.required.clone(),
            optional: self.optional.remove(value),
        })
    }

    /// Returns true if the set contains the value (required or optional).
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.required.contains(value) || self.optional.contains(value)
    }

    /// Returns true if `value` is a required member.
    #[must_use]
    pub fn is_required(&self, value: &T) -> bool {
        self.required.contains(value)
    }

    /// Returns the total number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    /// Returns true if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty()
    }

    /// Iterates all members, required first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.required.iter().chain(self.optional.iter())
    }
}

impl<T: Clone + Eq + Hash + fmt::Debug> fmt::Debug for RequiredSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequiredSet")
            .field("required", &self.required)
            .field("optional", &self.optional)
            .finish()
    }
}
