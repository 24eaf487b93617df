//! Insertion-ordered, name-keyed collection.
//!
//! Positions are stable: replacing an existing key keeps its slot, so
//! anything derived from iteration order (equation order, index maps) is
//! reproducible across redeclarations.

use std::collections::HashMap;
use std::ops::Index;

#[derive(Debug, Clone)]
pub struct NamedMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for NamedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> NamedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace. Returns the previous value when the key existed;
    /// the key keeps its original position in that case.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&pos) => Some(&mut self.entries[pos].1),
            None => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Position of `key` in insertion order.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn get_index(&self, pos: usize) -> Option<(&str, &V)> {
        self.entries.get(pos).map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    /// Shared access to `a` alongside mutable access to `b`.
    /// `None` when either key is missing or both name the same entry.
    pub fn pair_mut(&mut self, a: &str, b: &str) -> Option<(&V, &mut V)> {
        let (ia, ib) = (*self.index.get(a)?, *self.index.get(b)?);
        if ia < ib {
            let (head, tail) = self.entries.split_at_mut(ib);
            Some((&head[ia].1, &mut tail[0].1))
        } else if ib < ia {
            let (head, tail) = self.entries.split_at_mut(ia);
            Some((&tail[0].1, &mut head[ib].1))
        } else {
            None
        }
    }

    /// Remove `key`, shifting later entries down by one.
    pub fn shift_remove(&mut self, key: &str) -> Option<V> {
        let pos = self.index.remove(key)?;
        let (_, value) = self.entries.remove(pos);
        for (k, _) in &self.entries[pos..] {
            if let Some(p) = self.index.get_mut(k) {
                *p -= 1;
            }
        }
        Some(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

impl<V> Index<&str> for NamedMap<V> {
    type Output = V;

    /// Panics when `key` is absent, like `HashMap`.
    fn index(&self, key: &str) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("no entry named {key}"),
        }
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for NamedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = NamedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn order_is_first_insertion(keys in prop::collection::vec("[a-e]", 0..40)) {
            let mut map = NamedMap::new();
            let mut expected: Vec<String> = Vec::new();
            for (i, k) in keys.iter().enumerate() {
                map.insert(k.clone(), i);
                if !expected.contains(k) {
                    expected.push(k.clone());
                }
            }
            let got: Vec<String> = map.keys().map(str::to_owned).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
