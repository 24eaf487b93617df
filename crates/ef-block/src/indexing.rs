//! Stable positional indexing for solver integration.
//!
//! Maps block unknowns (variables and derivative markers) to contiguous
//! solver indices `0..N`. Indices are assigned in insertion order and never
//! change afterwards.

use core::hash::Hash;
use std::collections::HashMap;

use ef_core::{Quantity, QuantityId};
use ef_expr::Derivative;

/// Something that can occupy a solver slot.
pub trait SlotKey: Clone {
    type Key: Copy + Eq + Hash;

    fn slot_key(&self) -> Self::Key;
}

impl SlotKey for Quantity {
    type Key = QuantityId;

    fn slot_key(&self) -> QuantityId {
        self.id()
    }
}

impl SlotKey for Derivative {
    type Key = (QuantityId, QuantityId);

    fn slot_key(&self) -> Self::Key {
        self.key()
    }
}

/// Bidirectional map between items and contiguous indices.
#[derive(Clone, Debug)]
pub struct IndexMap<T: SlotKey> {
    /// index -> item
    items: Vec<T>,
    /// item key -> index
    to_idx: HashMap<T::Key, usize>,
}

impl<T: SlotKey> Default for IndexMap<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            to_idx: HashMap::new(),
        }
    }
}

impl<T: SlotKey> IndexMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of `item`, assigning the next free one on first sight.
    pub fn insert(&mut self, item: &T) -> usize {
        let next = self.items.len();
        let idx = *self.to_idx.entry(item.slot_key()).or_insert(next);
        if idx == next {
            self.items.push(item.clone());
        }
        idx
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.to_idx.get(&item.slot_key()).copied()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.to_idx.contains_key(&item.slot_key())
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

pub type VariableIndexMap = IndexMap<Quantity>;
pub type DerivativeIndexMap = IndexMap<Derivative>;

impl VariableIndexMap {
    /// Qualified keys in slot order.
    pub fn keys(&self) -> Vec<String> {
        self.items.iter().map(Quantity::key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ef_core::{QuantityKind, si};

    fn var(name: &str) -> Quantity {
        Quantity::new(QuantityKind::Variable, name, "M", si::DIMENSIONLESS, "")
    }

    #[test]
    fn assigns_contiguous_first_seen_indices() {
        let (a, b) = (var("a"), var("b"));
        let mut map = VariableIndexMap::new();
        assert_eq!(map.insert(&b), 0);
        assert_eq!(map.insert(&a), 1);
        assert_eq!(map.insert(&b), 0);
        assert_eq!(map.len(), 2);
        assert_eq!(map.index_of(&a), Some(1));
        assert_eq!(map.get(0), Some(&b));
        assert_eq!(map.keys(), ["b@M", "a@M"]);
        assert!(map.index_of(&var("a")).is_none());
    }

    #[test]
    fn derivatives_are_keyed_by_both_operands() {
        let (x, t, s) = (var("x"), var("t"), var("s"));
        let mut map = DerivativeIndexMap::new();
        let dxdt = Derivative { of: x.clone(), wrt: t.clone() };
        let dxds = Derivative { of: x.clone(), wrt: s };
        assert_eq!(map.insert(&dxdt), 0);
        assert_eq!(map.insert(&dxds), 1);
        assert_eq!(map.insert(&Derivative { of: x, wrt: t }), 0);
    }
}
