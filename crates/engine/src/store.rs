//! Entity stores (trait + in-memory implementations).
//!
//! The engine talks to persistence through these traits only; the in-memory
//! implementations back tests and dev. A production adapter maps them onto a
//! relational schema and must give each dispatch an all-or-nothing boundary.
//! Item saves carry an `ExpectedVersion` so concurrent dispatches against the
//! same item cannot silently overwrite each other's recomputation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use stockbook_core::{CostLayerId, ExpectedVersion, ItemId};
use stockbook_inventory::{CostLayer, Item};

/// Entity store failure (infrastructure, not domain).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,

    #[error("version conflict: expected {expected:?}, actual {actual}")]
    VersionConflict { expected: ExpectedVersion, actual: u64 },

    #[error("duplicate id: {0}")]
    DuplicateId(String),
}

/// Generic keyed store for order aggregates and fulfillments.
pub trait Repository<K, V>: Send + Sync {
    fn insert(&self, key: K, value: V) -> Result<(), StoreError>;
    fn get(&self, key: &K) -> Result<Option<V>, StoreError>;
    fn save(&self, key: K, value: V) -> Result<(), StoreError>;
    fn remove(&self, key: &K) -> Result<Option<V>, StoreError>;
    fn list(&self) -> Result<Vec<V>, StoreError>;
}

/// Item store with optimistic concurrency on save.
pub trait ItemStore: Send + Sync {
    fn insert(&self, item: Item) -> Result<(), StoreError>;
    fn get(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Persist a mutated item. `expected` is the version the caller loaded;
    /// the save fails with `VersionConflict` if the stored row has moved.
    fn save(&self, item: Item, expected: ExpectedVersion) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<Item>, StoreError>;
}

/// Cost-layer store: layers are inserted on receipt and updated (drained)
/// by fulfillment, never removed.
pub trait CostLayerStore: Send + Sync {
    fn insert(&self, layer: CostLayer) -> Result<(), StoreError>;

    /// All layers for an item, including exhausted ones.
    fn for_item(&self, item_id: ItemId) -> Result<Vec<CostLayer>, StoreError>;

    /// Persist consumption results for already-known layers.
    fn save_all(&self, layers: &[CostLayer]) -> Result<(), StoreError>;
}

impl<K, V, S> Repository<K, V> for Arc<S>
where
    S: Repository<K, V> + ?Sized,
{
    fn insert(&self, key: K, value: V) -> Result<(), StoreError> {
        (**self).insert(key, value)
    }

    fn get(&self, key: &K) -> Result<Option<V>, StoreError> {
        (**self).get(key)
    }

    fn save(&self, key: K, value: V) -> Result<(), StoreError> {
        (**self).save(key, value)
    }

    fn remove(&self, key: &K) -> Result<Option<V>, StoreError> {
        (**self).remove(key)
    }

    fn list(&self) -> Result<Vec<V>, StoreError> {
        (**self).list()
    }
}

/// In-memory keyed store for tests/dev.
#[derive(Debug)]
pub struct InMemoryRepository<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> InMemoryRepository<K, V> {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }
}

impl<K, V> Default for InMemoryRepository<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Repository<K, V> for InMemoryRepository<K, V>
where
    K: Clone + Eq + Hash + core::fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn insert(&self, key: K, value: V) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if map.contains_key(&key) {
            return Err(StoreError::DuplicateId(format!("{key:?}")));
        }
        map.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &K) -> Result<Option<V>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn save(&self, key: K, value: V) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &K) -> Result<Option<V>, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(map.remove(key))
    }

    fn list(&self) -> Result<Vec<V>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().cloned().collect())
    }
}

/// In-memory item store enforcing optimistic versioning.
#[derive(Debug, Default)]
pub struct InMemoryItemStore {
    inner: RwLock<HashMap<ItemId, Item>>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemStore for InMemoryItemStore {
    fn insert(&self, item: Item) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let id = item.id_typed();
        if map.contains_key(&id) {
            return Err(StoreError::DuplicateId(id.to_string()));
        }
        map.insert(id, item);
        Ok(())
    }

    fn get(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&id).cloned())
    }

    fn save(&self, item: Item, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let current = map.get(&item.id_typed()).map(|i| i.version()).unwrap_or(0);
        if !expected.matches(current) {
            return Err(StoreError::VersionConflict { expected, actual: current });
        }
        map.insert(item.id_typed(), item);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Item>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().cloned().collect())
    }
}

/// In-memory cost-layer store.
#[derive(Debug, Default)]
pub struct InMemoryCostLayerStore {
    inner: RwLock<HashMap<CostLayerId, CostLayer>>,
}

impl InMemoryCostLayerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CostLayerStore for InMemoryCostLayerStore {
    fn insert(&self, layer: CostLayer) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let id = layer.id_typed();
        if map.contains_key(&id) {
            return Err(StoreError::DuplicateId(id.to_string()));
        }
        map.insert(id, layer);
        Ok(())
    }

    fn for_item(&self, item_id: ItemId) -> Result<Vec<CostLayer>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().filter(|l| l.item_id() == item_id).cloned().collect())
    }

    fn save_all(&self, layers: &[CostLayer]) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        for layer in layers {
            map.insert(layer.id_typed(), layer.clone());
        }
        Ok(())
    }
}

/// Sequential, unique order-number generation (`PO-00001`, `SO-00001`, …).
#[derive(Debug, Default)]
pub struct OrderNumberSequences {
    purchase: AtomicU64,
    sales: AtomicU64,
}

impl OrderNumberSequences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_purchase(&self) -> String {
        let n = self.purchase.fetch_add(1, Ordering::SeqCst) + 1;
        format!("PO-{n:05}")
    }

    pub fn next_sales(&self) -> String {
        let n = self.sales.fetch_add(1, Ordering::SeqCst) + 1;
        format!("SO-{n:05}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn item_save_enforces_expected_version() {
        let store = InMemoryItemStore::new();
        let mut item = Item::new(ItemId::new(), "WID-1", "Widget", Utc::now());
        let id = item.id_typed();
        store.insert(item.clone()).unwrap();

        let expected = ExpectedVersion::Exact(item.version());
        item.apply_effect(&stockbook_inventory::QuantityEffect::adjustment(5), Utc::now());
        store.save(item.clone(), expected).unwrap();

        // A stale writer loses.
        let err = store.save(item.clone(), expected).unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
        assert_eq!(store.get(id).unwrap().unwrap().on_hand(), 5);
    }

    #[test]
    fn insert_rejects_duplicates() {
        let store = InMemoryItemStore::new();
        let item = Item::new(ItemId::new(), "WID-1", "Widget", Utc::now());
        store.insert(item.clone()).unwrap();
        assert!(matches!(store.insert(item), Err(StoreError::DuplicateId(_))));
    }

    #[test]
    fn cost_layer_store_filters_by_item() {
        let store = InMemoryCostLayerStore::new();
        let item_a = ItemId::new();
        let item_b = ItemId::new();
        store
            .insert(CostLayer::new(CostLayerId::new(), item_a, 10, 1.0, Utc::now()))
            .unwrap();
        store
            .insert(CostLayer::new(CostLayerId::new(), item_b, 20, 2.0, Utc::now()))
            .unwrap();

        let layers = store.for_item(item_a).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].quantity_received(), 10);
    }

    #[test]
    fn order_numbers_are_sequential_per_type() {
        let seq = OrderNumberSequences::new();
        assert_eq!(seq.next_purchase(), "PO-00001");
        assert_eq!(seq.next_purchase(), "PO-00002");
        assert_eq!(seq.next_sales(), "SO-00001");
    }
}
