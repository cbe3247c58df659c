//! Append-only event streams.
//!
//! Two streams, two traits: per-item facts and per-order facts. Records are
//! written in the same dispatch that mutates the corresponding entities, so a
//! storage adapter can hold both inside one transaction. No record is ever
//! updated or deleted.

use std::sync::{Arc, RwLock};

use thiserror::Error;
use uuid::Uuid;

use stockbook_core::ItemId;
use stockbook_orders::OrderType;

use crate::event::{EventReference, ItemEventRecord, OrderEventRecord};

/// Event stream operation error (infrastructure, not domain).
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("event append failed: {0}")]
    Append(String),

    #[error("event read failed: {0}")]
    Read(String),

    #[error("event serialization failed: {0}")]
    Serialize(String),
}

/// Append-only store for item-level events.
pub trait ItemEventStore: Send + Sync {
    fn append(&self, record: ItemEventRecord) -> Result<(), EventStoreError>;

    /// All events for one item, in append order.
    fn for_item(&self, item_id: ItemId) -> Result<Vec<ItemEventRecord>, EventStoreError>;

    /// All events caused by one business document, in append order.
    /// This is the reversal engine's lookup path.
    fn for_reference(
        &self,
        reference: &EventReference,
    ) -> Result<Vec<ItemEventRecord>, EventStoreError>;
}

/// Append-only store for order-level events.
pub trait OrderEventStore: Send + Sync {
    fn append(&self, record: OrderEventRecord) -> Result<(), EventStoreError>;

    /// Full history for one order, in append order.
    fn history(
        &self,
        order_type: OrderType,
        order_id: Uuid,
    ) -> Result<Vec<OrderEventRecord>, EventStoreError>;
}

impl<S> ItemEventStore for Arc<S>
where
    S: ItemEventStore + ?Sized,
{
    fn append(&self, record: ItemEventRecord) -> Result<(), EventStoreError> {
        (**self).append(record)
    }

    fn for_item(&self, item_id: ItemId) -> Result<Vec<ItemEventRecord>, EventStoreError> {
        (**self).for_item(item_id)
    }

    fn for_reference(
        &self,
        reference: &EventReference,
    ) -> Result<Vec<ItemEventRecord>, EventStoreError> {
        (**self).for_reference(reference)
    }
}

impl<S> OrderEventStore for Arc<S>
where
    S: OrderEventStore + ?Sized,
{
    fn append(&self, record: OrderEventRecord) -> Result<(), EventStoreError> {
        (**self).append(record)
    }

    fn history(
        &self,
        order_type: OrderType,
        order_id: Uuid,
    ) -> Result<Vec<OrderEventRecord>, EventStoreError> {
        (**self).history(order_type, order_id)
    }
}

/// In-memory append-only item event store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryItemEventStore {
    records: RwLock<Vec<ItemEventRecord>>,
}

impl InMemoryItemEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemEventStore for InMemoryItemEventStore {
    fn append(&self, record: ItemEventRecord) -> Result<(), EventStoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| EventStoreError::Append("lock poisoned".to_string()))?;
        records.push(record);
        Ok(())
    }

    fn for_item(&self, item_id: ItemId) -> Result<Vec<ItemEventRecord>, EventStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| EventStoreError::Read("lock poisoned".to_string()))?;
        Ok(records.iter().filter(|r| r.item_id == item_id).cloned().collect())
    }

    fn for_reference(
        &self,
        reference: &EventReference,
    ) -> Result<Vec<ItemEventRecord>, EventStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| EventStoreError::Read("lock poisoned".to_string()))?;
        Ok(records.iter().filter(|r| r.reference == *reference).cloned().collect())
    }
}

/// In-memory append-only order event store.
#[derive(Debug, Default)]
pub struct InMemoryOrderEventStore {
    records: RwLock<Vec<OrderEventRecord>>,
}

impl InMemoryOrderEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderEventStore for InMemoryOrderEventStore {
    fn append(&self, record: OrderEventRecord) -> Result<(), EventStoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| EventStoreError::Append("lock poisoned".to_string()))?;
        records.push(record);
        Ok(())
    }

    fn history(
        &self,
        order_type: OrderType,
        order_id: Uuid,
    ) -> Result<Vec<OrderEventRecord>, EventStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| EventStoreError::Read("lock poisoned".to_string()))?;
        Ok(records
            .iter()
            .filter(|r| r.order_type == order_type && r.order_id == order_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ItemEventKind, OrderEventKind};
    use chrono::Utc;
    use stockbook_inventory::QuantityEffect;

    #[test]
    fn item_events_are_isolated_per_item_and_reference() {
        let store = InMemoryItemEventStore::new();
        let item_a = ItemId::new();
        let item_b = ItemId::new();
        let ref_a = EventReference::purchase_order(Uuid::now_v7());
        let ref_b = EventReference::purchase_order(Uuid::now_v7());

        store
            .append(ItemEventRecord::new(
                item_a,
                ItemEventKind::PurchaseOrderCreated,
                10,
                ref_a,
                QuantityEffect::purchase(10),
                Utc::now(),
            ))
            .unwrap();
        store
            .append(ItemEventRecord::new(
                item_b,
                ItemEventKind::PurchaseOrderCreated,
                5,
                ref_b,
                QuantityEffect::purchase(5),
                Utc::now(),
            ))
            .unwrap();

        assert_eq!(store.for_item(item_a).unwrap().len(), 1);
        assert_eq!(store.for_reference(&ref_b).unwrap().len(), 1);
        assert_eq!(store.for_reference(&ref_b).unwrap()[0].item_id, item_b);
    }

    #[test]
    fn order_history_preserves_append_order() {
        let store = InMemoryOrderEventStore::new();
        let order_id = Uuid::now_v7();

        for kind in [OrderEventKind::Created, OrderEventKind::Updated, OrderEventKind::Deleted] {
            store
                .append(
                    OrderEventRecord::new(OrderType::Sales, order_id, kind, None, None, Utc::now())
                        .unwrap(),
                )
                .unwrap();
        }

        let history = store.history(OrderType::Sales, order_id).unwrap();
        let kinds: Vec<_> = history.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![OrderEventKind::Created, OrderEventKind::Updated, OrderEventKind::Deleted]
        );
        assert!(store.history(OrderType::Purchase, order_id).unwrap().is_empty());
    }
}
