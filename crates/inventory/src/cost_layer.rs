//! Cost layers: one batch of received inventory carrying its own unit cost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{CostLayerId, Entity, ItemId};

/// One inventory receipt batch.
///
/// Created on receipt, never deleted, only drained to zero remaining.
/// `quantity_remaining` is mutated exclusively by [`CostLayer::consume`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLayer {
    id: CostLayerId,
    item_id: ItemId,
    unit_cost: f64,
    quantity_received: i64,
    quantity_remaining: i64,
    /// FIFO ordering key; ties are broken by the time-ordered layer id.
    receipt_date: DateTime<Utc>,
    location: Option<String>,
}

/// Result of consuming from a single layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Consumption {
    pub consumed: i64,
    pub cost: f64,
}

impl CostLayer {
    pub fn new(
        id: CostLayerId,
        item_id: ItemId,
        quantity: i64,
        unit_cost: f64,
        receipt_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            item_id,
            unit_cost,
            quantity_received: quantity,
            quantity_remaining: quantity,
            receipt_date,
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn id_typed(&self) -> CostLayerId {
        self.id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn unit_cost(&self) -> f64 {
        self.unit_cost
    }

    pub fn quantity_received(&self) -> i64 {
        self.quantity_received
    }

    pub fn quantity_remaining(&self) -> i64 {
        self.quantity_remaining
    }

    pub fn receipt_date(&self) -> DateTime<Utc> {
        self.receipt_date
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.quantity_remaining == 0
    }

    /// Consume up to `quantity` units from this layer.
    ///
    /// Consumes `min(quantity, remaining)` and returns the quantity taken and
    /// its cost. Invariant preserved: `0 <= remaining <= received`.
    pub fn consume(&mut self, quantity: i64) -> Consumption {
        let consumed = quantity.min(self.quantity_remaining).max(0);
        self.quantity_remaining -= consumed;

        Consumption {
            consumed,
            cost: consumed as f64 * self.unit_cost,
        }
    }

    /// Remaining value of this layer (`remaining * unit_cost`).
    pub fn remaining_value(&self) -> f64 {
        self.quantity_remaining as f64 * self.unit_cost
    }
}

impl Entity for CostLayer {
    type Id = CostLayerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(quantity: i64, unit_cost: f64) -> CostLayer {
        CostLayer::new(CostLayerId::new(), ItemId::new(), quantity, unit_cost, Utc::now())
    }

    #[test]
    fn consume_caps_at_remaining() {
        let mut layer = layer(30, 5.0);

        let first = layer.consume(20);
        assert_eq!(first.consumed, 20);
        assert_eq!(first.cost, 100.0);
        assert_eq!(layer.quantity_remaining(), 10);

        let second = layer.consume(20);
        assert_eq!(second.consumed, 10);
        assert_eq!(second.cost, 50.0);
        assert!(layer.is_exhausted());
    }

    #[test]
    fn consume_from_exhausted_layer_is_free() {
        let mut layer = layer(5, 2.5);
        layer.consume(5);

        let more = layer.consume(3);
        assert_eq!(more.consumed, 0);
        assert_eq!(more.cost, 0.0);
        assert_eq!(layer.quantity_remaining(), 0);
    }

    #[test]
    fn negative_request_consumes_nothing() {
        let mut layer = layer(5, 2.5);
        let out = layer.consume(-1);
        assert_eq!(out.consumed, 0);
        assert_eq!(layer.quantity_remaining(), 5);
    }
}
