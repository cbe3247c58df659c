//! The item master record and its derived quantity projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{AuditInfo, Entity, ItemId};

use crate::effect::QuantityEffect;

/// Inventory item master record.
///
/// The five quantity fields form a projection that is recomputed by every
/// event handler: `available` is derived, never a source of truth. Items are
/// created once via the catalog and mutated only through applied effects,
/// never directly by order logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    sku: String,
    name: String,

    on_hand: i64,
    on_order: i64,
    committed: i64,
    back_ordered: i64,
    available: i64,

    /// Incremented on every applied effect; checked by the item store on save.
    version: u64,
    audit: AuditInfo,
}

/// Read-only view of an item's quantity fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuantities {
    pub on_hand: i64,
    pub on_order: i64,
    pub committed: i64,
    pub back_ordered: i64,
    pub available: i64,
}

impl Item {
    pub fn new(id: ItemId, sku: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            sku: sku.into(),
            name: name.into(),
            on_hand: 0,
            on_order: 0,
            committed: 0,
            back_ordered: 0,
            available: 0,
            version: 0,
            audit: AuditInfo::new(now),
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    pub fn quantities(&self) -> ItemQuantities {
        ItemQuantities {
            on_hand: self.on_hand,
            on_order: self.on_order,
            committed: self.committed,
            back_ordered: self.back_ordered,
            available: self.available,
        }
    }

    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }

    pub fn on_order(&self) -> i64 {
        self.on_order
    }

    pub fn committed(&self) -> i64 {
        self.committed
    }

    pub fn back_ordered(&self) -> i64 {
        self.back_ordered
    }

    pub fn available(&self) -> i64 {
        self.available
    }

    /// Apply one event's quantity deltas and recompute `available`.
    ///
    /// `committed` and `back_ordered` are clamped at zero; `on_hand` is not
    /// (an over-fulfillment drives it negative and is logged by the caller).
    pub fn apply_effect(&mut self, effect: &QuantityEffect, now: DateTime<Utc>) {
        if effect.is_noop() {
            return;
        }

        self.on_hand += effect.on_hand_delta;
        self.on_order += effect.on_order_delta;
        self.committed = (self.committed + effect.committed_delta).max(0);
        self.back_ordered = (self.back_ordered + effect.back_ordered_delta).max(0);

        self.recompute_available();
        self.version += 1;
        self.audit.touch(now);

        if self.on_hand < 0 {
            tracing::warn!(
                item_id = %self.id,
                on_hand = self.on_hand,
                "item on-hand quantity went negative"
            );
        }
    }

    /// Canonical availability formula, applied after every mutation.
    ///
    /// `available = max(0, on_hand + on_order - committed - back_ordered)` —
    /// incoming purchase stock counts toward what can be promised, open
    /// reservations and deferred backorders count against it.
    fn recompute_available(&mut self) {
        self.available = (self.on_hand + self.on_order - self.committed - self.back_ordered).max(0);
    }

    /// Split an ordered quantity against current availability.
    ///
    /// Returns `(committed, back_ordered)`: the portion that can be reserved
    /// now and the remainder deferred to future fulfillment. A shortfall is
    /// not an error.
    pub fn commitment_split(&self, ordered: i64) -> (i64, i64) {
        let committed = ordered.min(self.available).max(0);
        let back_ordered = (ordered - committed).max(0);
        (committed, back_ordered)
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::QuantityEffect;

    fn item() -> Item {
        Item::new(ItemId::new(), "WID-1", "Widget", Utc::now())
    }

    #[test]
    fn purchase_then_receipt_updates_projection() {
        let mut item = item();
        let now = Utc::now();

        item.apply_effect(&QuantityEffect::purchase(100), now);
        assert_eq!(item.on_order(), 100);
        assert_eq!(item.available(), 100);

        item.apply_effect(&QuantityEffect::receipt(50), now);
        assert_eq!(item.on_hand(), 50);
        assert_eq!(item.on_order(), 50);
        assert_eq!(item.available(), 100);
    }

    #[test]
    fn fulfillment_releases_commitment() {
        let mut item = item();
        let now = Utc::now();

        item.apply_effect(&QuantityEffect::adjustment(100), now);
        item.apply_effect(&QuantityEffect::commitment(50, 0), now);
        assert_eq!(item.available(), 50);

        item.apply_effect(&QuantityEffect::fulfillment(50), now);
        assert_eq!(item.on_hand(), 50);
        assert_eq!(item.committed(), 0);
        assert_eq!(item.available(), 50);
    }

    #[test]
    fn committed_is_clamped_at_zero() {
        let mut item = item();
        let now = Utc::now();

        item.apply_effect(&QuantityEffect::adjustment(10), now);
        // Fulfill more than was ever committed.
        item.apply_effect(&QuantityEffect::fulfillment(5), now);
        assert_eq!(item.committed(), 0);
        assert_eq!(item.on_hand(), 5);
    }

    #[test]
    fn oversell_split_zeroes_availability() {
        let mut item = item();
        let now = Utc::now();
        item.apply_effect(&QuantityEffect::adjustment(50), now);

        let (committed, back_ordered) = item.commitment_split(60);
        assert_eq!(committed, 50);
        assert_eq!(back_ordered, 10);

        item.apply_effect(&QuantityEffect::commitment(committed, back_ordered), now);
        assert_eq!(item.available(), 0);
    }

    #[test]
    fn effect_then_inverse_restores_quantities() {
        let mut item = item();
        let now = Utc::now();
        item.apply_effect(&QuantityEffect::adjustment(80), now);
        let before = item.quantities();

        let effect = QuantityEffect::commitment(30, 5);
        item.apply_effect(&effect, now);
        item.apply_effect(&effect.inverse(), now);

        assert_eq!(item.quantities(), before);
    }

    #[test]
    fn version_increments_per_effect() {
        let mut item = item();
        let now = Utc::now();
        assert_eq!(item.version(), 0);

        item.apply_effect(&QuantityEffect::adjustment(1), now);
        item.apply_effect(&QuantityEffect::adjustment(1), now);
        assert_eq!(item.version(), 2);

        // No-op effects do not bump the version.
        item.apply_effect(&QuantityEffect::default(), now);
        assert_eq!(item.version(), 2);
    }
}
