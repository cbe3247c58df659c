//! Typed applied-effect records.
//!
//! Every item-level event stores the exact deltas it applied to the item's
//! quantity fields. Reversal (order update/delete) then applies the
//! structural inverse instead of re-deriving amounts from metadata blobs.

use serde::{Deserialize, Serialize};

use stockbook_core::ValueObject;

/// The quantity deltas one event applied to an item.
///
/// Signs are field-local: a positive `committed_delta` means `committed`
/// increased, regardless of the event-store sign convention for
/// `quantity_change` (where a commitment is recorded as negative).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityEffect {
    pub on_hand_delta: i64,
    pub on_order_delta: i64,
    pub committed_delta: i64,
    pub back_ordered_delta: i64,
}

impl QuantityEffect {
    /// Purchase order created: goods are now on order.
    pub fn purchase(quantity: i64) -> Self {
        Self {
            on_order_delta: quantity,
            ..Self::default()
        }
    }

    /// Goods received against a purchase order.
    pub fn receipt(quantity: i64) -> Self {
        Self {
            on_hand_delta: quantity,
            on_order_delta: -quantity,
            ..Self::default()
        }
    }

    /// Sales order created: the availability split between a reservation and
    /// a backorder.
    pub fn commitment(committed: i64, back_ordered: i64) -> Self {
        Self {
            committed_delta: committed,
            back_ordered_delta: back_ordered,
            ..Self::default()
        }
    }

    /// Goods fulfilled (shipped out): stock leaves and the reservation is
    /// released.
    pub fn fulfillment(quantity: i64) -> Self {
        Self {
            on_hand_delta: -quantity,
            committed_delta: -quantity,
            ..Self::default()
        }
    }

    /// Manual on-hand adjustment (signed).
    pub fn adjustment(delta: i64) -> Self {
        Self {
            on_hand_delta: delta,
            ..Self::default()
        }
    }

    /// Structural inverse: applying `self` then `self.inverse()` is a no-op
    /// on every field (before clamping).
    pub fn inverse(&self) -> Self {
        Self {
            on_hand_delta: -self.on_hand_delta,
            on_order_delta: -self.on_order_delta,
            committed_delta: -self.committed_delta,
            back_ordered_delta: -self.back_ordered_delta,
        }
    }

    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

impl std::ops::Add for QuantityEffect {
    type Output = Self;

    /// Field-wise sum: the net effect of applying both operands.
    fn add(self, rhs: Self) -> Self {
        Self {
            on_hand_delta: self.on_hand_delta + rhs.on_hand_delta,
            on_order_delta: self.on_order_delta + rhs.on_order_delta,
            committed_delta: self.committed_delta + rhs.committed_delta,
            back_ordered_delta: self.back_ordered_delta + rhs.back_ordered_delta,
        }
    }
}

impl ValueObject for QuantityEffect {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_negates_every_field() {
        let effect = QuantityEffect {
            on_hand_delta: 3,
            on_order_delta: -4,
            committed_delta: 5,
            back_ordered_delta: -6,
        };

        let inv = effect.inverse();
        assert_eq!(inv.on_hand_delta, -3);
        assert_eq!(inv.on_order_delta, 4);
        assert_eq!(inv.committed_delta, -5);
        assert_eq!(inv.back_ordered_delta, 6);
        assert_eq!(inv.inverse(), effect);
    }

    #[test]
    fn receipt_moves_on_order_to_on_hand() {
        let effect = QuantityEffect::receipt(50);
        assert_eq!(effect.on_hand_delta, 50);
        assert_eq!(effect.on_order_delta, -50);
        assert_eq!(effect.committed_delta, 0);
    }

    #[test]
    fn sum_then_inverse_cancels() {
        let net = QuantityEffect::purchase(10) + QuantityEffect::receipt(4);
        assert_eq!(net.on_hand_delta, 4);
        assert_eq!(net.on_order_delta, 6);
        assert!((net + net.inverse()).is_noop());
    }

    #[test]
    fn noop_detection() {
        assert!(QuantityEffect::default().is_noop());
        assert!(!QuantityEffect::adjustment(1).is_noop());
    }
}
