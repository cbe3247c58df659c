//! Event-store record types.
//!
//! Two append-only streams: per-item facts and per-order facts. Records are
//! immutable once written and form the audit trail used for reversal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockbook_core::ItemId;
use stockbook_inventory::QuantityEffect;
use stockbook_orders::{OrderSnapshot, OrderType};

use crate::event_store::EventStoreError;

/// Closed set of item-level event kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemEventKind {
    PurchaseOrderCreated,
    ItemReceived,
    SalesOrderCreated,
    ItemFulfilled,
    InventoryAdjusted,
    ItemShipped,
}

impl ItemEventKind {
    /// Stable event name identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemEventKind::PurchaseOrderCreated => "item.purchase_order_created",
            ItemEventKind::ItemReceived => "item.received",
            ItemEventKind::SalesOrderCreated => "item.sales_order_created",
            ItemEventKind::ItemFulfilled => "item.fulfilled",
            ItemEventKind::InventoryAdjusted => "item.adjusted",
            ItemEventKind::ItemShipped => "item.shipped",
        }
    }
}

/// What an item event refers back to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    PurchaseOrder,
    SalesOrder,
    Fulfillment,
    Adjustment,
}

/// `(referenceType, referenceId)` pair linking an item event to the business
/// document that caused it. Reversal finds an order's footprint through this.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReference {
    pub kind: ReferenceKind,
    pub id: Uuid,
}

impl EventReference {
    pub fn purchase_order(id: impl Into<Uuid>) -> Self {
        Self { kind: ReferenceKind::PurchaseOrder, id: id.into() }
    }

    pub fn sales_order(id: impl Into<Uuid>) -> Self {
        Self { kind: ReferenceKind::SalesOrder, id: id.into() }
    }

    pub fn fulfillment(id: impl Into<Uuid>) -> Self {
        Self { kind: ReferenceKind::Fulfillment, id: id.into() }
    }

    pub fn adjustment(id: impl Into<Uuid>) -> Self {
        Self { kind: ReferenceKind::Adjustment, id: id.into() }
    }
}

/// Append-only fact about one item.
///
/// `quantity_change` keeps the wire sign convention (positive = inventory
/// increase; a sales-order commitment is recorded negative even though the
/// physical change lands on `committed`). The typed `effect` carries the
/// exact per-field deltas and is what reversal inverts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEventRecord {
    pub event_id: Uuid,
    pub item_id: ItemId,
    pub kind: ItemEventKind,
    pub quantity_change: i64,
    pub reference: EventReference,
    pub effect: QuantityEffect,
    /// COGS charged by this event's FIFO consumption, when any.
    pub cost_consumed: Option<f64>,
    /// Free-form annotation (e.g. adjustment reason/notes).
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ItemEventRecord {
    pub fn new(
        item_id: ItemId,
        kind: ItemEventKind,
        quantity_change: i64,
        reference: EventReference,
        effect: QuantityEffect,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            item_id,
            kind,
            quantity_change,
            reference,
            effect,
            cost_consumed: None,
            note: None,
            occurred_at,
        }
    }

    pub fn with_cost_consumed(mut self, cost: f64) -> Self {
        self.cost_consumed = Some(cost);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Closed set of order-level event kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    Approved,
    Updated,
    Deleted,
    Cancelled,
    ItemsReceived,
    ItemsFulfilled,
    Shipped,
}

/// Append-only fact about an order aggregate.
///
/// `previous_state`/`new_state` hold full JSON snapshots of the aggregate
/// (id, order number, date, status, lines) for audit display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEventRecord {
    pub event_id: Uuid,
    pub order_type: OrderType,
    pub order_id: Uuid,
    pub kind: OrderEventKind,
    pub previous_state: Option<JsonValue>,
    pub new_state: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

impl OrderEventRecord {
    pub fn new(
        order_type: OrderType,
        order_id: impl Into<Uuid>,
        kind: OrderEventKind,
        previous_state: Option<&OrderSnapshot>,
        new_state: Option<&OrderSnapshot>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, EventStoreError> {
        let serialize = |snap: &OrderSnapshot| {
            serde_json::to_value(snap)
                .map_err(|e| EventStoreError::Serialize(format!("order snapshot: {e}")))
        };

        Ok(Self {
            event_id: Uuid::now_v7(),
            order_type,
            order_id: order_id.into(),
            kind,
            previous_state: previous_state.map(serialize).transpose()?,
            new_state: new_state.map(serialize).transpose()?,
            occurred_at,
        })
    }

    /// Deserialize the previous-state snapshot, when present.
    pub fn previous_snapshot(&self) -> Option<OrderSnapshot> {
        self.previous_state
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Deserialize the new-state snapshot, when present.
    pub fn new_snapshot(&self) -> Option<OrderSnapshot> {
        self.new_state
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_core::{PurchaseOrderId, SalesOrderId};

    #[test]
    fn item_event_builders_attach_extras() {
        let record = ItemEventRecord::new(
            ItemId::new(),
            ItemEventKind::ItemFulfilled,
            -5,
            EventReference::fulfillment(uuid::Uuid::now_v7()),
            QuantityEffect::fulfillment(5),
            Utc::now(),
        )
        .with_cost_consumed(25.0)
        .with_note("rush order");

        assert_eq!(record.cost_consumed, Some(25.0));
        assert_eq!(record.note.as_deref(), Some("rush order"));
        assert_eq!(record.quantity_change, -5);
    }

    #[test]
    fn order_event_round_trips_snapshots() {
        use stockbook_orders::{PurchaseOrder, PurchaseOrderLine};

        let now = Utc::now();
        let order = PurchaseOrder::new(
            PurchaseOrderId::new(),
            "PO-00007",
            now,
            vec![PurchaseOrderLine::new(ItemId::new(), "Widget", 3, 2.0)],
            now,
        )
        .unwrap();
        let snap = OrderSnapshot::of_purchase(&order);

        let record = OrderEventRecord::new(
            OrderType::Purchase,
            order.id_typed(),
            OrderEventKind::Created,
            None,
            Some(&snap),
            now,
        )
        .unwrap();

        assert!(record.previous_state.is_none());
        assert_eq!(record.new_snapshot().unwrap(), snap);
    }

    #[test]
    fn reference_constructors_tag_the_kind() {
        let r = EventReference::sales_order(SalesOrderId::new());
        assert_eq!(r.kind, ReferenceKind::SalesOrder);
    }
}
