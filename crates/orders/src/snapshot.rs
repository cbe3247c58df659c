//! Order snapshots: the JSON payload recorded on order-level events.
//!
//! An order event stores a full before/after snapshot of the aggregate
//! (id, order number, date, status, lines). The snapshots serve audit
//! display; reversal itself reads the typed effects on item events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockbook_core::{ItemId, OrderLineId};

use crate::purchase::PurchaseOrder;
use crate::sales::SalesOrder;

/// Which order aggregate an order-level record refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Purchase,
    Sales,
}

/// One line inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLine {
    pub line_id: OrderLineId,
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: i64,
    /// Vendor rate; only purchase lines carry one.
    pub rate: Option<f64>,
}

/// Full JSON snapshot of an order aggregate at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: Uuid,
    pub order_type: OrderType,
    pub order_number: String,
    pub date: DateTime<Utc>,
    pub status: String,
    pub lines: Vec<SnapshotLine>,
}

impl OrderSnapshot {
    pub fn of_purchase(order: &PurchaseOrder) -> Self {
        Self {
            order_id: order.id_typed().into(),
            order_type: OrderType::Purchase,
            order_number: order.order_number().to_string(),
            date: order.date(),
            status: format!("{:?}", order.status()),
            lines: order
                .lines()
                .iter()
                .map(|l| SnapshotLine {
                    line_id: l.id,
                    item_id: l.item_id,
                    item_name: l.item_name.clone(),
                    quantity: l.quantity_ordered,
                    rate: Some(l.rate),
                })
                .collect(),
        }
    }

    pub fn of_sales(order: &SalesOrder) -> Self {
        Self {
            order_id: order.id_typed().into(),
            order_type: OrderType::Sales,
            order_number: order.order_number().to_string(),
            date: order.date(),
            status: format!("{:?}", order.status()),
            lines: order
                .lines()
                .iter()
                .map(|l| SnapshotLine {
                    line_id: l.id,
                    item_id: l.item_id,
                    item_name: l.item_name.clone(),
                    quantity: l.quantity_ordered,
                    rate: None,
                })
                .collect(),
        }
    }
}
