//! Command surface of the engine.
//!
//! One command per user intent. Commands carry only caller-supplied input;
//! derived state (order numbers, commitment splits, cost layers) is computed
//! by the handlers. An accepted command becomes exactly one domain event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{FulfillmentId, ItemId, OrderLineId, PurchaseOrderId, SalesOrderId};

/// One requested purchase line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLineInput {
    pub item_id: ItemId,
    pub quantity: i64,
    /// Vendor unit cost; becomes the cost layer's unit cost on receipt.
    pub rate: f64,
}

/// One requested sales line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesLineInput {
    pub item_id: ItemId,
    pub quantity: i64,
}

/// Quantity received against one existing purchase order line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub line_id: OrderLineId,
    pub quantity: i64,
}

/// Quantity fulfilled against one existing sales order line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentLineInput {
    pub line_id: OrderLineId,
    pub quantity: i64,
}

/// One item's manual quantity correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentEntry {
    pub item_id: ItemId,
    /// Signed on-hand delta. Never touches cost layers.
    pub delta: i64,
    pub reason: String,
    pub notes: Option<String>,
}

/// Add an item to the catalog. Quantities start at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterItem {
    pub sku: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub date: DateTime<Utc>,
    pub lines: Vec<PurchaseLineInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSalesOrder {
    pub date: DateTime<Utc>,
    pub lines: Vec<SalesLineInput>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveSalesOrder {
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Replace a purchase order's lines. Allowed only before any receipt; the
/// old lines' recorded effects are reversed and the new lines applied fresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub lines: Vec<PurchaseLineInput>,
    pub occurred_at: DateTime<Utc>,
}

/// Replace a sales order's lines. Allowed only before any fulfillment;
/// commitment splits are recomputed against current availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSalesOrder {
    pub order_id: SalesOrderId,
    pub lines: Vec<SalesLineInput>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSalesOrder {
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSalesOrder {
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Record a (possibly partial) receipt against an approved purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveItems {
    pub order_id: PurchaseOrderId,
    pub lines: Vec<ReceiptLine>,
    pub date: DateTime<Utc>,
    /// Warehouse the stock lands in; stamped on the new cost layers.
    pub location: Option<String>,
}

/// Fulfill (pick) quantities against an approved sales order. Creates a
/// fulfillment record and drives FIFO cost-layer consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillItems {
    pub order_id: SalesOrderId,
    pub lines: Vec<FulfillmentLineInput>,
    pub date: DateTime<Utc>,
    /// Restrict FIFO consumption to layers at this location.
    pub location: Option<String>,
}

/// Mark an existing fulfillment as shipped. Informational: quantities moved
/// when the fulfillment was created.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipFulfillment {
    pub fulfillment_id: FulfillmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Apply manual on-hand corrections to one or more items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInventoryAdjustment {
    pub entries: Vec<AdjustmentEntry>,
    pub date: DateTime<Utc>,
}

/// Closed set of commands the engine dispatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    RegisterItem(RegisterItem),
    CreatePurchaseOrder(CreatePurchaseOrder),
    ApprovePurchaseOrder(ApprovePurchaseOrder),
    UpdatePurchaseOrder(UpdatePurchaseOrder),
    DeletePurchaseOrder(DeletePurchaseOrder),
    CancelPurchaseOrder(CancelPurchaseOrder),
    ReceiveItems(ReceiveItems),
    CreateSalesOrder(CreateSalesOrder),
    ApproveSalesOrder(ApproveSalesOrder),
    UpdateSalesOrder(UpdateSalesOrder),
    DeleteSalesOrder(DeleteSalesOrder),
    CancelSalesOrder(CancelSalesOrder),
    FulfillItems(FulfillItems),
    ShipFulfillment(ShipFulfillment),
    CreateInventoryAdjustment(CreateInventoryAdjustment),
}
