//! Order domain module (purchase orders, sales orders, fulfillments).
//!
//! This crate contains business rules for order aggregates, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).
//! Inventory side effects of order activity live in the engine's event
//! handlers; this crate only owns the aggregates and their state machines.

pub mod fulfillment;
pub mod purchase;
pub mod sales;
pub mod snapshot;

pub use fulfillment::{FulfillmentLine, FulfillmentStatus, ItemFulfillment};
pub use purchase::{PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus};
pub use sales::{SalesOrder, SalesOrderLine, SalesOrderStatus};
pub use snapshot::{OrderSnapshot, OrderType, SnapshotLine};
