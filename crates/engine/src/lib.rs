//! The inventory event-sourcing and valuation engine.
//!
//! One dispatch = one command = one domain event = one handler invocation,
//! executed synchronously and all-or-nothing. Handlers mutate item/order
//! state, append event-store records, and keep the item quantity projection
//! consistent; the reversal engine undoes recorded effects on order
//! update/delete using the typed effect stored on each item event.

pub mod commands;
pub mod engine;
pub mod error;
pub mod event;
pub mod event_store;
mod handlers;
pub mod store;

pub use commands::{
    AdjustmentEntry, ApprovePurchaseOrder, ApproveSalesOrder, CancelPurchaseOrder,
    CancelSalesOrder, Command, CreateInventoryAdjustment, CreatePurchaseOrder, CreateSalesOrder,
    DeletePurchaseOrder, DeleteSalesOrder, FulfillItems, FulfillmentLineInput, PurchaseLineInput,
    ReceiptLine, ReceiveItems, RegisterItem, SalesLineInput, ShipFulfillment, UpdatePurchaseOrder,
    UpdateSalesOrder,
};
pub use engine::{DomainEvent, OrderEngine, Outcome};
pub use error::EngineError;
pub use event::{
    EventReference, ItemEventKind, ItemEventRecord, OrderEventKind, OrderEventRecord,
    ReferenceKind,
};
pub use event_store::{
    EventStoreError, InMemoryItemEventStore, InMemoryOrderEventStore, ItemEventStore,
    OrderEventStore,
};
pub use store::{
    CostLayerStore, InMemoryCostLayerStore, InMemoryItemStore, InMemoryRepository, ItemStore,
    Repository, StoreError,
};
