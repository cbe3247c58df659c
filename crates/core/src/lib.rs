//! `stockbook-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod audit;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;
pub mod version;

pub use audit::AuditInfo;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AdjustmentId, CostLayerId, FulfillmentId, ItemId, OrderLineId, PurchaseOrderId, SalesOrderId,
};
pub use value_object::ValueObject;
pub use version::ExpectedVersion;
