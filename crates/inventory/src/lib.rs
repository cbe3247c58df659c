//! Inventory domain module.
//!
//! This crate contains business rules for inventory, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage): the per-item
//! quantity projection, the typed applied-effect record that makes event
//! reversal a structural inverse, and the FIFO cost-layer ledger.

pub mod cost_layer;
pub mod effect;
pub mod fifo;
pub mod item;

pub use cost_layer::{Consumption, CostLayer};
pub use effect::QuantityEffect;
pub use fifo::{ConsumptionOutcome, LayerConsumption, consume_fifo, fifo_sort, valuation};
pub use item::{Item, ItemQuantities};
