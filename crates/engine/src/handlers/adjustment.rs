//! Inventory adjustment handler.
//!
//! Adjustments correct `on_hand` directly and never touch cost layers:
//! valuation reflects what receipts actually cost, and a counted-in unit
//! with no known cost would otherwise invent one.

use chrono::{DateTime, Utc};

use stockbook_core::AdjustmentId;
use stockbook_inventory::QuantityEffect;

use crate::commands::CreateInventoryAdjustment;
use crate::engine::OrderEngine;
use crate::error::EngineError;
use crate::event::{EventReference, ItemEventKind, ItemEventRecord};
use crate::handlers::ItemBatch;

pub(crate) fn create(
    engine: &OrderEngine,
    cmd: CreateInventoryAdjustment,
    now: DateTime<Utc>,
) -> Result<AdjustmentId, EngineError> {
    if cmd.entries.is_empty() {
        return Err(EngineError::Validation("adjustment requires at least one entry".into()));
    }
    for entry in &cmd.entries {
        if entry.delta == 0 {
            return Err(EngineError::Validation("adjustment delta cannot be zero".into()));
        }
        if entry.reason.trim().is_empty() {
            return Err(EngineError::Validation("adjustment reason is required".into()));
        }
    }

    let mut batch = ItemBatch::load(&*engine.items, cmd.entries.iter().map(|e| e.item_id))?;

    let adjustment_id = AdjustmentId::new();
    let reference = EventReference::adjustment(adjustment_id);
    let mut records = Vec::with_capacity(cmd.entries.len());
    for entry in &cmd.entries {
        let effect = QuantityEffect::adjustment(entry.delta);
        batch.apply(entry.item_id, &effect, now)?;

        let note = match &entry.notes {
            Some(notes) => format!("{}: {notes}", entry.reason),
            None => entry.reason.clone(),
        };
        records.push(
            ItemEventRecord::new(
                entry.item_id,
                ItemEventKind::InventoryAdjusted,
                entry.delta,
                reference,
                effect,
                cmd.date,
            )
            .with_note(note),
        );
    }

    batch.commit(&*engine.items)?;
    for record in records {
        engine.item_events.append(record)?;
    }

    Ok(adjustment_id)
}
