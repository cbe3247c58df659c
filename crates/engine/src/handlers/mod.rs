//! Event handlers: one per domain event kind.
//!
//! Handlers load state, validate, mutate clones, and only then persist.
//! Every fallible lookup and state-machine check happens before the first
//! write, so a rejected command leaves no partial mutation behind.

pub(crate) mod adjustment;
pub(crate) mod purchasing;
pub(crate) mod reversal;
pub(crate) mod sales;

use chrono::{DateTime, Utc};

use stockbook_core::{ExpectedVersion, ItemId};
use stockbook_inventory::{Item, QuantityEffect};

use crate::error::EngineError;
use crate::store::ItemStore;

/// Items loaded for one dispatch, with the versions they were loaded at.
///
/// Effects accumulate on the in-memory copies; `commit` saves each item with
/// `ExpectedVersion::Exact(loaded_version)`, so a concurrent dispatch that
/// saved first turns this one into a conflict instead of a lost update.
pub(crate) struct ItemBatch {
    entries: Vec<LoadedItem>,
}

struct LoadedItem {
    item: Item,
    loaded_version: u64,
}

impl ItemBatch {
    /// Load each distinct id once. Fails with `NotFound` on the first id
    /// that does not resolve, before anything is mutated.
    pub(crate) fn load(
        store: &dyn ItemStore,
        ids: impl IntoIterator<Item = ItemId>,
    ) -> Result<Self, EngineError> {
        let mut entries: Vec<LoadedItem> = Vec::new();
        for id in ids {
            if entries.iter().any(|e| e.item.id_typed() == id) {
                continue;
            }
            let item = store.get(id)?.ok_or(EngineError::NotFound)?;
            let loaded_version = item.version();
            entries.push(LoadedItem { item, loaded_version });
        }
        Ok(Self { entries })
    }

    pub(crate) fn item(&self, id: ItemId) -> Result<&Item, EngineError> {
        self.entries
            .iter()
            .map(|e| &e.item)
            .find(|i| i.id_typed() == id)
            .ok_or(EngineError::NotFound)
    }

    pub(crate) fn apply(
        &mut self,
        id: ItemId,
        effect: &QuantityEffect,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.item.id_typed() == id)
            .ok_or(EngineError::NotFound)?;
        entry.item.apply_effect(effect, now);
        Ok(())
    }

    pub(crate) fn commit(self, store: &dyn ItemStore) -> Result<(), EngineError> {
        for entry in self.entries {
            store.save(entry.item, ExpectedVersion::Exact(entry.loaded_version))?;
        }
        Ok(())
    }
}
