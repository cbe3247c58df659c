//! Reversal engine: order update, delete, and cancel.
//!
//! An order's live inventory footprint is the per-item sum of the typed
//! effects on its creation-kind item events. Reversing applies the inverse of
//! that sum and appends a compensating event with the inverse effect, so the
//! stream stays append-only and the footprint of a reversed order nets to
//! zero. Updates then re-apply the new lines as fresh creation events.
//!
//! All three operations require the order to still be modifiable: once goods
//! have been received or fulfilled, physical movements exist that a line
//! rewrite cannot undo.

use chrono::{DateTime, Utc};

use stockbook_core::ItemId;
use stockbook_inventory::QuantityEffect;
use stockbook_orders::{OrderSnapshot, OrderType, PurchaseOrder, PurchaseOrderLine, SalesOrder, SalesOrderLine};

use crate::commands::{
    CancelPurchaseOrder, CancelSalesOrder, DeletePurchaseOrder, DeleteSalesOrder,
    UpdatePurchaseOrder, UpdateSalesOrder,
};
use crate::engine::OrderEngine;
use crate::error::EngineError;
use crate::event::{EventReference, ItemEventKind, ItemEventRecord, OrderEventKind, OrderEventRecord};
use crate::handlers::{sales, ItemBatch};

/// One item's net recorded effect under a reference.
struct Footprint {
    item_id: ItemId,
    quantity: i64,
    effect: QuantityEffect,
}

/// Sum the recorded effects of `kind` events under `reference`, per item.
/// Compensating events appended by earlier reversals are part of the sum, so
/// an already-reversed footprint nets out to a no-op.
fn recorded_footprint(
    engine: &OrderEngine,
    reference: &EventReference,
    kind: ItemEventKind,
) -> Result<Vec<Footprint>, EngineError> {
    let mut footprints: Vec<Footprint> = Vec::new();
    for record in engine
        .item_events
        .for_reference(reference)?
        .into_iter()
        .filter(|r| r.kind == kind)
    {
        match footprints.iter_mut().find(|f| f.item_id == record.item_id) {
            Some(f) => {
                f.quantity += record.quantity_change;
                f.effect = f.effect + record.effect;
            }
            None => footprints.push(Footprint {
                item_id: record.item_id,
                quantity: record.quantity_change,
                effect: record.effect,
            }),
        }
    }
    footprints.retain(|f| !f.effect.is_noop());
    Ok(footprints)
}

/// Apply the inverse of each footprint to the batch and build the
/// compensating event records (appended by the caller after the writes).
fn reverse_into_batch(
    batch: &mut ItemBatch,
    footprints: &[Footprint],
    reference: EventReference,
    kind: ItemEventKind,
    note: &str,
    occurred_at: DateTime<Utc>,
) -> Result<Vec<ItemEventRecord>, EngineError> {
    let mut records = Vec::with_capacity(footprints.len());
    for f in footprints {
        let inverse = f.effect.inverse();
        batch.apply(f.item_id, &inverse, occurred_at)?;
        records.push(
            ItemEventRecord::new(f.item_id, kind, -f.quantity, reference, inverse, occurred_at)
                .with_note(note),
        );
    }
    Ok(records)
}

/// Purchase order updated: reverse the old lines' on-order footprint, swap in
/// the new lines, and apply their effects as fresh creation events.
pub(crate) fn update_purchase(
    engine: &OrderEngine,
    cmd: UpdatePurchaseOrder,
) -> Result<PurchaseOrder, EngineError> {
    let mut order = engine
        .purchase_orders
        .get(&cmd.order_id)?
        .ok_or(EngineError::NotFound)?;
    let previous = OrderSnapshot::of_purchase(&order);
    let reference = EventReference::purchase_order(order.id_typed());
    let footprints = recorded_footprint(engine, &reference, ItemEventKind::PurchaseOrderCreated)?;

    let ids = footprints
        .iter()
        .map(|f| f.item_id)
        .chain(cmd.lines.iter().map(|l| l.item_id));
    let mut batch = ItemBatch::load(&*engine.items, ids)?;

    let mut new_lines = Vec::with_capacity(cmd.lines.len());
    for input in &cmd.lines {
        let item = batch.item(input.item_id)?;
        new_lines.push(PurchaseOrderLine::new(input.item_id, item.name(), input.quantity, input.rate));
    }
    order.replace_lines(new_lines, cmd.occurred_at)?;

    let mut records = reverse_into_batch(
        &mut batch,
        &footprints,
        reference,
        ItemEventKind::PurchaseOrderCreated,
        "order updated",
        cmd.occurred_at,
    )?;
    for line in order.lines() {
        let effect = QuantityEffect::purchase(line.quantity_ordered);
        batch.apply(line.item_id, &effect, cmd.occurred_at)?;
        records.push(ItemEventRecord::new(
            line.item_id,
            ItemEventKind::PurchaseOrderCreated,
            line.quantity_ordered,
            reference,
            effect,
            cmd.occurred_at,
        ));
    }

    engine.purchase_orders.save(order.id_typed(), order.clone())?;
    batch.commit(&*engine.items)?;
    for record in records {
        engine.item_events.append(record)?;
    }

    let snapshot = OrderSnapshot::of_purchase(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Purchase,
        order.id_typed(),
        OrderEventKind::Updated,
        Some(&previous),
        Some(&snapshot),
        cmd.occurred_at,
    )?)?;

    Ok(order)
}

/// Sales order updated: reverse the old commitments first so availability is
/// freed, then recompute splits for the new lines against current state.
pub(crate) fn update_sales(
    engine: &OrderEngine,
    cmd: UpdateSalesOrder,
) -> Result<SalesOrder, EngineError> {
    let mut order = engine
        .sales_orders
        .get(&cmd.order_id)?
        .ok_or(EngineError::NotFound)?;
    let previous = OrderSnapshot::of_sales(&order);
    let reference = EventReference::sales_order(order.id_typed());
    let footprints = recorded_footprint(engine, &reference, ItemEventKind::SalesOrderCreated)?;

    let ids = footprints
        .iter()
        .map(|f| f.item_id)
        .chain(cmd.lines.iter().map(|l| l.item_id));
    let mut batch = ItemBatch::load(&*engine.items, ids)?;

    let mut new_lines = Vec::with_capacity(cmd.lines.len());
    for input in &cmd.lines {
        let item = batch.item(input.item_id)?;
        new_lines.push(SalesOrderLine::new(input.item_id, item.name(), input.quantity));
    }
    order.replace_lines(new_lines, cmd.occurred_at)?;

    let mut records = reverse_into_batch(
        &mut batch,
        &footprints,
        reference,
        ItemEventKind::SalesOrderCreated,
        "order updated",
        cmd.occurred_at,
    )?;
    let splits = sales::commit_lines(&mut order, &mut batch, cmd.occurred_at)?;
    for (item_id, ordered, effect) in splits {
        records.push(ItemEventRecord::new(
            item_id,
            ItemEventKind::SalesOrderCreated,
            -ordered,
            reference,
            effect,
            cmd.occurred_at,
        ));
    }

    engine.sales_orders.save(order.id_typed(), order.clone())?;
    batch.commit(&*engine.items)?;
    for record in records {
        engine.item_events.append(record)?;
    }

    let snapshot = OrderSnapshot::of_sales(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Sales,
        order.id_typed(),
        OrderEventKind::Updated,
        Some(&previous),
        Some(&snapshot),
        cmd.occurred_at,
    )?)?;

    Ok(order)
}

pub(crate) fn delete_purchase(
    engine: &OrderEngine,
    cmd: DeletePurchaseOrder,
) -> Result<(), EngineError> {
    let order = engine
        .purchase_orders
        .get(&cmd.order_id)?
        .ok_or(EngineError::NotFound)?;
    if !order.is_modifiable() {
        return Err(EngineError::InvariantViolation(
            "cannot delete a purchase order once receiving has started".into(),
        ));
    }
    let previous = OrderSnapshot::of_purchase(&order);
    let reference = EventReference::purchase_order(order.id_typed());
    let footprints = recorded_footprint(engine, &reference, ItemEventKind::PurchaseOrderCreated)?;

    let mut batch = ItemBatch::load(&*engine.items, footprints.iter().map(|f| f.item_id))?;
    let records = reverse_into_batch(
        &mut batch,
        &footprints,
        reference,
        ItemEventKind::PurchaseOrderCreated,
        "order deleted",
        cmd.occurred_at,
    )?;

    engine.purchase_orders.remove(&cmd.order_id)?;
    batch.commit(&*engine.items)?;
    for record in records {
        engine.item_events.append(record)?;
    }

    engine.order_events.append(OrderEventRecord::new(
        OrderType::Purchase,
        order.id_typed(),
        OrderEventKind::Deleted,
        Some(&previous),
        None,
        cmd.occurred_at,
    )?)?;

    Ok(())
}

pub(crate) fn delete_sales(
    engine: &OrderEngine,
    cmd: DeleteSalesOrder,
) -> Result<(), EngineError> {
    let order = engine
        .sales_orders
        .get(&cmd.order_id)?
        .ok_or(EngineError::NotFound)?;
    if !order.is_modifiable() {
        return Err(EngineError::InvariantViolation(
            "cannot delete a sales order once fulfillment has started".into(),
        ));
    }
    let previous = OrderSnapshot::of_sales(&order);
    let reference = EventReference::sales_order(order.id_typed());
    let footprints = recorded_footprint(engine, &reference, ItemEventKind::SalesOrderCreated)?;

    let mut batch = ItemBatch::load(&*engine.items, footprints.iter().map(|f| f.item_id))?;
    let records = reverse_into_batch(
        &mut batch,
        &footprints,
        reference,
        ItemEventKind::SalesOrderCreated,
        "order deleted",
        cmd.occurred_at,
    )?;

    engine.sales_orders.remove(&cmd.order_id)?;
    batch.commit(&*engine.items)?;
    for record in records {
        engine.item_events.append(record)?;
    }

    engine.order_events.append(OrderEventRecord::new(
        OrderType::Sales,
        order.id_typed(),
        OrderEventKind::Deleted,
        Some(&previous),
        None,
        cmd.occurred_at,
    )?)?;

    Ok(())
}

pub(crate) fn cancel_purchase(
    engine: &OrderEngine,
    cmd: CancelPurchaseOrder,
) -> Result<PurchaseOrder, EngineError> {
    let mut order = engine
        .purchase_orders
        .get(&cmd.order_id)?
        .ok_or(EngineError::NotFound)?;
    let previous = OrderSnapshot::of_purchase(&order);

    order.cancel(cmd.occurred_at)?;

    let reference = EventReference::purchase_order(order.id_typed());
    let footprints = recorded_footprint(engine, &reference, ItemEventKind::PurchaseOrderCreated)?;
    let mut batch = ItemBatch::load(&*engine.items, footprints.iter().map(|f| f.item_id))?;
    let records = reverse_into_batch(
        &mut batch,
        &footprints,
        reference,
        ItemEventKind::PurchaseOrderCreated,
        "order cancelled",
        cmd.occurred_at,
    )?;

    engine.purchase_orders.save(order.id_typed(), order.clone())?;
    batch.commit(&*engine.items)?;
    for record in records {
        engine.item_events.append(record)?;
    }

    let snapshot = OrderSnapshot::of_purchase(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Purchase,
        order.id_typed(),
        OrderEventKind::Cancelled,
        Some(&previous),
        Some(&snapshot),
        cmd.occurred_at,
    )?)?;

    Ok(order)
}

pub(crate) fn cancel_sales(
    engine: &OrderEngine,
    cmd: CancelSalesOrder,
) -> Result<SalesOrder, EngineError> {
    let mut order = engine
        .sales_orders
        .get(&cmd.order_id)?
        .ok_or(EngineError::NotFound)?;
    let previous = OrderSnapshot::of_sales(&order);

    order.cancel(cmd.occurred_at)?;

    let reference = EventReference::sales_order(order.id_typed());
    let footprints = recorded_footprint(engine, &reference, ItemEventKind::SalesOrderCreated)?;
    let mut batch = ItemBatch::load(&*engine.items, footprints.iter().map(|f| f.item_id))?;
    let records = reverse_into_batch(
        &mut batch,
        &footprints,
        reference,
        ItemEventKind::SalesOrderCreated,
        "order cancelled",
        cmd.occurred_at,
    )?;

    engine.sales_orders.save(order.id_typed(), order.clone())?;
    batch.commit(&*engine.items)?;
    for record in records {
        engine.item_events.append(record)?;
    }

    let snapshot = OrderSnapshot::of_sales(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Sales,
        order.id_typed(),
        OrderEventKind::Cancelled,
        Some(&previous),
        Some(&snapshot),
        cmd.occurred_at,
    )?)?;

    Ok(order)
}
