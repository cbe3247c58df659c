//! Sales handlers: sales-order-created, approval, fulfillment, shipment.

use chrono::{DateTime, Utc};

use stockbook_core::{FulfillmentId, ItemId, OrderLineId, SalesOrderId};
use stockbook_inventory::{consume_fifo, QuantityEffect};
use stockbook_orders::{
    FulfillmentLine, ItemFulfillment, OrderSnapshot, OrderType, SalesOrder, SalesOrderLine,
};

use crate::commands::{ApproveSalesOrder, CreateSalesOrder, FulfillItems, ShipFulfillment};
use crate::engine::OrderEngine;
use crate::error::EngineError;
use crate::event::{EventReference, ItemEventKind, ItemEventRecord, OrderEventKind, OrderEventRecord};
use crate::handlers::ItemBatch;

/// Sales order created: each line's quantity is split against current
/// availability into a commitment and a backorder. Lines are processed in
/// order, so an earlier line's reservation reduces what a later line of the
/// same item can commit. Insufficient inventory is not an error.
pub(crate) fn create(
    engine: &OrderEngine,
    cmd: CreateSalesOrder,
    now: DateTime<Utc>,
) -> Result<SalesOrder, EngineError> {
    let mut batch = ItemBatch::load(&*engine.items, cmd.lines.iter().map(|l| l.item_id))?;

    let mut lines = Vec::with_capacity(cmd.lines.len());
    for input in &cmd.lines {
        let item = batch.item(input.item_id)?;
        lines.push(SalesOrderLine::new(input.item_id, item.name(), input.quantity));
    }

    let mut order = SalesOrder::new(
        SalesOrderId::new(),
        engine.sequences.next_sales(),
        cmd.date,
        lines,
        now,
    )?;

    let splits = commit_lines(&mut order, &mut batch, now)?;

    engine.sales_orders.insert(order.id_typed(), order.clone())?;
    batch.commit(&*engine.items)?;

    let reference = EventReference::sales_order(order.id_typed());
    for (item_id, ordered, effect) in splits {
        engine.item_events.append(ItemEventRecord::new(
            item_id,
            ItemEventKind::SalesOrderCreated,
            -ordered,
            reference,
            effect,
            now,
        ))?;
    }

    let snapshot = OrderSnapshot::of_sales(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Sales,
        order.id_typed(),
        OrderEventKind::Created,
        None,
        Some(&snapshot),
        now,
    )?)?;

    Ok(order)
}

/// Split every line of `order` against the batch's current availability,
/// storing the split on the line and applying the commitment effect to the
/// item. Returns `(item_id, ordered, effect)` per line for event recording.
pub(crate) fn commit_lines(
    order: &mut SalesOrder,
    batch: &mut ItemBatch,
    now: DateTime<Utc>,
) -> Result<Vec<(ItemId, i64, QuantityEffect)>, EngineError> {
    let infos: Vec<(OrderLineId, ItemId, i64)> = order
        .lines()
        .iter()
        .map(|l| (l.id, l.item_id, l.quantity_ordered))
        .collect();

    let mut splits = Vec::with_capacity(infos.len());
    for (line_id, item_id, ordered) in infos {
        let (committed, back_ordered) = batch.item(item_id)?.commitment_split(ordered);
        order.set_commitment(line_id, committed, back_ordered, now)?;

        let effect = QuantityEffect::commitment(committed, back_ordered);
        batch.apply(item_id, &effect, now)?;
        splits.push((item_id, ordered, effect));
    }
    Ok(splits)
}

pub(crate) fn approve(
    engine: &OrderEngine,
    cmd: ApproveSalesOrder,
) -> Result<SalesOrder, EngineError> {
    let mut order = engine
        .sales_orders
        .get(&cmd.order_id)?
        .ok_or(EngineError::NotFound)?;
    let previous = OrderSnapshot::of_sales(&order);

    order.approve(cmd.occurred_at)?;

    engine.sales_orders.save(order.id_typed(), order.clone())?;
    let snapshot = OrderSnapshot::of_sales(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Sales,
        order.id_typed(),
        OrderEventKind::Approved,
        Some(&previous),
        Some(&snapshot),
        cmd.occurred_at,
    )?)?;

    Ok(order)
}

struct PlannedFulfillment {
    line_id: OrderLineId,
    item_id: ItemId,
    quantity: i64,
    /// Portion taken out of the line's reservation.
    released: i64,
    /// Portion taken out of the line's backorder.
    from_backorder: i64,
}

/// Items fulfilled: stock leaves `on_hand`, the reservation (then backorder)
/// is released, and FIFO cost-layer consumption charges COGS. Produces a
/// `Picked` fulfillment record.
pub(crate) fn fulfill(
    engine: &OrderEngine,
    cmd: FulfillItems,
    now: DateTime<Utc>,
) -> Result<ItemFulfillment, EngineError> {
    if cmd.lines.is_empty() {
        return Err(EngineError::Validation("fulfillment requires at least one line".into()));
    }

    let mut order = engine
        .sales_orders
        .get(&cmd.order_id)?
        .ok_or(EngineError::NotFound)?;
    let previous = OrderSnapshot::of_sales(&order);

    let mut planned = Vec::with_capacity(cmd.lines.len());
    for input in &cmd.lines {
        let line = order.line(input.line_id).ok_or(EngineError::NotFound)?;
        let released = input.quantity.min(line.quantity_committed).max(0);
        let from_backorder = (input.quantity - released).min(line.quantity_back_ordered).max(0);
        planned.push(PlannedFulfillment {
            line_id: input.line_id,
            item_id: line.item_id,
            quantity: input.quantity,
            released,
            from_backorder,
        });
        order.fulfill(input.line_id, input.quantity, now)?;
    }

    let fulfillment = ItemFulfillment::new(
        FulfillmentId::new(),
        order.id_typed(),
        planned
            .iter()
            .map(|p| FulfillmentLine {
                item_id: p.item_id,
                sales_order_line_id: p.line_id,
                quantity: p.quantity,
            })
            .collect(),
        cmd.date,
        now,
    )?;

    let mut batch = ItemBatch::load(&*engine.items, planned.iter().map(|p| p.item_id))?;
    let reference = EventReference::fulfillment(fulfillment.id_typed());
    let mut records = Vec::with_capacity(planned.len());
    for p in &planned {
        let effect = QuantityEffect {
            on_hand_delta: -p.quantity,
            on_order_delta: 0,
            committed_delta: -p.released,
            back_ordered_delta: -p.from_backorder,
        };
        batch.apply(p.item_id, &effect, now)?;

        let mut layers = engine.cost_layers.for_item(p.item_id)?;
        let outcome = consume_fifo(&mut layers, p.quantity, cmd.location.as_deref());
        engine.cost_layers.save_all(&layers)?;

        records.push(
            ItemEventRecord::new(
                p.item_id,
                ItemEventKind::ItemFulfilled,
                -p.quantity,
                reference,
                effect,
                now,
            )
            .with_cost_consumed(outcome.cost_of_goods),
        );
    }

    engine.sales_orders.save(order.id_typed(), order.clone())?;
    engine.fulfillments.insert(fulfillment.id_typed(), fulfillment.clone())?;
    batch.commit(&*engine.items)?;
    for record in records {
        engine.item_events.append(record)?;
    }

    let snapshot = OrderSnapshot::of_sales(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Sales,
        order.id_typed(),
        OrderEventKind::ItemsFulfilled,
        Some(&previous),
        Some(&snapshot),
        now,
    )?)?;

    Ok(fulfillment)
}

/// Fulfillment shipped. Informational: quantities and COGS moved when the
/// fulfillment was created; this only flips the status and records the fact.
pub(crate) fn ship(
    engine: &OrderEngine,
    cmd: ShipFulfillment,
) -> Result<ItemFulfillment, EngineError> {
    let mut fulfillment = engine
        .fulfillments
        .get(&cmd.fulfillment_id)?
        .ok_or(EngineError::NotFound)?;

    fulfillment.ship(cmd.occurred_at)?;

    let order: SalesOrder = engine
        .sales_orders
        .get(&fulfillment.sales_order_id())?
        .ok_or(EngineError::NotFound)?;

    engine.fulfillments.save(fulfillment.id_typed(), fulfillment.clone())?;

    let reference = EventReference::fulfillment(fulfillment.id_typed());
    for line in fulfillment.lines() {
        engine.item_events.append(ItemEventRecord::new(
            line.item_id,
            ItemEventKind::ItemShipped,
            0,
            reference,
            QuantityEffect::default(),
            cmd.occurred_at,
        ))?;
    }

    let snapshot = OrderSnapshot::of_sales(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Sales,
        order.id_typed(),
        OrderEventKind::Shipped,
        None,
        Some(&snapshot),
        cmd.occurred_at,
    )?)?;

    Ok(fulfillment)
}
