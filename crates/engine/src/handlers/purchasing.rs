//! Purchasing handlers: purchase-order-created, approval, and receipt.

use chrono::{DateTime, Utc};

use stockbook_core::{CostLayerId, ItemId, PurchaseOrderId};
use stockbook_inventory::{CostLayer, QuantityEffect};
use stockbook_orders::{OrderSnapshot, OrderType, PurchaseOrder, PurchaseOrderLine};

use crate::commands::{ApprovePurchaseOrder, CreatePurchaseOrder, ReceiveItems};
use crate::engine::OrderEngine;
use crate::error::EngineError;
use crate::event::{EventReference, ItemEventKind, ItemEventRecord, OrderEventKind, OrderEventRecord};
use crate::handlers::ItemBatch;

/// Purchase order created: every line's quantity moves onto `on_order`.
pub(crate) fn create(
    engine: &OrderEngine,
    cmd: CreatePurchaseOrder,
    now: DateTime<Utc>,
) -> Result<PurchaseOrder, EngineError> {
    let mut batch = ItemBatch::load(&*engine.items, cmd.lines.iter().map(|l| l.item_id))?;

    let mut lines = Vec::with_capacity(cmd.lines.len());
    for input in &cmd.lines {
        let item = batch.item(input.item_id)?;
        lines.push(PurchaseOrderLine::new(input.item_id, item.name(), input.quantity, input.rate));
    }

    let order = PurchaseOrder::new(
        PurchaseOrderId::new(),
        engine.sequences.next_purchase(),
        cmd.date,
        lines,
        now,
    )?;

    for line in order.lines() {
        batch.apply(line.item_id, &QuantityEffect::purchase(line.quantity_ordered), now)?;
    }

    engine.purchase_orders.insert(order.id_typed(), order.clone())?;
    batch.commit(&*engine.items)?;

    let reference = EventReference::purchase_order(order.id_typed());
    for line in order.lines() {
        engine.item_events.append(ItemEventRecord::new(
            line.item_id,
            ItemEventKind::PurchaseOrderCreated,
            line.quantity_ordered,
            reference,
            QuantityEffect::purchase(line.quantity_ordered),
            now,
        ))?;
    }

    let snapshot = OrderSnapshot::of_purchase(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Purchase,
        order.id_typed(),
        OrderEventKind::Created,
        None,
        Some(&snapshot),
        now,
    )?)?;

    Ok(order)
}

pub(crate) fn approve(
    engine: &OrderEngine,
    cmd: ApprovePurchaseOrder,
) -> Result<PurchaseOrder, EngineError> {
    let mut order = engine
        .purchase_orders
        .get(&cmd.order_id)?
        .ok_or(EngineError::NotFound)?;
    let previous = OrderSnapshot::of_purchase(&order);

    order.approve(cmd.occurred_at)?;

    engine.purchase_orders.save(order.id_typed(), order.clone())?;
    let snapshot = OrderSnapshot::of_purchase(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Purchase,
        order.id_typed(),
        OrderEventKind::Approved,
        Some(&previous),
        Some(&snapshot),
        cmd.occurred_at,
    )?)?;

    Ok(order)
}

struct PlannedReceipt {
    item_id: ItemId,
    quantity: i64,
    rate: f64,
}

/// Items received: received stock moves from `on_order` to `on_hand` and a
/// new cost layer is opened per line at the line's vendor rate.
pub(crate) fn receive(
    engine: &OrderEngine,
    cmd: ReceiveItems,
    now: DateTime<Utc>,
) -> Result<PurchaseOrder, EngineError> {
    if cmd.lines.is_empty() {
        return Err(EngineError::Validation("receipt requires at least one line".into()));
    }

    let mut order = engine
        .purchase_orders
        .get(&cmd.order_id)?
        .ok_or(EngineError::NotFound)?;
    let previous = OrderSnapshot::of_purchase(&order);

    let mut planned = Vec::with_capacity(cmd.lines.len());
    for receipt in &cmd.lines {
        let line = order.line(receipt.line_id).ok_or(EngineError::NotFound)?;
        planned.push(PlannedReceipt {
            item_id: line.item_id,
            quantity: receipt.quantity,
            rate: line.rate,
        });
        order.receive(receipt.line_id, receipt.quantity, now)?;
    }

    let mut batch = ItemBatch::load(&*engine.items, planned.iter().map(|p| p.item_id))?;
    let mut layers = Vec::with_capacity(planned.len());
    for p in &planned {
        batch.apply(p.item_id, &QuantityEffect::receipt(p.quantity), now)?;

        let mut layer = CostLayer::new(CostLayerId::new(), p.item_id, p.quantity, p.rate, cmd.date);
        if let Some(location) = &cmd.location {
            layer = layer.with_location(location.clone());
        }
        layers.push(layer);
    }

    engine.purchase_orders.save(order.id_typed(), order.clone())?;
    batch.commit(&*engine.items)?;
    for layer in layers {
        engine.cost_layers.insert(layer)?;
    }

    let reference = EventReference::purchase_order(order.id_typed());
    for p in &planned {
        engine.item_events.append(ItemEventRecord::new(
            p.item_id,
            ItemEventKind::ItemReceived,
            p.quantity,
            reference,
            QuantityEffect::receipt(p.quantity),
            now,
        ))?;
    }

    let snapshot = OrderSnapshot::of_purchase(&order);
    engine.order_events.append(OrderEventRecord::new(
        OrderType::Purchase,
        order.id_typed(),
        OrderEventKind::ItemsReceived,
        Some(&previous),
        Some(&snapshot),
        now,
    )?)?;

    Ok(order)
}
