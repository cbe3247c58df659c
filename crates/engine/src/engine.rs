//! The order engine: command dispatch, one handler per domain event.
//!
//! A dispatch is synchronous and all-or-nothing: the command is validated,
//! exactly one domain event is produced, and the matching handler mutates
//! entity state and appends event records before `execute` returns. There is
//! no queue and no partial application.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use stockbook_core::{AdjustmentId, FulfillmentId, ItemId, PurchaseOrderId, SalesOrderId};
use stockbook_inventory::{fifo_sort, valuation, CostLayer, Item, ItemQuantities};
use stockbook_orders::{ItemFulfillment, OrderType, PurchaseOrder, SalesOrder};

use crate::commands::{
    ApprovePurchaseOrder, ApproveSalesOrder, CancelPurchaseOrder, CancelSalesOrder, Command,
    CreateInventoryAdjustment, CreatePurchaseOrder, CreateSalesOrder, DeletePurchaseOrder,
    DeleteSalesOrder, FulfillItems, ReceiveItems, RegisterItem, ShipFulfillment,
    UpdatePurchaseOrder, UpdateSalesOrder,
};
use crate::error::EngineError;
use crate::event::{ItemEventRecord, OrderEventRecord};
use crate::event_store::{
    InMemoryItemEventStore, InMemoryOrderEventStore, ItemEventStore, OrderEventStore,
};
use crate::handlers;
use crate::store::{
    CostLayerStore, InMemoryCostLayerStore, InMemoryItemStore, InMemoryRepository, ItemStore,
    OrderNumberSequences, Repository,
};

/// The domain fact an accepted command became.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    ItemRegistered(ItemId),
    PurchaseOrderCreated(PurchaseOrderId),
    PurchaseOrderApproved(PurchaseOrderId),
    PurchaseOrderUpdated(PurchaseOrderId),
    PurchaseOrderDeleted(PurchaseOrderId),
    PurchaseOrderCancelled(PurchaseOrderId),
    ItemsReceived(PurchaseOrderId),
    SalesOrderCreated(SalesOrderId),
    SalesOrderApproved(SalesOrderId),
    SalesOrderUpdated(SalesOrderId),
    SalesOrderDeleted(SalesOrderId),
    SalesOrderCancelled(SalesOrderId),
    FulfillmentCreated(FulfillmentId),
    FulfillmentShipped(FulfillmentId),
    InventoryAdjusted(AdjustmentId),
}

/// Result of one dispatch: the aggregate state after the handler ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    ItemRegistered(Item),
    PurchaseOrderCreated(PurchaseOrder),
    PurchaseOrderApproved(PurchaseOrder),
    PurchaseOrderUpdated(PurchaseOrder),
    PurchaseOrderDeleted(PurchaseOrderId),
    PurchaseOrderCancelled(PurchaseOrder),
    ItemsReceived(PurchaseOrder),
    SalesOrderCreated(SalesOrder),
    SalesOrderApproved(SalesOrder),
    SalesOrderUpdated(SalesOrder),
    SalesOrderDeleted(SalesOrderId),
    SalesOrderCancelled(SalesOrder),
    FulfillmentCreated(ItemFulfillment),
    FulfillmentShipped(ItemFulfillment),
    InventoryAdjusted(AdjustmentId),
}

impl Outcome {
    /// The domain event this outcome corresponds to.
    pub fn event(&self) -> DomainEvent {
        match self {
            Outcome::ItemRegistered(item) => DomainEvent::ItemRegistered(item.id_typed()),
            Outcome::PurchaseOrderCreated(o) => DomainEvent::PurchaseOrderCreated(o.id_typed()),
            Outcome::PurchaseOrderApproved(o) => DomainEvent::PurchaseOrderApproved(o.id_typed()),
            Outcome::PurchaseOrderUpdated(o) => DomainEvent::PurchaseOrderUpdated(o.id_typed()),
            Outcome::PurchaseOrderDeleted(id) => DomainEvent::PurchaseOrderDeleted(*id),
            Outcome::PurchaseOrderCancelled(o) => DomainEvent::PurchaseOrderCancelled(o.id_typed()),
            Outcome::ItemsReceived(o) => DomainEvent::ItemsReceived(o.id_typed()),
            Outcome::SalesOrderCreated(o) => DomainEvent::SalesOrderCreated(o.id_typed()),
            Outcome::SalesOrderApproved(o) => DomainEvent::SalesOrderApproved(o.id_typed()),
            Outcome::SalesOrderUpdated(o) => DomainEvent::SalesOrderUpdated(o.id_typed()),
            Outcome::SalesOrderDeleted(id) => DomainEvent::SalesOrderDeleted(*id),
            Outcome::SalesOrderCancelled(o) => DomainEvent::SalesOrderCancelled(o.id_typed()),
            Outcome::FulfillmentCreated(f) => DomainEvent::FulfillmentCreated(f.id_typed()),
            Outcome::FulfillmentShipped(f) => DomainEvent::FulfillmentShipped(f.id_typed()),
            Outcome::InventoryAdjusted(id) => DomainEvent::InventoryAdjusted(*id),
        }
    }
}

/// Synchronous command dispatcher over pluggable stores.
pub struct OrderEngine {
    pub(crate) items: Arc<dyn ItemStore>,
    pub(crate) cost_layers: Arc<dyn CostLayerStore>,
    pub(crate) purchase_orders: Arc<dyn Repository<PurchaseOrderId, PurchaseOrder>>,
    pub(crate) sales_orders: Arc<dyn Repository<SalesOrderId, SalesOrder>>,
    pub(crate) fulfillments: Arc<dyn Repository<FulfillmentId, ItemFulfillment>>,
    pub(crate) item_events: Arc<dyn ItemEventStore>,
    pub(crate) order_events: Arc<dyn OrderEventStore>,
    pub(crate) sequences: OrderNumberSequences,
}

impl OrderEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        items: Arc<dyn ItemStore>,
        cost_layers: Arc<dyn CostLayerStore>,
        purchase_orders: Arc<dyn Repository<PurchaseOrderId, PurchaseOrder>>,
        sales_orders: Arc<dyn Repository<SalesOrderId, SalesOrder>>,
        fulfillments: Arc<dyn Repository<FulfillmentId, ItemFulfillment>>,
        item_events: Arc<dyn ItemEventStore>,
        order_events: Arc<dyn OrderEventStore>,
    ) -> Self {
        Self {
            items,
            cost_layers,
            purchase_orders,
            sales_orders,
            fulfillments,
            item_events,
            order_events,
            sequences: OrderNumberSequences::new(),
        }
    }

    /// Engine over fresh in-memory stores (tests, dev).
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryItemStore::new()),
            Arc::new(InMemoryCostLayerStore::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryItemEventStore::new()),
            Arc::new(InMemoryOrderEventStore::new()),
        )
    }

    /// Dispatch one command to its handler.
    pub fn execute(&self, command: Command) -> Result<Outcome, EngineError> {
        match command {
            Command::RegisterItem(cmd) => self.register_item(cmd).map(Outcome::ItemRegistered),
            Command::CreatePurchaseOrder(cmd) => {
                self.create_purchase_order(cmd).map(Outcome::PurchaseOrderCreated)
            }
            Command::ApprovePurchaseOrder(cmd) => {
                self.approve_purchase_order(cmd).map(Outcome::PurchaseOrderApproved)
            }
            Command::UpdatePurchaseOrder(cmd) => {
                self.update_purchase_order(cmd).map(Outcome::PurchaseOrderUpdated)
            }
            Command::DeletePurchaseOrder(cmd) => {
                let order_id = cmd.order_id;
                self.delete_purchase_order(cmd)
                    .map(|()| Outcome::PurchaseOrderDeleted(order_id))
            }
            Command::CancelPurchaseOrder(cmd) => {
                self.cancel_purchase_order(cmd).map(Outcome::PurchaseOrderCancelled)
            }
            Command::ReceiveItems(cmd) => self.receive_items(cmd).map(Outcome::ItemsReceived),
            Command::CreateSalesOrder(cmd) => {
                self.create_sales_order(cmd).map(Outcome::SalesOrderCreated)
            }
            Command::ApproveSalesOrder(cmd) => {
                self.approve_sales_order(cmd).map(Outcome::SalesOrderApproved)
            }
            Command::UpdateSalesOrder(cmd) => {
                self.update_sales_order(cmd).map(Outcome::SalesOrderUpdated)
            }
            Command::DeleteSalesOrder(cmd) => {
                let order_id = cmd.order_id;
                self.delete_sales_order(cmd)
                    .map(|()| Outcome::SalesOrderDeleted(order_id))
            }
            Command::CancelSalesOrder(cmd) => {
                self.cancel_sales_order(cmd).map(Outcome::SalesOrderCancelled)
            }
            Command::FulfillItems(cmd) => self.fulfill_items(cmd).map(Outcome::FulfillmentCreated),
            Command::ShipFulfillment(cmd) => {
                self.ship_fulfillment(cmd).map(Outcome::FulfillmentShipped)
            }
            Command::CreateInventoryAdjustment(cmd) => {
                self.create_adjustment(cmd).map(Outcome::InventoryAdjusted)
            }
        }
    }

    /// Add an item to the catalog with zero quantities. SKUs are unique.
    pub fn register_item(&self, cmd: RegisterItem) -> Result<Item, EngineError> {
        if cmd.sku.trim().is_empty() {
            return Err(EngineError::Validation("item sku is required".into()));
        }
        if cmd.name.trim().is_empty() {
            return Err(EngineError::Validation("item name is required".into()));
        }
        if self.items.list()?.iter().any(|i| i.sku() == cmd.sku) {
            return Err(EngineError::Conflict(format!("sku {} already registered", cmd.sku)));
        }

        let item = Item::new(ItemId::new(), cmd.sku, cmd.name, Utc::now());
        self.items.insert(item.clone())?;
        tracing::info!(item_id = %item.id_typed(), sku = item.sku(), "item registered");
        Ok(item)
    }

    pub fn create_purchase_order(
        &self,
        cmd: CreatePurchaseOrder,
    ) -> Result<PurchaseOrder, EngineError> {
        let order = handlers::purchasing::create(self, cmd, Utc::now())?;
        tracing::info!(
            order_id = %order.id_typed(),
            order_number = order.order_number(),
            lines = order.lines().len(),
            "purchase order created"
        );
        Ok(order)
    }

    pub fn approve_purchase_order(
        &self,
        cmd: ApprovePurchaseOrder,
    ) -> Result<PurchaseOrder, EngineError> {
        let order = handlers::purchasing::approve(self, cmd)?;
        tracing::info!(order_id = %order.id_typed(), "purchase order approved");
        Ok(order)
    }

    pub fn update_purchase_order(
        &self,
        cmd: UpdatePurchaseOrder,
    ) -> Result<PurchaseOrder, EngineError> {
        let order = handlers::reversal::update_purchase(self, cmd)?;
        tracing::info!(order_id = %order.id_typed(), "purchase order updated");
        Ok(order)
    }

    pub fn delete_purchase_order(&self, cmd: DeletePurchaseOrder) -> Result<(), EngineError> {
        let order_id = cmd.order_id;
        handlers::reversal::delete_purchase(self, cmd)?;
        tracing::info!(order_id = %order_id, "purchase order deleted");
        Ok(())
    }

    pub fn cancel_purchase_order(
        &self,
        cmd: CancelPurchaseOrder,
    ) -> Result<PurchaseOrder, EngineError> {
        let order = handlers::reversal::cancel_purchase(self, cmd)?;
        tracing::info!(order_id = %order.id_typed(), "purchase order cancelled");
        Ok(order)
    }

    pub fn receive_items(&self, cmd: ReceiveItems) -> Result<PurchaseOrder, EngineError> {
        let order = handlers::purchasing::receive(self, cmd, Utc::now())?;
        tracing::info!(
            order_id = %order.id_typed(),
            status = ?order.status(),
            "items received"
        );
        Ok(order)
    }

    pub fn create_sales_order(&self, cmd: CreateSalesOrder) -> Result<SalesOrder, EngineError> {
        let order = handlers::sales::create(self, cmd, Utc::now())?;
        tracing::info!(
            order_id = %order.id_typed(),
            order_number = order.order_number(),
            lines = order.lines().len(),
            "sales order created"
        );
        Ok(order)
    }

    pub fn approve_sales_order(&self, cmd: ApproveSalesOrder) -> Result<SalesOrder, EngineError> {
        let order = handlers::sales::approve(self, cmd)?;
        tracing::info!(order_id = %order.id_typed(), "sales order approved");
        Ok(order)
    }

    pub fn update_sales_order(&self, cmd: UpdateSalesOrder) -> Result<SalesOrder, EngineError> {
        let order = handlers::reversal::update_sales(self, cmd)?;
        tracing::info!(order_id = %order.id_typed(), "sales order updated");
        Ok(order)
    }

    pub fn delete_sales_order(&self, cmd: DeleteSalesOrder) -> Result<(), EngineError> {
        let order_id = cmd.order_id;
        handlers::reversal::delete_sales(self, cmd)?;
        tracing::info!(order_id = %order_id, "sales order deleted");
        Ok(())
    }

    pub fn cancel_sales_order(&self, cmd: CancelSalesOrder) -> Result<SalesOrder, EngineError> {
        let order = handlers::reversal::cancel_sales(self, cmd)?;
        tracing::info!(order_id = %order.id_typed(), "sales order cancelled");
        Ok(order)
    }

    pub fn fulfill_items(&self, cmd: FulfillItems) -> Result<ItemFulfillment, EngineError> {
        let fulfillment = handlers::sales::fulfill(self, cmd, Utc::now())?;
        tracing::info!(
            fulfillment_id = %fulfillment.id_typed(),
            sales_order_id = %fulfillment.sales_order_id(),
            "items fulfilled"
        );
        Ok(fulfillment)
    }

    pub fn ship_fulfillment(&self, cmd: ShipFulfillment) -> Result<ItemFulfillment, EngineError> {
        let fulfillment = handlers::sales::ship(self, cmd)?;
        tracing::info!(fulfillment_id = %fulfillment.id_typed(), "fulfillment shipped");
        Ok(fulfillment)
    }

    pub fn create_adjustment(
        &self,
        cmd: CreateInventoryAdjustment,
    ) -> Result<AdjustmentId, EngineError> {
        let entries = cmd.entries.len();
        let adjustment_id = handlers::adjustment::create(self, cmd, Utc::now())?;
        tracing::info!(adjustment_id = %adjustment_id, entries, "inventory adjusted");
        Ok(adjustment_id)
    }

    // ----- queries -----

    pub fn item(&self, id: ItemId) -> Result<Item, EngineError> {
        self.items.get(id)?.ok_or(EngineError::NotFound)
    }

    pub fn item_quantities(&self, id: ItemId) -> Result<ItemQuantities, EngineError> {
        Ok(self.item(id)?.quantities())
    }

    /// Current inventory value of one item over its remaining cost layers.
    pub fn item_valuation(&self, id: ItemId) -> Result<f64, EngineError> {
        let layers = self.cost_layers.for_item(id)?;
        Ok(valuation(&layers))
    }

    /// An item's cost layers in FIFO consumption order.
    pub fn layers_for_item(&self, id: ItemId) -> Result<Vec<CostLayer>, EngineError> {
        let mut layers = self.cost_layers.for_item(id)?;
        fifo_sort(&mut layers);
        Ok(layers)
    }

    /// An item's full event stream, in append order.
    pub fn events_for_item(&self, id: ItemId) -> Result<Vec<ItemEventRecord>, EngineError> {
        Ok(self.item_events.for_item(id)?)
    }

    /// An order's full event history, in append order.
    pub fn order_history(
        &self,
        order_type: OrderType,
        order_id: Uuid,
    ) -> Result<Vec<OrderEventRecord>, EngineError> {
        Ok(self.order_events.history(order_type, order_id)?)
    }

    pub fn purchase_order(&self, id: PurchaseOrderId) -> Result<PurchaseOrder, EngineError> {
        self.purchase_orders.get(&id)?.ok_or(EngineError::NotFound)
    }

    pub fn sales_order(&self, id: SalesOrderId) -> Result<SalesOrder, EngineError> {
        self.sales_orders.get(&id)?.ok_or(EngineError::NotFound)
    }

    pub fn fulfillment(&self, id: FulfillmentId) -> Result<ItemFulfillment, EngineError> {
        self.fulfillments.get(&id)?.ok_or(EngineError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{AdjustmentEntry, PurchaseLineInput, SalesLineInput};

    fn engine_with_item(sku: &str) -> (OrderEngine, ItemId) {
        let engine = OrderEngine::in_memory();
        let item = engine
            .register_item(RegisterItem { sku: sku.into(), name: "Widget".into() })
            .unwrap();
        (engine, item.id_typed())
    }

    #[test]
    fn register_item_rejects_duplicate_sku() {
        let (engine, _) = engine_with_item("WID-1");
        let err = engine
            .register_item(RegisterItem { sku: "WID-1".into(), name: "Other".into() })
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn execute_routes_to_one_handler_and_reports_the_event() {
        let (engine, item_id) = engine_with_item("WID-1");

        let outcome = engine
            .execute(Command::CreatePurchaseOrder(CreatePurchaseOrder {
                date: Utc::now(),
                lines: vec![PurchaseLineInput { item_id, quantity: 10, rate: 2.0 }],
            }))
            .unwrap();

        let Outcome::PurchaseOrderCreated(order) = &outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(outcome.event(), DomainEvent::PurchaseOrderCreated(order.id_typed()));
        assert_eq!(engine.item_quantities(item_id).unwrap().on_order, 10);
    }

    #[test]
    fn rejected_command_leaves_no_trace() {
        let (engine, item_id) = engine_with_item("WID-1");

        let err = engine
            .create_purchase_order(CreatePurchaseOrder {
                date: Utc::now(),
                lines: vec![PurchaseLineInput { item_id, quantity: -5, rate: 2.0 }],
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        assert_eq!(engine.item_quantities(item_id).unwrap().on_order, 0);
        assert!(engine.events_for_item(item_id).unwrap().is_empty());
    }

    #[test]
    fn unknown_item_aborts_the_whole_command() {
        let (engine, item_id) = engine_with_item("WID-1");

        let err = engine
            .create_sales_order(CreateSalesOrder {
                date: Utc::now(),
                lines: vec![
                    SalesLineInput { item_id, quantity: 5 },
                    SalesLineInput { item_id: ItemId::new(), quantity: 5 },
                ],
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound));
        assert!(engine.events_for_item(item_id).unwrap().is_empty());
    }

    #[test]
    fn adjustment_moves_on_hand_without_cost_layers() {
        let (engine, item_id) = engine_with_item("WID-1");

        engine
            .create_adjustment(CreateInventoryAdjustment {
                entries: vec![AdjustmentEntry {
                    item_id,
                    delta: 25,
                    reason: "cycle count".into(),
                    notes: None,
                }],
                date: Utc::now(),
            })
            .unwrap();

        let quantities = engine.item_quantities(item_id).unwrap();
        assert_eq!(quantities.on_hand, 25);
        assert_eq!(quantities.available, 25);
        assert!(engine.layers_for_item(item_id).unwrap().is_empty());
        assert_eq!(engine.item_valuation(item_id).unwrap(), 0.0);
    }

    #[test]
    fn order_numbers_increase_monotonically() {
        let (engine, item_id) = engine_with_item("WID-1");
        let line = || PurchaseLineInput { item_id, quantity: 1, rate: 1.0 };

        let first = engine
            .create_purchase_order(CreatePurchaseOrder { date: Utc::now(), lines: vec![line()] })
            .unwrap();
        let second = engine
            .create_purchase_order(CreatePurchaseOrder { date: Utc::now(), lines: vec![line()] })
            .unwrap();

        assert_eq!(first.order_number(), "PO-00001");
        assert_eq!(second.order_number(), "PO-00002");
    }
}
