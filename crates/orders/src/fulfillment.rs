use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{AuditInfo, DomainError, Entity, FulfillmentId, ItemId, OrderLineId, SalesOrderId};

/// Shipment lifecycle of a fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Picked,
    Shipped,
}

/// One fulfilled line: which item, against which sales order line, how much.
///
/// The quantity here is what drove FIFO cost-layer consumption when the
/// fulfillment was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentLine {
    pub item_id: ItemId,
    pub sales_order_line_id: OrderLineId,
    pub quantity: i64,
}

/// Shipment record owned by a sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFulfillment {
    id: FulfillmentId,
    sales_order_id: SalesOrderId,
    status: FulfillmentStatus,
    lines: Vec<FulfillmentLine>,
    date: DateTime<Utc>,
    audit: AuditInfo,
}

impl ItemFulfillment {
    pub fn new(
        id: FulfillmentId,
        sales_order_id: SalesOrderId,
        lines: Vec<FulfillmentLine>,
        date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::validation("fulfillment requires at least one line"));
        }
        if lines.iter().any(|l| l.quantity <= 0) {
            return Err(DomainError::validation("fulfillment quantity must be positive"));
        }

        Ok(Self {
            id,
            sales_order_id,
            status: FulfillmentStatus::Picked,
            lines,
            date,
            audit: AuditInfo::new(now),
        })
    }

    pub fn id_typed(&self) -> FulfillmentId {
        self.id
    }

    pub fn sales_order_id(&self) -> SalesOrderId {
        self.sales_order_id
    }

    pub fn status(&self) -> FulfillmentStatus {
        self.status
    }

    pub fn lines(&self) -> &[FulfillmentLine] {
        &self.lines
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    /// Mark the shipment as sent. Informational: quantities already moved
    /// when the fulfillment was created.
    pub fn ship(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != FulfillmentStatus::Picked {
            return Err(DomainError::invariant("fulfillment has already shipped"));
        }
        self.status = FulfillmentStatus::Shipped;
        self.audit.touch(now);
        Ok(())
    }
}

impl Entity for ItemFulfillment {
    type Id = FulfillmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fulfillment() -> ItemFulfillment {
        let now = Utc::now();
        ItemFulfillment::new(
            FulfillmentId::new(),
            SalesOrderId::new(),
            vec![FulfillmentLine {
                item_id: ItemId::new(),
                sales_order_line_id: OrderLineId::new(),
                quantity: 5,
            }],
            now,
            now,
        )
        .unwrap()
    }

    #[test]
    fn starts_picked_then_ships_once() {
        let mut f = fulfillment();
        assert_eq!(f.status(), FulfillmentStatus::Picked);

        f.ship(Utc::now()).unwrap();
        assert_eq!(f.status(), FulfillmentStatus::Shipped);

        let err = f.ship(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn rejects_empty_and_nonpositive_lines() {
        let now = Utc::now();
        assert!(ItemFulfillment::new(FulfillmentId::new(), SalesOrderId::new(), vec![], now, now).is_err());

        let bad = vec![FulfillmentLine {
            item_id: ItemId::new(),
            sales_order_line_id: OrderLineId::new(),
            quantity: 0,
        }];
        assert!(ItemFulfillment::new(FulfillmentId::new(), SalesOrderId::new(), bad, now, now).is_err());
    }
}
