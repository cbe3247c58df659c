use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{AuditInfo, DomainError, Entity, ItemId, OrderLineId, SalesOrderId};

/// Sales order status lifecycle.
///
/// `PendingApproval → PendingFulfillment → PartiallyFulfilled → Fulfilled →
/// Closed`, with `Cancelled` reachable from the two pending states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesOrderStatus {
    PendingApproval,
    PendingFulfillment,
    PartiallyFulfilled,
    Fulfilled,
    Closed,
    Cancelled,
}

/// Sales order line.
///
/// Persists the commitment split decided when the order was created: how much
/// of the ordered quantity was reserved against availability and how much was
/// deferred as a backorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderLine {
    pub id: OrderLineId,
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity_ordered: i64,
    pub quantity_fulfilled: i64,
    pub quantity_committed: i64,
    pub quantity_back_ordered: i64,
}

impl SalesOrderLine {
    pub fn new(item_id: ItemId, item_name: impl Into<String>, quantity: i64) -> Self {
        Self {
            id: OrderLineId::new(),
            item_id,
            item_name: item_name.into(),
            quantity_ordered: quantity,
            quantity_fulfilled: 0,
            quantity_committed: 0,
            quantity_back_ordered: 0,
        }
    }

    pub fn quantity_outstanding(&self) -> i64 {
        self.quantity_ordered - self.quantity_fulfilled
    }

    pub fn is_fully_fulfilled(&self) -> bool {
        self.quantity_fulfilled >= self.quantity_ordered
    }
}

/// Transactional aggregate root: SalesOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    id: SalesOrderId,
    order_number: String,
    date: DateTime<Utc>,
    status: SalesOrderStatus,
    lines: Vec<SalesOrderLine>,
    audit: AuditInfo,
}

impl SalesOrder {
    pub fn new(
        id: SalesOrderId,
        order_number: impl Into<String>,
        date: DateTime<Utc>,
        lines: Vec<SalesOrderLine>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_lines(&lines)?;

        Ok(Self {
            id,
            order_number: order_number.into(),
            date,
            status: SalesOrderStatus::PendingApproval,
            lines,
            audit: AuditInfo::new(now),
        })
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn status(&self) -> SalesOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[SalesOrderLine] {
        &self.lines
    }

    pub fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    pub fn line(&self, line_id: OrderLineId) -> Option<&SalesOrderLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    fn has_fulfillments(&self) -> bool {
        self.lines.iter().any(|l| l.quantity_fulfilled > 0)
    }

    /// Lines may be replaced (order update) only before any fulfillment.
    pub fn is_modifiable(&self) -> bool {
        matches!(
            self.status,
            SalesOrderStatus::PendingApproval | SalesOrderStatus::PendingFulfillment
        ) && !self.has_fulfillments()
    }

    pub fn is_fulfillable(&self) -> bool {
        matches!(
            self.status,
            SalesOrderStatus::PendingFulfillment | SalesOrderStatus::PartiallyFulfilled
        )
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != SalesOrderStatus::PendingApproval {
            return Err(DomainError::invariant(
                "only pending-approval sales orders can be approved",
            ));
        }
        self.status = SalesOrderStatus::PendingFulfillment;
        self.audit.touch(now);
        Ok(())
    }

    /// Store the commitment split computed by the sales-order-created handler.
    pub fn set_commitment(
        &mut self,
        line_id: OrderLineId,
        committed: i64,
        back_ordered: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or(DomainError::NotFound)?;

        if committed + back_ordered != line.quantity_ordered {
            return Err(DomainError::invariant(format!(
                "commitment split {committed}+{back_ordered} does not cover ordered quantity {}",
                line.quantity_ordered
            )));
        }

        line.quantity_committed = committed;
        line.quantity_back_ordered = back_ordered;
        self.audit.touch(now);
        Ok(())
    }

    /// Record a fulfillment against one line and roll the status up.
    pub fn fulfill(
        &mut self,
        line_id: OrderLineId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.is_fulfillable() {
            return Err(DomainError::invariant(format!(
                "sales order {} is not fulfillable in status {:?}",
                self.order_number, self.status
            )));
        }
        if quantity <= 0 {
            return Err(DomainError::validation("fulfillment quantity must be positive"));
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or(DomainError::NotFound)?;

        if quantity > line.quantity_outstanding() {
            return Err(DomainError::validation(format!(
                "fulfillment of {quantity} exceeds outstanding quantity {}",
                line.quantity_outstanding()
            )));
        }

        line.quantity_fulfilled += quantity;
        // Fulfilled quantity comes out of the reservation first, then the
        // backordered remainder.
        let released = quantity.min(line.quantity_committed);
        line.quantity_committed -= released;
        line.quantity_back_ordered = (line.quantity_back_ordered - (quantity - released)).max(0);

        self.status = if self.lines.iter().all(SalesOrderLine::is_fully_fulfilled) {
            SalesOrderStatus::Fulfilled
        } else {
            SalesOrderStatus::PartiallyFulfilled
        };
        self.audit.touch(now);
        Ok(())
    }

    /// Replace the owned line set (order update path).
    pub fn replace_lines(
        &mut self,
        lines: Vec<SalesOrderLine>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify a sales order once fulfillment has started",
            ));
        }
        validate_lines(&lines)?;

        self.lines = lines;
        self.audit.touch(now);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot cancel a sales order once fulfillment has started",
            ));
        }
        self.status = SalesOrderStatus::Cancelled;
        self.audit.touch(now);
        Ok(())
    }

    pub fn close(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != SalesOrderStatus::Fulfilled {
            return Err(DomainError::invariant(
                "only fully fulfilled sales orders can be closed",
            ));
        }
        self.status = SalesOrderStatus::Closed;
        self.audit.touch(now);
        Ok(())
    }
}

impl Entity for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_lines(lines: &[SalesOrderLine]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::validation("sales order requires at least one line"));
    }
    for line in lines {
        if line.quantity_ordered <= 0 {
            return Err(DomainError::validation("line quantity must be positive"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with_line(quantity: i64) -> SalesOrder {
        let now = Utc::now();
        SalesOrder::new(
            SalesOrderId::new(),
            "SO-00001",
            now,
            vec![SalesOrderLine::new(ItemId::new(), "Widget", quantity)],
            now,
        )
        .unwrap()
    }

    #[test]
    fn commitment_split_must_cover_ordered_quantity() {
        let mut order = order_with_line(60);
        let line_id = order.lines()[0].id;

        order.set_commitment(line_id, 50, 10, Utc::now()).unwrap();
        assert_eq!(order.lines()[0].quantity_committed, 50);
        assert_eq!(order.lines()[0].quantity_back_ordered, 10);

        let err = order.set_commitment(line_id, 50, 5, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn fulfill_consumes_commitment_then_backorder() {
        let mut order = order_with_line(60);
        let line_id = order.lines()[0].id;
        order.set_commitment(line_id, 50, 10, Utc::now()).unwrap();
        order.approve(Utc::now()).unwrap();

        order.fulfill(line_id, 55, Utc::now()).unwrap();
        let line = &order.lines()[0];
        assert_eq!(line.quantity_fulfilled, 55);
        assert_eq!(line.quantity_committed, 0);
        assert_eq!(line.quantity_back_ordered, 5);
        assert_eq!(order.status(), SalesOrderStatus::PartiallyFulfilled);

        order.fulfill(line_id, 5, Utc::now()).unwrap();
        assert_eq!(order.status(), SalesOrderStatus::Fulfilled);
        order.close(Utc::now()).unwrap();
    }

    #[test]
    fn over_fulfillment_is_a_validation_failure() {
        let mut order = order_with_line(10);
        let line_id = order.lines()[0].id;
        order.approve(Utc::now()).unwrap();

        let err = order.fulfill(line_id, 11, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn fulfillment_freezes_modification() {
        let mut order = order_with_line(10);
        let line_id = order.lines()[0].id;
        order.approve(Utc::now()).unwrap();
        order.fulfill(line_id, 1, Utc::now()).unwrap();

        assert!(!order.is_modifiable());
        assert!(order.cancel(Utc::now()).is_err());
    }

    #[test]
    fn cancel_before_fulfillment() {
        let mut order = order_with_line(10);
        order.cancel(Utc::now()).unwrap();
        assert_eq!(order.status(), SalesOrderStatus::Cancelled);
    }
}
