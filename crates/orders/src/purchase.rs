use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{AuditInfo, DomainError, Entity, ItemId, OrderLineId, PurchaseOrderId};

/// Purchase order status lifecycle.
///
/// `PendingApproval → PendingReceipt → PartiallyReceived → Received → Closed`,
/// with `Cancelled` reachable from the two pending states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    PendingApproval,
    PendingReceipt,
    PartiallyReceived,
    Received,
    Closed,
    Cancelled,
}

/// Purchase order line: references one item, carries the vendor rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: OrderLineId,
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity_ordered: i64,
    pub quantity_received: i64,
    /// Unit cost agreed with the vendor; becomes the cost layer's unit cost
    /// on receipt.
    pub rate: f64,
}

impl PurchaseOrderLine {
    pub fn new(item_id: ItemId, item_name: impl Into<String>, quantity: i64, rate: f64) -> Self {
        Self {
            id: OrderLineId::new(),
            item_id,
            item_name: item_name.into(),
            quantity_ordered: quantity,
            quantity_received: 0,
            rate,
        }
    }

    pub fn quantity_outstanding(&self) -> i64 {
        self.quantity_ordered - self.quantity_received
    }

    pub fn is_fully_received(&self) -> bool {
        self.quantity_received >= self.quantity_ordered
    }
}

/// Transactional aggregate root: PurchaseOrder.
///
/// Owns its lines; references items without owning them. Deleted only as a
/// whole aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    order_number: String,
    date: DateTime<Utc>,
    status: PurchaseOrderStatus,
    lines: Vec<PurchaseOrderLine>,
    audit: AuditInfo,
}

impl PurchaseOrder {
    pub fn new(
        id: PurchaseOrderId,
        order_number: impl Into<String>,
        date: DateTime<Utc>,
        lines: Vec<PurchaseOrderLine>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_lines(&lines)?;

        Ok(Self {
            id,
            order_number: order_number.into(),
            date,
            status: PurchaseOrderStatus::PendingApproval,
            lines,
            audit: AuditInfo::new(now),
        })
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[PurchaseOrderLine] {
        &self.lines
    }

    pub fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    pub fn line(&self, line_id: OrderLineId) -> Option<&PurchaseOrderLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    fn has_receipts(&self) -> bool {
        self.lines.iter().any(|l| l.quantity_received > 0)
    }

    /// Lines may be replaced (order update) only before any receipt.
    pub fn is_modifiable(&self) -> bool {
        matches!(
            self.status,
            PurchaseOrderStatus::PendingApproval | PurchaseOrderStatus::PendingReceipt
        ) && !self.has_receipts()
    }

    pub fn is_receivable(&self) -> bool {
        matches!(
            self.status,
            PurchaseOrderStatus::PendingReceipt | PurchaseOrderStatus::PartiallyReceived
        )
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != PurchaseOrderStatus::PendingApproval {
            return Err(DomainError::invariant(
                "only pending-approval purchase orders can be approved",
            ));
        }
        self.status = PurchaseOrderStatus::PendingReceipt;
        self.audit.touch(now);
        Ok(())
    }

    /// Record a receipt against one line and roll the status up.
    pub fn receive(
        &mut self,
        line_id: OrderLineId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.is_receivable() {
            return Err(DomainError::invariant(format!(
                "purchase order {} is not receivable in status {:?}",
                self.order_number, self.status
            )));
        }
        if quantity <= 0 {
            return Err(DomainError::validation("receipt quantity must be positive"));
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or(DomainError::NotFound)?;

        if quantity > line.quantity_outstanding() {
            return Err(DomainError::validation(format!(
                "receipt of {quantity} exceeds outstanding quantity {}",
                line.quantity_outstanding()
            )));
        }

        line.quantity_received += quantity;

        self.status = if self.lines.iter().all(PurchaseOrderLine::is_fully_received) {
            PurchaseOrderStatus::Received
        } else {
            PurchaseOrderStatus::PartiallyReceived
        };
        self.audit.touch(now);
        Ok(())
    }

    /// Replace the owned line set (order update path).
    pub fn replace_lines(
        &mut self,
        lines: Vec<PurchaseOrderLine>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify a purchase order once receiving has started",
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
                "cannot cancel a purchase order once receiving has started",
            ));
        }
        self.status = PurchaseOrderStatus::Cancelled;
        self.audit.touch(now);
        Ok(())
    }

    pub fn close(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != PurchaseOrderStatus::Received {
            return Err(DomainError::invariant(
                "only fully received purchase orders can be closed",
            ));
        }
        self.status = PurchaseOrderStatus::Closed;
        self.audit.touch(now);
        Ok(())
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_lines(lines: &[PurchaseOrderLine]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::validation("purchase order requires at least one line"));
    }
    for line in lines {
        if line.quantity_ordered <= 0 {
            return Err(DomainError::validation("line quantity must be positive"));
        }
        if line.rate < 0.0 {
            return Err(DomainError::validation("line rate cannot be negative"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with_line(quantity: i64) -> PurchaseOrder {
        let now = Utc::now();
        PurchaseOrder::new(
            PurchaseOrderId::new(),
            "PO-00001",
            now,
            vec![PurchaseOrderLine::new(ItemId::new(), "Widget", quantity, 4.5)],
            now,
        )
        .unwrap()
    }

    #[test]
    fn create_requires_lines() {
        let now = Utc::now();
        let err =
            PurchaseOrder::new(PurchaseOrderId::new(), "PO-00001", now, vec![], now).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn receive_before_approval_is_rejected() {
        let mut order = order_with_line(10);
        let line_id = order.lines()[0].id;
        let err = order.receive(line_id, 5, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn partial_then_full_receipt_rolls_status_up() {
        let mut order = order_with_line(10);
        let line_id = order.lines()[0].id;
        order.approve(Utc::now()).unwrap();

        order.receive(line_id, 4, Utc::now()).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::PartiallyReceived);

        order.receive(line_id, 6, Utc::now()).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Received);

        order.close(Utc::now()).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Closed);
    }

    #[test]
    fn over_receipt_is_a_validation_failure() {
        let mut order = order_with_line(10);
        let line_id = order.lines()[0].id;
        order.approve(Utc::now()).unwrap();

        let err = order.receive(line_id, 11, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(order.lines()[0].quantity_received, 0);
    }

    #[test]
    fn receipt_freezes_modification_and_cancellation() {
        let mut order = order_with_line(10);
        let line_id = order.lines()[0].id;
        order.approve(Utc::now()).unwrap();
        assert!(order.is_modifiable());

        order.receive(line_id, 1, Utc::now()).unwrap();
        assert!(!order.is_modifiable());
        assert!(order.cancel(Utc::now()).is_err());
        assert!(
            order
                .replace_lines(
                    vec![PurchaseOrderLine::new(ItemId::new(), "Other", 5, 1.0)],
                    Utc::now()
                )
                .is_err()
        );
    }

    #[test]
    fn cancel_from_pending_states() {
        let mut order = order_with_line(10);
        order.cancel(Utc::now()).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Cancelled);
    }

    #[test]
    fn receive_unknown_line_is_not_found() {
        let mut order = order_with_line(10);
        order.approve(Utc::now()).unwrap();
        let err = order.receive(OrderLineId::new(), 1, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }
}
