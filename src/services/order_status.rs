//! Order-level status transitions, derived from the aggregate receiving
//! state of the items, plus the order total derivation.
//!
//! Everything here is pure: the fulfillment engine calls these functions
//! once per mutating command and persists the result. Callers never set
//! `status`, `fully_received`, `delivery_date`, or `total_amount` directly.

use rust_decimal::Decimal;

use crate::{
    entities::{purchase_order_items, purchase_orders::PurchaseOrderStatus},
    errors::ServiceError,
    services::receiving::ItemCompletion,
};

/// Recomputes the order status from the completion states of its items.
///
/// - Canceled and Received are terminal: recomputing them is a no-op.
/// - All items complete -> Received.
/// - At least one item partial or complete, but not all complete ->
///   PartiallyReceived.
/// - No receipts yet -> status unchanged (Draft/Issued stay put).
///
/// An order with no items keeps its current status; an empty item set never
/// counts as "all received".
pub fn recompute(
    current: PurchaseOrderStatus,
    completions: &[ItemCompletion],
) -> PurchaseOrderStatus {
    if current.is_terminal() {
        return current;
    }

    if completions.is_empty() {
        return current;
    }

    let all_complete = completions
        .iter()
        .all(|c| matches!(c, ItemCompletion::Complete));
    if all_complete {
        return PurchaseOrderStatus::Received;
    }

    let any_received = completions
        .iter()
        .any(|c| !matches!(c, ItemCompletion::None));
    if any_received {
        return PurchaseOrderStatus::PartiallyReceived;
    }

    current
}

/// Guards a receiving command: receipts against terminal orders are illegal.
pub fn ensure_receivable(status: PurchaseOrderStatus) -> Result<(), ServiceError> {
    if status.is_terminal() {
        return Err(ServiceError::IllegalTransition(format!(
            "cannot receive against a {} purchase order",
            status
        )));
    }
    Ok(())
}

/// Explicit cancel transition. Fails once the order is terminal.
pub fn cancel(status: PurchaseOrderStatus) -> Result<PurchaseOrderStatus, ServiceError> {
    if status.is_terminal() {
        return Err(ServiceError::IllegalTransition(format!(
            "cannot cancel a {} purchase order",
            status
        )));
    }
    Ok(PurchaseOrderStatus::Canceled)
}

/// Order total: what was ordered, at the price snapshotted at order time.
/// Received quantities affect fulfillment status, never the invoice total.
pub fn order_total(items: &[purchase_order_items::Model]) -> Decimal {
    items
        .iter()
        .map(|item| item.ordered_quantity * item.unit_price)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use ItemCompletion::{Complete, None as NotStarted, Partial};

    #[test]
    fn no_receipts_leaves_status_unchanged() {
        assert_eq!(
            recompute(PurchaseOrderStatus::Issued, &[NotStarted, NotStarted]),
            PurchaseOrderStatus::Issued
        );
        assert_eq!(
            recompute(PurchaseOrderStatus::Draft, &[NotStarted]),
            PurchaseOrderStatus::Draft
        );
    }

    #[test]
    fn any_progress_marks_partially_received() {
        assert_eq!(
            recompute(PurchaseOrderStatus::Issued, &[Partial, NotStarted]),
            PurchaseOrderStatus::PartiallyReceived
        );
        assert_eq!(
            recompute(PurchaseOrderStatus::Issued, &[Complete, NotStarted]),
            PurchaseOrderStatus::PartiallyReceived
        );
    }

    #[test]
    fn all_complete_marks_received() {
        assert_eq!(
            recompute(PurchaseOrderStatus::PartiallyReceived, &[Complete, Complete]),
            PurchaseOrderStatus::Received
        );
    }

    #[test]
    fn recompute_is_idempotent() {
        let first = recompute(PurchaseOrderStatus::Issued, &[Complete]);
        let second = recompute(first, &[Complete]);
        assert_eq!(first, second);
        assert_eq!(second, PurchaseOrderStatus::Received);

        let first = recompute(PurchaseOrderStatus::Issued, &[Partial]);
        let second = recompute(first, &[Partial]);
        assert_eq!(first, second);
    }

    #[test]
    fn cancellation_wins_over_receiving_state() {
        // Recompute never resurrects a canceled order, whatever the items say.
        assert_eq!(
            recompute(PurchaseOrderStatus::Canceled, &[Complete, Complete]),
            PurchaseOrderStatus::Canceled
        );
    }

    #[test]
    fn empty_item_set_never_counts_as_received() {
        assert_eq!(
            recompute(PurchaseOrderStatus::Issued, &[]),
            PurchaseOrderStatus::Issued
        );
    }

    #[test]
    fn cancel_transition_rules() {
        assert_eq!(
            cancel(PurchaseOrderStatus::Issued).unwrap(),
            PurchaseOrderStatus::Canceled
        );
        assert_eq!(
            cancel(PurchaseOrderStatus::PartiallyReceived).unwrap(),
            PurchaseOrderStatus::Canceled
        );
        assert!(matches!(
            cancel(PurchaseOrderStatus::Received),
            Err(ServiceError::IllegalTransition(_))
        ));
        assert!(matches!(
            cancel(PurchaseOrderStatus::Canceled),
            Err(ServiceError::IllegalTransition(_))
        ));
    }

    #[test]
    fn terminal_orders_reject_receipts() {
        assert!(ensure_receivable(PurchaseOrderStatus::Issued).is_ok());
        assert!(ensure_receivable(PurchaseOrderStatus::PartiallyReceived).is_ok());
        assert!(matches!(
            ensure_receivable(PurchaseOrderStatus::Received),
            Err(ServiceError::IllegalTransition(_))
        ));
        assert!(matches!(
            ensure_receivable(PurchaseOrderStatus::Canceled),
            Err(ServiceError::IllegalTransition(_))
        ));
    }

    fn item(ordered: Decimal, price: Decimal) -> purchase_order_items::Model {
        purchase_order_items::Model {
            id: Uuid::new_v4(),
            purchase_order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            ordered_quantity: ordered,
            received_quantity: dec!(0),
            unit_price: price,
            description: None,
            location_id: None,
        }
    }

    #[test]
    fn total_reflects_ordered_not_received() {
        let mut items = vec![item(dec!(5), dec!(10)), item(dec!(5), dec!(20))];
        assert_eq!(order_total(&items), dec!(150));

        // Fully receiving the first item does not move the total.
        items[0].received_quantity = dec!(5);
        assert_eq!(order_total(&items), dec!(150));
    }

    #[test]
    fn total_of_empty_order_is_zero() {
        assert_eq!(order_total(&[]), dec!(0));
    }
}
