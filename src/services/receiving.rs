use rust_decimal::Decimal;

use crate::{entities::purchase_order_items, errors::ServiceError};

/// How far along a line item is toward full receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCompletion {
    /// Nothing received yet.
    None,
    /// Some received, less than ordered.
    Partial,
    /// Received equals ordered.
    Complete,
}

/// Classifies a received/ordered pair.
pub fn completion(received: Decimal, ordered: Decimal) -> ItemCompletion {
    if received.is_zero() {
        ItemCompletion::None
    } else if received < ordered {
        ItemCompletion::Partial
    } else {
        ItemCompletion::Complete
    }
}

/// Applies a receipt of `quantity` against an item, returning the new
/// received quantity and the item's resulting completion state.
///
/// Over-receipt is rejected outright rather than clamped; silently clamping
/// would hide supplier or data errors.
pub fn receive_quantity(
    item: &purchase_order_items::Model,
    quantity: Decimal,
) -> Result<(Decimal, ItemCompletion), ServiceError> {
    if quantity <= Decimal::ZERO {
        return Err(ServiceError::InvalidQuantity(format!(
            "receipt quantity must be positive, got {}",
            quantity
        )));
    }

    let new_received = item.received_quantity + quantity;
    if new_received > item.ordered_quantity {
        return Err(ServiceError::OverReceipt(format!(
            "cannot receive more than ordered. Ordered: {}, already received: {}, trying to receive: {}",
            item.ordered_quantity, item.received_quantity, quantity
        )));
    }

    Ok((new_received, completion(new_received, item.ordered_quantity)))
}

/// Storage volume consumed by this receipt. A product without a declared
/// per-unit volume has zero footprint.
pub fn receipt_footprint(quantity: Decimal, unit_volume: Option<Decimal>) -> Decimal {
    match unit_volume {
        Some(v) => quantity * v,
        None => Decimal::ZERO,
    }
}
