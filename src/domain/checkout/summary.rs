use rust_decimal::Decimal;

use super::value_objects::CheckoutItem;

/// Totals over a validated item set. Amounts are fixed-point decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub total_qty: i64,
    pub total_amount: Decimal,
}

impl OrderSummary {
    pub fn from_items(items: &[CheckoutItem]) -> Self {
        items.iter().fold(
            Self {
                total_qty: 0,
                total_amount: Decimal::ZERO,
            },
            |acc, item| Self {
                total_qty: acc.total_qty + i64::from(item.quantity),
                total_amount: acc.total_amount + Decimal::from(item.quantity) * item.price,
            },
        )
    }
}
