//! Net transaction and tax amount calculation

use bigdecimal::BigDecimal;

use crate::types::SourceRow;

/// Sum of the nine fee/amount components, minus the settlement-wide deposit
/// total on the deposit anchor row (so the batch total is not double-counted
/// as a fee component).
pub fn transaction_amount(row: &SourceRow) -> BigDecimal {
    let component_sum = &row.price_amount
        + &row.shipment_fee_amount
        + &row.order_fee_amount
        + &row.item_related_fee_amount
        + &row.misc_fee_amount
        + &row.other_fee_amount
        + &row.direct_payment_amount
        + &row.other_amount
        + &row.promotion_amount;

    match (&row.total_amount, row.is_deposit_anchor) {
        (Some(total), true) => component_sum - total,
        _ => component_sum,
    }
}

/// The "other fee" amount counts as tax only when the fee-reason classifier
/// says so.
pub fn tax_amount(row: &SourceRow) -> BigDecimal {
    if row
        .other_fee_reason_description
        .trim()
        .eq_ignore_ascii_case("taxamount")
    {
        row.other_fee_amount.clone()
    } else {
        BigDecimal::from(0)
    }
}
