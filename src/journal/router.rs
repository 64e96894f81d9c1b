//! GL account routing
//!
//! An ordered decision table on row attributes; the first matching rule
//! wins and everything unmatched lands in Clearing.

use crate::types::{GlAccount, SourceRow};

/// Route one row to its ledger account.
pub fn route(row: &SourceRow) -> GlAccount {
    let currency = lower(row.currency.as_deref().unwrap_or(""));
    let txn_type = lower(&row.transaction_type);
    let price_type = lower(&row.price_type);
    let item_fee = lower(&row.item_related_fee_type);
    let promo_type = lower(&row.promotion_type);
    let shipment_fee = lower(&row.shipment_fee_type);

    let is_order_or_refund = txn_type == "order" || txn_type == "refund";

    // Deposit rows: any non-null settlement total in the home currency
    if row.total_amount.is_some() && currency == "cad" {
        return GlAccount::Clearing;
    }
    // Principal sales and refunds clear against the invoice side
    if is_order_or_refund && price_type == "principal" {
        return GlAccount::Clearing;
    }
    // Shipping income in its three reporting shapes
    if is_order_or_refund && promo_type == "shipping" {
        return GlAccount::Revenue;
    }
    if is_order_or_refund && price_type == "shipping" {
        return GlAccount::Revenue;
    }
    if txn_type == "order" && item_fee == "shippingchargeback" {
        return GlAccount::Revenue;
    }
    // Fulfillment fees
    if is_order_or_refund && shipment_fee == "fba transportation fee" {
        return GlAccount::FbaFulfillmentFees;
    }
    if is_order_or_refund
        && matches!(
            item_fee.as_str(),
            "fbaperunitfulfillmentfee" | "commission" | "digitalservicesfee" | "refundcommission"
        )
    {
        return GlAccount::FbaFulfillmentFees;
    }
    // Account-level charges
    if txn_type == "inbound transportation fee" {
        return GlAccount::InboundFreight;
    }
    if txn_type == "subscription fee" {
        return GlAccount::AccountFees;
    }
    if txn_type == "servicefee" && item_fee == "cost of advertising" {
        return GlAccount::AdvertisingExpense;
    }
    if txn_type == "storage fee" {
        return GlAccount::StorageExpense;
    }
    // Everything else clears
    GlAccount::Clearing
}

fn lower(text: &str) -> String {
    text.trim().to_lowercase()
}
