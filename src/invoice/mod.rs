//! Invoice building: quantity-bearing rows to invoice lines

pub mod payment;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};

use crate::ingest::key::tail;
use crate::pricing::PriceLookupTable;
use crate::types::*;

pub use payment::build_payments;

/// Default customer when the report carries no marketplace name
const DEFAULT_CUSTOMER: &str = "Amazon.ca";

/// Result of an invoice build. `lines` holds the exportable lines; rejected
/// zero-amount lines are kept for data-quality reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceBuildOutput {
    pub lines: Vec<InvoiceLine>,
    pub rejected: Vec<InvoiceLine>,
}

/// Builds invoice lines from ingested rows and the batch price lookup.
pub struct InvoiceBuilder {
    /// Timestamp used for date-based invoice numbers when a row has no
    /// posted date. Injected so number derivation stays a pure function.
    fallback_timestamp: NaiveDateTime,
}

impl InvoiceBuilder {
    /// Create a builder whose date fallback is the current time
    pub fn new() -> Self {
        Self {
            fallback_timestamp: chrono::Utc::now().naive_utc(),
        }
    }

    /// Create a builder with an explicit fallback timestamp
    pub fn with_fallback_timestamp(fallback_timestamp: NaiveDateTime) -> Self {
        Self { fallback_timestamp }
    }

    /// Build invoice lines for every quantity-bearing row.
    pub fn build(&self, rows: &[SourceRow], lookup: &PriceLookupTable) -> InvoiceBuildOutput {
        let mut output = InvoiceBuildOutput {
            lines: Vec::new(),
            rejected: Vec::new(),
        };

        for row in rows {
            let quantity = match row.quantity_purchased {
                Some(q) => q,
                None => continue,
            };

            let item_price = resolve_item_price(row, lookup);
            let line_amount = &item_price * BigDecimal::from(quantity);
            let validation = classify_line(quantity, &item_price, &line_amount);

            let line = InvoiceLine {
                invoice_number: self.invoice_number(row),
                invoice_date: invoice_date(row),
                customer: row
                    .marketplace_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CUSTOMER.to_string()),
                sku: row.sku.clone().unwrap_or_default(),
                quantity,
                item_price,
                line_amount,
                notes: invoice_notes(row),
                reference_number: row.settlement_id.clone(),
                source_row_id: row.row_id,
                validation,
            };

            if validation.is_exportable() {
                output.lines.push(line);
            } else {
                tracing::warn!(
                    row_id = row.row_id,
                    settlement_id = %row.settlement_id,
                    "invoice line excluded: zero amount requiring review"
                );
                output.rejected.push(line);
            }
        }

        tracing::info!(
            lines = output.lines.len(),
            rejected = output.rejected.len(),
            "invoice lines built"
        );
        output
    }

    /// Derive the invoice number for a row.
    ///
    /// Warehouse-damage rows and rows without an order id get a date-coded
    /// number (`AMZN` + last year digit + MMDDHH); everything else keys on
    /// the order id tail, so all rows of one order share one invoice.
    fn invoice_number(&self, row: &SourceRow) -> String {
        let txn_type = row.transaction_type.to_uppercase();
        let is_damage = txn_type.contains("WAREHOUSE") && txn_type.contains("DAMAGE");
        let order_id = row.order_id.as_deref().map(str::trim).unwrap_or("");

        if is_damage || order_id.is_empty() {
            let ts = row.posted_date.unwrap_or(self.fallback_timestamp);
            format!(
                "AMZN{}{}",
                chrono::Datelike::year(&ts).rem_euclid(10),
                ts.format("%m%d%H")
            )
        } else {
            format!("AMZN{}", tail(order_id, 7))
        }
    }
}

impl Default for InvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build invoices with the default (current-time) date fallback.
pub fn build_invoices(rows: &[SourceRow], lookup: &PriceLookupTable) -> InvoiceBuildOutput {
    InvoiceBuilder::new().build(rows, lookup)
}

/// Resolve the per-unit price for an invoice line.
///
/// Damage and reversal rows always price from their own transaction amount;
/// other rows prefer the recovered lookup price and fall back to the
/// transaction amount.
fn resolve_item_price(row: &SourceRow, lookup: &PriceLookupTable) -> BigDecimal {
    let zero = BigDecimal::from(0);
    let quantity = row.quantity_purchased.unwrap_or(0);
    let txn_type = row.transaction_type.trim().to_uppercase();

    if quantity != 0
        && row.transaction_amount != zero
        && (txn_type == "REVERSAL_REIMBURSEMENT" || txn_type == "WAREHOUSE DAMAGE")
    {
        return &row.transaction_amount / BigDecimal::from(quantity);
    }

    match lookup.unit_price(row.lookup_key.as_deref()) {
        Some(unit_price) if *unit_price != zero => unit_price.clone(),
        _ => row.transaction_amount.clone(),
    }
}

fn invoice_date(row: &SourceRow) -> NaiveDate {
    match row.posted_date {
        Some(dt) => dt.date(),
        None => NaiveDate::from_ymd_opt(1900, 1, 1).expect("constant date"),
    }
}

fn invoice_notes(row: &SourceRow) -> String {
    let mut notes = row.transaction_type.clone();
    if row.transaction_type.eq_ignore_ascii_case("order") {
        if let Some(order_id) = row.order_id.as_deref() {
            notes.push(' ');
            notes.push_str(order_id);
        }
    }
    if row.tax_amount != BigDecimal::from(0) {
        notes.push_str(&format!(" Tax: {}", row.tax_amount));
    }
    format!("{notes}-{}_{}", row.settlement_id, row.row_id)
}

/// Zero-amount edge case handling: a quantity with no recoverable price is
/// a legitimate $0 transaction; any other zero line needs review.
fn classify_line(quantity: i64, item_price: &BigDecimal, line_amount: &BigDecimal) -> InvoiceValidation {
    let zero = BigDecimal::from(0);
    if quantity != 0 && *item_price == zero && *line_amount == zero {
        InvoiceValidation::ValidZeroAmount
    } else if *line_amount != zero {
        InvoiceValidation::Valid
    } else {
        InvoiceValidation::Review
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::test_support::bare_row;
    use crate::pricing::build_price_lookup;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn builder() -> InvoiceBuilder {
        InvoiceBuilder::with_fallback_timestamp(ts(1999, 1, 1, 0))
    }

    #[test]
    fn rows_without_quantity_are_skipped() {
        let mut row = bare_row(1, "S1");
        row.transaction_amount = dec("10.00");
        let output = builder().build(&[row], &PriceLookupTable::default());
        assert!(output.lines.is_empty());
        assert!(output.rejected.is_empty());
    }

    #[test]
    fn lookup_price_wins_over_transaction_amount() {
        let mut price_row = bare_row(1, "S1");
        price_row.lookup_key = Some("K".to_string());
        price_row.price_type = "Principal".to_string();
        price_row.price_amount = dec("19.99");

        let mut quantity_row = bare_row(2, "S1");
        quantity_row.lookup_key = Some("K".to_string());
        quantity_row.sku = Some("SKU1".to_string());
        quantity_row.quantity_purchased = Some(2);
        quantity_row.transaction_amount = dec("123.45");
        quantity_row.posted_date = Some(ts(2025, 3, 1, 9));
        quantity_row.order_id = Some("701-1234567-0001234".to_string());
        quantity_row.transaction_type = "Order".to_string();

        let rows = vec![price_row, quantity_row];
        let lookup = build_price_lookup(&rows);
        let output = builder().build(&rows, &lookup);

        assert_eq!(output.lines.len(), 1);
        let line = &output.lines[0];
        assert_eq!(line.item_price, dec("9.995"));
        assert_eq!(line.line_amount, dec("19.990"));
        assert_eq!(line.invoice_number, "AMZN0001234");
        assert_eq!(line.validation, InvoiceValidation::Valid);
    }

    #[test]
    fn damage_rows_always_price_from_their_own_amount() {
        let mut row = bare_row(1, "S1");
        row.transaction_type = "WAREHOUSE DAMAGE".to_string();
        row.quantity_purchased = Some(3);
        row.transaction_amount = dec("30.00");
        row.lookup_key = Some("K".to_string());
        row.posted_date = Some(ts(2025, 3, 7, 14));

        // a lookup entry exists but must be ignored for damage rows
        let mut price_row = bare_row(2, "S1");
        price_row.lookup_key = Some("K".to_string());
        price_row.price_type = "Principal".to_string();
        price_row.price_amount = dec("99.00");
        let mut qty_row = bare_row(3, "S1");
        qty_row.lookup_key = Some("K".to_string());
        qty_row.quantity_purchased = Some(1);

        let lookup = build_price_lookup(&[price_row, qty_row]);
        let output = builder().build(std::slice::from_ref(&row), &lookup);
        assert_eq!(output.lines[0].item_price, dec("10.00"));
    }

    #[test]
    fn damage_rows_get_date_coded_invoice_numbers() {
        let mut row = bare_row(1, "S1");
        row.transaction_type = "WAREHOUSE DAMAGE".to_string();
        row.quantity_purchased = Some(1);
        row.transaction_amount = dec("12.00");
        row.posted_date = Some(ts(2025, 3, 7, 14));
        // an order id elsewhere on the row must not change the number
        row.order_id = Some("701-1234567-0001234".to_string());

        let output = builder().build(&[row], &PriceLookupTable::default());
        assert_eq!(output.lines[0].invoice_number, "AMZN5030714");
    }

    #[test]
    fn orderless_rows_fall_back_to_the_injected_timestamp() {
        let mut row = bare_row(1, "S1");
        row.transaction_type = "Refund".to_string();
        row.quantity_purchased = Some(1);
        row.transaction_amount = dec("5.00");

        let output = builder().build(&[row], &PriceLookupTable::default());
        // fallback 1999-01-01 00:00 → year digit 9, 01 01 00
        assert_eq!(output.lines[0].invoice_number, "AMZN9010100");
    }

    #[test]
    fn invoice_numbers_are_deterministic() {
        let mut row = bare_row(1, "S1");
        row.transaction_type = "Order".to_string();
        row.order_id = Some("701-1234567-0001234".to_string());
        row.quantity_purchased = Some(1);
        row.transaction_amount = dec("5.00");
        row.posted_date = Some(ts(2025, 3, 1, 9));

        let a = builder().build(std::slice::from_ref(&row), &PriceLookupTable::default());
        let b = builder().build(std::slice::from_ref(&row), &PriceLookupTable::default());
        assert_eq!(a.lines[0].invoice_number, b.lines[0].invoice_number);
    }

    #[test]
    fn zero_price_with_quantity_is_a_kept_zero_transaction() {
        let mut row = bare_row(1, "S1");
        row.transaction_type = "Order".to_string();
        row.order_id = Some("701-1234567-0001234".to_string());
        row.quantity_purchased = Some(2);

        let output = builder().build(&[row], &PriceLookupTable::default());
        assert_eq!(output.lines.len(), 1);
        assert_eq!(output.lines[0].validation, InvoiceValidation::ValidZeroAmount);
    }

    #[test]
    fn zero_quantity_zero_amount_lines_are_rejected_for_review() {
        let mut row = bare_row(1, "S1");
        row.transaction_type = "Order".to_string();
        row.order_id = Some("701-1234567-0001234".to_string());
        row.quantity_purchased = Some(0);

        let output = builder().build(&[row], &PriceLookupTable::default());
        assert!(output.lines.is_empty());
        assert_eq!(output.rejected.len(), 1);
        assert_eq!(output.rejected[0].validation, InvoiceValidation::Review);
    }

    #[test]
    fn customer_defaults_to_the_marketplace() {
        let mut row = bare_row(1, "S1");
        row.transaction_type = "Order".to_string();
        row.order_id = Some("701-1234567-0001234".to_string());
        row.quantity_purchased = Some(1);
        row.transaction_amount = dec("5.00");

        let output = builder().build(std::slice::from_ref(&row), &PriceLookupTable::default());
        assert_eq!(output.lines[0].customer, "Amazon.ca");

        row.marketplace_name = Some("Amazon.com".to_string());
        let output = builder().build(&[row], &PriceLookupTable::default());
        assert_eq!(output.lines[0].customer, "Amazon.com");
    }

    #[test]
    fn notes_carry_lineage() {
        let mut row = bare_row(7, "S9");
        row.transaction_type = "Order".to_string();
        row.order_id = Some("701-1234567-0001234".to_string());
        row.quantity_purchased = Some(1);
        row.transaction_amount = dec("5.00");
        row.tax_amount = dec("0.65");

        let output = builder().build(&[row], &PriceLookupTable::default());
        let notes = &output.lines[0].notes;
        assert!(notes.contains("701-1234567-0001234"));
        assert!(notes.contains("Tax: 0.65"));
        assert!(notes.ends_with("-S9_7"));
    }
}
