//! Price lookup: recovering unit prices for quantity-bearing rows
//!
//! Settlement exports report price and quantity for one sale on separate,
//! non-adjacent rows. The lookup table aggregates rows by lookup key and
//! derives a per-unit price that the invoice builder reads back.

use std::collections::HashMap;

use bigdecimal::BigDecimal;

use crate::types::{PriceLookupEntry, SourceRow};

/// Read-only per-batch price lookup table, keyed by lookup key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceLookupTable {
    entries: HashMap<String, PriceLookupEntry>,
}

impl PriceLookupTable {
    pub fn get(&self, key: &str) -> Option<&PriceLookupEntry> {
        self.entries.get(key)
    }

    /// Unit price for a row's (optional) lookup key
    pub fn unit_price(&self, key: Option<&str>) -> Option<&BigDecimal> {
        key.and_then(|k| self.entries.get(k)).map(|e| &e.unit_price)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the price lookup table for a batch.
///
/// Rows are grouped by lookup key, keeping the maximum price line and the
/// maximum quantity seen per key; keys with a zero on either side carry no
/// recoverable price and are dropped.
pub fn build_price_lookup(rows: &[SourceRow]) -> PriceLookupTable {
    let zero = BigDecimal::from(0);
    let mut grouped: HashMap<&str, (BigDecimal, i64)> = HashMap::new();

    for row in rows {
        let key = match &row.lookup_key {
            Some(key) => key.as_str(),
            None => continue,
        };
        let price_line = price_amount_line(row);
        let quantity = row.quantity_purchased.unwrap_or(0);
        if price_line == zero && quantity == 0 {
            continue;
        }
        let entry = grouped.entry(key).or_insert((zero.clone(), 0));
        if price_line > entry.0 {
            entry.0 = price_line;
        }
        if quantity > entry.1 {
            entry.1 = quantity;
        }
    }

    let entries: HashMap<String, PriceLookupEntry> = grouped
        .into_iter()
        .filter(|(_, (total, quantity))| *total != zero && *quantity != 0)
        .map(|(key, (total, quantity))| {
            let unit_price = &total / BigDecimal::from(quantity);
            (
                key.to_string(),
                PriceLookupEntry {
                    total_price_amount: total,
                    quantity,
                    unit_price,
                },
            )
        })
        .collect();

    tracing::debug!(entries = entries.len(), "price lookup table built");
    PriceLookupTable { entries }
}

/// The price contribution of a single row.
///
/// Damage/reversal rows that carry a quantity report their value in the
/// "other" amount field; principal rows report it in the price field;
/// everything else contributes nothing.
fn price_amount_line(row: &SourceRow) -> BigDecimal {
    let txn_type = row.transaction_type.trim().to_uppercase();
    let quantity = row.quantity_purchased.unwrap_or(0);

    if (txn_type == "WAREHOUSE DAMAGE" || txn_type == "REVERSAL_REIMBURSEMENT") && quantity > 0 {
        row.other_amount.clone()
    } else if row.price_type.trim().eq_ignore_ascii_case("principal") {
        row.price_amount.clone()
    } else {
        BigDecimal::from(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::test_support::bare_row;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn keyed_row(row_id: u64, key: &str) -> crate::types::SourceRow {
        let mut row = bare_row(row_id, "S1");
        row.lookup_key = Some(key.to_string());
        row
    }

    #[test]
    fn price_and_quantity_rows_recombine_into_a_unit_price() {
        let mut price_row = keyed_row(1, "1234567SKU1");
        price_row.price_type = "Principal".to_string();
        price_row.price_amount = dec("19.99");

        let mut quantity_row = keyed_row(2, "1234567SKU1");
        quantity_row.quantity_purchased = Some(2);

        let table = build_price_lookup(&[price_row, quantity_row]);
        let entry = table.get("1234567SKU1").unwrap();
        assert_eq!(entry.total_price_amount, dec("19.99"));
        assert_eq!(entry.quantity, 2);
        assert_eq!(entry.unit_price, dec("9.995"));
    }

    #[test]
    fn damage_rows_price_from_the_other_amount_field() {
        let mut row = keyed_row(1, "K");
        row.transaction_type = "WAREHOUSE DAMAGE".to_string();
        row.quantity_purchased = Some(3);
        row.other_amount = dec("30.00");
        row.price_amount = dec("999");

        let table = build_price_lookup(&[row]);
        assert_eq!(table.get("K").unwrap().unit_price, dec("10.00"));
    }

    #[test]
    fn keys_without_both_sides_are_dropped() {
        let mut price_only = keyed_row(1, "P");
        price_only.price_type = "Principal".to_string();
        price_only.price_amount = dec("5.00");

        let mut quantity_only = keyed_row(2, "Q");
        quantity_only.quantity_purchased = Some(4);

        let table = build_price_lookup(&[price_only, quantity_only]);
        assert!(table.is_empty());
    }

    #[test]
    fn keyless_rows_are_excluded() {
        let mut row = bare_row(1, "S1");
        row.price_type = "Principal".to_string();
        row.price_amount = dec("5.00");
        row.quantity_purchased = Some(1);
        assert!(build_price_lookup(&[row]).is_empty());
    }

    #[test]
    fn rebuilding_yields_identical_prices() {
        let mut price_row = keyed_row(1, "K");
        price_row.price_type = "principal".to_string();
        price_row.price_amount = dec("47.97");
        let mut quantity_row = keyed_row(2, "K");
        quantity_row.quantity_purchased = Some(3);

        let rows = vec![price_row, quantity_row];
        let first = build_price_lookup(&rows);
        let second = build_price_lookup(&rows);
        assert_eq!(first, second);
        assert_eq!(first.get("K").unwrap().unit_price, dec("15.99"));
    }
}
