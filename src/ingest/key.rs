//! Lookup key derivation
//!
//! Settlement exports split one sale into several rows (principal price,
//! fees, promotions) that share order_id + sku but carry different amount
//! fields. The lookup key is the join surface that recombines them.

use chrono::NaiveDateTime;

/// Fallback date component used when a keyless row has no posted date
const FALLBACK_DATE: &str = "01011900";

/// Derive the composite lookup key for a row.
///
/// Rows without a sku produce no key and are excluded from price lookup.
/// With an order_id the key is the order's last seven characters plus the
/// sku; otherwise settlement_id + posted date (`ddMMyyyy`) + lowercase
/// transaction type.
pub fn lookup_key(
    settlement_id: &str,
    order_id: Option<&str>,
    sku: Option<&str>,
    posted_date: Option<NaiveDateTime>,
    transaction_type: &str,
) -> Option<String> {
    let sku = sku.map(str::trim).unwrap_or("");
    if sku.is_empty() || sku.eq_ignore_ascii_case("nan") || sku.eq_ignore_ascii_case("null") {
        return None;
    }

    let order_id = order_id.map(str::trim).unwrap_or("");
    if order_id.is_empty() || order_id.eq_ignore_ascii_case("nan") {
        let date_part = match posted_date {
            Some(dt) => dt.format("%d%m%Y").to_string(),
            None => FALLBACK_DATE.to_string(),
        };
        Some(format!(
            "{settlement_id}{date_part}{}",
            transaction_type.trim().to_lowercase()
        ))
    } else {
        Some(format!("{}{sku}", tail(order_id, 7)))
    }
}

/// Last `n` characters of a string (the whole string when shorter)
pub(crate) fn tail(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
