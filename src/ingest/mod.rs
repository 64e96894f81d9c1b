//! Batch ingestion: raw report records to immutable source rows
//!
//! Ingestion is the only place rows are created. Each record gets a
//! monotonically increasing `row_id`, parsed amount and date fields, the
//! deposit-anchor flag, its lookup key, and the precomputed net
//! transaction/tax amounts. Parse failures are recovered to zero (amounts)
//! or `None` (dates, quantities) with a note on the row's lineage; a
//! malformed row never aborts the batch.

pub mod amount;
pub mod amounts;
pub mod key;

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};

use crate::types::*;

pub use amount::parse_amount;
pub use key::lookup_key;

/// One ingested settlement batch: an immutable table of source rows
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementBatch {
    rows: Vec<SourceRow>,
}

impl SettlementBatch {
    /// Ingest raw records into source rows.
    ///
    /// Row ids start at 1 and follow input order; the first row of each
    /// settlement becomes its deposit anchor.
    pub fn ingest(records: Vec<RawRecord>) -> Self {
        let mut rows: Vec<SourceRow> = records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| ingest_record(idx as u64 + 1, record))
            .collect();

        let mut first_row: HashMap<String, u64> = HashMap::new();
        for row in &rows {
            let entry = first_row
                .entry(row.settlement_id.clone())
                .or_insert(row.row_id);
            if row.row_id < *entry {
                *entry = row.row_id;
            }
        }

        for row in &mut rows {
            row.is_deposit_anchor = first_row.get(&row.settlement_id) == Some(&row.row_id);
            row.transaction_amount = amounts::transaction_amount(row);
            row.tax_amount = amounts::tax_amount(row);
            row.lookup_key = key::lookup_key(
                &row.settlement_id,
                row.order_id.as_deref(),
                row.sku.as_deref(),
                row.posted_date,
                &row.transaction_type,
            );
        }

        tracing::info!(
            rows = rows.len(),
            settlements = first_row.len(),
            "settlement batch ingested"
        );
        Self { rows }
    }

    /// Wrap already-ingested rows (for callers that persist rows between runs)
    pub fn from_rows(rows: Vec<SourceRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[SourceRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<SourceRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct settlement ids in first-seen order
    pub fn settlement_ids(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.settlement_id.as_str()) {
                seen.push(row.settlement_id.as_str());
            }
        }
        seen
    }

    /// The settlement's single deposit date (first non-null occurrence)
    pub fn deposit_date(&self, settlement_id: &str) -> Option<NaiveDateTime> {
        self.rows
            .iter()
            .filter(|r| r.settlement_id == settlement_id)
            .find_map(|r| r.deposit_date)
    }
}

fn ingest_record(row_id: u64, record: RawRecord) -> SourceRow {
    let mut notes: Vec<String> = Vec::new();

    let mut parse_field = |field: &str, raw: &Option<String>| -> BigDecimal {
        match raw {
            None => BigDecimal::from(0),
            Some(text) => match amount::parse_amount(text) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(row_id, field, %err, "recovered malformed amount as zero");
                    notes.push(format!("{field}: {err}"));
                    BigDecimal::from(0)
                }
            },
        }
    };

    let price_amount = parse_field("price_amount", &record.price_amount);
    let shipment_fee_amount = parse_field("shipment_fee_amount", &record.shipment_fee_amount);
    let order_fee_amount = parse_field("order_fee_amount", &record.order_fee_amount);
    let item_related_fee_amount =
        parse_field("item_related_fee_amount", &record.item_related_fee_amount);
    let misc_fee_amount = parse_field("misc_fee_amount", &record.misc_fee_amount);
    let other_fee_amount = parse_field("other_fee_amount", &record.other_fee_amount);
    let direct_payment_amount = parse_field("direct_payment_amount", &record.direct_payment_amount);
    let other_amount = parse_field("other_amount", &record.other_amount);
    let promotion_amount = parse_field("promotion_amount", &record.promotion_amount);

    // total_amount keeps present/absent semantics: routing treats any
    // non-null total as the deposit-row signal
    let total_amount = match &record.total_amount {
        Some(text) if has_value(text) => Some(parse_field("total_amount", &record.total_amount)),
        _ => None,
    };

    let quantity_purchased = parse_quantity(row_id, &record.quantity_purchased, &mut notes);
    let posted_date = parse_date_field(row_id, "posted_date", &record.posted_date, &mut notes);
    let deposit_date = parse_date_field(row_id, "deposit_date", &record.deposit_date, &mut notes);

    SourceRow {
        row_id,
        settlement_id: record.settlement_id.as_deref().map(str::trim).unwrap_or("").to_string(),
        order_id: optional_text(record.order_id),
        merchant_order_id: optional_text(record.merchant_order_id),
        sku: optional_text(record.sku),
        marketplace_name: optional_text(record.marketplace_name),
        currency: optional_text(record.currency),
        transaction_type: classifier_text(record.transaction_type),
        price_type: classifier_text(record.price_type),
        shipment_fee_type: classifier_text(record.shipment_fee_type),
        order_fee_type: classifier_text(record.order_fee_type),
        item_related_fee_type: classifier_text(record.item_related_fee_type),
        other_fee_reason_description: classifier_text(record.other_fee_reason_description),
        promotion_type: classifier_text(record.promotion_type),
        quantity_purchased,
        posted_date,
        deposit_date,
        price_amount,
        shipment_fee_amount,
        order_fee_amount,
        item_related_fee_amount,
        misc_fee_amount,
        other_fee_amount,
        direct_payment_amount,
        other_amount,
        promotion_amount,
        total_amount,
        // filled in by the batch-level passes
        is_deposit_anchor: false,
        lookup_key: None,
        transaction_amount: BigDecimal::from(0),
        tax_amount: BigDecimal::from(0),
        parse_notes: notes,
    }
}

fn has_value(text: &str) -> bool {
    let t = text.trim();
    !t.is_empty() && !t.eq_ignore_ascii_case("nan") && !t.eq_ignore_ascii_case("null")
}

fn optional_text(raw: Option<String>) -> Option<String> {
    raw.and_then(|text| {
        let t = text.trim();
        if has_value(t) {
            Some(t.to_string())
        } else {
            None
        }
    })
}

fn classifier_text(raw: Option<String>) -> String {
    optional_text(raw).unwrap_or_default()
}

fn parse_quantity(row_id: u64, raw: &Option<String>, notes: &mut Vec<String>) -> Option<i64> {
    let text = raw.as_deref()?.trim();
    if !has_value(text) {
        return None;
    }
    if let Ok(q) = text.parse::<i64>() {
        return Some(q);
    }
    // report writers occasionally emit "2.0"
    if let Ok(f) = text.parse::<f64>() {
        if f.fract() == 0.0 {
            return Some(f as i64);
        }
    }
    tracing::warn!(row_id, value = text, "unparseable quantity dropped");
    notes.push(format!("quantity_purchased: unparseable {text:?}"));
    None
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S UTC",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];

fn parse_date_field(
    row_id: u64,
    field: &str,
    raw: &Option<String>,
    notes: &mut Vec<String>,
) -> Option<NaiveDateTime> {
    let text = raw.as_deref()?.trim();
    if !has_value(text) {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    tracing::warn!(row_id, field, value = text, "unparseable date dropped");
    notes.push(format!("{field}: unparseable {text:?}"));
    None
}
