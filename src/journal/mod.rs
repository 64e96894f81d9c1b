//! Journal building: routed rows to a balanced double-entry journal

pub mod router;
pub mod signs;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::traits::{BalancingStrategy, DepositPlugStrategy};
use crate::types::*;

pub use router::route;

/// Result of a journal build: the lines plus any settlements that could not
/// be balanced. Partial output is always kept.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalBuildOutput {
    pub lines: Vec<JournalLine>,
    pub imbalances: Vec<ImbalanceFinding>,
}

/// Builds journal lines from ingested rows: routing, polarity with its two
/// override passes, synthetic tax lines, and the balancing adjustment.
pub struct JournalBuilder {
    balancing: Box<dyn BalancingStrategy>,
}

impl JournalBuilder {
    /// Create a builder with the default deposit-plug balancing strategy
    pub fn new() -> Self {
        Self {
            balancing: Box::new(DepositPlugStrategy::new()),
        }
    }

    /// Create a builder with a custom balancing strategy
    pub fn with_strategy(balancing: Box<dyn BalancingStrategy>) -> Self {
        Self { balancing }
    }

    /// Build the journal for every settlement in the row set.
    pub fn build(&self, rows: &[SourceRow]) -> JournalBuildOutput {
        let mut output = JournalBuildOutput {
            lines: Vec::new(),
            imbalances: Vec::new(),
        };

        for (settlement_id, settlement_rows) in group_by_settlement(rows) {
            let deposit_date = settlement_rows
                .iter()
                .find_map(|r| r.deposit_date)
                .map(|dt| dt.date());

            let mut lines = Vec::new();
            for row in &settlement_rows {
                if includes_row(row) {
                    lines.push(standard_line(row, deposit_date));
                }
            }
            // Tax lines come from the full settlement, not the journal
            // subset: a zero-amount row can still carry tax.
            for row in &settlement_rows {
                if row.tax_amount != BigDecimal::from(0) {
                    lines.push(tax_line(row, deposit_date));
                }
            }

            match self.balancing.balance(settlement_id, &mut lines) {
                Ok(()) => {}
                Err(EngineError::JournalImbalance {
                    settlement_id,
                    difference,
                }) => {
                    tracing::warn!(
                        settlement_id = %settlement_id,
                        %difference,
                        "settlement left unbalanced: no deposit line to adjust"
                    );
                    output.imbalances.push(ImbalanceFinding {
                        settlement_id,
                        difference,
                    });
                }
                Err(err) => {
                    tracing::warn!(settlement_id, %err, "balancing failed");
                    output.imbalances.push(ImbalanceFinding {
                        settlement_id: settlement_id.to_string(),
                        difference: BigDecimal::from(0),
                    });
                }
            }

            tracing::info!(
                settlement_id,
                lines = lines.len(),
                "journal built for settlement"
            );
            output.lines.append(&mut lines);
        }

        output
    }
}

impl Default for JournalBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a journal with the default strategy.
pub fn build_journal(rows: &[SourceRow]) -> JournalBuildOutput {
    JournalBuilder::new().build(rows)
}

/// Group rows per settlement in first-seen order
pub(crate) fn group_by_settlement(rows: &[SourceRow]) -> Vec<(&str, Vec<&SourceRow>)> {
    let mut groups: Vec<(&str, Vec<&SourceRow>)> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|(id, _)| *id == row.settlement_id) {
            Some((_, members)) => members.push(row),
            None => groups.push((row.settlement_id.as_str(), vec![row])),
        }
    }
    groups
}

/// Zero-amount principal order rows are kept so every source row stays
/// accounted for in the line-count check.
fn includes_row(row: &SourceRow) -> bool {
    row.transaction_amount != BigDecimal::from(0)
        || (row.transaction_type.eq_ignore_ascii_case("order")
            && row.price_type.eq_ignore_ascii_case("principal"))
}

fn standard_line(row: &SourceRow, deposit_date: Option<NaiveDate>) -> JournalLine {
    let adjusted = &row.transaction_amount - &row.tax_amount;
    let account = router::route(row);

    let (mut side, amount) = signs::default_polarity(&adjusted);
    if signs::revenue_override_applies(&row.transaction_type, &adjusted) {
        side = signs::flip(side);
    }
    if signs::expense_override_applies(account) {
        side = signs::flip(side);
    }

    let (debit, credit) = match side {
        EntryType::Debit => (amount, BigDecimal::from(0)),
        EntryType::Credit => (BigDecimal::from(0), amount),
    };

    JournalLine {
        settlement_id: row.settlement_id.clone(),
        date: deposit_date.or_else(|| row.posted_date.map(|dt| dt.date())),
        gl_account: account,
        debit,
        credit,
        description: line_description(row),
        notes: line_notes(row),
        source_row_id: row.row_id,
    }
}

fn tax_line(row: &SourceRow, deposit_date: Option<NaiveDate>) -> JournalLine {
    // Ordinary sign rules; tax is a liability collected or reversed
    let (side, amount) = signs::default_polarity(&row.tax_amount);
    let (debit, credit) = match side {
        EntryType::Debit => (amount, BigDecimal::from(0)),
        EntryType::Credit => (BigDecimal::from(0), amount),
    };

    JournalLine {
        settlement_id: row.settlement_id.clone(),
        date: deposit_date.or_else(|| row.posted_date.map(|dt| dt.date())),
        gl_account: GlAccount::CombinedTaxCharged,
        debit,
        credit,
        description: format!("Combined GST and PST charged on line # {}", row.row_id),
        notes: line_notes(row),
        source_row_id: row.row_id,
    }
}

/// "/"-join of the distinct classifier values; deposit rows with no
/// classifiers become the bank deposit line the balancing plug targets.
fn line_description(row: &SourceRow) -> String {
    let classifiers = [
        &row.transaction_type,
        &row.price_type,
        &row.shipment_fee_type,
        &row.order_fee_type,
        &row.item_related_fee_type,
        &row.other_fee_reason_description,
        &row.promotion_type,
    ];

    let mut parts: Vec<&str> = Vec::new();
    for value in classifiers {
        let trimmed = value.trim();
        if !trimmed.is_empty() && !parts.contains(&trimmed) {
            parts.push(trimmed);
        }
    }

    if parts.is_empty() {
        match row.deposit_date {
            Some(dt) => format!("Bank Deposit on {}", dt.format("%Y-%m-%d")),
            None => String::new(),
        }
    } else {
        parts.join("/")
    }
}

fn line_notes(row: &SourceRow) -> String {
    format!(
        "Row ID: {} - Merchant Order ID: {}",
        row.row_id,
        row.merchant_order_id.as_deref().unwrap_or("")
    )
}
