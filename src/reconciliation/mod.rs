//! Reconciliation: proving the three outputs agree with the source rows
//!
//! Every metric here is a finding, not a gate: the engine always computes
//! and reports them, and the caller decides whether to block posting on a
//! mismatch. Nothing in this module mutates the builder outputs.

use std::collections::HashSet;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::journal::group_by_settlement;
use crate::types::*;

/// Per-settlement reconciliation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementReconciliation {
    pub settlement_id: String,
    /// Source rows in the settlement
    pub total_records: usize,
    /// Journal lines, synthetic tax lines included
    pub journal_line_count: usize,
    /// Valid invoice lines
    pub invoice_line_count: usize,
    /// Synthetic tax lines
    pub tax_line_count: usize,
    /// Rows present in both the journal and the invoice outputs
    pub split_line_count: usize,
    /// `total_records - journal - invoice + tax + split`; zero when every
    /// source row is accounted for exactly once
    pub linecount_check: i64,
    pub total_debits: BigDecimal,
    pub total_credits: BigDecimal,
    /// `total_debits - total_credits`
    pub balance_difference: BigDecimal,
    /// Debits posted to the clearing account
    pub clearing_account_debits: BigDecimal,
    /// Sum of valid invoice line amounts
    pub total_amount_invoiced: BigDecimal,
    /// `clearing_account_debits - total_amount_invoiced`
    pub clearing_difference: BigDecimal,
    /// Net of all transaction amounts; the deposit netting makes this
    /// expected to be zero for a complete settlement
    pub transaction_amount_sum: BigDecimal,
    /// Source rows absent from both outputs
    pub unresolved_row_ids: Vec<u64>,
}

impl SettlementReconciliation {
    /// Journal balances to the cent
    pub fn is_balanced(&self) -> bool {
        self.balance_difference.abs() < cent()
    }

    /// Clearing debits equal the invoiced total to the cent
    pub fn clearing_matches(&self) -> bool {
        self.clearing_difference.abs() < cent()
    }

    /// Every source row is accounted for exactly once
    pub fn line_counts_conserved(&self) -> bool {
        self.linecount_check == 0
    }

    /// True when any finding needs human review before posting
    pub fn requires_review(&self) -> bool {
        !self.is_balanced()
            || !self.clearing_matches()
            || !self.line_counts_conserved()
            || !self.unresolved_row_ids.is_empty()
    }
}

/// Reconciliation results for a whole batch, one entry per settlement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub settlements: Vec<SettlementReconciliation>,
}

impl ReconciliationReport {
    /// True when no settlement needs review
    pub fn clean(&self) -> bool {
        self.settlements.iter().all(|s| !s.requires_review())
    }

    /// Settlements flagged for review
    pub fn flagged(&self) -> Vec<&SettlementReconciliation> {
        self.settlements
            .iter()
            .filter(|s| s.requires_review())
            .collect()
    }

    pub fn get(&self, settlement_id: &str) -> Option<&SettlementReconciliation> {
        self.settlements
            .iter()
            .find(|s| s.settlement_id == settlement_id)
    }
}

/// Computes reconciliation metrics over the immutable builder outputs
pub struct ReconciliationEngine;

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Reconcile one batch: rows against the journal and invoice outputs.
    pub fn reconcile(
        &self,
        rows: &[SourceRow],
        journal: &[JournalLine],
        invoices: &[InvoiceLine],
    ) -> ReconciliationReport {
        let mut report = ReconciliationReport::default();

        for (settlement_id, settlement_rows) in group_by_settlement(rows) {
            let journal_lines: Vec<&JournalLine> = journal
                .iter()
                .filter(|l| l.settlement_id == settlement_id)
                .collect();
            let invoice_lines: Vec<&InvoiceLine> = invoices
                .iter()
                .filter(|l| l.reference_number == settlement_id)
                .collect();

            report.settlements.push(reconcile_settlement(
                settlement_id,
                &settlement_rows,
                &journal_lines,
                &invoice_lines,
            ));
        }

        report
    }
}

/// Reconcile a batch with the default engine.
pub fn reconcile(
    rows: &[SourceRow],
    journal: &[JournalLine],
    invoices: &[InvoiceLine],
) -> ReconciliationReport {
    ReconciliationEngine::new().reconcile(rows, journal, invoices)
}

fn reconcile_settlement(
    settlement_id: &str,
    rows: &[&SourceRow],
    journal: &[&JournalLine],
    invoices: &[&InvoiceLine],
) -> SettlementReconciliation {
    let total_records = rows.len();
    let journal_line_count = journal.len();
    let invoice_line_count = invoices.len();
    let tax_line_count = journal.iter().filter(|l| l.is_tax_line()).count();

    let journal_row_ids: HashSet<u64> = journal.iter().map(|l| l.source_row_id).collect();
    let invoice_row_ids: HashSet<u64> = invoices.iter().map(|l| l.source_row_id).collect();
    let split_line_count = journal_row_ids.intersection(&invoice_row_ids).count();

    let linecount_check = total_records as i64 - journal_line_count as i64
        - invoice_line_count as i64
        + tax_line_count as i64
        + split_line_count as i64;

    let total_debits: BigDecimal = journal.iter().map(|l| &l.debit).sum();
    let total_credits: BigDecimal = journal.iter().map(|l| &l.credit).sum();
    let balance_difference = &total_debits - &total_credits;

    let clearing_account_debits: BigDecimal = journal
        .iter()
        .filter(|l| l.gl_account == GlAccount::Clearing)
        .map(|l| &l.debit)
        .sum();
    let total_amount_invoiced: BigDecimal = invoices.iter().map(|l| &l.line_amount).sum();
    let clearing_difference = &clearing_account_debits - &total_amount_invoiced;

    let transaction_amount_sum: BigDecimal = rows.iter().map(|r| &r.transaction_amount).sum();

    let mut unresolved_row_ids: Vec<u64> = rows
        .iter()
        .map(|r| r.row_id)
        .filter(|id| !journal_row_ids.contains(id) && !invoice_row_ids.contains(id))
        .collect();
    unresolved_row_ids.sort_unstable();

    let recon = SettlementReconciliation {
        settlement_id: settlement_id.to_string(),
        total_records,
        journal_line_count,
        invoice_line_count,
        tax_line_count,
        split_line_count,
        linecount_check,
        total_debits,
        total_credits,
        balance_difference,
        clearing_account_debits,
        total_amount_invoiced,
        clearing_difference,
        transaction_amount_sum,
        unresolved_row_ids,
    };

    if recon.requires_review() {
        tracing::warn!(
            settlement_id,
            linecount_check = recon.linecount_check,
            balance_difference = %recon.balance_difference,
            clearing_difference = %recon.clearing_difference,
            unresolved = recon.unresolved_row_ids.len(),
            "settlement flagged for review"
        );
    } else {
        tracing::info!(settlement_id, "settlement reconciled clean");
    }

    recon
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::test_support::bare_row;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn journal_line(settlement_id: &str, row_id: u64, debit: &str, credit: &str) -> JournalLine {
        JournalLine {
            settlement_id: settlement_id.to_string(),
            date: None,
            gl_account: GlAccount::Clearing,
            debit: dec(debit),
            credit: dec(credit),
            description: String::new(),
            notes: String::new(),
            source_row_id: row_id,
        }
    }

    fn invoice_line(settlement_id: &str, row_id: u64, amount: &str) -> InvoiceLine {
        InvoiceLine {
            invoice_number: "AMZN0001234".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            customer: "Amazon.ca".to_string(),
            sku: "SKU1".to_string(),
            quantity: 1,
            item_price: dec(amount),
            line_amount: dec(amount),
            notes: String::new(),
            reference_number: settlement_id.to_string(),
            source_row_id: row_id,
            validation: InvoiceValidation::Valid,
        }
    }

    #[test]
    fn conserved_settlement_reconciles_clean() {
        // two rows: the deposit (journal only) and a sale (journal + invoice)
        let mut deposit = bare_row(1, "S1");
        deposit.transaction_amount = dec("-9.99");
        let mut sale = bare_row(2, "S1");
        sale.transaction_amount = dec("9.99");
        let rows = vec![deposit, sale];

        let journal = vec![
            journal_line("S1", 1, "9.99", "0"),
            journal_line("S1", 2, "0", "9.99"),
        ];
        let invoices = vec![invoice_line("S1", 2, "9.99")];

        let report = reconcile(&rows, &journal, &invoices);
        let s = report.get("S1").unwrap();

        // 2 records - 2 journal - 1 invoice + 0 tax + 1 split = 0
        assert_eq!(s.linecount_check, 0);
        assert_eq!(s.split_line_count, 1);
        assert!(s.is_balanced());
        assert!(s.clearing_matches());
        assert!(s.unresolved_row_ids.is_empty());
        assert_eq!(s.transaction_amount_sum, dec("0.00"));
        assert!(report.clean());
    }

    #[test]
    fn tax_lines_enter_the_linecount_formula() {
        let mut row = bare_row(1, "S1");
        row.transaction_amount = dec("2.00");
        row.tax_amount = dec("0.26");
        let rows = vec![row];

        let mut tax = journal_line("S1", 1, "0.26", "0");
        tax.gl_account = GlAccount::CombinedTaxCharged;
        let journal = vec![journal_line("S1", 1, "0", "1.74"), tax];

        let report = reconcile(&rows, &journal, &[]);
        let s = report.get("S1").unwrap();
        assert_eq!(s.tax_line_count, 1);
        // 1 record - 2 journal - 0 invoice + 1 tax + 0 split = 0
        assert_eq!(s.linecount_check, 0);
    }

    #[test]
    fn dropped_rows_are_enumerated_not_summarized() {
        let mut kept = bare_row(1, "S1");
        kept.transaction_amount = dec("1.00");
        let dropped = bare_row(2, "S1");
        let rows = vec![kept, dropped];

        let journal = vec![journal_line("S1", 1, "1.00", "0")];
        let report = reconcile(&rows, &journal, &[]);
        let s = report.get("S1").unwrap();
        assert_eq!(s.unresolved_row_ids, vec![2]);
        assert!(s.requires_review());
        assert_eq!(report.flagged().len(), 1);
    }

    #[test]
    fn clearing_mismatch_is_a_finding() {
        let mut row = bare_row(1, "S1");
        row.transaction_amount = dec("10.00");
        let rows = vec![row];

        let journal = vec![journal_line("S1", 1, "10.00", "0")];
        let invoices = vec![invoice_line("S1", 1, "7.50")];

        let report = reconcile(&rows, &journal, &invoices);
        let s = report.get("S1").unwrap();
        assert_eq!(s.clearing_account_debits, dec("10.00"));
        assert_eq!(s.total_amount_invoiced, dec("7.50"));
        assert_eq!(s.clearing_difference, dec("2.50"));
        assert!(!s.clearing_matches());
    }

    #[test]
    fn settlements_reconcile_independently() {
        let mut a = bare_row(1, "S1");
        a.transaction_amount = dec("1.00");
        let mut b = bare_row(2, "S2");
        b.transaction_amount = dec("2.00");
        let rows = vec![a, b];

        let journal = vec![
            journal_line("S1", 1, "1.00", "1.00"),
            journal_line("S2", 2, "2.00", "0"),
        ];
        let report = reconcile(&rows, &journal, &[]);
        assert_eq!(report.settlements.len(), 2);
        assert!(report.get("S1").unwrap().is_balanced());
        assert!(!report.get("S2").unwrap().is_balanced());
    }
}
