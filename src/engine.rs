//! Engine orchestrator wiring the pipeline stages together

use crate::ingest::SettlementBatch;
use crate::invoice::{build_payments, InvoiceBuilder};
use crate::journal::JournalBuilder;
use crate::pricing::{build_price_lookup, PriceLookupTable};
use crate::reconciliation::{reconcile, ReconciliationReport};
use crate::traits::BalancingStrategy;
use crate::types::*;
use crate::utils::LedgerAccountMap;

/// Everything one batch run produces. All tables are write-once; the
/// reconciliation report is computed last and mutates nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    pub journal: Vec<JournalLine>,
    /// Settlements whose journal could not be balanced
    pub imbalances: Vec<ImbalanceFinding>,
    pub invoices: Vec<InvoiceLine>,
    /// Zero-amount invoice lines excluded from the export
    pub rejected_invoices: Vec<InvoiceLine>,
    pub payments: Vec<PaymentRecord>,
    pub reconciliation: ReconciliationReport,
    /// GL account names used by the journal with no external mapping;
    /// non-empty means the journal must not be posted yet
    pub unmapped_accounts: Vec<String>,
}

/// Orchestrates the settlement pipeline: price lookup, journal, invoices,
/// payments, and reconciliation over one ingested batch.
///
/// The engine holds no batch state; batches are independent and a single
/// engine can process any number of them.
pub struct SettlementEngine {
    journal_builder: JournalBuilder,
    invoice_builder: InvoiceBuilder,
    account_map: LedgerAccountMap,
}

impl SettlementEngine {
    /// Create an engine with default strategies and the given account mapping
    pub fn new(account_map: LedgerAccountMap) -> Self {
        Self {
            journal_builder: JournalBuilder::new(),
            invoice_builder: InvoiceBuilder::new(),
            account_map,
        }
    }

    /// Create an engine with a custom balancing strategy and invoice builder
    pub fn with_strategies(
        account_map: LedgerAccountMap,
        balancing: Box<dyn BalancingStrategy>,
        invoice_builder: InvoiceBuilder,
    ) -> Self {
        Self {
            journal_builder: JournalBuilder::with_strategy(balancing),
            invoice_builder,
            account_map,
        }
    }

    pub fn account_map(&self) -> &LedgerAccountMap {
        &self.account_map
    }

    /// Build the batch price lookup table
    pub fn price_lookup(&self, batch: &SettlementBatch) -> PriceLookupTable {
        build_price_lookup(batch.rows())
    }

    /// Run the whole pipeline over one batch.
    pub fn process(&self, batch: &SettlementBatch) -> BatchOutput {
        let rows = batch.rows();
        let lookup = build_price_lookup(rows);

        let journal = self.journal_builder.build(rows);
        let invoices = self.invoice_builder.build(rows, &lookup);

        let mut payments = Vec::new();
        for settlement_id in batch.settlement_ids() {
            match batch.deposit_date(settlement_id) {
                Some(deposit) => {
                    let settlement_lines: Vec<InvoiceLine> = invoices
                        .lines
                        .iter()
                        .filter(|l| l.reference_number == settlement_id)
                        .cloned()
                        .collect();
                    payments.extend(build_payments(&settlement_lines, deposit.date()));
                }
                None => {
                    tracing::warn!(
                        settlement_id,
                        "settlement has no deposit date; payments skipped"
                    );
                }
            }
        }

        let reconciliation = reconcile(rows, &journal.lines, &invoices.lines);
        let unmapped_accounts = self.account_map.missing_accounts(&journal.lines);
        if !unmapped_accounts.is_empty() {
            tracing::warn!(
                accounts = ?unmapped_accounts,
                "journal uses accounts with no external ledger mapping"
            );
        }

        BatchOutput {
            journal: journal.lines,
            imbalances: journal.imbalances,
            invoices: invoices.lines,
            rejected_invoices: invoices.rejected,
            payments,
            reconciliation,
            unmapped_accounts,
        }
    }
}
