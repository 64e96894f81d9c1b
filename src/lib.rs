//! # Settlement Core
//!
//! A settlement-to-ledger transformation engine: deterministically turns
//! per-transaction marketplace settlement reports into a balanced
//! double-entry journal, customer invoices, and customer payments, plus
//! reconciliation metrics proving the three outputs agree with each other
//! and with the source data.
//!
//! ## Features
//!
//! - **Batch ingestion**: amount/date parsing with per-row recovery, lineage
//!   row ids, and deposit-anchor detection
//! - **Price lookup**: recovers unit prices for line items whose price and
//!   quantity arrive on separate report rows
//! - **GL routing**: ordered first-match decision table onto a fixed set of
//!   named ledger accounts
//! - **Journal building**: debit/credit polarity with two sign-override
//!   passes, synthetic tax lines, and a swappable balancing strategy
//! - **Invoices and payments**: deterministic invoice numbers, zero-amount
//!   edge-case validation, one payment per invoice on the deposit date
//! - **Reconciliation**: line-count conservation, journal balance, and
//!   clearing-vs-invoicing checks, with unresolved rows enumerated
//!
//! ## Quick Start
//!
//! ```rust
//! use settlement_core::{LedgerAccountMap, RawRecord, SettlementBatch, SettlementEngine};
//!
//! let records = vec![
//!     RawRecord {
//!         settlement_id: Some("23874396421".to_string()),
//!         total_amount: Some("29.99".to_string()),
//!         currency: Some("CAD".to_string()),
//!         deposit_date: Some("2025-03-14".to_string()),
//!         ..Default::default()
//!     },
//!     RawRecord {
//!         settlement_id: Some("23874396421".to_string()),
//!         order_id: Some("701-1234567-0001234".to_string()),
//!         sku: Some("SKU1".to_string()),
//!         transaction_type: Some("Order".to_string()),
//!         price_type: Some("Principal".to_string()),
//!         currency: Some("CAD".to_string()),
//!         price_amount: Some("29.99".to_string()),
//!         quantity_purchased: Some("1".to_string()),
//!         posted_date: Some("2025-03-01 09:30:00".to_string()),
//!         ..Default::default()
//!     },
//! ];
//!
//! let batch = SettlementBatch::ingest(records);
//! let engine = SettlementEngine::new(LedgerAccountMap::default());
//! let output = engine.process(&batch);
//!
//! assert!(output.reconciliation.get("23874396421").unwrap().is_balanced());
//! ```

pub mod engine;
pub mod ingest;
pub mod invoice;
pub mod journal;
pub mod pricing;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use engine::{BatchOutput, SettlementEngine};
pub use ingest::{parse_amount, SettlementBatch};
pub use invoice::{build_invoices, build_payments, InvoiceBuildOutput, InvoiceBuilder};
pub use journal::{build_journal, route, JournalBuildOutput, JournalBuilder};
pub use pricing::{build_price_lookup, PriceLookupTable};
pub use reconciliation::{
    reconcile, ReconciliationEngine, ReconciliationReport, SettlementReconciliation,
};
pub use traits::{BalancingStrategy, DepositPlugStrategy, StrictBalancing};
pub use types::*;
pub use utils::LedgerAccountMap;
