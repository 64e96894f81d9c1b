//! Core types and data structures for the settlement engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The fixed set of ledger accounts a settlement row can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlAccount {
    /// Suspense account that nets to the invoiced amount once a settlement
    /// is fully posted
    Clearing,
    /// Marketplace revenue (shipping income and shipping chargebacks)
    Revenue,
    /// Fulfillment, transportation, commission, and digital-service fees
    FbaFulfillmentFees,
    /// Inbound transportation charges
    InboundFreight,
    /// Subscription and account-level fees
    AccountFees,
    /// Cost-of-advertising service fees
    AdvertisingExpense,
    /// Warehouse storage fees
    StorageExpense,
    /// General marketplace selling expenses
    SellingExpenses,
    /// Referral fees
    ReferralFees,
    /// Digital services fees billed separately
    DigitalServicesFees,
    /// Combined GST/PST collected on a settlement line
    CombinedTaxCharged,
}

impl GlAccount {
    /// Display name used on journal exports and in the external-ledger mapping
    pub fn name(&self) -> &'static str {
        match self {
            GlAccount::Clearing => "Amazon.ca Clearing",
            GlAccount::Revenue => "Amazon.ca Revenue",
            GlAccount::FbaFulfillmentFees => "Amazon FBA Fulfillment Fees",
            GlAccount::InboundFreight => "Amazon Inbound Freight Charges",
            GlAccount::AccountFees => "Amazon Account Fees",
            GlAccount::AdvertisingExpense => "Amazon Advertising Expense",
            GlAccount::StorageExpense => "Amazon Storage Expense",
            GlAccount::SellingExpenses => "Amazon.ca Selling Expenses",
            GlAccount::ReferralFees => "Amazon Referral Fees",
            GlAccount::DigitalServicesFees => "Amazon Digital Services Fees",
            GlAccount::CombinedTaxCharged => "Amazon Combined Tax Charged",
        }
    }

    /// Expense accounts post as credits that net against Clearing, so every
    /// line routed to one of them has its debit/credit polarity swapped
    pub fn is_expense(&self) -> bool {
        matches!(
            self,
            GlAccount::FbaFulfillmentFees
                | GlAccount::AdvertisingExpense
                | GlAccount::StorageExpense
                | GlAccount::InboundFreight
                | GlAccount::AccountFees
                | GlAccount::SellingExpenses
                | GlAccount::ReferralFees
                | GlAccount::DigitalServicesFees
        )
    }

    /// All accounts, in export order
    pub const ALL: [GlAccount; 11] = [
        GlAccount::Clearing,
        GlAccount::Revenue,
        GlAccount::FbaFulfillmentFees,
        GlAccount::InboundFreight,
        GlAccount::AccountFees,
        GlAccount::AdvertisingExpense,
        GlAccount::StorageExpense,
        GlAccount::SellingExpenses,
        GlAccount::ReferralFees,
        GlAccount::DigitalServicesFees,
        GlAccount::CombinedTaxCharged,
    ];
}

/// Types of entries in double-entry bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Debit entry
    Debit,
    /// Credit entry
    Credit,
}

/// One line of a settlement report as handed over by the file-reading
/// collaborator: column names already normalized, every field still text.
///
/// All fields are optional so that sparse report rows (and tests) can be
/// expressed with `..Default::default()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub settlement_id: Option<String>,
    pub order_id: Option<String>,
    pub merchant_order_id: Option<String>,
    pub sku: Option<String>,
    pub marketplace_name: Option<String>,
    pub currency: Option<String>,
    pub transaction_type: Option<String>,
    pub price_type: Option<String>,
    pub shipment_fee_type: Option<String>,
    pub order_fee_type: Option<String>,
    pub item_related_fee_type: Option<String>,
    pub other_fee_reason_description: Option<String>,
    pub promotion_type: Option<String>,
    pub quantity_purchased: Option<String>,
    pub posted_date: Option<String>,
    pub deposit_date: Option<String>,
    pub price_amount: Option<String>,
    pub shipment_fee_amount: Option<String>,
    pub order_fee_amount: Option<String>,
    pub item_related_fee_amount: Option<String>,
    pub misc_fee_amount: Option<String>,
    pub other_fee_amount: Option<String>,
    pub direct_payment_amount: Option<String>,
    pub other_amount: Option<String>,
    pub promotion_amount: Option<String>,
    pub total_amount: Option<String>,
}

/// One ingested settlement row. Immutable once assigned a `row_id`; the
/// `row_id` is the unit of lineage for every downstream check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Monotonically increasing per-batch identifier, assigned at ingestion
    /// and never reused
    pub row_id: u64,
    pub settlement_id: String,
    pub order_id: Option<String>,
    pub merchant_order_id: Option<String>,
    pub sku: Option<String>,
    pub marketplace_name: Option<String>,
    pub currency: Option<String>,
    /// Classifier fields; absent values are stored as empty strings
    pub transaction_type: String,
    pub price_type: String,
    pub shipment_fee_type: String,
    pub order_fee_type: String,
    pub item_related_fee_type: String,
    pub other_fee_reason_description: String,
    pub promotion_type: String,
    pub quantity_purchased: Option<i64>,
    pub posted_date: Option<NaiveDateTime>,
    /// Populated on exactly one row per settlement (the deposit header row)
    pub deposit_date: Option<NaiveDateTime>,
    pub price_amount: BigDecimal,
    pub shipment_fee_amount: BigDecimal,
    pub order_fee_amount: BigDecimal,
    pub item_related_fee_amount: BigDecimal,
    pub misc_fee_amount: BigDecimal,
    pub other_fee_amount: BigDecimal,
    pub direct_payment_amount: BigDecimal,
    pub other_amount: BigDecimal,
    pub promotion_amount: BigDecimal,
    /// The settlement-wide deposit total; null on non-deposit rows and
    /// meaningful to GL routing when present
    pub total_amount: Option<BigDecimal>,
    /// True for the single row carrying the batch-level deposit total
    /// (`row_id == min(row_id)` within the settlement)
    pub is_deposit_anchor: bool,
    /// Join key linking rows that belong to the same commercial event;
    /// `None` when the row has no sku
    pub lookup_key: Option<String>,
    /// Net transaction amount: the nine fee/amount fields summed, with the
    /// deposit total netted out on the anchor row
    pub transaction_amount: BigDecimal,
    /// Tax portion of the row ("taxamount" fee-reason rows), zero otherwise
    pub tax_amount: BigDecimal,
    /// Recovered row-level issues (malformed amounts, unparseable dates)
    pub parse_notes: Vec<String>,
}

/// A unit price recovered for one lookup key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLookupEntry {
    /// `max(price_amount_line)` across all rows sharing the key
    pub total_price_amount: BigDecimal,
    /// `max(quantity_purchased)` across all rows sharing the key
    pub quantity: i64,
    /// `total_price_amount / quantity`
    pub unit_price: BigDecimal,
}

/// One journal entry. Exactly one of `debit`/`credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    pub settlement_id: String,
    /// Settlement deposit date propagated to every line, falling back to the
    /// row's posted date
    pub date: Option<NaiveDate>,
    pub gl_account: GlAccount,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub description: String,
    pub notes: String,
    pub source_row_id: u64,
}

impl JournalLine {
    /// True for lines synthesized onto the combined tax account
    pub fn is_tax_line(&self) -> bool {
        self.gl_account == GlAccount::CombinedTaxCharged
    }
}

/// Validation outcome of an invoice line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceValidation {
    /// Non-zero line amount
    Valid,
    /// Quantity present but no recoverable price; kept on the invoice as a
    /// $0 transaction
    ValidZeroAmount,
    /// Zero line amount with no explaining edge case; excluded from the
    /// export and reported as a data-quality finding
    Review,
}

impl InvoiceValidation {
    /// Flag text as it appears on exports
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceValidation::Valid => "Valid",
            InvoiceValidation::ValidZeroAmount => "Valid - $0 Transaction",
            InvoiceValidation::Review => "Zero Invoice Amount: Review",
        }
    }

    /// Whether the line is kept on the final invoice export
    pub fn is_exportable(&self) -> bool {
        !matches!(self, InvoiceValidation::Review)
    }
}

/// One invoice line. Lines sharing an `invoice_number` compose one logical
/// invoice whose date, customer, and reference are taken from the first line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub customer: String,
    pub sku: String,
    pub quantity: i64,
    pub item_price: BigDecimal,
    pub line_amount: BigDecimal,
    pub notes: String,
    /// The settlement this line belongs to
    pub reference_number: String,
    pub source_row_id: u64,
    pub validation: InvoiceValidation,
}

/// One customer payment: the sum of an invoice's line amounts, cleared on
/// the settlement's bank deposit date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub invoice_number: String,
    pub customer: String,
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub paid_through_account: String,
    pub mode: String,
    pub reference_number: String,
}

/// A settlement whose journal could not be balanced because no bank deposit
/// line was available to plug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImbalanceFinding {
    pub settlement_id: String,
    /// Signed difference `total credits - total debits` at the time the
    /// plug was attempted
    pub difference: BigDecimal,
}

/// Errors that can occur in the settlement engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("malformed amount: {0:?}")]
    MalformedAmount(String),
    #[error("no external ledger mapping for account '{0}'")]
    UnmappedGlAccount(String),
    #[error(
        "journal for settlement {settlement_id} is out of balance by {difference} \
         and has no bank deposit line to adjust"
    )]
    JournalImbalance {
        settlement_id: String,
        difference: BigDecimal,
    },
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Tolerance used by the balance and clearing checks: one cent
pub fn cent() -> BigDecimal {
    &BigDecimal::from(1) / BigDecimal::from(100)
}
