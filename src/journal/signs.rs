//! Debit/credit polarity assignment
//!
//! Three passes, applied in this order: the default sign rule, then the
//! revenue-type override, then the expense-account override. The overrides
//! are separate functions on purpose; reordering them changes which side
//! expense and revenue lines land on.

use bigdecimal::BigDecimal;

use crate::types::{EntryType, GlAccount};

/// Transaction types whose positive amounts represent revenue owed rather
/// than cash received
const REVENUE_TYPES: [&str; 4] = ["successful charge", "chargeback", "order", "refund"];

/// Pass 1, default polarity: non-negative amounts debit, negative amounts
/// credit, always as absolute values.
pub fn default_polarity(amount: &BigDecimal) -> (EntryType, BigDecimal) {
    if *amount >= BigDecimal::from(0) {
        (EntryType::Debit, amount.clone())
    } else {
        (EntryType::Credit, -amount)
    }
}

/// Pass 2, revenue-type override: positive amounts on revenue-shaped
/// transaction types swap sides.
pub fn revenue_override_applies(transaction_type: &str, amount: &BigDecimal) -> bool {
    *amount > BigDecimal::from(0)
        && REVENUE_TYPES
            .iter()
            .any(|t| transaction_type.trim().eq_ignore_ascii_case(t))
}

/// Pass 3, expense-account override: lines routed to an expense account
/// swap sides regardless of sign, so expenses post as credits that net
/// against Clearing.
pub fn expense_override_applies(account: GlAccount) -> bool {
    account.is_expense()
}

pub fn flip(side: EntryType) -> EntryType {
    match side {
        EntryType::Debit => EntryType::Credit,
        EntryType::Credit => EntryType::Debit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn default_polarity_splits_on_sign() {
        assert_eq!(
            default_polarity(&dec("29.99")),
            (EntryType::Debit, dec("29.99"))
        );
        assert_eq!(
            default_polarity(&dec("-5.00")),
            (EntryType::Credit, dec("5.00"))
        );
        assert_eq!(default_polarity(&dec("0")), (EntryType::Debit, dec("0")));
    }

    #[test]
    fn revenue_override_needs_a_positive_amount() {
        assert!(revenue_override_applies("Order", &dec("10")));
        assert!(revenue_override_applies("Refund", &dec("10")));
        assert!(revenue_override_applies("Successful charge", &dec("10")));
        assert!(revenue_override_applies("Chargeback", &dec("10")));
        assert!(!revenue_override_applies("Order", &dec("-10")));
        assert!(!revenue_override_applies("Order", &dec("0")));
        assert!(!revenue_override_applies("ServiceFee", &dec("10")));
    }

    #[test]
    fn expense_override_follows_the_account() {
        assert!(expense_override_applies(GlAccount::AdvertisingExpense));
        assert!(expense_override_applies(GlAccount::FbaFulfillmentFees));
        assert!(!expense_override_applies(GlAccount::Clearing));
        assert!(!expense_override_applies(GlAccount::Revenue));
        assert!(!expense_override_applies(GlAccount::CombinedTaxCharged));
    }

    #[test]
    fn flip_is_an_involution() {
        assert_eq!(flip(flip(EntryType::Debit)), EntryType::Debit);
        assert_eq!(flip(flip(EntryType::Credit)), EntryType::Credit);
    }
}
