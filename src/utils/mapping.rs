//! External ledger account mapping
//!
//! The engine routes to named accounts; the accounting backend wants its
//! own opaque account ids. The mapping is injected read-only, and a missing
//! entry is a named error the caller must handle before posting; it never
//! stops journal computation.

use std::collections::HashMap;

use crate::types::{EngineError, EngineResult, GlAccount, JournalLine};

/// Read-only mapping from GL account display names to external ledger ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerAccountMap {
    accounts: HashMap<String, String>,
}

impl LedgerAccountMap {
    pub fn new(accounts: HashMap<String, String>) -> Self {
        Self { accounts }
    }

    /// Resolve an account to its external ledger id
    pub fn resolve(&self, account: GlAccount) -> EngineResult<&str> {
        self.accounts
            .get(account.name())
            .map(String::as_str)
            .ok_or_else(|| EngineError::UnmappedGlAccount(account.name().to_string()))
    }

    /// Distinct account names used by the journal that have no mapping.
    /// A non-empty result must block posting.
    pub fn missing_accounts(&self, lines: &[JournalLine]) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for line in lines {
            let name = line.gl_account.name();
            if !self.accounts.contains_key(name) && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
        missing
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl FromIterator<(String, String)> for LedgerAccountMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            accounts: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn map() -> LedgerAccountMap {
        [
            ("Amazon.ca Clearing".to_string(), "2000001".to_string()),
            ("Amazon.ca Revenue".to_string(), "2000002".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn line(account: GlAccount) -> JournalLine {
        JournalLine {
            settlement_id: "S1".to_string(),
            date: None,
            gl_account: account,
            debit: BigDecimal::from(1),
            credit: BigDecimal::from(0),
            description: String::new(),
            notes: String::new(),
            source_row_id: 1,
        }
    }

    #[test]
    fn mapped_accounts_resolve() {
        assert_eq!(map().resolve(GlAccount::Clearing).unwrap(), "2000001");
    }

    #[test]
    fn unmapped_accounts_are_a_named_error() {
        let err = map().resolve(GlAccount::StorageExpense).unwrap_err();
        match err {
            EngineError::UnmappedGlAccount(name) => {
                assert_eq!(name, "Amazon Storage Expense");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_accounts_lists_each_name_once() {
        let lines = vec![
            line(GlAccount::Clearing),
            line(GlAccount::StorageExpense),
            line(GlAccount::StorageExpense),
            line(GlAccount::AdvertisingExpense),
        ];
        assert_eq!(
            map().missing_accounts(&lines),
            vec![
                "Amazon Storage Expense".to_string(),
                "Amazon Advertising Expense".to_string()
            ]
        );
    }
}
