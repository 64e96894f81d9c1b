//! Strategy seams for the settlement engine

use bigdecimal::BigDecimal;

use crate::types::*;

/// Strategy deciding how a settlement's journal is forced to balance.
///
/// The balancing adjustment is deliberately isolated behind this trait: the
/// default behavior patches the bank deposit line, but callers that would
/// rather reject an unbalanced settlement outright can swap in
/// [`StrictBalancing`] without touching the journal builder.
pub trait BalancingStrategy: Send + Sync {
    /// Bring one settlement's lines into balance, or return a
    /// [`EngineError::JournalImbalance`] describing why that was impossible.
    fn balance(&self, settlement_id: &str, lines: &mut [JournalLine]) -> EngineResult<()>;
}

fn totals(lines: &[JournalLine]) -> (BigDecimal, BigDecimal) {
    let debits: BigDecimal = lines.iter().map(|l| &l.debit).sum();
    let credits: BigDecimal = lines.iter().map(|l| &l.credit).sum();
    (debits, credits)
}

/// Default balancing strategy: add the signed difference to the bank
/// deposit line's debit so the settlement balances to the cent.
pub struct DepositPlugStrategy {
    tolerance: BigDecimal,
}

impl DepositPlugStrategy {
    /// Create a plug strategy with the standard one-cent tolerance
    pub fn new() -> Self {
        Self { tolerance: cent() }
    }

    /// Create a plug strategy with a custom tolerance
    pub fn with_tolerance(tolerance: BigDecimal) -> Self {
        Self { tolerance }
    }
}

impl Default for DepositPlugStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl BalancingStrategy for DepositPlugStrategy {
    fn balance(&self, settlement_id: &str, lines: &mut [JournalLine]) -> EngineResult<()> {
        let (debits, credits) = totals(lines);
        let difference = &credits - &debits;
        if difference.abs() <= self.tolerance {
            return Ok(());
        }

        let deposit = lines
            .iter_mut()
            .find(|l| l.description.contains("Bank Deposit"));
        match deposit {
            Some(line) => {
                tracing::info!(
                    settlement_id,
                    %difference,
                    "adjusting bank deposit line to balance settlement"
                );
                // Fold the adjustment into the line's net amount so exactly
                // one side stays non-zero.
                let net = &line.debit + &difference - &line.credit;
                if net >= BigDecimal::from(0) {
                    line.debit = net;
                    line.credit = BigDecimal::from(0);
                } else {
                    line.debit = BigDecimal::from(0);
                    line.credit = -net;
                }
                Ok(())
            }
            None => Err(EngineError::JournalImbalance {
                settlement_id: settlement_id.to_string(),
                difference,
            }),
        }
    }
}

/// Balancing strategy that never plugs: any imbalance beyond the tolerance
/// is an error, even when a deposit line exists.
pub struct StrictBalancing {
    tolerance: BigDecimal,
}

impl StrictBalancing {
    pub fn new() -> Self {
        Self { tolerance: cent() }
    }
}

impl Default for StrictBalancing {
    fn default() -> Self {
        Self::new()
    }
}

impl BalancingStrategy for StrictBalancing {
    fn balance(&self, settlement_id: &str, lines: &mut [JournalLine]) -> EngineResult<()> {
        let (debits, credits) = totals(lines);
        let difference = &credits - &debits;
        if difference.abs() <= self.tolerance {
            Ok(())
        } else {
            Err(EngineError::JournalImbalance {
                settlement_id: settlement_id.to_string(),
                difference,
            })
        }
    }
}
