//! Payment building: one payment per invoice, cleared on the deposit date

use chrono::NaiveDate;

use crate::types::*;

/// Payment mode recorded on every generated payment
const PAYMENT_MODE: &str = "Direct Deposit";

/// Group valid invoice lines into one payment per invoice.
///
/// The payment date is the settlement's single bank deposit date (every
/// invoice in a settlement is assumed to clear on that deposit) and the
/// paid-through account is always Clearing.
pub fn build_payments(lines: &[InvoiceLine], deposit_date: NaiveDate) -> Vec<PaymentRecord> {
    // group key: (invoice_number, customer, invoice_date), first-seen order
    let mut groups: Vec<(&InvoiceLine, PaymentRecord)> = Vec::new();

    for line in lines {
        if !line.validation.is_exportable() {
            continue;
        }
        let existing = groups.iter_mut().find(|(first, _)| {
            first.invoice_number == line.invoice_number
                && first.customer == line.customer
                && first.invoice_date == line.invoice_date
        });
        match existing {
            Some((_, payment)) => payment.amount = &payment.amount + &line.line_amount,
            None => groups.push((
                line,
                PaymentRecord {
                    invoice_number: line.invoice_number.clone(),
                    customer: line.customer.clone(),
                    amount: line.line_amount.clone(),
                    date: deposit_date,
                    paid_through_account: GlAccount::Clearing.name().to_string(),
                    mode: PAYMENT_MODE.to_string(),
                    reference_number: line.reference_number.clone(),
                },
            )),
        }
    }

    let payments: Vec<PaymentRecord> = groups.into_iter().map(|(_, payment)| payment).collect();
    tracing::info!(payments = payments.len(), "payments built");
    payments
}
