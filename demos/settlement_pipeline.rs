//! End-to-end settlement pipeline example

use settlement_core::{
    GlAccount, LedgerAccountMap, RawRecord, SettlementBatch, SettlementEngine,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("🧾 Settlement Core - Pipeline Example\n");

    // 1. A small settlement as the file reader would hand it over: a deposit
    //    header row, two sales, an advertising fee, and a tax row
    let settlement_id = "23874396421";
    let base = RawRecord {
        settlement_id: Some(settlement_id.to_string()),
        currency: Some("CAD".to_string()),
        ..Default::default()
    };

    let records = vec![
        RawRecord {
            total_amount: Some("45.63".to_string()),
            deposit_date: Some("2025-03-14".to_string()),
            ..base.clone()
        },
        RawRecord {
            order_id: Some("701-1234567-0001234".to_string()),
            sku: Some("SKU1".to_string()),
            transaction_type: Some("Order".to_string()),
            price_type: Some("Principal".to_string()),
            price_amount: Some("29.99".to_string()),
            quantity_purchased: Some("1".to_string()),
            posted_date: Some("2025-03-01 09:30:00".to_string()),
            ..base.clone()
        },
        RawRecord {
            order_id: Some("702-7654321-0009999".to_string()),
            sku: Some("SKU2".to_string()),
            transaction_type: Some("Order".to_string()),
            price_type: Some("Principal".to_string()),
            price_amount: Some("19.99".to_string()),
            quantity_purchased: Some("1".to_string()),
            posted_date: Some("2025-03-03 16:45:00".to_string()),
            ..base.clone()
        },
        RawRecord {
            transaction_type: Some("ServiceFee".to_string()),
            item_related_fee_type: Some("Cost of Advertising".to_string()),
            item_related_fee_amount: Some("-5.00".to_string()),
            posted_date: Some("2025-03-05 08:00:00".to_string()),
            ..base.clone()
        },
        RawRecord {
            order_id: Some("701-1234567-0001234".to_string()),
            transaction_type: Some("Order".to_string()),
            other_fee_reason_description: Some("TaxAmount".to_string()),
            other_fee_amount: Some("0.65".to_string()),
            posted_date: Some("2025-03-01 09:30:00".to_string()),
            ..base.clone()
        },
    ];

    // 2. Ingest and process
    let batch = SettlementBatch::ingest(records);
    println!(
        "📥 Ingested {} rows across {} settlement(s)\n",
        batch.len(),
        batch.settlement_ids().len()
    );

    let account_map: LedgerAccountMap = GlAccount::ALL
        .iter()
        .enumerate()
        .map(|(idx, account)| (account.name().to_string(), format!("{}", 2000000 + idx)))
        .collect();
    let engine = SettlementEngine::new(account_map);
    let output = engine.process(&batch);

    // 3. Journal
    println!("📒 Journal ({} lines):", output.journal.len());
    for line in &output.journal {
        println!(
            "  {:<32} DR {:>10}  CR {:>10}  {}",
            line.gl_account.name(),
            line.debit.with_scale(2),
            line.credit.with_scale(2),
            line.description
        );
    }
    println!();

    // 4. Invoices and payments
    println!("🧾 Invoices ({} lines):", output.invoices.len());
    for line in &output.invoices {
        println!(
            "  {}  {} x{} @ {} = {}",
            line.invoice_number,
            line.sku,
            line.quantity,
            line.item_price.with_scale(2),
            line.line_amount.with_scale(2)
        );
    }
    println!();

    println!("💰 Payments ({}):", output.payments.len());
    for payment in &output.payments {
        println!(
            "  {}  {} via {} on {}",
            payment.invoice_number,
            payment.amount.with_scale(2),
            payment.mode,
            payment.date
        );
    }
    println!();

    // 5. Reconciliation
    let recon = output.reconciliation.get(settlement_id).expect("settlement reconciled");
    println!("✅ Reconciliation for {settlement_id}:");
    println!("  total records      {}", recon.total_records);
    println!("  journal lines      {}", recon.journal_line_count);
    println!("  invoice lines      {}", recon.invoice_line_count);
    println!("  linecount check    {}", recon.linecount_check);
    println!(
        "  balance            DR {} / CR {} ({})",
        recon.total_debits.with_scale(2),
        recon.total_credits.with_scale(2),
        if recon.is_balanced() { "BALANCED" } else { "UNBALANCED" }
    );
    println!(
        "  clearing vs inv.   {} ({})",
        recon.clearing_difference.with_scale(2),
        if recon.clearing_matches() { "BALANCED" } else { "REVIEW" }
    );
    if !recon.unresolved_row_ids.is_empty() {
        println!("  unresolved rows    {:?}", recon.unresolved_row_ids);
    }
}
