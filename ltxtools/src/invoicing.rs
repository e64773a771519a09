use anyhow::{anyhow, Result};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use ticket_invoice_engine::{
    db_types::PaymentId,
    db_url,
    helpers::{InvoicePeriod, SEQUENCE_BASE},
    matcher,
    InvoiceFlowApi,
    InvoicingDatabase,
    PaymentQueryFilter,
    PreviewResult,
    RecordLookup,
    SqliteDatabase,
};

use crate::{formatting, InvoicesCommand, PaymentsCommand};

async fn new_api() -> Result<InvoiceFlowApi<SqliteDatabase>> {
    let db = SqliteDatabase::new(5).await?;
    Ok(InvoiceFlowApi::new(db))
}

pub async fn run_migrations() -> Result<()> {
    let url = db_url();
    if !Sqlite::database_exists(&url).await.unwrap_or(false) {
        Sqlite::create_database(&url).await?;
        println!("Created database {url}");
    }
    let db = SqliteDatabase::new_with_url(&url, 1).await?;
    sqlx::migrate!("../ticket_invoice_engine/src/db/sqlite/migrations").run(db.pool()).await?;
    println!("Migrations complete");
    Ok(())
}

pub async fn handle_payments_command(cmd: PaymentsCommand) -> Result<()> {
    let api = new_api().await?;
    match cmd {
        PaymentsCommand::List { provider, invoiced, declined, json } => {
            let mut filter = PaymentQueryFilter::default();
            if let Some(provider) = provider {
                filter = filter.with_provider(provider);
            }
            if let Some(invoiced) = invoiced {
                filter = filter.with_invoiced(invoiced);
            }
            if let Some(declined) = declined {
                filter = filter.with_declined(declined);
            }
            let payments = api.db().fetch_payments(filter).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&payments)?);
            } else {
                println!("{}", formatting::format_payments(&payments)?);
            }
        },
        PaymentsCommand::Queue => {
            let payments = api.db().fetch_uninvoiced_payments().await?;
            println!("{}", formatting::format_payments(&payments)?);
        },
    }
    Ok(())
}

pub async fn match_payment(payment_id: String) -> Result<()> {
    let api = new_api().await?;
    let id = PaymentId(payment_id);
    let payment = api.db().fetch_payment(&id).await?.ok_or_else(|| anyhow!("Payment {id} not found"))?;
    let candidates = api.db().fetch_candidate_registrations().await?;
    let m = matcher::match_payment(&payment, &candidates);
    match &m.registration {
        Some(registration) => {
            println!("Payment {} matches registration {} ({})", m.payment.id, registration.id, registration.event_name);
            println!("Method: {}, confidence: {}", m.method, m.confidence);
            println!("Auto-approvable: {}", if m.auto_approvable() { "yes" } else { "no" });
        },
        None => println!("No registration matches payment {}.", m.payment.id),
    }
    Ok(())
}

pub async fn init_counter(name: Option<String>, start: Option<i64>) -> Result<()> {
    let api = new_api().await?;
    let name = name.unwrap_or_else(|| InvoicePeriod::current().sequence_name());
    let start = start.unwrap_or(SEQUENCE_BASE);
    api.db().initialize_sequence(&name, start).await?;
    let current = api.db().current_in_sequence(&name).await?;
    println!("Sequence {name} is at {current}");
    Ok(())
}

pub async fn preview_payment(payment_id: String) -> Result<()> {
    let api = new_api().await?;
    let id = PaymentId(payment_id);
    match api.preview(&id).await? {
        PreviewResult::Ready(preview) => println!("{}", formatting::format_preview(&preview)?),
        PreviewResult::NoMatch(m) => {
            println!("No registration matched payment {} (method: {}, confidence: {}).", m.payment.id, m.method, m.confidence);
            println!("Review the registration data, or decline the payment.");
        },
        PreviewResult::AlreadyFinalized(receipt) => {
            println!("Payment {id} is already invoiced.");
            println!("{}", formatting::format_receipt(&receipt)?);
        },
    }
    Ok(())
}

pub async fn finalize_payment(payment_id: String) -> Result<()> {
    let api = new_api().await?;
    let id = PaymentId(payment_id);
    let receipt = api.finalize_payment(&id).await?;
    println!("{}", formatting::format_receipt(&receipt)?);
    let rows = api.db().fetch_transactions_for_invoice(&receipt.invoice_number).await?;
    println!("{}", formatting::format_transactions(&rows)?);
    Ok(())
}

pub async fn decline_payment(payment_id: String, reason: String) -> Result<()> {
    let api = new_api().await?;
    let id = PaymentId(payment_id);
    let payment = api.decline(&id, &reason).await?;
    println!("Payment {} declined: {reason}", payment.id);
    Ok(())
}

pub async fn handle_invoices_command(cmd: InvoicesCommand) -> Result<()> {
    let api = new_api().await?;
    match cmd {
        InvoicesCommand::Get { number } => {
            let invoice = api
                .db()
                .fetch_invoice_by_number(&number)
                .await?
                .ok_or_else(|| anyhow!("No invoice with number {number}"))?;
            println!("{}", formatting::format_invoice(&invoice)?);
            let rows = api.db().fetch_transactions_for_invoice(&invoice.invoice_number).await?;
            println!("{}", formatting::format_transactions(&rows)?);
        },
    }
    Ok(())
}
