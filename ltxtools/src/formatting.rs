use std::fmt::Write;

use anyhow::Result;
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};
use ticket_invoice_engine::{
    db_types::{Invoice, InvoiceBody, InvoiceReceipt, Payment, TransactionRecord},
    preview::InvoicePreview,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

pub fn format_payments(payments: &[Payment]) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "{} payments", payments.len())?;
    let mut table = Table::new();
    markdown_style(&mut table);
    table.set_titles(row!["ID", "Provider", "Amount", "Created", "Customer", "Invoice", "Declined"]);
    for p in payments {
        let created = p.created_at.format("%Y-%m-%d %H:%M").to_string();
        let customer = p.customer_email.as_deref().unwrap_or("");
        let invoice = p.invoice_number.as_deref().unwrap_or("-");
        let declined = if p.declined { "yes" } else { "" };
        table.add_row(row![p.id, p.provider, p.amount, created, customer, invoice, declined]);
    }
    writeln!(f, "{table}")?;
    Ok(f)
}

fn format_invoice_body(f: &mut String, body: &InvoiceBody) -> Result<()> {
    let mut table = Table::new();
    markdown_style(&mut table);
    table.set_titles(row!["Description", "Qty", "Unit price", "Amount"]);
    for line in &body.lines {
        table.add_row(row![line.description, line.quantity, line.unit_price, line.amount]);
    }
    writeln!(f, "{table}")?;
    writeln!(f, "Subtotal: {}", body.subtotal)?;
    writeln!(f, "Includes tax: {}", body.tax)?;
    writeln!(f, "Total: {}", body.total)?;
    Ok(())
}

pub fn format_preview(preview: &InvoicePreview) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Draft invoice for payment {}", preview.payment.id)?;
    writeln!(
        f,
        "Matched registration {} ({}) via {} with confidence {}",
        preview.registration.id, preview.registration.event_name, preview.match_method, preview.match_confidence
    )?;
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Customer invoice:")?;
    format_invoice_body(&mut f, &preview.customer_invoice)?;
    writeln!(f)?;
    writeln!(f, "Supplier invoice ({} fee estimate: {}):", preview.fee_basis, preview.processing_fee)?;
    format_invoice_body(&mut f, &preview.supplier_invoice)?;
    Ok(f)
}

pub fn format_receipt(receipt: &InvoiceReceipt) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "Invoice number: {}", receipt.invoice_number)?;
    writeln!(f, "Supplier number: {}", receipt.supplier_number)?;
    writeln!(f, "Invoice id: {}", receipt.invoice_id)?;
    writeln!(f, "Transaction rows: {}", receipt.transaction_ids.len())?;
    Ok(f)
}

pub fn format_invoice(invoice: &Invoice) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Invoice {} / {}", invoice.invoice_number, invoice.supplier_number)?;
    writeln!(f, "Issued: {}", invoice.created_at.format("%Y-%m-%d %H:%M"))?;
    writeln!(f, "Payment: {}", invoice.payment_id)?;
    if let Some(registration_id) = &invoice.registration_id {
        writeln!(f, "Registration: {registration_id}")?;
    }
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Customer invoice:")?;
    format_invoice_body(&mut f, &invoice.customer_invoice.0)?;
    writeln!(f)?;
    writeln!(f, "Supplier invoice:")?;
    format_invoice_body(&mut f, &invoice.supplier_invoice.0)?;
    Ok(f)
}

pub fn format_transactions(rows: &[TransactionRecord]) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "{} transaction rows", rows.len())?;
    let mut table = Table::new();
    markdown_style(&mut table);
    table.set_titles(row!["ID", "Invoice", "Side", "Description", "Amount", "Payment"]);
    for r in rows {
        table.add_row(row![r.id, r.invoice_number, r.side, r.description, r.amount, r.payment_id]);
    }
    writeln!(f, "{table}")?;
    Ok(f)
}
