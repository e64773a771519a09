//! Invoice preview assembly.
//!
//! A preview is a draft invoice built from a matched payment/registration pair. Nothing is persisted and neither
//! source record is mutated; the preview is handed to an operator for review, or finalized directly when the match
//! confidence allows auto-approval.

use ltx_common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{InvoiceBody, LineItem, Payment, Provider, Registration},
    helpers::{extract_payment_key, provider_hint, KeyRole},
    matcher::{Match, MatchMethod},
};

/// Inclusive tax is reported at this rate (GST). Totals already contain it; the invoice merely breaks it out.
pub const INCLUSIVE_TAX_RATE_PERCENT: i64 = 10;

/// Gateway fee schedules, used for the supplier-side processing fee estimate.
pub const STRIPE_FEE_BASIS_POINTS: i64 = 290;
pub const STRIPE_FEE_FIXED_CENTS: i64 = 30;
pub const SQUARE_FEE_BASIS_POINTS: i64 = 260;
pub const SQUARE_FEE_FIXED_CENTS: i64 = 10;

#[derive(Debug, Clone, Error)]
pub enum PreviewError {
    #[error("Cannot build an invoice preview: payment {0} has no matched registration")]
    NoMatchedRegistration(String),
}

/// A draft invoice: customer copy plus supplier copy, with the fee estimate that separates the two totals.
/// No invoice number is assigned yet; numbers are only reserved at finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePreview {
    pub payment: Payment,
    pub registration: Registration,
    pub customer_invoice: InvoiceBody,
    pub supplier_invoice: InvoiceBody,
    pub processing_fee: Money,
    pub fee_basis: Provider,
    pub match_method: MatchMethod,
    pub match_confidence: u8,
}

/// Assembles a draft invoice from a match. Pure and synchronous: the match already carries both records.
///
/// The customer copy lists the registration's ticket selections (falling back to a single line for the payment
/// amount when the registration predates structured ticket data). The supplier copy carries the same lines less a
/// processing-fee estimate, since the gateway settles net of fees. Which fee schedule applies is decided by the
/// shape of the payment key, not the stored provider field, because several legacy importers recorded the provider
/// unreliably.
pub fn build_preview(m: &Match) -> Result<InvoicePreview, PreviewError> {
    let registration = m
        .registration
        .as_ref()
        .ok_or_else(|| PreviewError::NoMatchedRegistration(m.payment.id.to_string()))?;
    let payment = &m.payment;

    let mut lines: Vec<LineItem> = registration
        .ticket_selections()
        .iter()
        .map(|t| LineItem::new(&t.description, t.quantity, t.unit_price))
        .collect();
    if lines.is_empty() {
        lines.push(LineItem::new(
            &format!("Event registration: {}", registration.event_name),
            1,
            payment.amount,
        ));
    }

    let fee_basis = processing_fee_basis(payment);
    let processing_fee = estimate_processing_fee(payment.amount, fee_basis);

    let customer_invoice = body_from_lines(lines.clone());

    let mut supplier_lines = lines;
    if !processing_fee.is_zero() {
        supplier_lines.push(LineItem::new(
            &format!("{fee_basis} processing fee (estimate)"),
            1,
            -processing_fee,
        ));
    }
    let supplier_invoice = body_from_lines(supplier_lines);

    Ok(InvoicePreview {
        payment: payment.clone(),
        registration: registration.clone(),
        customer_invoice,
        supplier_invoice,
        processing_fee,
        fee_basis,
        match_method: m.method,
        match_confidence: m.confidence,
    })
}

fn body_from_lines(lines: Vec<LineItem>) -> InvoiceBody {
    let subtotal: Money = lines.iter().map(|l| l.amount).sum();
    let total = subtotal;
    InvoiceBody { lines, subtotal, tax: inclusive_tax(total), total }
}

/// The inclusive tax portion of a tax-inclusive total: `total * r / (100 + r)`, rounded half-up.
fn inclusive_tax(total: Money) -> Money {
    let divisor = 100 / INCLUSIVE_TAX_RATE_PERCENT + 1;
    let v = total.value();
    Money::from_cents((2 * v + divisor * v.signum()) / (2 * divisor))
}

fn processing_fee_basis(payment: &Payment) -> Provider {
    match extract_payment_key(&payment.original_data.0, KeyRole::Payment) {
        Some(key) => provider_hint(&key),
        None => payment.provider,
    }
}

fn estimate_processing_fee(amount: Money, basis: Provider) -> Money {
    match basis {
        Provider::Stripe => amount.basis_points(STRIPE_FEE_BASIS_POINTS) + Money::from_cents(STRIPE_FEE_FIXED_CENTS),
        Provider::Square => amount.basis_points(SQUARE_FEE_BASIS_POINTS) + Money::from_cents(SQUARE_FEE_FIXED_CENTS),
        Provider::Manual => Money::from_cents(0),
    }
}
