use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use ltx_common::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

//--------------------------------------      PaymentId      ---------------------------------------------------------
/// The internal id of a payment record. Distinct from the provider-native payment key, which may live under any of
/// several legacy field names inside the record (see [`crate::helpers::extract_payment_key`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct PaymentId(pub String);

impl FromStr for PaymentId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for PaymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PaymentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    RegistrationId   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct RegistrationId(pub String);

impl FromStr for RegistrationId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for RegistrationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RegistrationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      Provider       ---------------------------------------------------------
/// The payment gateway a payment record originated from. Manually captured payments (cash, EFT, comps) carry the
/// `Manual` provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Square,
    Stripe,
    Manual,
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Square => write!(f, "square"),
            Provider::Stripe => write!(f, "stripe"),
            Provider::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid provider: {0}")]
pub struct ConversionError(String);

impl FromStr for Provider {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "square" => Ok(Self::Square),
            "stripe" => Ok(Self::Stripe),
            "manual" => Ok(Self::Manual),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
/// A gateway charge record, imported by the reconciler or one of the legacy importers. The financial fields are
/// immutable facts; the invoicing-state fields (`invoice_created`, `invoice_number`, `invoice_id`, `declined`) are
/// the only fields ever mutated after insert, and only by the invoice flow.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub provider: Provider,
    /// The normalized payment key, extracted at import time. Kept as a column so that import dedup can be done in
    /// SQL. In-memory matching still probes `original_data` so that legacy rows behave identically.
    pub payment_key: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    /// The loose legacy document as imported. Provider-native identifiers may hide anywhere in here.
    pub original_data: Json<Value>,
    pub invoice_created: bool,
    pub invoice_number: Option<String>,
    pub invoice_id: Option<i64>,
    pub declined: bool,
}

//--------------------------------------      NewPayment     ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: PaymentId,
    pub provider: Provider,
    pub amount: Money,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub original_data: Value,
}

impl NewPayment {
    pub fn new(id: PaymentId, provider: Provider, amount: Money, original_data: Value) -> Self {
        Self {
            id,
            provider,
            amount,
            currency: ltx_common::DEFAULT_CURRENCY_CODE.to_string(),
            created_at: Utc::now(),
            customer_name: None,
            customer_email: None,
            original_data,
        }
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_customer(mut self, name: Option<String>, email: Option<String>) -> Self {
        self.customer_name = name;
        self.customer_email = email;
        self
    }
}

//--------------------------------------    Registration     ---------------------------------------------------------
/// An event-registration record. Created by the upstream registration import; the engine only ever stamps the
/// invoicing-state fields, mirroring [`Payment`].
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub event_name: String,
    pub created_at: DateTime<Utc>,
    /// Loose registration document: attendee details, ticket selections, and possibly a payment-provider identifier
    /// under one of several historical field names.
    pub registration_data: Json<Value>,
    pub invoice_created: bool,
    pub invoice_number: Option<String>,
    pub invoice_id: Option<i64>,
}

/// A single ticket selection parsed out of a registration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSelection {
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    pub unit_price: Money,
}

fn default_quantity() -> i64 {
    1
}

impl Registration {
    /// Parses the ticket selections out of the registration document. Registrations that predate the ticketing
    /// rework store their selections under `tickets`; anything unparseable is skipped rather than failing the whole
    /// registration, since the preview builder falls back to a single line for the payment amount.
    pub fn ticket_selections(&self) -> Vec<TicketSelection> {
        self.registration_data
            .0
            .get("tickets")
            .and_then(Value::as_array)
            .map(|items| {
                items.iter().filter_map(|t| serde_json::from_value::<TicketSelection>(t.clone()).ok()).collect()
            })
            .unwrap_or_default()
    }
}

//--------------------------------------   NewRegistration   ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub id: RegistrationId,
    pub event_name: String,
    pub created_at: DateTime<Utc>,
    pub registration_data: Value,
}

impl NewRegistration {
    pub fn new(id: RegistrationId, event_name: &str, registration_data: Value) -> Self {
        Self { id, event_name: event_name.to_string(), created_at: Utc::now(), registration_data }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

//--------------------------------------      LineItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub amount: Money,
}

impl LineItem {
    pub fn new(description: &str, quantity: i64, unit_price: Money) -> Self {
        Self { description: description.to_string(), quantity, unit_price, amount: unit_price * quantity }
    }
}

//--------------------------------------    InvoiceBody      ---------------------------------------------------------
/// One side of an invoice (customer copy or supplier copy): line items plus derived totals. Totals are
/// tax-inclusive; `tax` reports the inclusive tax portion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceBody {
    pub lines: Vec<LineItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

//--------------------------------------       Invoice       ---------------------------------------------------------
/// An issued invoice document. Immutable once `finalized` is true; created exactly once per payment.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub supplier_number: String,
    pub payment_id: PaymentId,
    pub registration_id: Option<RegistrationId>,
    pub customer_invoice: Json<InvoiceBody>,
    pub supplier_invoice: Json<InvoiceBody>,
    pub finalized: bool,
    pub transaction_ids: Json<Vec<i64>>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   TransactionSide   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionSide {
    Customer,
    Supplier,
}

impl Display for TransactionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionSide::Customer => write!(f, "customer"),
            TransactionSide::Supplier => write!(f, "supplier"),
        }
    }
}

//-------------------------------------- TransactionRecord   ---------------------------------------------------------
/// One accounting row per invoice line item, denormalized with payment/customer fields for reporting.
/// Keyed by a dense integer id from the `transaction_sequence` counter. Insert-only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub invoice_number: String,
    pub side: TransactionSide,
    pub description: String,
    pub amount: Money,
    pub payment_id: PaymentId,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   InvoiceReceipt    ---------------------------------------------------------
/// The result of finalizing an invoice. Returned unchanged on repeat calls for an already-invoiced payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceReceipt {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub supplier_number: String,
    pub transaction_ids: Vec<i64>,
}
