//! LiveTix Invoicing Engine
//!
//! The invoicing engine is the core of the LiveTix ticketing migration toolkit. It reconciles payment records
//! imported from the payment gateways (Square, Stripe, plus manually captured payments) against event registrations,
//! and issues invoices with gapless, monotonically increasing invoice numbers.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@db`]). Sqlite is the supported backend. You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types used
//!    in the database. These are defined in the `db_types` module and are public.
//! 2. The invoice flow API ([`InvoiceFlowApi`]). This provides the public-facing functionality of the engine:
//!    previewing, finalizing and declining invoices for imported payments. Backends need to implement the traits in
//!    [`mod@db`] in order to drive the flow.
//! 3. The gateway import reconciler ([`mod@reconciler`]). This pages through a payment gateway's payment list and
//!    upserts records that have not been imported yet, so that repeated imports over overlapping date ranges are safe.
//!
//! Matching and preview building are pure functions over in-memory records ([`mod@matcher`], [`mod@preview`]), so the
//! interesting reconciliation logic is unit-testable without a live database.
mod db;

pub mod db_types;
pub mod helpers;
mod invoice_flow;
pub mod matcher;
pub mod preview;
pub mod reconciler;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{db_url, PaymentQueryFilter, SqliteDatabase, SqliteDatabaseError};
pub use db::common::{DatabaseError, InsertPaymentResult, InsertRegistrationResult, InvoicingDatabase, RecordLookup};
pub use invoice_flow::{InvoiceFlowApi, InvoiceFlowError, PreviewResult};
pub use reconciler::{import_new_payments, GatewayError, ImportError, ImportSummary, PaymentGateway, PaymentPage};
