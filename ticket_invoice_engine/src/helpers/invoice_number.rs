use std::fmt::Display;

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix for the customer copy of an invoice.
pub const CUSTOMER_PREFIX: &str = "LTIV";
/// Prefix for the supplier copy. Always issued together with the customer copy from a single sequence value.
pub const SUPPLIER_PREFIX: &str = "LTSP";
/// Monthly invoice sequences are initialized at this value, so the running count within the month is
/// `sequence value - SEQUENCE_BASE`. The first invoice of a month is number 001.
pub const SEQUENCE_BASE: i64 = 1000;
/// Name of the counter that assigns dense transaction row ids.
pub const TRANSACTION_SEQUENCE: &str = "transaction_sequence";

const NUMBER_PATTERN: &str = r"^(LTIV|LTSP)-\d{2}\d{2}\d{3,}$";

/// The calendar month an invoice number is scoped to. Each period has its own counter, so numbering restarts at 001
/// every month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePeriod {
    year: i32,
    month: u32,
}

impl InvoicePeriod {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn current() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self { year: dt.year(), month: dt.month() }
    }

    /// Two-digit year, two-digit month, e.g. `2506` for June 2025.
    pub fn yymm(&self) -> String {
        format!("{:02}{:02}", self.year % 100, self.month)
    }

    /// The counter name backing this period's invoice numbers, e.g. `invoice_number:2506`.
    pub fn sequence_name(&self) -> String {
        format!("invoice_number:{}", self.yymm())
    }
}

impl Display for InvoicePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A customer/supplier invoice number pair. The two numbers share the numeric suffix because they are derived from
/// one sequence value; they are never issued separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceNumberPair {
    pub customer: String,
    pub supplier: String,
}

impl InvoiceNumberPair {
    /// Formats the pair for a sequence value issued within the given period. The running count is zero-padded to at
    /// least three digits and simply grows wider in a month with more than 999 invoices.
    pub fn from_sequence_value(period: InvoicePeriod, value: i64) -> Self {
        let count = value - SEQUENCE_BASE;
        let yymm = period.yymm();
        Self {
            customer: format!("{CUSTOMER_PREFIX}-{yymm}{count:03}"),
            supplier: format!("{SUPPLIER_PREFIX}-{yymm}{count:03}"),
        }
    }
}

/// Validates an externally-visible invoice number against the published format contract.
pub fn is_valid_invoice_number(number: &str) -> bool {
    // The pattern is a compile-time constant, so the parse cannot fail.
    Regex::new(NUMBER_PATTERN).map(|re| re.is_match(number)).unwrap_or(false)
}
