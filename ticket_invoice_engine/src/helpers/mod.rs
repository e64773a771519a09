mod invoice_number;
mod payment_key;

pub use invoice_number::{
    is_valid_invoice_number,
    InvoiceNumberPair,
    InvoicePeriod,
    CUSTOMER_PREFIX,
    SEQUENCE_BASE,
    SUPPLIER_PREFIX,
    TRANSACTION_SEQUENCE,
};
pub use payment_key::{extract_manual_marker, extract_payment_key, provider_hint, KeyRole};
