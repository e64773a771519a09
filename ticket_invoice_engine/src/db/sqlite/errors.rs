use thiserror::Error;

use crate::{
    db::common::DatabaseError,
    db_types::{PaymentId, RegistrationId},
};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),
    #[error("Registration not found: {0}")]
    RegistrationNotFound(RegistrationId),
    #[error("Sequence has not been initialized: {0}")]
    CounterNotFound(String),
    #[error("Payment {0} already has an invoice")]
    PaymentAlreadyInvoiced(PaymentId),
    #[error("Registration {0} is already attached to another invoice")]
    RegistrationConflict(RegistrationId),
    #[error("Invoice transaction aborted (safe to retry): {0}")]
    TransactionAborted(String),
}

impl DatabaseError for SqliteDatabaseError {
    fn is_retriable(&self) -> bool {
        matches!(self, SqliteDatabaseError::TransactionAborted(_))
    }

    fn is_already_invoiced(&self) -> bool {
        matches!(self, SqliteDatabaseError::PaymentAlreadyInvoiced(_))
    }
}
