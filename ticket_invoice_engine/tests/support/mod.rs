//! Shared fixtures for the integration tests: seed records shaped like the legacy documents the engine ingests.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use ltx_common::Money;
use serde_json::json;
use ticket_invoice_engine::db_types::{NewPayment, NewRegistration, PaymentId, Provider};

pub fn ts(s: &str) -> DateTime<Utc> {
    s.parse().expect("invalid test timestamp")
}

/// A Stripe payment whose provider-native key sits under the modern `paymentId` field.
pub fn stripe_payment(id: &str, key: &str, cents: i64) -> NewPayment {
    NewPayment::new(
        PaymentId(id.to_string()),
        Provider::Stripe,
        Money::from_cents(cents),
        json!({ "paymentId": key, "originalData": { "PaymentIntent ID": key } }),
    )
    .with_created_at(ts("2025-06-10T09:00:00Z"))
    .with_customer(Some("Dana Scully".to_string()), Some("dana@example.com".to_string()))
}

pub fn square_payment(id: &str, key: &str, cents: i64) -> NewPayment {
    NewPayment::new(
        PaymentId(id.to_string()),
        Provider::Square,
        Money::from_cents(cents),
        json!({ "paymentId": key }),
    )
    .with_created_at(ts("2025-06-10T09:00:00Z"))
}

/// A registration referencing a Stripe payment intent, with structured ticket selections.
pub fn registration_with_tickets(id: &str, event: &str, key: &str) -> NewRegistration {
    NewRegistration::new(
        id.parse().expect("infallible"),
        event,
        json!({
            "stripePaymentIntentId": key,
            "tickets": [
                { "description": "General admission", "quantity": 2, "unit_price": 4500 },
                { "description": "Program booklet", "quantity": 1, "unit_price": 1000 },
            ],
        }),
    )
    .with_created_at(ts("2025-06-10T08:55:00Z"))
}

/// A pre-rework registration with no ticket data, referencing a Square payment.
pub fn bare_registration(id: &str, event: &str, key: &str) -> NewRegistration {
    NewRegistration::new(
        id.parse().expect("infallible"),
        event,
        json!({ "squarePaymentId": key }),
    )
    .with_created_at(ts("2025-06-10T08:55:00Z"))
}
