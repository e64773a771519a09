//! Wire formats for the gateway payment-listing endpoints, and their conversions into the engine's record shape.
//!
//! Imported records are stored as legacy-style documents: the provider-native id sits under `paymentId` and the
//! untouched wire object under `originalData`, which is where the identifier normalizer probes for it. Unknown wire
//! fields are retained so the stored document is a faithful copy of what the provider sent.

use chrono::{DateTime, Utc};
use ltx_common::Money;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use ticket_invoice_engine::db_types::{NewPayment, PaymentId, Provider};

//--------------------------------------        Square        --------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquarePaymentList {
    #[serde(default)]
    pub payments: Vec<SquarePayment>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquareMoney {
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquarePayment {
    pub id: String,
    pub amount_money: SquareMoney,
    pub created_at: DateTime<Utc>,
    pub buyer_email_address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<SquarePayment> for NewPayment {
    fn from(p: SquarePayment) -> Self {
        let amount = Money::from_cents(p.amount_money.amount);
        let currency = p.amount_money.currency.clone();
        let created_at = p.created_at;
        let email = p.buyer_email_address.clone();
        let id = PaymentId(format!("square:{}", p.id));
        let wire_id = p.id.clone();
        let wire = serde_json::to_value(&p).unwrap_or(Value::Null);
        let original_data = json!({ "paymentId": wire_id, "originalData": wire });
        NewPayment::new(id, Provider::Square, amount, original_data)
            .with_currency(&currency)
            .with_created_at(created_at)
            .with_customer(None, email)
    }
}

//--------------------------------------        Stripe        --------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePaymentIntentList {
    #[serde(default)]
    pub data: Vec<StripePaymentIntent>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    /// Unix timestamp, per the Stripe API.
    pub created: i64,
    pub receipt_email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<StripePaymentIntent> for NewPayment {
    fn from(p: StripePaymentIntent) -> Self {
        let amount = Money::from_cents(p.amount);
        let currency = p.currency.to_ascii_uppercase();
        let created_at = DateTime::from_timestamp(p.created, 0).unwrap_or_default();
        let email = p.receipt_email.clone();
        let id = PaymentId(format!("stripe:{}", p.id));
        let wire_id = p.id.clone();
        let wire = serde_json::to_value(&p).unwrap_or(Value::Null);
        let original_data = json!({ "paymentId": wire_id, "originalData": wire });
        NewPayment::new(id, Provider::Stripe, amount, original_data)
            .with_currency(&currency)
            .with_created_at(created_at)
            .with_customer(None, email)
    }
}

#[cfg(test)]
mod test {
    use ticket_invoice_engine::helpers::{extract_payment_key, provider_hint, KeyRole};

    use super::*;

    #[test]
    fn square_wire_payment_converts_to_record() {
        let wire = r#"{
            "id": "bP9mAsEMYJ8Gk9YfI2",
            "amount_money": { "amount": 12500, "currency": "AUD" },
            "created_at": "2025-06-03T10:15:00Z",
            "buyer_email_address": "fox@example.com",
            "status": "COMPLETED",
            "location_id": "L8S9"
        }"#;
        let payment: SquarePayment = serde_json::from_str(wire).unwrap();
        let record = NewPayment::from(payment);
        assert_eq!(record.id, PaymentId("square:bP9mAsEMYJ8Gk9YfI2".to_string()));
        assert_eq!(record.amount, Money::from_cents(12_500));
        assert_eq!(record.currency, "AUD");
        assert_eq!(record.customer_email.as_deref(), Some("fox@example.com"));
        // The stored document keeps the unknown wire fields.
        assert_eq!(record.original_data["originalData"]["status"], "COMPLETED");
        // The normalizer can recover the key and recognizes it as non-Stripe.
        let key = extract_payment_key(&record.original_data, KeyRole::Payment).unwrap();
        assert_eq!(key, "bP9mAsEMYJ8Gk9YfI2");
        assert_eq!(provider_hint(&key), Provider::Square);
    }

    #[test]
    fn stripe_wire_intent_converts_to_record() {
        let wire = r#"{
            "id": "pi_3PQx9z",
            "amount": 9900,
            "currency": "aud",
            "created": 1717409700,
            "receipt_email": null,
            "status": "succeeded"
        }"#;
        let intent: StripePaymentIntent = serde_json::from_str(wire).unwrap();
        let record = NewPayment::from(intent);
        assert_eq!(record.id, PaymentId("stripe:pi_3PQx9z".to_string()));
        assert_eq!(record.currency, "AUD");
        assert_eq!(record.created_at, "2024-06-03T10:15:00Z".parse::<DateTime<Utc>>().unwrap());
        let key = extract_payment_key(&record.original_data, KeyRole::Payment).unwrap();
        assert_eq!(key, "pi_3PQx9z");
        assert_eq!(provider_hint(&key), Provider::Stripe);
    }
}
