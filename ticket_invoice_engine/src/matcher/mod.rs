//! Payment-to-registration matching.
//!
//! Matching is a pure function over in-memory records: the caller hands over the payment and the candidate
//! registrations, and gets back zero-or-one match with a confidence score and the rule that produced it. No database
//! or network access happens here, which is what makes the reconciliation logic unit-testable.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Payment, Registration},
    helpers::{extract_manual_marker, extract_payment_key, KeyRole},
};

/// Matches at or above this confidence may be finalized without operator review. An exact key match (90) qualifies;
/// anything weaker is reported as no match and left for a human.
pub const AUTO_APPROVE_THRESHOLD: u8 = 90;

pub const CONFIDENCE_MANUAL_MARKER: u8 = 100;
pub const CONFIDENCE_EXACT_KEY: u8 = 90;

/// The rule that produced a match. Recorded for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    ManualMarker,
    ExactKey,
    None,
}

impl Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMethod::ManualMarker => write!(f, "manual-marker"),
            MatchMethod::ExactKey => write!(f, "exact-key"),
            MatchMethod::None => write!(f, "none"),
        }
    }
}

/// An ephemeral match result. Never persisted; recomputed on demand. For the same inputs the result is always
/// identical: there is no randomness and no wall-clock dependence in the rules below.
#[derive(Debug, Clone)]
pub struct Match {
    pub payment: Payment,
    pub registration: Option<Registration>,
    pub confidence: u8,
    pub method: MatchMethod,
}

impl Match {
    pub fn auto_approvable(&self) -> bool {
        self.registration.is_some() && self.confidence >= AUTO_APPROVE_THRESHOLD
    }

    fn none(payment: Payment) -> Self {
        Self { payment, registration: None, confidence: 0, method: MatchMethod::None }
    }
}

/// Matches a payment against the candidate registrations.
///
/// A registration carrying a manual match marker equal to *this* payment's id wins outright (confidence 100).
/// Otherwise a match requires the payment's normalized key and the registration's normalized key to be non-null and
/// equal (confidence 90). The per-role path lists keep providers segregated, so key equality alone is the matching
/// predicate; a Square key never compares equal to a Stripe key because registrations store them under
/// provider-specific fields.
///
/// When several candidates match, preference order is: manual marker, then the registration whose timestamp is
/// closest to the payment's, then the lowest registration id. The final tie-break keeps the result deterministic
/// regardless of the order the candidates were handed over in.
pub fn match_payment(payment: &Payment, candidates: &[Registration]) -> Match {
    if let Some(marked) = find_manual_match(payment, candidates) {
        return Match {
            payment: payment.clone(),
            registration: Some(marked.clone()),
            confidence: CONFIDENCE_MANUAL_MARKER,
            method: MatchMethod::ManualMarker,
        };
    }

    let payment_key = match extract_payment_key(&payment.original_data.0, KeyRole::Payment) {
        Some(key) => key,
        None => return Match::none(payment.clone()),
    };

    let mut matched: Vec<&Registration> = candidates
        .iter()
        .filter(|reg| {
            extract_payment_key(&reg.registration_data.0, KeyRole::Registration)
                .is_some_and(|reg_key| reg_key == payment_key)
        })
        .collect();

    if matched.is_empty() {
        return Match::none(payment.clone());
    }

    matched.sort_by_key(|reg| {
        let distance = (reg.created_at - payment.created_at).num_seconds().abs();
        (distance, reg.id.clone())
    });

    Match {
        payment: payment.clone(),
        registration: Some(matched[0].clone()),
        confidence: CONFIDENCE_EXACT_KEY,
        method: MatchMethod::ExactKey,
    }
}

fn find_manual_match<'a>(payment: &Payment, candidates: &'a [Registration]) -> Option<&'a Registration> {
    let mut marked: Vec<&Registration> = candidates
        .iter()
        .filter(|reg| {
            extract_manual_marker(&reg.registration_data.0).is_some_and(|marker| marker == payment.id.as_str())
        })
        .collect();
    // Two registrations pointing at the same payment is an operator data-entry error. Resolve it deterministically
    // by id so repeated runs agree.
    marked.sort_by(|a, b| a.id.cmp(&b.id));
    marked.first().copied()
}

#[cfg(test)]
mod test {
    use chrono::{DateTime, Utc};
    use ltx_common::Money;
    use serde_json::{json, Value};
    use sqlx::types::Json;

    use super::*;
    use crate::db_types::{PaymentId, Provider, RegistrationId};

    fn payment(id: &str, data: Value) -> Payment {
        Payment {
            id: PaymentId(id.to_string()),
            provider: Provider::Square,
            payment_key: None,
            amount: Money::from_cents(10_000),
            currency: "AUD".to_string(),
            created_at: ts("2025-06-01T12:00:00Z"),
            customer_name: None,
            customer_email: None,
            original_data: Json(data),
            invoice_created: false,
            invoice_number: None,
            invoice_id: None,
            declined: false,
        }
    }

    fn registration(id: &str, data: Value) -> Registration {
        Registration {
            id: RegistrationId(id.to_string()),
            event_name: "conf-2025".to_string(),
            created_at: ts("2025-06-01T12:00:00Z"),
            registration_data: Json(data),
            invoice_created: false,
            invoice_number: None,
            invoice_id: None,
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn exact_key_match() {
        let p = payment("p1", json!({"paymentId": "SQ123"}));
        let r = registration("r1", json!({"squarePaymentId": "SQ123"}));
        let m = match_payment(&p, &[r]);
        assert_eq!(m.registration.as_ref().unwrap().id.as_str(), "r1");
        assert_eq!(m.confidence, 90);
        assert_eq!(m.method, MatchMethod::ExactKey);
        assert!(m.auto_approvable());
    }

    #[test]
    fn cross_provider_keys_never_match() {
        let p = payment("p1", json!({"paymentId": "SQ123"}));
        let r1 = registration("r1", json!({"stripePaymentIntentId": "pi_abc"}));
        // A stray manual marker pointing at some *other* record must not fire either.
        let r2 = registration("r2", json!({"matchedRegistrationId": "r1"}));
        let m = match_payment(&p, &[r1, r2]);
        assert!(m.registration.is_none());
        assert_eq!(m.confidence, 0);
        assert_eq!(m.method, MatchMethod::None);
    }

    #[test]
    fn manual_marker_beats_key_match() {
        let p = payment("p1", json!({"paymentId": "SQ123"}));
        let keyed = registration("r1", json!({"squarePaymentId": "SQ123"}));
        let marked = registration("r2", json!({"matchedRegistrationId": "p1"}));
        let m = match_payment(&p, &[keyed, marked]);
        assert_eq!(m.registration.as_ref().unwrap().id.as_str(), "r2");
        assert_eq!(m.confidence, 100);
        assert_eq!(m.method, MatchMethod::ManualMarker);
    }

    #[test]
    fn closest_timestamp_wins_among_equal_keys() {
        let p = payment("p1", json!({"paymentId": "SQ123"}));
        let mut near = registration("r-near", json!({"squarePaymentId": "SQ123"}));
        near.created_at = ts("2025-06-01T12:05:00Z");
        let mut far = registration("r-far", json!({"squarePaymentId": "SQ123"}));
        far.created_at = ts("2025-06-02T12:00:00Z");
        let m = match_payment(&p, &[far.clone(), near.clone()]);
        assert_eq!(m.registration.as_ref().unwrap().id.as_str(), "r-near");
        // Determinism: candidate order must not change the outcome.
        let m = match_payment(&p, &[near, far]);
        assert_eq!(m.registration.as_ref().unwrap().id.as_str(), "r-near");
    }

    #[test]
    fn equal_timestamps_break_ties_by_id() {
        let p = payment("p1", json!({"paymentId": "SQ123"}));
        let a = registration("r-a", json!({"squarePaymentId": "SQ123"}));
        let b = registration("r-b", json!({"squarePaymentId": "SQ123"}));
        let m = match_payment(&p, &[b.clone(), a.clone()]);
        assert_eq!(m.registration.as_ref().unwrap().id.as_str(), "r-a");
        let m = match_payment(&p, &[a, b]);
        assert_eq!(m.registration.as_ref().unwrap().id.as_str(), "r-a");
    }

    #[test]
    fn keyless_payment_never_matches() {
        let p = payment("p1", json!({"note": "cash on the day"}));
        let r = registration("r1", json!({"squarePaymentId": "SQ123"}));
        let m = match_payment(&p, &[r]);
        assert!(m.registration.is_none());
        assert_eq!(m.method, MatchMethod::None);
    }

    #[test]
    fn match_is_deterministic() {
        let p = payment("p1", json!({"paymentId": "SQ123"}));
        let candidates = vec![
            registration("r1", json!({"squarePaymentId": "SQ123"})),
            registration("r2", json!({"squarePaymentId": "SQ123"})),
            registration("r3", json!({"stripePaymentIntentId": "pi_x"})),
        ];
        let first = match_payment(&p, &candidates);
        let second = match_payment(&p, &candidates);
        assert_eq!(first.registration.as_ref().unwrap().id, second.registration.as_ref().unwrap().id);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.method, second.method);
    }
}
