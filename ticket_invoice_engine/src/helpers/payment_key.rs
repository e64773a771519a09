use serde_json::Value;

use crate::db_types::Provider;

/// Which side of the reconciliation a record belongs to. Payments and registrations historically stored the
/// provider-native payment identifier under different field names, so the probe list differs per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Payment,
    Registration,
}

/// Field paths that may hold the payment key on a payment record, in priority order. The order is a fixed contract:
/// earlier importers wrote `paymentId`, the Square CSV importer wrote `transactionId`, and the Stripe importer left
/// the identifier buried in the raw gateway payload under `originalData`.
const PAYMENT_KEY_PATHS: &[&[&str]] = &[
    &["paymentId"],
    &["payment_id"],
    &["transactionId"],
    &["transaction_id"],
    &["originalData", "PaymentIntent ID"],
    &["originalData", "payment_intent"],
    &["originalData", "metadata", "paymentId"],
    &["originalData", "metadata", "payment_id"],
];

/// Field paths that may hold the payment key on a registration record, in priority order. Registrations kept the
/// per-provider field names (which conveniently keeps providers segregated during matching), at the top level or
/// nested under one of three historical containers.
const REGISTRATION_KEY_PATHS: &[&[&str]] = &[
    &["stripePaymentIntentId"],
    &["stripe_payment_intent_id"],
    &["squarePaymentId"],
    &["square_payment_id"],
    &["registrationData", "stripePaymentIntentId"],
    &["registrationData", "stripe_payment_intent_id"],
    &["registrationData", "squarePaymentId"],
    &["registrationData", "square_payment_id"],
    &["paymentInfo", "stripePaymentIntentId"],
    &["paymentInfo", "stripe_payment_intent_id"],
    &["paymentInfo", "squarePaymentId"],
    &["paymentInfo", "square_payment_id"],
    &["paymentData", "stripePaymentIntentId"],
    &["paymentData", "stripe_payment_intent_id"],
    &["paymentData", "squarePaymentId"],
    &["paymentData", "square_payment_id"],
];

/// Paths that may hold an operator-entered manual match marker on a registration record. Despite the legacy field
/// names, the value stored is the *payment* id the operator linked the registration to.
const MANUAL_MARKER_PATHS: &[&[&str]] = &[
    &["matchedRegistrationId"],
    &["linkedRegistrationId"],
    &["matched_registration_id"],
    &["linked_registration_id"],
    &["registrationData", "matchedRegistrationId"],
    &["registrationData", "linkedRegistrationId"],
];

/// The legacy admin tool wrote this sentinel into key fields when an operator dismissed a record.
const NO_MATCH_SENTINEL: &str = "no-match";

/// Extracts the provider-native payment key from a loosely-structured record by probing the known field paths for
/// the given role, in priority order. Returns the first non-empty value found, or `None` if no path yields a value.
/// Empty strings and the `"no-match"` sentinel count as absent. Side-effect free.
pub fn extract_payment_key(record: &Value, role: KeyRole) -> Option<String> {
    let paths = match role {
        KeyRole::Payment => PAYMENT_KEY_PATHS,
        KeyRole::Registration => REGISTRATION_KEY_PATHS,
    };
    probe_paths(record, paths)
}

/// Extracts a manual match marker from a registration record, if an operator linked it to a payment by hand.
pub fn extract_manual_marker(record: &Value) -> Option<String> {
    probe_paths(record, MANUAL_MARKER_PATHS)
}

fn probe_paths(record: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        let value = path.iter().try_fold(record, |v, segment| v.get(segment))?;
        match value.as_str() {
            Some(s) if !s.is_empty() && s != NO_MATCH_SENTINEL => Some(s.to_string()),
            _ => None,
        }
    })
}

/// Guesses the gateway a payment key belongs to from its shape. Stripe PaymentIntent and charge ids carry a fixed
/// prefix; Square payment ids are unprefixed base62 tokens. Used for the processing-fee estimate when the payment
/// record itself does not carry a trustworthy provider field.
pub fn provider_hint(key: &str) -> Provider {
    if key.starts_with("pi_") || key.starts_with("ch_") || key.starts_with("py_") {
        Provider::Stripe
    } else {
        Provider::Square
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn payment_key_from_each_legacy_path() {
        // Field-path equivalence: the same key is returned regardless of which legacy path held it.
        let records = [
            json!({"paymentId": "SQ123"}),
            json!({"payment_id": "SQ123"}),
            json!({"transactionId": "SQ123"}),
            json!({"originalData": {"PaymentIntent ID": "SQ123"}}),
            json!({"originalData": {"metadata": {"paymentId": "SQ123"}}}),
        ];
        for record in &records {
            assert_eq!(extract_payment_key(record, KeyRole::Payment).as_deref(), Some("SQ123"), "record: {record}");
        }
    }

    #[test]
    fn path_priority_is_fixed() {
        // `paymentId` outranks `transactionId` outranks the nested originalData paths.
        let record = json!({
            "transactionId": "second",
            "paymentId": "first",
            "originalData": {"PaymentIntent ID": "third"},
        });
        assert_eq!(extract_payment_key(&record, KeyRole::Payment).as_deref(), Some("first"));
        let record = json!({
            "transactionId": "second",
            "originalData": {"PaymentIntent ID": "third"},
        });
        assert_eq!(extract_payment_key(&record, KeyRole::Payment).as_deref(), Some("second"));
    }

    #[test]
    fn empty_and_sentinel_values_are_absent() {
        let record = json!({"paymentId": "", "transactionId": "no-match"});
        assert_eq!(extract_payment_key(&record, KeyRole::Payment), None);
        // An absent higher-priority path falls through to a populated lower one.
        let record = json!({"paymentId": "no-match", "transactionId": "SQ999"});
        assert_eq!(extract_payment_key(&record, KeyRole::Payment).as_deref(), Some("SQ999"));
    }

    #[test]
    fn registration_keys_probe_nested_containers() {
        let record = json!({"registrationData": {"squarePaymentId": "SQ42"}});
        assert_eq!(extract_payment_key(&record, KeyRole::Registration).as_deref(), Some("SQ42"));
        let record = json!({"paymentInfo": {"stripe_payment_intent_id": "pi_9"}});
        assert_eq!(extract_payment_key(&record, KeyRole::Registration).as_deref(), Some("pi_9"));
        let record = json!({"paymentData": {"squarePaymentId": "SQ7"}});
        assert_eq!(extract_payment_key(&record, KeyRole::Registration).as_deref(), Some("SQ7"));
        // Top-level fields outrank nested containers.
        let record = json!({
            "stripePaymentIntentId": "pi_top",
            "registrationData": {"stripePaymentIntentId": "pi_nested"},
        });
        assert_eq!(extract_payment_key(&record, KeyRole::Registration).as_deref(), Some("pi_top"));
    }

    #[test]
    fn payment_paths_never_match_registration_fields() {
        let record = json!({"squarePaymentId": "SQ123"});
        assert_eq!(extract_payment_key(&record, KeyRole::Payment), None);
    }

    #[test]
    fn manual_markers() {
        let record = json!({"matchedRegistrationId": "pay-001"});
        assert_eq!(extract_manual_marker(&record).as_deref(), Some("pay-001"));
        let record = json!({"registrationData": {"linkedRegistrationId": "pay-002"}});
        assert_eq!(extract_manual_marker(&record).as_deref(), Some("pay-002"));
        assert_eq!(extract_manual_marker(&json!({})), None);
    }

    #[test]
    fn provider_hints() {
        assert_eq!(provider_hint("pi_3MtwBwLkdIwHu7ix28a3tqPa"), Provider::Stripe);
        assert_eq!(provider_hint("ch_1NirD82eZvKYlo2CIvbtLWuY"), Provider::Stripe);
        assert_eq!(provider_hint("bP9mAsDuKzRKkAEaKgHKVQ2rp1IZY"), Provider::Square);
    }

    #[test]
    fn non_string_values_are_ignored() {
        let record = json!({"paymentId": 12345, "transactionId": "SQ1"});
        assert_eq!(extract_payment_key(&record, KeyRole::Payment).as_deref(), Some("SQ1"));
    }
}
