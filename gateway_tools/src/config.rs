use log::*;
use ltx_common::Secret;

#[derive(Debug, Clone, Default)]
pub struct SquareConfig {
    pub api_url: String,
    pub api_version: String,
    pub access_token: Secret<String>,
}

impl SquareConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("LTX_SQUARE_API_URL").unwrap_or_else(|_| {
            debug!("LTX_SQUARE_API_URL not set, using the production endpoint");
            "https://connect.squareup.com".to_string()
        });
        let api_version = std::env::var("LTX_SQUARE_API_VERSION").unwrap_or_else(|_| {
            debug!("LTX_SQUARE_API_VERSION not set, using 2024-05-15 as default");
            "2024-05-15".to_string()
        });
        let access_token = Secret::new(std::env::var("LTX_SQUARE_TOKEN").unwrap_or_else(|_| {
            warn!("LTX_SQUARE_TOKEN not set, using (probably useless) default");
            "EAAA0000000000".to_string()
        }));
        Self { api_url, api_version, access_token }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub api_url: String,
    pub secret_key: Secret<String>,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("LTX_STRIPE_API_URL").unwrap_or_else(|_| {
            debug!("LTX_STRIPE_API_URL not set, using the production endpoint");
            "https://api.stripe.com".to_string()
        });
        let secret_key = Secret::new(std::env::var("LTX_STRIPE_TOKEN").unwrap_or_else(|_| {
            warn!("LTX_STRIPE_TOKEN not set, using (probably useless) default");
            "sk_test_00000000000000".to_string()
        }));
        Self { api_url, secret_key }
    }
}
