use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use ticket_invoice_engine::{
    db_types::{NewPayment, Provider},
    GatewayError,
    PaymentGateway,
    PaymentPage,
};

use crate::{config::StripeConfig, data_objects::StripePaymentIntentList};

/// Client for the Stripe PaymentIntents API. Stripe paginates with `starting_after=<last object id>`, so the
/// engine's cursor for this gateway is the id of the last intent on the previous page.
#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(1);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    async fn fetch_page(&self, starting_after: Option<&str>) -> Result<StripePaymentIntentList, GatewayError> {
        let url = self.url("/v1/payment_intents");
        trace!("Fetching Stripe payment intents page: {url}");
        let mut req = self.client.get(url).query(&[("limit", "100")]);
        if let Some(after) = starting_after {
            req = req.query(&[("starting_after", after)]);
        }
        let response = req.send().await.map_err(|e| GatewayError::RequestError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayError::RequestError(e.to_string()))?;
            return Err(GatewayError::ApiError { status, message });
        }
        response.json::<StripePaymentIntentList>().await.map_err(|e| GatewayError::JsonError(e.to_string()))
    }
}

impl PaymentGateway for StripeApi {
    fn provider(&self) -> Provider {
        Provider::Stripe
    }

    async fn list_payments(&self, cursor: Option<&str>) -> Result<PaymentPage, GatewayError> {
        let page = self.fetch_page(cursor).await?;
        debug!("Fetched {} Stripe payment intents", page.data.len());
        let next_cursor = if page.has_more { page.data.last().map(|p| p.id.clone()) } else { None };
        let items = page.data.into_iter().map(NewPayment::from).collect();
        Ok(PaymentPage { items, next_cursor })
    }
}
