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

use crate::{config::SquareConfig, data_objects::SquarePaymentList};

/// Client for the Square Payments API. Pagination uses Square's opaque `cursor` query parameter, which is passed
/// through to the engine unchanged.
#[derive(Clone)]
pub struct SquareApi {
    config: SquareConfig,
    client: Arc<Client>,
}

impl SquareApi {
    pub fn new(config: SquareConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(3);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.access_token.reveal()))
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        let version = HeaderValue::from_str(config.api_version.as_str())
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        headers.insert("Square-Version", version);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<SquarePaymentList, GatewayError> {
        let url = self.url("/v2/payments");
        trace!("Fetching Square payments page: {url}");
        let mut req = self.client.get(url);
        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor)]);
        }
        let response = req.send().await.map_err(|e| GatewayError::RequestError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayError::RequestError(e.to_string()))?;
            return Err(GatewayError::ApiError { status, message });
        }
        response.json::<SquarePaymentList>().await.map_err(|e| GatewayError::JsonError(e.to_string()))
    }
}

impl PaymentGateway for SquareApi {
    fn provider(&self) -> Provider {
        Provider::Square
    }

    async fn list_payments(&self, cursor: Option<&str>) -> Result<PaymentPage, GatewayError> {
        let page = self.fetch_page(cursor).await?;
        debug!("Fetched {} Square payments", page.payments.len());
        let items = page.payments.into_iter().map(NewPayment::from).collect();
        Ok(PaymentPage { items, next_cursor: page.cursor })
    }
}
