use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::FetchError;
use crate::quotes::Quote;

/// Source of per-symbol quotes. Implementations should not apply their own
/// timeout; the aggregator bounds every call.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError>;
}

pub struct AlphaVantageClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let body: Value = self.client
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Quote::from_global_quote(&body)
    }
}
