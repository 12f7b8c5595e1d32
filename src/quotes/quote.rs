use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub source: QuoteSource,
}

/// "RELIANCE.BSE" -> "RELIANCE"
pub fn strip_exchange_suffix(symbol: &str) -> &str {
    symbol.split('.').next().unwrap_or(symbol)
}

fn field<'a>(quote: &'a Value, name: &'static str) -> Result<&'a str, FetchError> {
    quote.get(name)
        .and_then(Value::as_str)
        .ok_or(FetchError::MissingField(name))
}

fn number(quote: &Value, name: &'static str) -> Result<f64, FetchError> {
    let raw = field(quote, name)?;
    let value: f64 = raw.trim().parse()
        .map_err(|_| FetchError::Malformed(format!("{} is not a number: {:?}", name, raw)))?;
    if !value.is_finite() {
        return Err(FetchError::Malformed(format!("{} is not finite: {:?}", name, raw)));
    }
    Ok(value)
}

impl Quote {
    pub fn live(symbol: &str, price: f64, change: f64, change_percent: Option<String>) -> Self {
        Self {
            symbol: strip_exchange_suffix(symbol).to_string(),
            price,
            change,
            change_percent,
            timestamp: Utc::now(),
            source: QuoteSource::Live,
        }
    }

    pub fn fallback(symbol: &str, price: f64, change: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            change,
            change_percent: None,
            timestamp: Utc::now(),
            source: QuoteSource::Fallback,
        }
    }

    /// Builds a live quote from an Alpha Vantage `GLOBAL_QUOTE` response body.
    pub fn from_global_quote(body: &Value) -> Result<Self, FetchError> {
        for key in ["Error Message", "Note", "Information"] {
            if let Some(message) = body.get(key).and_then(Value::as_str) {
                return Err(FetchError::Upstream(message.to_string()));
            }
        }

        let quote = body.get("Global Quote")
            .filter(|q| q.as_object().map(|o| !o.is_empty()).unwrap_or(false))
            .ok_or(FetchError::MissingField("Global Quote"))?;

        let symbol = field(quote, "01. symbol")?;
        let price = number(quote, "05. price")?;
        let change = number(quote, "09. change")?;
        let change_percent = quote.get("10. change percent")
            .and_then(Value::as_str)
            .map(|s| s.to_string());

        if price < 0.0 {
            return Err(FetchError::Malformed(format!("negative price {} for {}", price, symbol)));
        }

        Ok(Self::live(symbol, price, change, change_percent))
    }
}
