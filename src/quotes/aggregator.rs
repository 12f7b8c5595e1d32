use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use tokio::time::timeout;
use log::{info, warn, error};

use crate::error::{AggregationError, FetchError};
use crate::quotes::{fallback_quotes, Quote, QuoteProvider, QuoteSource};

/// Fans a fixed symbol list out to a [`QuoteProvider`] and degrades to the
/// fallback dataset when nothing live comes back.
pub struct QuoteAggregator {
    provider: Arc<dyn QuoteProvider>,
    symbols: Vec<String>,
    fetch_timeout: Duration,
}

impl QuoteAggregator {
    pub fn new(provider: Arc<dyn QuoteProvider>, symbols: Vec<String>, fetch_timeout: Duration) -> Self {
        Self {
            provider,
            symbols,
            fetch_timeout,
        }
    }

    /// Either the live quotes that succeeded, in symbol order, or the whole
    /// fallback dataset. Never fails.
    pub async fn aggregate(&self) -> Vec<Quote> {
        match self.fetch_live().await {
            Ok(quotes) if !quotes.is_empty() => {
                info!("Aggregated {}/{} live quotes", quotes.len(), self.symbols.len());
                quotes
            }
            Ok(_) => {
                warn!("All {} quote lookups failed, using fallback data", self.symbols.len());
                fallback_quotes()
            }
            Err(e) => {
                error!("Quote aggregation failed: {}, using fallback data", e);
                fallback_quotes()
            }
        }
    }

    async fn fetch_live(&self) -> Result<Vec<Quote>, AggregationError> {
        if self.symbols.is_empty() {
            return Err(AggregationError::NoSymbols);
        }

        let tasks: Vec<_> = self.symbols.iter()
            .map(|symbol| {
                let provider = self.provider.clone();
                let symbol = symbol.clone();
                let fetch_timeout = self.fetch_timeout;
                tokio::spawn(async move {
                    let result = match timeout(fetch_timeout, provider.fetch_quote(&symbol)).await {
                        Ok(result) => result,
                        Err(_) => Err(FetchError::Timeout(fetch_timeout.as_millis() as u64)),
                    };
                    if let Err(e) = &result {
                        warn!("Failed to fetch {}: {}", symbol, e);
                    }
                    result
                })
            })
            .collect();

        let results = join_all(tasks).await;

        let mut quotes = Vec::with_capacity(results.len());
        for (symbol, joined) in self.symbols.iter().zip(results) {
            match joined {
                Ok(Ok(quote)) => quotes.push(Quote { source: QuoteSource::Live, ..quote }),
                Ok(Err(_)) => {}
                Err(e) if e.is_panic() => {
                    warn!("Fetch task for {} panicked", symbol);
                }
                Err(_) => {
                    return Err(AggregationError::Cancelled { symbol: symbol.clone() });
                }
            }
        }

        Ok(quotes)
    }
}
