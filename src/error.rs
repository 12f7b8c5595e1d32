use thiserror::Error;

/// Failure of a single per-symbol upstream lookup. Recovered by dropping the
/// symbol from the aggregated result.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream refused request: {0}")]
    Upstream(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Orchestration failure of the whole fan-out. Recovered with the fallback dataset.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("fetch task for {symbol} was cancelled")]
    Cancelled { symbol: String },
    #[error("no symbols configured")]
    NoSymbols,
}

#[derive(Debug, Error, PartialEq)]
pub enum HubError {
    #[error("subscriber {0} already connected")]
    AlreadyConnected(String),
    #[error("subscriber lock poisoned")]
    LockPoisoned,
}

/// Per-subscriber push failure. Logged and dropped; never aborts a tick.
#[derive(Debug, Error, PartialEq)]
pub enum DeliveryError {
    #[error("subscriber {0} is lagging, update dropped")]
    Lagging(String),
    #[error("subscriber {0} has gone away")]
    Closed(String),
}
