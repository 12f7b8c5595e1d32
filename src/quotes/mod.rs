pub mod quote;
pub mod fallback;
pub mod upstream;
pub mod aggregator;

pub use quote::{Quote, QuoteSource};
pub use fallback::fallback_quotes;
pub use upstream::{QuoteProvider, AlphaVantageClient};
pub use aggregator::QuoteAggregator;
