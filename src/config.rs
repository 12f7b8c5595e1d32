use std::env;
use std::time::Duration;
use log::warn;

// Server Configuration
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_API_BIND_ADDRESS: &str = "127.0.0.1:5001";
pub const STATS_INTERVAL_SECS: u64 = 60;

// Upstream Configuration
pub const DEFAULT_API_KEY: &str = "demo";
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_QUOTE_SYMBOLS: &str = "RELIANCE.BSE,TCS.BSE,HDFCBANK.BSE,INFY.BSE,SBIN.BSE";
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5000;

// Broadcast Configuration
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_BROADCAST_SYMBOLS: &str = "AAPL";
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

pub struct Config {
    pub bind_address: String,
    pub api_bind_address: String,
    pub api_key: String,
    pub upstream_base_url: String,
    pub quote_symbols: Vec<String>,
    pub fetch_timeout: Duration,
    pub tick_interval: Duration,
    pub broadcast_symbols: Vec<String>,
    pub subscriber_buffer: usize,
    pub log_level: String,
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            api_bind_address: env::var("API_BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_API_BIND_ADDRESS.to_string()),
            api_key: env::var("ALPHA_VANTAGE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("ALPHA_VANTAGE_API_KEY not set, using the demo key");
                    DEFAULT_API_KEY.to_string()
                }),
            upstream_base_url: env::var("UPSTREAM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_BASE_URL.to_string()),
            quote_symbols: parse_list(
                &env::var("QUOTE_SYMBOLS").unwrap_or_else(|_| DEFAULT_QUOTE_SYMBOLS.to_string()),
            ),
            fetch_timeout: Duration::from_millis(parse_or("FETCH_TIMEOUT_MS", DEFAULT_FETCH_TIMEOUT_MS)),
            tick_interval: Duration::from_millis(parse_or("TICK_INTERVAL_MS", DEFAULT_TICK_INTERVAL_MS)),
            broadcast_symbols: parse_list(
                &env::var("BROADCAST_SYMBOLS").unwrap_or_else(|_| DEFAULT_BROADCAST_SYMBOLS.to_string()),
            ),
            subscriber_buffer: parse_or("SUBSCRIBER_BUFFER", DEFAULT_SUBSCRIBER_BUFFER),
            log_level: env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_key == DEFAULT_API_KEY {
            warn!("Using the demo API key - live quotes will mostly fall back");
        }

        if self.quote_symbols.is_empty() {
            return Err("QUOTE_SYMBOLS must name at least one symbol".to_string());
        }

        if self.broadcast_symbols.is_empty() {
            return Err("BROADCAST_SYMBOLS must name at least one symbol".to_string());
        }

        if self.fetch_timeout.is_zero() {
            return Err("FETCH_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.tick_interval.is_zero() {
            return Err("TICK_INTERVAL_MS must be greater than zero".to_string());
        }

        if self.subscriber_buffer == 0 {
            return Err("SUBSCRIBER_BUFFER must be greater than zero".to_string());
        }

        Ok(())
    }

    /// First four characters of the key, the rest hidden.
    pub fn masked_api_key(&self) -> String {
        let visible: String = self.api_key.chars().take(4).collect();
        format!("{}***", visible)
    }

    pub fn log_config(&self) {
        println!("Server Configuration:");
        println!("  WebSocket Address: {}", self.bind_address);
        println!("  API Address: {}", self.api_bind_address);
        println!("  Upstream: {}", self.upstream_base_url);
        println!("  API Key: {}", self.masked_api_key());
        println!("  Quote Symbols: {}", self.quote_symbols.join(", "));
        println!("  Fetch Timeout: {} ms", self.fetch_timeout.as_millis());
        println!("  Tick Interval: {} ms", self.tick_interval.as_millis());
        println!("  Broadcast Symbols: {}", self.broadcast_symbols.join(", "));
        println!("  Log Level: {}", self.log_level);
    }
}
