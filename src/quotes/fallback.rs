use crate::quotes::Quote;

const FALLBACK_QUOTES: [(&str, f64, f64); 5] = [
    ("RELIANCE", 2800.0, 25.5),
    ("TCS", 3500.0, -15.0),
    ("HDFCBANK", 1600.0, 12.0),
    ("INFY", 1400.0, 8.0),
    ("SBIN", 700.0, -5.0),
];

/// Static quotes served when every live lookup fails.
pub fn fallback_quotes() -> Vec<Quote> {
    FALLBACK_QUOTES.iter()
        .map(|(symbol, price, change)| Quote::fallback(symbol, *price, *change))
        .collect()
}
