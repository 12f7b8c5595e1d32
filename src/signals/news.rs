use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
}

struct Headline {
    headline: &'static str,
    stock: &'static str,
    sentiment: Sentiment,
    is_fake: bool,
}

// Pre-labeled; there is no classifier behind these.
const HEADLINES: [Headline; 5] = [
    Headline {
        headline: "Reliance Q2 profits surge 24% on Jio growth",
        stock: "RELIANCE",
        sentiment: Sentiment::Positive,
        is_fake: false,
    },
    Headline {
        headline: "TCS to lay off 50,000 employees: FAKE NEWS",
        stock: "TCS",
        sentiment: Sentiment::Negative,
        is_fake: true,
    },
    Headline {
        headline: "HDFC Bank launches AI-powered banking suite",
        stock: "HDFCBANK",
        sentiment: Sentiment::Positive,
        is_fake: false,
    },
    Headline {
        headline: "Infosys stock to crash due to US visa ban: FALSE",
        stock: "INFY",
        sentiment: Sentiment::Negative,
        is_fake: true,
    },
    Headline {
        headline: "SBI Q2 results beat estimates, net profit up 18%",
        stock: "SBIN",
        sentiment: Sentiment::Positive,
        is_fake: false,
    },
];

pub const VERDICT_FAKE: &str = "Likely Fake News";
pub const VERDICT_REAL: &str = "Verified Real News";
pub const IMPACT_PANIC: &str = "High panic risk — ignore";
pub const IMPACT_POSITIVE: &str = "Positive momentum";
pub const IMPACT_DIP: &str = "Temporary dip";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub headline: String,
    pub stock: String,
    pub sentiment: Sentiment,
    pub is_fake: bool,
    pub confidence: f64,
    pub verdict: &'static str,
    pub impact: &'static str,
}

pub fn verdict(is_fake: bool) -> &'static str {
    if is_fake { VERDICT_FAKE } else { VERDICT_REAL }
}

pub fn impact(is_fake: bool, sentiment: Sentiment) -> &'static str {
    match (is_fake, sentiment) {
        (true, Sentiment::Negative) => IMPACT_PANIC,
        (_, Sentiment::Positive) => IMPACT_POSITIVE,
        (false, Sentiment::Negative) => IMPACT_DIP,
    }
}

/// Labels the static headline list. Confidence is drawn fresh from
/// `[0.70, 1.00)` on every call.
pub fn label_news_with<R: Rng>(rng: &mut R) -> Vec<NewsItem> {
    HEADLINES.iter()
        .map(|h| NewsItem {
            headline: h.headline.to_string(),
            stock: h.stock.to_string(),
            sentiment: h.sentiment,
            is_fake: h.is_fake,
            confidence: rng.gen_range(0.70..1.00),
            verdict: verdict(h.is_fake),
            impact: impact(h.is_fake, h.sentiment),
        })
        .collect()
}

pub fn label_news() -> Vec<NewsItem> {
    label_news_with(&mut rand::thread_rng())
}
