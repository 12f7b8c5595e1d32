use serde::{Serialize, Serializer};

use crate::quotes::Quote;

pub const TIME_FRAME: &str = "Short-term (1-3 months)";
const TARGET_UPSIDE_FACTOR: f64 = 0.15;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Action {
    #[serde(rename = "Strong Buy")]
    StrongBuy,
    Buy,
    Hold,
    Sell,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub action: Action,
    #[serde(serialize_with = "as_percent")]
    pub confidence: f64,
    pub target_price: f64,
    pub time_frame: &'static str,
    pub reason: &'static str,
}

fn as_percent<S: Serializer>(confidence: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&confidence_label(*confidence))
}

/// 0.85 -> "85%"
pub fn confidence_label(confidence: f64) -> String {
    format!("{}%", (confidence * 100.0).round() as i64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// First match wins.
fn classify(change: f64) -> (Action, f64, &'static str) {
    if change > 2.0 {
        (Action::StrongBuy, 0.90, "Strong upward momentum")
    } else if change > 0.0 {
        (Action::Buy, 0.80, "Positive trend")
    } else if change < -3.0 {
        (Action::Sell, 0.85, "Significant drop")
    } else {
        (Action::Hold, 0.70, "Stable performance")
    }
}

impl Recommendation {
    pub fn from_quote(quote: &Quote) -> Self {
        let (action, confidence, reason) = classify(quote.change);
        Self {
            symbol: quote.symbol.clone(),
            price: quote.price,
            change: quote.change,
            action,
            confidence,
            target_price: round2(quote.price * (1.0 + confidence * TARGET_UPSIDE_FACTOR)),
            time_frame: TIME_FRAME,
            reason,
        }
    }
}

/// One recommendation per quote, in input order.
pub fn derive_recommendations(quotes: &[Quote]) -> Vec<Recommendation> {
    quotes.iter().map(Recommendation::from_quote).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::fallback_quotes;

    fn action_for(change: f64) -> Action {
        Recommendation::from_quote(&Quote::live("X.BSE", 100.0, change, None)).action
    }

    #[test]
    fn test_threshold_ladder() {
        assert_eq!(action_for(5.0), Action::StrongBuy);
        assert_eq!(action_for(1.0), Action::Buy);
        assert_eq!(action_for(-1.0), Action::Hold);
        assert_eq!(action_for(-10.0), Action::Sell);
    }

    #[test]
    fn test_ladder_boundaries() {
        assert_eq!(action_for(2.01), Action::StrongBuy);
        // exactly 2 falls through to the next rung
        assert_eq!(action_for(2.0), Action::Buy);
        assert_eq!(action_for(0.0), Action::Hold);
        assert_eq!(action_for(-3.0), Action::Hold);
        assert_eq!(action_for(-3.01), Action::Sell);
    }

    #[test]
    fn test_target_price() {
        let rec = Recommendation::from_quote(&Quote::live("X.BSE", 100.0, 3.0, None));
        assert_eq!(rec.confidence, 0.90);
        assert!((rec.target_price - 113.50).abs() < 1e-9);

        let rec = Recommendation::from_quote(&Quote::live("X.BSE", 700.0, -5.0, None));
        assert_eq!(rec.action, Action::Sell);
        assert!((rec.target_price - 789.25).abs() < 1e-9);
    }

    #[test]
    fn test_preserves_length_and_order() {
        let quotes = fallback_quotes();
        let recs = derive_recommendations(&quotes);

        assert_eq!(recs.len(), quotes.len());
        for (rec, quote) in recs.iter().zip(quotes.iter()) {
            assert_eq!(rec.symbol, quote.symbol);
            assert_eq!(rec.time_frame, TIME_FRAME);
        }
        assert!(derive_recommendations(&[]).is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let rec = Recommendation::from_quote(&Quote::live("RELIANCE.BSE", 2800.0, 25.5, None));
        let json = serde_json::to_value(&rec).unwrap();

        assert_eq!(json["action"], "Strong Buy");
        assert_eq!(json["confidence"], "90%");
        assert_eq!(json["targetPrice"], 3178.0);
        assert_eq!(json["timeFrame"], TIME_FRAME);
    }

    #[test]
    fn test_confidence_label() {
        assert_eq!(confidence_label(0.85), "85%");
        assert_eq!(confidence_label(0.7), "70%");
    }
}
