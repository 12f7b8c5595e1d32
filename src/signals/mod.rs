pub mod recommendation;
pub mod news;

pub use recommendation::{Recommendation, derive_recommendations};
pub use news::{NewsItem, label_news};
