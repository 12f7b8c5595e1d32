use std::sync::Arc;
use axum::{
    extract::State,
    response::Json,
    routing::get,
    Router,
};
use log::info;

use crate::hub::BroadcastHub;
use crate::quotes::{Quote, QuoteAggregator};
use crate::signals::{derive_recommendations, label_news, NewsItem, Recommendation};

#[derive(Clone)]
pub struct ApiState {
    pub aggregator: Arc<QuoteAggregator>,
    pub hub: BroadcastHub,
}

// GET / - Liveness banner
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "IndiaStock AI Server is running!"
    }))
}

// GET /api/health - Health check endpoint
pub async fn health_check(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "indiastock_feed",
        "timestamp": chrono::Utc::now(),
        "subscribers": state.hub.subscriber_count(),
        "hubState": state.hub.state(),
    }))
}

// GET /api/indian-stocks - Live quotes, or the fallback set
pub async fn get_quotes(State(state): State<ApiState>) -> Json<Vec<Quote>> {
    Json(state.aggregator.aggregate().await)
}

// GET /api/ai-recommendations - Recommendations over the current quotes
pub async fn get_recommendations(State(state): State<ApiState>) -> Json<Vec<Recommendation>> {
    let quotes = state.aggregator.aggregate().await;
    let recommendations = derive_recommendations(&quotes);
    info!("Derived {} recommendations", recommendations.len());
    Json(recommendations)
}

// GET /api/news-analysis - Labeled headlines
pub async fn get_news_analysis() -> Json<Vec<NewsItem>> {
    Json(label_news())
}

// Create the API router
pub fn create_api_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/indian-stocks", get(get_quotes))
        .route("/ai-recommendations", get(get_recommendations))
        .route("/news-analysis", get(get_news_analysis))
        .with_state(state);

    Router::new()
        .route("/", get(root))
        .nest("/api", api_routes)
}
