use axum::Json;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: String,
    pub category: String,
}

/// Static community news feed
pub async fn list_news() -> Json<Vec<NewsItem>> {
    Json(vec![NewsItem {
        id: 1,
        title: "Upcoming Gaming Tournament".to_string(),
        description: "Join our first community tournament!".to_string(),
        date: Utc::now().to_rfc3339(),
        category: "Events".to_string(),
    }])
}
