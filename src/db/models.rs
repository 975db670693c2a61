//! Row types matching migrations/0001_init.sql.
use serde::Serialize;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProcessedMarketRow {
    pub market_id: String,
    pub title: String,
    pub first_seen_at: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PriceSampleRow {
    pub id: i64,
    pub market_id: String,
    pub token_id: String,
    pub price: f64,
    pub sampled_at: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SpikeNotificationRow {
    pub id: i64,
    pub market_id: String,
    pub token_id: String,
    pub price: f64,
    pub sent_at: i64,
}
