use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::models::{PriceSampleRow, ProcessedMarketRow, SpikeNotificationRow};
use crate::db::StateStore;
use crate::error::Result;
use crate::types::{LastNotification, PriceSample, SpikeNotificationRecord, SubscriberId};

/// SQLite-backed state store. Cheap to clone (shares the pool).
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply migrations.
    /// `:memory:` gives a private in-memory database on a single connection.
    pub async fn open(path: &str) -> Result<Self> {
        let pool = if path == ":memory:" {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?
        } else {
            let options = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))?
                .create_if_missing(true);
            SqlitePoolOptions::new().connect_with(options).await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database ready at {path}");
        Ok(Self { pool })
    }

    pub async fn recent_processed(&self, limit: i64) -> Result<Vec<ProcessedMarketRow>> {
        let rows = sqlx::query_as::<_, ProcessedMarketRow>(
            r#"
            SELECT market_id, title, first_seen_at
            FROM processed_markets
            ORDER BY first_seen_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn price_history(
        &self,
        market_id: &str,
        since: i64,
        limit: i64,
    ) -> Result<Vec<PriceSampleRow>> {
        let rows = sqlx::query_as::<_, PriceSampleRow>(
            r#"
            SELECT id, market_id, token_id, price, sampled_at
            FROM price_history
            WHERE market_id = ? AND sampled_at >= ?
            ORDER BY sampled_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(market_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn recent_spikes(&self, limit: i64) -> Result<Vec<SpikeNotificationRow>> {
        let rows = sqlx::query_as::<_, SpikeNotificationRow>(
            r#"
            SELECT id, market_id, token_id, price, sent_at
            FROM spike_notifications
            ORDER BY sent_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn subscriber_count(&self) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn is_processed(&self, market_id: &str) -> Result<bool> {
        let hit = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM processed_markets WHERE market_id = ?",
        )
        .bind(market_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hit.is_some())
    }

    async fn mark_processed(&self, market_id: &str, title: &str, now: i64) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO processed_markets (market_id, title, first_seen_at) VALUES (?, ?, ?)",
        )
        .bind(market_id)
        .bind(title)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_subscribers(&self) -> Result<Vec<SubscriberId>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT chat_id FROM subscribers ORDER BY chat_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn add_subscriber(&self, chat_id: SubscriberId, now: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO subscribers (chat_id, subscribed_at) VALUES (?, ?)",
        )
        .bind(chat_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_price_sample(&self, sample: &PriceSample) -> Result<()> {
        sqlx::query(
            "INSERT INTO price_history (market_id, token_id, price, sampled_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&sample.market_id)
        .bind(&sample.token_id)
        .bind(sample.price)
        .bind(sample.sampled_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn price_at_or_before(&self, market_id: &str, cutoff: i64) -> Result<Option<f64>> {
        let price = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT price FROM price_history
            WHERE market_id = ? AND sampled_at <= ?
            ORDER BY sampled_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(market_id)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;
        Ok(price)
    }

    async fn last_notification(&self, market_id: &str) -> Result<Option<LastNotification>> {
        let row = sqlx::query_as::<_, (f64, i64)>(
            r#"
            SELECT price, sent_at FROM spike_notifications
            WHERE market_id = ?
            ORDER BY sent_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(market_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(price, sent_at)| LastNotification { price, sent_at }))
    }

    async fn record_notification(&self, record: &SpikeNotificationRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO spike_notifications (market_id, token_id, price, sent_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&record.market_id)
        .bind(&record.token_id)
        .bind(record.price)
        .bind(record.sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
