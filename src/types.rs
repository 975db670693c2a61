use serde::Serialize;

// ---------------------------------------------------------------------------
// Market snapshot
// ---------------------------------------------------------------------------

/// One market as listed by the feed on a single poll. Rebuilt every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub id: String,
    pub title: String,
    /// Unix seconds. Missing in the feed → 0, which always reads as stale.
    pub created_at: i64,
    /// 0 while the market is open. `None` when the feed omitted the field.
    pub resolved_at: Option<i64>,
    pub market_type: Option<i64>,
    /// Sub-markets of a multi-outcome parent.
    pub children: Vec<MarketSnapshot>,
    pub yes_token_id: Option<String>,
    pub volume_24h: Option<f64>,
    pub volume: Option<f64>,
    pub yes_label: Option<String>,
    pub no_label: Option<String>,
}

impl MarketSnapshot {
    pub fn is_unresolved(&self) -> bool {
        self.resolved_at == Some(0)
    }

    /// Multi-outcome for link purposes: typed as multi or carrying children.
    pub fn is_multi(&self) -> bool {
        self.market_type == Some(1) || !self.children.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tracked instrument
// ---------------------------------------------------------------------------

/// A flat, scan-eligible unit: a leaf market or one unresolved child.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedInstrument {
    pub instrument_id: String,
    pub display_title: String,
    pub price_token_id: Option<String>,
    pub volume_24h: f64,
    /// Market the trade link points at (the parent for children).
    pub trade_target_id: String,
    /// Passed to the fallback price source.
    pub market_id_hint: String,
    pub is_multi: bool,
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub market_id: String,
    pub token_id: String,
    pub price: f64,
    pub sampled_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpikeNotificationRecord {
    pub market_id: String,
    pub token_id: String,
    pub price: f64,
    pub sent_at: i64,
}

/// Baseline for the cooldown rule: the last alert actually sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastNotification {
    pub price: f64,
    pub sent_at: i64,
}

/// Opaque delivery target for a subscriber (a Telegram chat id).
pub type SubscriberId = i64;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A genuinely new market worth announcing.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarketEvent {
    pub market: MarketSnapshot,
    pub is_multi: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A price move that crossed the threshold and passed the cooldown rule.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeEvent {
    pub instrument: TrackedInstrument,
    /// Signed percentage change over the lookback window.
    pub change_pct: f64,
    pub current_price: f64,
}

impl SpikeEvent {
    pub fn direction(&self) -> Direction {
        if self.change_pct > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}
