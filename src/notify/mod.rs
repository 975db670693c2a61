pub mod category;
pub mod format;
pub mod telegram;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::Result;
use crate::types::{NewMarketEvent, SpikeEvent, SubscriberId};

pub use format::Formatter;
pub use telegram::TelegramClient;

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Broadcast channel, "@name" or a numeric "-100..." id.
    Channel(String),
    Chat(SubscriberId),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Channel(c) => write!(f, "channel {c}"),
            Target::Chat(id) => write!(f, "chat {id}"),
        }
    }
}

/// Rendered notification: HTML body plus the link behind the action button.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub body: String,
    pub action_url: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, target: &Target, message: &Message) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Renders events and fans them out to the channel and every subscriber.
/// Deliveries are best-effort: one failed target never blocks the rest and
/// nothing is retried.
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    channel: Option<String>,
    formatter: Formatter,
}

impl Notifier {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        channel: Option<String>,
        formatter: Formatter,
    ) -> Self {
        Self { sink, channel, formatter }
    }

    /// Whether anyone would receive a broadcast.
    pub fn has_destination(&self, subscribers: &[SubscriberId]) -> bool {
        self.channel.is_some() || !subscribers.is_empty()
    }

    pub async fn announce_market(
        &self,
        subscribers: &[SubscriberId],
        event: &NewMarketEvent,
    ) -> DeliveryReport {
        let message = self.formatter.new_market(event);
        self.broadcast(subscribers, &message).await
    }

    pub async fn announce_spike(
        &self,
        subscribers: &[SubscriberId],
        event: &SpikeEvent,
    ) -> DeliveryReport {
        let message = self.formatter.spike(event);
        self.broadcast(subscribers, &message).await
    }

    pub async fn broadcast(
        &self,
        subscribers: &[SubscriberId],
        message: &Message,
    ) -> DeliveryReport {
        let targets = self
            .channel
            .iter()
            .map(|c| Target::Channel(c.clone()))
            .chain(subscribers.iter().map(|id| Target::Chat(*id)));

        let mut report = DeliveryReport::default();
        for target in targets {
            match self.sink.send(&target, message).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to send to {target}: {e}");
                }
            }
        }
        debug!(delivered = report.delivered, failed = report.failed, "Broadcast finished");
        report
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;
    use crate::error::AppError;

    /// Sink that records every delivery and fails for chosen targets.
    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: Mutex<Vec<(Target, Message)>>,
        pub failing: Vec<Target>,
    }

    impl RecordingSink {
        pub fn failing_for(failing: Vec<Target>) -> Self {
            Self { sent: Mutex::new(Vec::new()), failing }
        }

        pub fn bodies(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, m)| m.body.clone()).collect()
        }

        pub fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, target: &Target, message: &Message) -> Result<()> {
            if self.failing.contains(target) {
                return Err(AppError::Telegram(format!("blocked by {target}")));
            }
            self.sent.lock().unwrap().push((target.clone(), message.clone()));
            Ok(())
        }
    }
}
