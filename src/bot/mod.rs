//! Telegram command listener. Long-polls `getUpdates` and maintains the
//! subscriber set from `/start`.

pub mod commands;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::COMMAND_RETRY_SECS;
use crate::db::StateStore;
use crate::engine::Clock;
use crate::error::Result;
use crate::notify::telegram::IncomingMessage;
use crate::notify::TelegramClient;

use commands::{greeting, parse_command, Command, HELP_TEXT};

pub struct CommandListener {
    telegram: Arc<TelegramClient>,
    store: Arc<dyn StateStore>,
    clock: Clock,
}

impl CommandListener {
    pub fn new(telegram: Arc<TelegramClient>, store: Arc<dyn StateStore>, clock: Clock) -> Self {
        Self { telegram, store, clock }
    }

    pub async fn run(self) {
        info!("Command listener started");
        let mut offset = 0i64;

        loop {
            let updates = match self.telegram.get_updates(offset).await {
                Ok(u) => u,
                Err(e) => {
                    warn!("getUpdates failed: {e}; retrying in {COMMAND_RETRY_SECS}s");
                    tokio::time::sleep(Duration::from_secs(COMMAND_RETRY_SECS)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message else { continue };
                let chat_id = message.chat.id;
                match self.respond(&message).await {
                    Ok(Some(reply)) => {
                        let sent = self.telegram.send_message(json!(chat_id), &reply, None).await;
                        if let Err(e) = sent {
                            warn!(chat_id, "Failed to reply to command: {e}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(chat_id, "Command handling failed: {e}"),
                }
            }
        }
    }

    /// Apply one incoming message and return the reply to send, if any.
    pub async fn respond(&self, message: &IncomingMessage) -> Result<Option<String>> {
        let Some(command) = message.text.as_deref().and_then(parse_command) else {
            return Ok(None);
        };

        match command {
            Command::Start => {
                let chat_id = message.chat.id;
                let added = self.store.add_subscriber(chat_id, (self.clock)()).await?;
                if added {
                    info!(chat_id, "New subscriber");
                } else {
                    debug!(chat_id, "Already subscribed");
                }
                let name = message
                    .from
                    .as_ref()
                    .map(|u| u.full_name())
                    .unwrap_or_else(|| "there".to_string());
                Ok(Some(greeting(&name)))
            }
            Command::Help => Ok(Some(HELP_TEXT.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicI64;

    use super::*;
    use crate::db::SqliteStore;
    use crate::engine::testing::clock_at;
    use crate::notify::telegram::{Chat, User};

    fn message(chat_id: i64, text: &str) -> IncomingMessage {
        IncomingMessage {
            chat: Chat { id: chat_id },
            from: Some(User { first_name: "Ann".to_string(), last_name: Some("Lee".to_string()) }),
            text: Some(text.to_string()),
        }
    }

    async fn listener() -> (CommandListener, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open(":memory:").await.unwrap());
        let telegram = Arc::new(TelegramClient::new("http://127.0.0.1:9", "test").unwrap());
        let clock = clock_at(Arc::new(AtomicI64::new(1_000)));
        (CommandListener::new(telegram, store.clone(), clock), store)
    }

    #[tokio::test]
    async fn start_subscribes_once() {
        let (l, store) = listener().await;

        let reply = l.respond(&message(42, "/start")).await.unwrap().unwrap();
        assert!(reply.contains("<b>Ann Lee</b>"));
        l.respond(&message(42, "/start@opinio_bot")).await.unwrap();

        assert_eq!(store.list_subscribers().await.unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn help_and_chatter_do_not_subscribe() {
        let (l, store) = listener().await;

        assert_eq!(l.respond(&message(7, "/help")).await.unwrap().as_deref(), Some(HELP_TEXT));
        assert_eq!(l.respond(&message(7, "hello")).await.unwrap(), None);

        assert!(store.list_subscribers().await.unwrap().is_empty());
    }
}
