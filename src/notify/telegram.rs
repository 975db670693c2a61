//! Minimal Telegram Bot API client: `sendMessage` for deliveries and
//! `getUpdates` for the command listener.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::COMMAND_POLL_TIMEOUT_SECS;
use crate::error::{AppError, Result};
use crate::notify::{Message, NotificationSink, Target};

const TRADE_BUTTON_TEXT: &str = "Trade Now 🚀";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub first_name: String,
    pub last_name: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: Value,
    text: &'a str,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<Value>,
}

pub struct TelegramClient {
    client: reqwest::Client,
    /// `{api}/bot{token}`
    base: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, bot_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Long polls hold the request open for COMMAND_POLL_TIMEOUT_SECS.
            .timeout(Duration::from_secs(COMMAND_POLL_TIMEOUT_SECS + 10))
            .build()?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), bot_token),
        })
    }

    /// Send an HTML message, optionally with a single URL button.
    pub async fn send_message(
        &self,
        chat_id: Value,
        text: &str,
        button_url: Option<&str>,
    ) -> Result<()> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: "HTML",
            reply_markup: button_url.map(|url| {
                json!({ "inline_keyboard": [[{ "text": TRADE_BUTTON_TEXT, "url": url }]] })
            }),
        };
        let resp: ApiResponse<Value> = self
            .client
            .post(format!("{}/sendMessage", self.base))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        check(resp).map(|_| ())
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let resp: ApiResponse<Vec<Update>> = self
            .client
            .get(format!("{}/getUpdates", self.base))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", COMMAND_POLL_TIMEOUT_SECS.to_string()),
                ("allowed_updates", r#"["message"]"#.to_string()),
            ])
            .send()
            .await?
            .json()
            .await?;
        let updates = check(resp)?;
        debug!(count = updates.len(), "Received bot updates");
        Ok(updates)
    }
}

fn check<T: Default>(resp: ApiResponse<T>) -> Result<T> {
    if resp.ok {
        Ok(resp.result.unwrap_or_default())
    } else {
        Err(AppError::Telegram(
            resp.description.unwrap_or_else(|| "request rejected".to_string()),
        ))
    }
}

/// Channel ids are usernames or numeric strings; chats are numbers.
fn chat_id_value(target: &Target) -> Value {
    match target {
        Target::Channel(c) => Value::String(c.clone()),
        Target::Chat(id) => json!(id),
    }
}

#[async_trait]
impl NotificationSink for TelegramClient {
    async fn send(&self, target: &Target, message: &Message) -> Result<()> {
        self.send_message(chat_id_value(target), &message.body, Some(&message.action_url))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_response_becomes_error() {
        let resp: ApiResponse<Value> =
            serde_json::from_str(r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#)
                .unwrap();
        match check(resp) {
            Err(AppError::Telegram(msg)) => assert!(msg.contains("blocked")),
            other => panic!("expected Telegram error, got {other:?}"),
        }
    }

    #[test]
    fn decodes_updates() {
        let raw = r#"{"ok":true,"result":[
            {"update_id":10,"message":{"message_id":1,"chat":{"id":555,"type":"private"},
             "from":{"id":555,"is_bot":false,"first_name":"Ada","last_name":"L"},"text":"/start"}},
            {"update_id":11,"edited_message":{"message_id":1,"chat":{"id":555}}}
        ]}"#;
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        let updates = check(resp).unwrap();
        assert_eq!(updates.len(), 2);
        let msg = updates[0].message.as_ref().unwrap();
        assert_eq!(msg.chat.id, 555);
        assert_eq!(msg.from.as_ref().unwrap().full_name(), "Ada L");
        assert!(updates[1].message.is_none());
    }

    #[test]
    fn chat_ids_keep_their_json_type() {
        assert_eq!(chat_id_value(&Target::Channel("@news".to_string())), json!("@news"));
        assert_eq!(chat_id_value(&Target::Chat(-100123)), json!(-100123));
    }
}
