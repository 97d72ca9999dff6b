//! Telegram channel adapter

use super::adapter::{Button, Callback, ChatGateway, Event, UpdateSource};
use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Telegram Bot API adapter: long polling in, JSON requests out
pub struct TelegramAdapter {
    base_url: String,
    poll_timeout_secs: u64,
    client: reqwest::Client,
    /// Next `getUpdates` offset
    offset: AtomicI64,
}

impl TelegramAdapter {
    /// Create a new Telegram adapter
    pub fn new(config: &TelegramConfig, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: format!("https://{}/bot{}", config.api_host, token),
            poll_timeout_secs: config.poll_timeout_secs,
            client,
            offset: AtomicI64::new(0),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram {} request failed: {}", method, e)))?;

        let result: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Channel(format!("Failed to parse Telegram {} response: {}", method, e)))?;

        result.into_result(method)
    }
}

#[async_trait]
impl ChatGateway for TelegramAdapter {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        tracing::debug!("Sending message to Telegram chat {}", chat_id);

        let _: SentMessage = self
            .call("sendMessage", &SendMessageRequest::new(chat_id, text, None))
            .await?;
        Ok(())
    }

    async fn send_interactive(&self, chat_id: i64, text: &str, buttons: &[Button]) -> Result<i64> {
        tracing::debug!(
            "Sending message with {} buttons to Telegram chat {}",
            buttons.len(),
            chat_id
        );

        let markup = InlineKeyboardMarkup::one_per_row(buttons);
        let sent: SentMessage = self
            .call("sendMessage", &SendMessageRequest::new(chat_id, text, Some(markup)))
            .await?;
        Ok(sent.message_id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        tracing::debug!(
            "Deleting Telegram message {} in chat {}",
            message_id,
            chat_id
        );

        let _: bool = self
            .call(
                "deleteMessage",
                &serde_json::json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &serde_json::json!({ "callback_query_id": callback_id }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for TelegramAdapter {
    async fn fetch(&self, limit: usize) -> Result<Vec<Event>> {
        let request = GetUpdatesRequest {
            offset: self.offset.load(Ordering::SeqCst),
            limit,
            timeout: self.poll_timeout_secs,
            allowed_updates: &["message", "callback_query"],
        };
        let updates: Vec<Update> = self.call("getUpdates", &request).await?;

        // Skipped updates advance the offset too
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset.store(last + 1, Ordering::SeqCst);
        }

        Ok(updates.into_iter().filter_map(Update::into_event).collect())
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(Error::Channel(format!(
                "Telegram {} error: {}",
                method,
                self.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest<'a> {
    offset: i64,
    limit: usize,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup>,
}

impl<'a> SendMessageRequest<'a> {
    fn new(chat_id: i64, text: &'a str, reply_markup: Option<InlineKeyboardMarkup>) -> Self {
        Self {
            chat_id,
            text,
            parse_mode: "HTML",
            reply_markup,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct InlineKeyboardMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    fn one_per_row(buttons: &[Button]) -> Self {
        Self {
            inline_keyboard: buttons
                .iter()
                .map(|b| {
                    vec![InlineKeyboardButton {
                        text: b.label.clone(),
                        callback_data: b.data.clone(),
                    }]
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct InlineKeyboardButton {
    text: String,
    callback_data: String,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<IncomingMessage>,
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    message_id: i64,
    from: Option<User>,
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    message: Option<IncomingMessage>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    username: Option<String>,
    #[serde(default)]
    first_name: String,
}

impl User {
    fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| self.first_name.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

impl Update {
    /// Text messages and button presses; everything else is dropped
    fn into_event(self) -> Option<Event> {
        let update_id = self.update_id;

        if let Some(query) = self.callback_query {
            let data = query.data?;
            let (chat_id, text, message_id) = match query.message {
                Some(m) => (m.chat.id, m.text.unwrap_or_default(), Some(m.message_id)),
                None => (query.from.id, String::new(), None),
            };
            return Some(Event {
                update_id,
                chat_id,
                user_id: query.from.id,
                username: query.from.display_name(),
                text,
                callback: Some(Callback {
                    id: query.id,
                    data,
                    message_id,
                }),
            });
        }

        let message = self.message?;
        let from = message.from?;
        Some(Event {
            update_id,
            chat_id: message.chat.id,
            user_id: from.id,
            username: from.display_name(),
            text: message.text?,
            callback: None,
        })
    }
}
