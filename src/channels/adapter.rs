//! Chat gateway seam

use crate::error::Result;
use async_trait::async_trait;

/// An inline button: what the user sees and what comes back when tapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// A button press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    /// Id used to acknowledge the press
    pub id: String,
    pub data: String,
    /// Message the pressed button was attached to
    pub message_id: Option<i64>,
}

/// Inbound event from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub update_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub username: String,
    /// Message text; for callbacks, the text of the message the button was on
    pub text: String,
    pub callback: Option<Callback>,
}

impl Event {
    /// Plain text message
    pub fn message(chat_id: i64, user_id: i64, username: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            update_id: 0,
            chat_id,
            user_id,
            username: username.into(),
            text: text.into(),
            callback: None,
        }
    }

    /// Button press
    pub fn callback(
        chat_id: i64,
        user_id: i64,
        username: impl Into<String>,
        callback: Callback,
    ) -> Self {
        Self {
            update_id: 0,
            chat_id,
            user_id,
            username: username.into(),
            text: String::new(),
            callback: Some(callback),
        }
    }

    pub fn is_callback(&self) -> bool {
        self.callback.is_some()
    }
}

/// Outbound side of a chat platform
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Platform name
    fn name(&self) -> &str;

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Send a message with one button per row, returning its message id
    async fn send_interactive(&self, chat_id: i64, text: &str, buttons: &[Button]) -> Result<i64>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;

    /// Clear the loading indicator of a button press
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}

/// Inbound side of a chat platform
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Next batch of events, in arrival order. May be empty.
    async fn fetch(&self, limit: usize) -> Result<Vec<Event>>;
}
