//! Recording gateway for tests

use super::{Button, ChatGateway};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message {
        chat_id: i64,
        text: String,
    },
    Interactive {
        chat_id: i64,
        message_id: i64,
        text: String,
        buttons: Vec<Button>,
    },
    Deleted {
        chat_id: i64,
        message_id: i64,
    },
    Answered(String),
}

/// Records everything sent through it
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    fail_delete: AtomicBool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Texts of plain and interactive messages sent to a chat
    pub fn texts(&self, chat: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Message { chat_id, text } if chat_id == chat => Some(text),
                Sent::Interactive { chat_id, text, .. } if chat_id == chat => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self, chat: i64) -> Option<String> {
        self.texts(chat).pop()
    }

    /// The most recent interactive message sent to a chat
    pub fn last_menu(&self, chat: i64) -> Option<(i64, Vec<Button>)> {
        self.sent().into_iter().rev().find_map(|s| match s {
            Sent::Interactive {
                chat_id,
                message_id,
                buttons,
                ..
            } if chat_id == chat => Some((message_id, buttons)),
            _ => None,
        })
    }

    pub fn deleted(&self) -> Vec<i64> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Deleted { message_id, .. } => Some(message_id),
                _ => None,
            })
            .collect()
    }

    pub fn answered(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Answered(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        self.record(Sent::Message {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_interactive(&self, chat_id: i64, text: &str, buttons: &[Button]) -> Result<i64> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(Sent::Interactive {
            chat_id,
            message_id,
            text: text.to_string(),
            buttons: buttons.to_vec(),
        });
        Ok(message_id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::Channel("message to delete not found".to_string()));
        }
        self.record(Sent::Deleted {
            chat_id,
            message_id,
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.record(Sent::Answered(callback_id.to_string()));
        Ok(())
    }
}
