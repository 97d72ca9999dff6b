//! Processor test harness: recording gateway and in-memory store

use super::{Payload, Processor};
use crate::channels::mock::RecordingGateway;
use crate::channels::{Callback, Event};
use crate::error::Result;
use crate::session::{Operation, SessionManager};
use crate::storage::{AccessGrant, Folder, SqliteStorage, Storage};
use std::sync::Arc;

pub(crate) struct Harness {
    pub processor: Processor,
    pub gateway: Arc<RecordingGateway>,
    pub storage: Arc<SqliteStorage>,
}

pub(crate) fn username(user: i64) -> String {
    format!("user{}", user)
}

impl Harness {
    pub fn new() -> Self {
        Self::with_admin_chat_id(None)
    }

    pub fn with_admin_chat(chat_id: i64) -> Self {
        Self::with_admin_chat_id(Some(chat_id))
    }

    fn with_admin_chat_id(chat_id: Option<i64>) -> Self {
        let gateway = Arc::new(RecordingGateway::new());
        let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
        let processor = Processor::new(
            gateway.clone(),
            storage.clone(),
            Arc::new(SessionManager::new()),
        )
        .with_admin_chat(chat_id);

        Self {
            processor,
            gateway,
            storage,
        }
    }

    /// User sends a text message in their private chat
    pub async fn say(&self, user: i64, text: &str) -> Result<()> {
        self.processor
            .process(&Event::message(user, user, username(user), text))
            .await
    }

    /// User presses a button with raw callback data on their last menu
    pub async fn tap_raw(&self, user: i64, data: &str) -> Result<()> {
        let message_id = self.gateway.last_menu(user).map(|(id, _)| id);
        let callback = Callback {
            id: format!("cb-{}", user),
            data: data.to_string(),
            message_id,
        };
        self.processor
            .process(&Event::callback(user, user, username(user), callback))
            .await
    }

    pub async fn tap(&self, user: i64, payload: Payload) -> Result<()> {
        self.tap_raw(user, &payload.encode()).await
    }

    /// User presses the button with this label on their last menu
    pub async fn tap_label(&self, user: i64, label: &str) -> Result<()> {
        let (_, buttons) = self
            .gateway
            .last_menu(user)
            .unwrap_or_else(|| panic!("user {} has no menu", user));
        let button = buttons
            .iter()
            .find(|b| b.label == label)
            .unwrap_or_else(|| panic!("no button '{}' in {:?}", label, buttons));
        self.tap_raw(user, &button.data).await
    }

    pub fn last(&self, user: i64) -> String {
        self.gateway.last_text(user).unwrap_or_default()
    }

    pub fn labels(&self, user: i64) -> Vec<String> {
        self.gateway
            .last_menu(user)
            .map(|(_, buttons)| buttons.into_iter().map(|b| b.label).collect())
            .unwrap_or_default()
    }

    pub async fn operation(&self, user: i64) -> Operation {
        self.processor
            .sessions()
            .snapshot(user)
            .await
            .map(|s| s.operation)
            .unwrap_or(Operation::Idle)
    }

    /// Create a folder directly in the store
    pub async fn create_folder(&self, owner: i64, name: &str) -> String {
        let folder = Folder {
            id: Folder::generate_id(),
            name: name.to_string(),
            owner_id: owner,
        };
        self.storage
            .add_folder(&AccessGrant::owner(&folder, username(owner)))
            .await
            .unwrap();
        folder.id
    }

    pub async fn folder_id(&self, user: i64, name: &str) -> String {
        self.storage
            .list_folders(user)
            .await
            .unwrap()
            .into_iter()
            .find(|f| f.name == name)
            .map(|f| f.id)
            .unwrap_or_else(|| panic!("user {} has no folder '{}'", user, name))
    }
}
