//! Conversation state machine
//!
//! The processor classifies every inbound [`Event`] and drives the user's
//! [`Session`] through the operation graph:
//!
//! ```text
//!   text ──► URL ──► ChooseTag ──► SaveLink ──► save page
//!        ──► KEY… ─► redeem key ──► (owner confirmation)
//!        ──► /cmd ─► folder choice ──► terminal action
//!        ──► text ─► input for the open operation
//!
//!   button ──► access answer (no session)
//!          ──► delete stale menu ──► payload for the open operation
//! ```
//!
//! Each flow step returns an [`Outcome`]. `Continue` keeps the operation
//! open, `Complete` and `Empty` close it, and an error closes it and is
//! propagated to the caller. Authorization is checked at the terminal step,
//! right before the store mutation it guards.

mod access;
mod command;
mod folders;
mod keys;
pub mod messages;
mod pages;
pub mod payload;
#[cfg(test)]
pub(crate) mod testing;

pub use command::{Command, Input};
pub use payload::{AccessProposal, MenuAction, Payload, Verdict};

use crate::access::{AccessKey, AccessLevel, Requirement};
use crate::channels::{Button, Callback, ChatGateway, Event};
use crate::error::{Error, Result, ResultExt};
use crate::session::{Expects, Operation, Session, SessionManager};
use crate::storage::Storage;
use std::sync::Arc;

/// Maximum tag length in bytes; a tag must fit a callback payload
pub const MAX_TAG_LEN: usize = 60;

/// How a flow step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Waiting for more input
    Continue,
    /// Terminal step done
    Complete,
    /// Nothing to act on (no folders, empty folder, no saved pages)
    Empty,
}

/// Event processor
pub struct Processor {
    gateway: Arc<dyn ChatGateway>,
    storage: Arc<dyn Storage>,
    sessions: Arc<SessionManager>,
    admin_chat_id: Option<i64>,
}

impl Processor {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        storage: Arc<dyn Storage>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            gateway,
            storage,
            sessions,
            admin_chat_id: None,
        }
    }

    /// Chat that receives `/feedback` messages
    pub fn with_admin_chat(mut self, chat_id: Option<i64>) -> Self {
        self.admin_chat_id = chat_id;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Process one event. Events of the same user are serialized.
    pub async fn process(&self, event: &Event) -> Result<()> {
        tracing::debug!(
            "Processing {} from user {}",
            if event.is_callback() { "callback" } else { "message" },
            event.user_id
        );

        if let Some(callback) = &event.callback {
            if Payload::is_access(&callback.data) {
                return self.handle_access_answer(event, callback).await;
            }
        }

        let mut session = self.sessions.acquire(event.user_id).await;
        let result = match &event.callback {
            Some(callback) => self.handle_callback(&mut session, event, callback).await,
            None => self.handle_text(&mut session, event).await,
        };
        settle(&mut session, result)
    }

    /// Close whatever the user has open, e.g. after a step overran its deadline
    pub async fn reset_session(&self, user_id: i64) {
        self.sessions.acquire(user_id).await.reset();
    }

    async fn handle_text(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        let text = event.text.trim();
        tracing::debug!("Got '{}' from user {}", text, event.user_id);

        match Input::classify(text) {
            Input::Url(url) => self.start_save(session, event, url).await,
            Input::Key(key) => self.redeem_key(event, key).await,
            Input::Cancel => self.cancel(session, event).await,
            Input::UnknownCommand => {
                self.send(event.chat_id, messages::UNKNOWN_COMMAND).await?;
                Ok(Outcome::Continue)
            }
            Input::Command(command) => self.start_command(session, event, command).await,
            Input::Text(text) => self.handle_free_text(session, event, text).await,
        }
    }

    async fn start_command(
        &self,
        session: &mut Session,
        event: &Event,
        command: Command,
    ) -> Result<Outcome> {
        match command {
            Command::Start | Command::Help => {
                session.begin(Operation::ShowHelp);
                let text = if command == Command::Start {
                    messages::HELLO
                } else {
                    messages::HELP
                };
                self.send(event.chat_id, text).await?;
                Ok(Outcome::Complete)
            }
            Command::Random => {
                session.reset();
                self.send_random(event).await
            }
            Command::CreateFolder => {
                session.begin(Operation::CreateFolder);
                self.send(event.chat_id, messages::ENTER_FOLDER_NAME).await?;
                Ok(Outcome::Continue)
            }
            Command::RenameFolder => {
                self.open_folder_choice(session, event, Operation::ChooseFolderForRename)
                    .await
            }
            Command::ShowFolder => {
                self.open_folder_choice(session, event, Operation::ShowFolder)
                    .await
            }
            Command::DeleteFolder => {
                self.open_folder_choice(session, event, Operation::DeleteFolder)
                    .await
            }
            Command::LeaveFolder => {
                self.open_folder_choice(session, event, Operation::LeaveFolder)
                    .await
            }
            Command::DeleteLink => {
                self.open_folder_choice(session, event, Operation::ChooseFolderForLinkDeletion)
                    .await
            }
            Command::Keys => {
                self.open_folder_choice(session, event, Operation::KeyMenu)
                    .await
            }
            Command::Feedback => {
                session.begin(Operation::Feedback);
                self.send(event.chat_id, messages::ENTER_FEEDBACK).await?;
                Ok(Outcome::Continue)
            }
            Command::Cancel => self.cancel(session, event).await,
        }
    }

    async fn handle_free_text(
        &self,
        session: &mut Session,
        event: &Event,
        text: &str,
    ) -> Result<Outcome> {
        match session.operation {
            Operation::Idle if AccessKey::is_key_like(text) => {
                self.send(event.chat_id, messages::INVALID_KEY).await?;
                Ok(Outcome::Complete)
            }
            operation if text.is_empty() => {
                self.send(event.chat_id, &messages::unexpected_input(operation))
                    .await?;
                Ok(Outcome::Continue)
            }
            Operation::CreateFolder => self.create_folder(session, event, text).await,
            Operation::RenameFolder => self.rename_folder(session, event, text).await,
            Operation::ChooseTag => self.accept_tag(session, event, text).await,
            Operation::Feedback => self.forward_feedback(session, event, text).await,
            operation => {
                self.send(event.chat_id, &messages::unexpected_input(operation))
                    .await?;
                Ok(Outcome::Continue)
            }
        }
    }

    async fn cancel(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        let text = if session.is_idle() {
            messages::NO_CURRENT_OPERATION
        } else {
            messages::OPERATION_CANCELLED
        };
        self.send(event.chat_id, text).await?;
        Ok(Outcome::Complete)
    }

    async fn handle_callback(
        &self,
        session: &mut Session,
        event: &Event,
        callback: &Callback,
    ) -> Result<Outcome> {
        self.acknowledge(callback).await;

        // The pressed menu goes away before anything else happens
        if let Some(message_id) = callback.message_id.or(session.last_message_id) {
            self.gateway
                .delete_message(event.chat_id, message_id)
                .await
                .context("can't delete menu")?;
            if session.last_message_id == Some(message_id) {
                session.last_message_id = None;
            }
        }

        let payload = match Payload::decode(&callback.data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("Ignoring callback from user {}: {}", event.user_id, e);
                self.send(event.chat_id, messages::MENU_EXPIRED).await?;
                return Ok(Outcome::Continue);
            }
        };

        let operation = session.operation;
        match payload {
            Payload::Menu(MenuAction::Back) => self.go_back(session, event).await,
            Payload::Menu(MenuAction::WithoutTag) if operation == Operation::ChooseTag => {
                self.accept_url_as_tag(session, event).await
            }
            Payload::Menu(action @ (MenuAction::CreateKey | MenuAction::DeleteKey))
                if operation == Operation::KeyMenu =>
            {
                self.choose_level(session, event, action).await
            }
            Payload::Menu(MenuAction::Members) if operation == Operation::KeyMenu => {
                self.show_members(session, event).await
            }
            Payload::Level(level) if operation == Operation::CreateKey => {
                self.create_key(session, event, level).await
            }
            Payload::Level(level) if operation == Operation::DeleteKey => {
                self.delete_key(session, event, level).await
            }
            Payload::Folder(folder_id)
                if operation.expects() == Expects::FolderChoice
                    || operation == Operation::KeyMenu =>
            {
                session.pending_folder_id = Some(folder_id);
                self.folder_chosen(session, event).await
            }
            Payload::Tag(tag) if operation == Operation::DeleteLink => {
                session.pending_tag = Some(tag);
                self.delete_link(session, event).await
            }
            payload => {
                tracing::debug!(
                    "Stale button {:?} pressed by user {} during {:?}",
                    payload,
                    event.user_id,
                    operation
                );
                self.send(event.chat_id, messages::MENU_EXPIRED).await?;
                Ok(Outcome::Continue)
            }
        }
    }

    /// Route a folder button to the step the open operation continues with
    async fn folder_chosen(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        match session.operation {
            Operation::ChooseFolderForRename => {
                session.begin(Operation::RenameFolder);
                self.send(event.chat_id, messages::ENTER_NEW_FOLDER_NAME)
                    .await?;
                Ok(Outcome::Continue)
            }
            Operation::ShowFolder => self.show_folder(session, event).await,
            Operation::DeleteFolder => self.delete_folder(session, event).await,
            Operation::LeaveFolder => self.leave_folder(session, event).await,
            Operation::ChooseFolderForLinkDeletion => self.choose_link(session, event).await,
            Operation::SaveLink => self.save_page(session, event).await,
            Operation::KeyMenu => self.show_keys(session, event).await,
            operation => Err(Error::Internal(format!(
                "folder chosen during {:?}",
                operation
            ))),
        }
    }

    /// Step back one screen in key management
    async fn go_back(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        let from = session.operation;
        let to = from.back();
        match from {
            Operation::CreateKey | Operation::DeleteKey => {
                session.begin(to);
                self.show_keys(session, event).await
            }
            Operation::KeyMenu => {
                session.begin(to);
                session.pending_folder_id = None;
                self.choose_folder(session, event).await
            }
            _ => Ok(Outcome::Continue),
        }
    }

    async fn forward_feedback(
        &self,
        session: &mut Session,
        event: &Event,
        text: &str,
    ) -> Result<Outcome> {
        session.finishing();
        match self.admin_chat_id {
            Some(chat_id) => self
                .gateway
                .send_message(
                    chat_id,
                    &messages::feedback(&event.username, event.user_id, text),
                )
                .await
                .context("can't forward feedback")?,
            None => tracing::info!("Feedback from user {}: {}", event.user_id, text),
        }
        self.send(event.chat_id, messages::THANKS_FOR_FEEDBACK)
            .await?;
        Ok(Outcome::Complete)
    }

    /// Check the user's level on the folder; on refusal tell them and return false
    async fn authorize(
        &self,
        event: &Event,
        folder_id: &str,
        requirement: Requirement,
    ) -> Result<bool> {
        let level = self
            .storage
            .access_level(folder_id, event.user_id)
            .await
            .context("can't check access level")?;
        if requirement.permits(level) {
            return Ok(true);
        }

        tracing::debug!(
            "User {} with {} access refused {:?} on folder {}",
            event.user_id,
            level,
            requirement,
            folder_id
        );
        self.send(event.chat_id, messages::INCORRECT_ACCESS).await?;
        Ok(false)
    }

    async fn access_level(&self, folder_id: &str, user_id: i64) -> Result<AccessLevel> {
        Ok(self.storage.access_level(folder_id, user_id).await?)
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        self.gateway.send_message(chat_id, text).await
    }

    /// Send a menu and remember it as the user's last interactive message
    async fn send_menu(
        &self,
        session: &mut Session,
        chat_id: i64,
        text: &str,
        buttons: &[Button],
    ) -> Result<()> {
        let message_id = self.gateway.send_interactive(chat_id, text, buttons).await?;
        session.last_message_id = Some(message_id);
        Ok(())
    }

    /// Remove the user's last menu, if any. Failures are only logged.
    async fn discard_menu(&self, session: &mut Session, chat_id: i64) {
        if let Some(message_id) = session.last_message_id.take() {
            if let Err(e) = self.gateway.delete_message(chat_id, message_id).await {
                tracing::warn!("Failed to delete menu {}: {}", message_id, e);
            }
        }
    }

    /// Send without failing the step
    async fn notify(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.gateway.send_message(chat_id, text).await {
            tracing::warn!("Failed to notify chat {}: {}", chat_id, e);
        }
    }

    async fn acknowledge(&self, callback: &Callback) {
        if let Err(e) = self.gateway.answer_callback(&callback.id).await {
            tracing::warn!("Failed to answer callback {}: {}", callback.id, e);
        }
    }
}

/// The folder the open flow works on
fn pending_folder(session: &Session) -> Result<String> {
    session
        .pending_folder_id
        .clone()
        .ok_or_else(|| Error::Internal(format!("no folder selected for {:?}", session.operation)))
}

/// Apply a step's outcome to the session
fn settle(session: &mut Session, result: Result<Outcome>) -> Result<()> {
    match result {
        Ok(Outcome::Continue) => Ok(()),
        Ok(Outcome::Complete) => {
            session.reset();
            Ok(())
        }
        Ok(Outcome::Empty) => {
            tracing::debug!(
                "Nothing to act on for user {} during {:?}",
                session.user_id,
                session.operation
            );
            session.reset();
            Ok(())
        }
        Err(e) => {
            tracing::debug!(
                "Aborting {:?} ({:?}) for user {}",
                session.operation,
                session.status,
                session.user_id
            );
            session.reset();
            Err(e)
        }
    }
}
