//! Key management: list, create and delete keys, list members. Owner only.

use super::payload::{MenuAction, Payload};
use super::{messages, pending_folder, Outcome, Processor};
use crate::access::{AccessKey, AccessLevel, Requirement};
use crate::channels::{Button, Event};
use crate::error::{Error, Result, ResultExt};
use crate::session::{Operation, Session};
use crate::storage::StorageError;

fn back_button() -> Button {
    Button::new(messages::BACK, Payload::Menu(MenuAction::Back).encode())
}

impl Processor {
    /// Existing keys of the folder with the key menu
    pub(super) async fn show_keys(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        let folder_id = pending_folder(session)?;
        if !self.authorize(event, &folder_id, Requirement::Own).await? {
            return Ok(Outcome::Complete);
        }

        let mut keys = Vec::new();
        for level in AccessLevel::GRANTABLE {
            match self.storage.get_password(&folder_id, level).await {
                Ok(secret) => keys.push((level, AccessKey::new(&folder_id, secret).encode())),
                Err(StorageError::NoPasswords) => continue,
                Err(e) => return Err(e).context("can't show keys"),
            }
        }

        let buttons = [
            Button::new(messages::CREATE_KEY, Payload::Menu(MenuAction::CreateKey).encode()),
            Button::new(messages::DELETE_KEY, Payload::Menu(MenuAction::DeleteKey).encode()),
            Button::new(messages::MEMBERS, Payload::Menu(MenuAction::Members).encode()),
            back_button(),
        ];
        session.begin(Operation::KeyMenu);
        self.send_menu(session, event.chat_id, &messages::key_list(&keys), &buttons)
            .await?;
        Ok(Outcome::Continue)
    }

    /// Level menu for creating or deleting a key
    pub(super) async fn choose_level(
        &self,
        session: &mut Session,
        event: &Event,
        action: MenuAction,
    ) -> Result<Outcome> {
        let operation = match action {
            MenuAction::CreateKey => Operation::CreateKey,
            MenuAction::DeleteKey => Operation::DeleteKey,
            other => {
                return Err(Error::Internal(format!(
                    "{:?} does not choose a level",
                    other
                )))
            }
        };

        let buttons: Vec<Button> = AccessLevel::GRANTABLE
            .into_iter()
            .map(|level| Button::new(level.name(), Payload::Level(level).encode()))
            .chain(std::iter::once(back_button()))
            .collect();
        session.begin(operation);
        self.send_menu(session, event.chat_id, messages::CHOOSE_LEVEL, &buttons)
            .await?;
        Ok(Outcome::Continue)
    }

    pub(super) async fn create_key(
        &self,
        session: &mut Session,
        event: &Event,
        level: AccessLevel,
    ) -> Result<Outcome> {
        session.finishing();
        if !level.is_grantable() {
            return Err(Error::Payload(format!("no keys are issued for {}", level)));
        }
        let folder_id = pending_folder(session)?;
        if !self.authorize(event, &folder_id, Requirement::Own).await? {
            return Ok(Outcome::Complete);
        }

        let secret = self
            .storage
            .create_password(&folder_id, level)
            .await
            .context("can't create key")?;
        let key = AccessKey::new(&folder_id, secret).encode();
        self.send(event.chat_id, &messages::key_created(level, &key))
            .await?;
        Ok(Outcome::Complete)
    }

    pub(super) async fn delete_key(
        &self,
        session: &mut Session,
        event: &Event,
        level: AccessLevel,
    ) -> Result<Outcome> {
        session.finishing();
        let folder_id = pending_folder(session)?;
        if !self.authorize(event, &folder_id, Requirement::Own).await? {
            return Ok(Outcome::Complete);
        }

        let reply = match self.storage.delete_password(&folder_id, level).await {
            Ok(()) => messages::KEY_DELETED,
            Err(StorageError::NoPasswords) => messages::NO_SUCH_KEY,
            Err(e) => return Err(e).context("can't delete key"),
        };
        self.send(event.chat_id, reply).await?;
        Ok(Outcome::Complete)
    }

    pub(super) async fn show_members(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        session.finishing();
        let folder_id = pending_folder(session)?;
        if !self.authorize(event, &folder_id, Requirement::Own).await? {
            return Ok(Outcome::Complete);
        }

        let members = self
            .storage
            .list_members(&folder_id)
            .await
            .context("can't list members")?;
        let name = self
            .storage
            .folder_name(&folder_id)
            .await
            .context("can't list members")?;
        self.send(event.chat_id, &messages::member_list(&name, &members))
            .await?;
        Ok(Outcome::Complete)
    }
}
