//! Folder flows: create, rename, show, delete, leave

use super::payload::Payload;
use super::{messages, pending_folder, Outcome, Processor};
use crate::access::{AccessLevel, Requirement};
use crate::channels::{Button, Event};
use crate::error::{Result, ResultExt};
use crate::session::{Operation, Session};
use crate::storage::{AccessGrant, Folder, StorageError};

impl Processor {
    /// Open an operation that starts with a folder choice
    pub(super) async fn open_folder_choice(
        &self,
        session: &mut Session,
        event: &Event,
        operation: Operation,
    ) -> Result<Outcome> {
        session.pending_folder_id = None;
        session.begin(operation);
        self.choose_folder(session, event).await
    }

    /// Menu of the user's folders
    pub(super) async fn choose_folder(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        let folders = match self.storage.list_folders(event.user_id).await {
            Ok(folders) => folders,
            Err(StorageError::NoFolders) => {
                self.send(event.chat_id, messages::NO_FOLDERS).await?;
                return Ok(Outcome::Empty);
            }
            Err(e) => return Err(e).context("can't list folders"),
        };

        let buttons: Vec<Button> = folders
            .iter()
            .map(|f| {
                Button::new(
                    messages::folder_label(f),
                    Payload::Folder(f.id.clone()).encode(),
                )
            })
            .collect();
        self.send_menu(session, event.chat_id, messages::CHOOSE_FOLDER, &buttons)
            .await?;
        Ok(Outcome::Continue)
    }

    pub(super) async fn create_folder(
        &self,
        session: &mut Session,
        event: &Event,
        name: &str,
    ) -> Result<Outcome> {
        session.finishing();
        let folder = Folder {
            id: Folder::generate_id(),
            name: name.to_string(),
            owner_id: event.user_id,
        };
        self.storage
            .add_folder(&AccessGrant::owner(&folder, &event.username))
            .await
            .context("can't create folder")?;

        tracing::debug!("User {} created folder {}", event.user_id, folder.id);
        self.send(event.chat_id, messages::FOLDER_CREATED).await?;
        Ok(Outcome::Complete)
    }

    pub(super) async fn rename_folder(
        &self,
        session: &mut Session,
        event: &Event,
        name: &str,
    ) -> Result<Outcome> {
        session.finishing();
        let folder_id = pending_folder(session)?;
        if !self.authorize(event, &folder_id, Requirement::Edit).await? {
            return Ok(Outcome::Complete);
        }

        self.storage
            .rename_folder(&folder_id, name)
            .await
            .context("can't rename folder")?;
        self.send(event.chat_id, messages::FOLDER_RENAMED).await?;
        Ok(Outcome::Complete)
    }

    pub(super) async fn show_folder(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        session.finishing();
        let folder_id = pending_folder(session)?;
        if !self.authorize(event, &folder_id, Requirement::Read).await? {
            return Ok(Outcome::Complete);
        }

        let urls = self
            .storage
            .list_urls(&folder_id)
            .await
            .context("can't show folder")?;
        if urls.is_empty() {
            self.send(event.chat_id, messages::EMPTY_FOLDER).await?;
            return Ok(Outcome::Empty);
        }
        let tags = self
            .storage
            .list_tags(&folder_id)
            .await
            .context("can't show folder")?;
        let name = self
            .storage
            .folder_name(&folder_id)
            .await
            .context("can't show folder")?;

        self.send(event.chat_id, &messages::folder_contents(&name, &tags, &urls))
            .await?;
        Ok(Outcome::Complete)
    }

    pub(super) async fn delete_folder(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        session.finishing();
        let folder_id = pending_folder(session)?;
        if !self.authorize(event, &folder_id, Requirement::Own).await? {
            return Ok(Outcome::Complete);
        }

        self.storage
            .remove_folder(&folder_id)
            .await
            .context("can't delete folder")?;
        tracing::debug!("User {} deleted folder {}", event.user_id, folder_id);
        self.send(event.chat_id, messages::FOLDER_DELETED).await?;
        Ok(Outcome::Complete)
    }

    /// Drop the user's own grant. Punitive grants stay.
    pub(super) async fn leave_folder(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        session.finishing();
        let folder_id = pending_folder(session)?;
        let level = self
            .access_level(&folder_id, event.user_id)
            .await
            .context("can't leave folder")?;

        let reply = match level {
            AccessLevel::Owner => messages::OWNER_CANNOT_LEAVE,
            AccessLevel::Reader | AccessLevel::Editor => {
                self.storage
                    .delete_access(event.user_id, &folder_id)
                    .await
                    .context("can't leave folder")?;
                messages::FOLDER_LEFT
            }
            _ => messages::INCORRECT_ACCESS,
        };
        self.send(event.chat_id, reply).await?;
        Ok(Outcome::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_create_folder_flow() {
        let h = Harness::new();

        h.say(1, "/create_folder").await.unwrap();
        assert_eq!(h.last(1), messages::ENTER_FOLDER_NAME);
        assert_eq!(h.operation(1).await, Operation::CreateFolder);

        h.say(1, "Reading list").await.unwrap();
        assert_eq!(h.last(1), messages::FOLDER_CREATED);
        assert_eq!(h.operation(1).await, Operation::Idle);

        let folder = h.folder_id(1, "Reading list").await;
        assert_eq!(
            h.storage.access_level(&folder, 1).await.unwrap(),
            AccessLevel::Owner
        );
        assert_eq!(h.storage.owner(&folder).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rename_folder_flow() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;

        h.say(1, "/rename_folder").await.unwrap();
        h.tap_label(1, "Recipes").await.unwrap();
        assert_eq!(h.operation(1).await, Operation::RenameFolder);
        assert_eq!(h.last(1), messages::ENTER_NEW_FOLDER_NAME);

        h.say(1, "Dinner").await.unwrap();
        assert_eq!(h.last(1), messages::FOLDER_RENAMED);
        assert_eq!(h.storage.folder_name(&folder).await.unwrap(), "Dinner");
    }

    #[tokio::test]
    async fn test_folder_menu_lists_shared_folders() {
        let h = Harness::new();
        h.create_folder(1, "Mine").await;
        let theirs = h.create_folder(2, "Theirs").await;
        h.storage
            .add_folder(&AccessGrant::shared(1, &theirs, AccessLevel::Reader, "user1"))
            .await
            .unwrap();

        h.say(1, "/show_folder").await.unwrap();

        assert_eq!(h.labels(1), vec!["Mine", "Theirs (shared)"]);
    }

    #[tokio::test]
    async fn test_delete_folder_flow() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;

        h.say(1, "/delete_folder").await.unwrap();
        h.tap_label(1, "Recipes").await.unwrap();

        assert_eq!(h.last(1), messages::FOLDER_DELETED);
        assert!(matches!(
            h.storage.folder_name(&folder).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_delete_or_rename() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        h.storage
            .add_folder(&AccessGrant::shared(2, &folder, AccessLevel::Reader, "user2"))
            .await
            .unwrap();

        h.say(2, "/delete_folder").await.unwrap();
        h.tap_label(2, "Recipes (shared)").await.unwrap();
        assert_eq!(h.last(2), messages::INCORRECT_ACCESS);
        assert!(h.storage.folder_name(&folder).await.is_ok());

        h.say(2, "/rename_folder").await.unwrap();
        h.tap_label(2, "Recipes (shared)").await.unwrap();
        h.say(2, "Mine now").await.unwrap();
        assert_eq!(h.last(2), messages::INCORRECT_ACCESS);
        assert_eq!(h.storage.folder_name(&folder).await.unwrap(), "Recipes");
        assert_eq!(h.operation(2).await, Operation::Idle);
    }

    #[tokio::test]
    async fn test_leave_folder() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        h.storage
            .add_folder(&AccessGrant::shared(2, &folder, AccessLevel::Editor, "user2"))
            .await
            .unwrap();

        h.say(2, "/leave_folder").await.unwrap();
        h.tap_label(2, "Recipes (shared)").await.unwrap();
        assert_eq!(h.last(2), messages::FOLDER_LEFT);
        assert_eq!(
            h.storage.access_level(&folder, 2).await.unwrap(),
            AccessLevel::Undefined
        );

        h.say(1, "/leave_folder").await.unwrap();
        h.tap_label(1, "Recipes").await.unwrap();
        assert_eq!(h.last(1), messages::OWNER_CANNOT_LEAVE);
        assert_eq!(h.storage.owner(&folder).await.unwrap(), 1);
    }
}
