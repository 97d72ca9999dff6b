//! Key redemption and the owner's confirmation

use super::payload::{AccessProposal, Payload, Verdict};
use super::{messages, Outcome, Processor};
use crate::access::{AccessKey, AccessLevel};
use crate::channels::{Button, Callback, Event};
use crate::error::{Error, Result, ResultExt};
use crate::storage::{AccessGrant, StorageError};

impl Processor {
    /// A user presented a key
    pub(super) async fn redeem_key(&self, event: &Event, text: &str) -> Result<Outcome> {
        let key = match AccessKey::decode(text) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!("Rejected key from user {}: {}", event.user_id, e);
                self.send(event.chat_id, messages::INVALID_KEY).await?;
                return Ok(Outcome::Complete);
            }
        };

        let current = self
            .access_level(&key.folder_id, event.user_id)
            .await
            .context("can't check key")?;
        match current {
            AccessLevel::Owner => {
                self.send(event.chat_id, messages::KEY_OWNER).await?;
                return Ok(Outcome::Complete);
            }
            AccessLevel::Banned => {
                self.send(event.chat_id, messages::KEY_BANNED).await?;
                return Ok(Outcome::Complete);
            }
            _ => {}
        }

        let level = match self.storage.resolve_level(&key.folder_id, &key.secret).await {
            Ok(level) => level,
            Err(StorageError::NotFound) => {
                tracing::debug!(
                    "Unknown key for folder {} from user {}",
                    key.folder_id,
                    event.user_id
                );
                self.send(event.chat_id, messages::INVALID_KEY).await?;
                return Ok(Outcome::Complete);
            }
            Err(e) => return Err(e).context("can't check key"),
        };

        if current >= AccessLevel::Reader && level <= current {
            self.send(event.chat_id, messages::ALREADY_MEMBER).await?;
            return Ok(Outcome::Complete);
        }

        let folder_name = self
            .storage
            .folder_name(&key.folder_id)
            .await
            .context("can't check key")?;

        // Reader keys need no confirmation, unless the user is already under suspicion
        if level == AccessLevel::Reader && current == AccessLevel::Undefined {
            self.storage
                .add_folder(&AccessGrant::shared(
                    event.user_id,
                    &key.folder_id,
                    level,
                    &event.username,
                ))
                .await
                .context("can't add shared folder")?;
            tracing::info!(
                "User {} joined folder {} as {}",
                event.user_id,
                key.folder_id,
                level
            );
            self.send(event.chat_id, &messages::folder_added(&folder_name))
                .await?;
            return Ok(Outcome::Complete);
        }

        self.request_confirmation(event, &key.folder_id, &folder_name, level)
            .await
    }

    /// Ask the owner to approve with Yes/No buttons
    async fn request_confirmation(
        &self,
        event: &Event,
        folder_id: &str,
        folder_name: &str,
        level: AccessLevel,
    ) -> Result<Outcome> {
        let owner = self
            .storage
            .owner(folder_id)
            .await
            .context("can't request access")?;

        let approve = AccessProposal {
            folder_id: folder_id.to_string(),
            user_id: event.user_id,
            verdict: Verdict::Grant(level),
            username: event.username.clone(),
        };
        let reject = AccessProposal {
            verdict: Verdict::Reject,
            ..approve.clone()
        };
        let buttons = [
            Button::new(messages::YES, Payload::Access(approve).encode()),
            Button::new(messages::NO, Payload::Access(reject).encode()),
        ];

        self.gateway
            .send_interactive(
                owner,
                &messages::confirm_access(&event.username, folder_name, level),
                &buttons,
            )
            .await
            .context("can't request access")?;
        self.send(event.chat_id, messages::REQUEST_SENT).await?;
        Ok(Outcome::Complete)
    }

    /// The owner pressed Yes or No on a confirmation
    pub(super) async fn handle_access_answer(&self, event: &Event, callback: &Callback) -> Result<()> {
        self.acknowledge(callback).await;
        self.set_access(event, callback)
            .await
            .context("can't set access")
    }

    async fn set_access(&self, event: &Event, callback: &Callback) -> Result<()> {
        let proposal = match Payload::decode(&callback.data)? {
            Payload::Access(proposal) => proposal,
            other => {
                return Err(Error::Payload(format!(
                    "expected an access answer, got {:?}",
                    other
                )))
            }
        };
        if let Verdict::Grant(level @ (AccessLevel::Owner | AccessLevel::Undefined)) =
            proposal.verdict
        {
            return Err(Error::Payload(format!("{} can't be granted", level)));
        }

        let owner = match self.storage.owner(&proposal.folder_id).await {
            Ok(owner) => owner,
            Err(StorageError::NotFound) => {
                self.send(event.chat_id, messages::MENU_EXPIRED).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        if owner != event.user_id {
            tracing::warn!(
                "User {} answered an access request for folder {} they don't own",
                event.user_id,
                proposal.folder_id
            );
            return Ok(());
        }

        if let Some(message_id) = callback.message_id {
            self.gateway
                .delete_message(event.chat_id, message_id)
                .await
                .context("can't delete confirmation")?;
        }

        let current = self
            .access_level(&proposal.folder_id, proposal.user_id)
            .await?;
        match current {
            AccessLevel::Banned => {
                self.send(event.chat_id, messages::USER_BLOCKED).await?;
                return Ok(());
            }
            AccessLevel::Owner => {
                return Err(Error::Payload(
                    "the owner's own access can't change".to_string(),
                ))
            }
            _ => {}
        }

        // Rejection demotes from the level held when the answer arrives
        let level = match proposal.verdict {
            Verdict::Grant(level) => level,
            Verdict::Reject => current.demoted(),
        };

        match self
            .storage
            .delete_access(proposal.user_id, &proposal.folder_id)
            .await
        {
            Ok(()) | Err(StorageError::NoRows) => {}
            Err(e) => return Err(e.into()),
        }
        self.storage
            .add_folder(&AccessGrant::shared(
                proposal.user_id,
                &proposal.folder_id,
                level,
                &proposal.username,
            ))
            .await?;
        tracing::info!(
            "User {} set to {} on folder {}",
            proposal.user_id,
            level,
            proposal.folder_id
        );

        let folder_name = self.storage.folder_name(&proposal.folder_id).await?;
        match level {
            AccessLevel::Suspected => {
                self.notify(event.chat_id, messages::OWNER_NEXT_REJECTION_BLOCKS)
                    .await;
                self.notify(proposal.user_id, messages::ACCESS_DENIED).await;
            }
            AccessLevel::Banned => {
                self.notify(event.chat_id, messages::USER_BLOCKED).await;
                self.notify(proposal.user_id, messages::ACCESS_DENIED).await;
            }
            level => {
                self.notify(
                    event.chat_id,
                    &messages::owner_granted(&proposal.username, &folder_name),
                )
                .await;
                self.notify(proposal.user_id, &messages::user_granted(&folder_name, level))
                    .await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::storage::Storage;

    async fn issue_key(h: &Harness, folder: &str, level: AccessLevel) -> String {
        let secret = h.storage.create_password(folder, level).await.unwrap();
        AccessKey::new(folder, secret).encode()
    }

    async fn level_of(h: &Harness, folder: &str, user: i64) -> AccessLevel {
        h.storage.access_level(folder, user).await.unwrap()
    }

    #[tokio::test]
    async fn test_editor_key_scenario() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        let key = issue_key(&h, &folder, AccessLevel::Editor).await;

        // B redeems, owner approves
        h.say(2, &key).await.unwrap();
        assert_eq!(h.last(2), messages::REQUEST_SENT);
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Undefined);
        assert_eq!(h.labels(1), vec![messages::YES, messages::NO]);

        h.tap_label(1, messages::YES).await.unwrap();
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Editor);
        assert!(h.last(2).contains("Editor access to folder 'Recipes'"));
        assert_eq!(h.last(1), messages::owner_granted("user2", "Recipes"));

        // Owner deletes the key; C can't use it
        h.say(1, "/keys").await.unwrap();
        h.tap_label(1, "Recipes").await.unwrap();
        h.tap_label(1, messages::DELETE_KEY).await.unwrap();
        h.tap_label(1, "Editor").await.unwrap();
        assert_eq!(h.last(1), messages::KEY_DELETED);

        h.say(3, &key).await.unwrap();
        assert_eq!(h.last(3), messages::INVALID_KEY);
        let secret = AccessKey::decode(&key).unwrap().secret;
        assert!(matches!(
            h.storage.resolve_level(&folder, &secret).await,
            Err(StorageError::NotFound)
        ));
        assert_eq!(level_of(&h, &folder, 3).await, AccessLevel::Undefined);
    }

    #[tokio::test]
    async fn test_reader_key_is_idempotent() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        let key = issue_key(&h, &folder, AccessLevel::Reader).await;

        h.say(2, &key).await.unwrap();
        assert_eq!(h.last(2), messages::folder_added("Recipes"));
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Reader);
        // No confirmation for Reader
        assert!(h.gateway.last_menu(1).is_none());

        h.say(2, &key).await.unwrap();
        assert_eq!(h.last(2), messages::ALREADY_MEMBER);
        assert_eq!(h.storage.list_members(&folder).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejections_walk_down_the_ladder() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        let editor_key = issue_key(&h, &folder, AccessLevel::Editor).await;
        let reader_key = issue_key(&h, &folder, AccessLevel::Reader).await;

        h.say(2, &editor_key).await.unwrap();
        h.tap_label(1, messages::NO).await.unwrap();
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Suspected);
        assert_eq!(h.last(1), messages::OWNER_NEXT_REJECTION_BLOCKS);
        assert_eq!(h.last(2), messages::ACCESS_DENIED);

        // A suspected user's Reader key still goes to the owner
        h.say(2, &reader_key).await.unwrap();
        assert_eq!(h.last(2), messages::REQUEST_SENT);
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Suspected);

        h.tap_label(1, messages::NO).await.unwrap();
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Banned);
        assert_eq!(h.last(1), messages::USER_BLOCKED);

        h.say(2, &editor_key).await.unwrap();
        assert_eq!(h.last(2), messages::KEY_BANNED);
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Banned);
        assert!(h.storage.list_folders(2).await.is_err());
    }

    #[tokio::test]
    async fn test_stale_answer_does_not_unban() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        let key = issue_key(&h, &folder, AccessLevel::Editor).await;

        h.say(2, &key).await.unwrap();
        let (_, first) = h.gateway.last_menu(1).unwrap();
        h.tap_label(1, messages::NO).await.unwrap();
        h.say(2, &key).await.unwrap();
        h.tap_label(1, messages::NO).await.unwrap();
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Banned);

        // The first request's Yes arrives late
        h.tap_raw(1, &first[0].data).await.unwrap();
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Banned);
    }

    #[tokio::test]
    async fn test_two_pending_requests_both_rejected() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        let key = issue_key(&h, &folder, AccessLevel::Editor).await;

        h.say(2, &key).await.unwrap();
        let (_, first) = h.gateway.last_menu(1).unwrap();
        h.say(2, &key).await.unwrap();
        let (_, second) = h.gateway.last_menu(1).unwrap();
        assert_eq!(first[1].data, second[1].data);

        h.tap_raw(1, &first[1].data).await.unwrap();
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Suspected);

        h.tap_raw(1, &second[1].data).await.unwrap();
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Banned);
        assert_eq!(h.last(1), messages::USER_BLOCKED);

        // Nothing moves it back up automatically
        h.tap_raw(1, &second[1].data).await.unwrap();
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Banned);
    }

    #[tokio::test]
    async fn test_promotion_replaces_grant() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        let reader_key = issue_key(&h, &folder, AccessLevel::Reader).await;
        let editor_key = issue_key(&h, &folder, AccessLevel::Editor).await;

        h.say(2, &reader_key).await.unwrap();
        h.say(2, &editor_key).await.unwrap();
        h.tap_label(1, messages::YES).await.unwrap();

        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Editor);
        assert_eq!(h.storage.list_members(&folder).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_owner_and_invalid_keys() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        let key = issue_key(&h, &folder, AccessLevel::Editor).await;

        h.say(1, &key).await.unwrap();
        assert_eq!(h.last(1), messages::KEY_OWNER);

        h.say(2, "KEYnot-a-key").await.unwrap();
        assert_eq!(h.last(2), messages::INVALID_KEY);

        h.say(2, &format!("KEY{}wrongsecret1", folder)).await.unwrap();
        assert_eq!(h.last(2), messages::INVALID_KEY);
    }

    #[tokio::test]
    async fn test_only_owner_can_answer() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        let key = issue_key(&h, &folder, AccessLevel::Editor).await;

        h.say(2, &key).await.unwrap();
        let (_, buttons) = h.gateway.last_menu(1).unwrap();

        // User 2 replays the owner's Yes
        h.tap_raw(2, &buttons[0].data).await.unwrap();
        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Undefined);
    }

    #[tokio::test]
    async fn test_answer_bypasses_session() {
        let h = Harness::new();
        let folder = h.create_folder(1, "Recipes").await;
        let key = issue_key(&h, &folder, AccessLevel::Editor).await;

        h.say(2, &key).await.unwrap();
        let (_, buttons) = h.gateway.last_menu(1).unwrap();
        h.say(1, "/create_folder").await.unwrap();

        h.tap_raw(1, &buttons[0].data).await.unwrap();

        assert_eq!(level_of(&h, &folder, 2).await, AccessLevel::Editor);
        assert_eq!(
            h.processor.sessions().snapshot(1).await.unwrap().operation,
            crate::session::Operation::CreateFolder
        );
    }
}
