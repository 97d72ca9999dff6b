//! Page flows: save a link, delete a link, random link

use super::payload::{self, MenuAction, Payload};
use super::{messages, pending_folder, Outcome, Processor, MAX_TAG_LEN};
use crate::access::Requirement;
use crate::channels::{Button, Event};
use crate::error::{Error, Result, ResultExt};
use crate::session::{Operation, Session};
use crate::storage::{Page, StorageError};

impl Processor {
    /// A URL arrived: ask for its tag
    pub(super) async fn start_save(
        &self,
        session: &mut Session,
        event: &Event,
        url: &str,
    ) -> Result<Outcome> {
        session.pending_url = Some(url.to_string());
        session.pending_tag = None;
        session.pending_folder_id = None;
        session.begin(Operation::ChooseTag);

        let button = Button::new(
            messages::WITHOUT_TAG,
            Payload::Menu(MenuAction::WithoutTag).encode(),
        );
        self.send_menu(session, event.chat_id, messages::ENTER_TAG, &[button])
            .await?;
        Ok(Outcome::Continue)
    }

    pub(super) async fn accept_tag(
        &self,
        session: &mut Session,
        event: &Event,
        tag: &str,
    ) -> Result<Outcome> {
        if tag.len() > MAX_TAG_LEN {
            self.send(event.chat_id, messages::LONG_TAG).await?;
            return Ok(Outcome::Continue);
        }
        self.discard_menu(session, event.chat_id).await;
        self.tag_chosen(session, event, tag.to_string()).await
    }

    /// "without a tag": the URL is its own tag
    pub(super) async fn accept_url_as_tag(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        let url = session
            .pending_url
            .as_deref()
            .ok_or_else(|| Error::Internal("no pending url".to_string()))?;
        let tag = payload::truncate(url, MAX_TAG_LEN).to_string();
        self.tag_chosen(session, event, tag).await
    }

    async fn tag_chosen(&self, session: &mut Session, event: &Event, tag: String) -> Result<Outcome> {
        session.pending_tag = Some(tag);
        session.begin(Operation::SaveLink);
        self.choose_folder(session, event).await
    }

    pub(super) async fn save_page(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        session.finishing();
        let folder_id = pending_folder(session)?;
        if !self.authorize(event, &folder_id, Requirement::Edit).await? {
            return Ok(Outcome::Complete);
        }

        let (Some(url), Some(tag)) = (session.pending_url.clone(), session.pending_tag.clone()) else {
            return Err(Error::Internal("no pending page".to_string()));
        };
        let page = Page::new(url, tag, folder_id);

        let exists = self
            .storage
            .page_exists(&page)
            .await
            .context("can't save page")?;
        let reply = if exists {
            messages::ALREADY_EXISTS
        } else {
            match self.storage.save_page(&page).await {
                Ok(()) => messages::SAVED,
                Err(StorageError::AlreadyExists) => messages::ALREADY_EXISTS,
                Err(e) => return Err(e).context("can't save page"),
            }
        };
        self.send(event.chat_id, reply).await?;
        Ok(Outcome::Complete)
    }

    /// Menu of the folder's tags
    pub(super) async fn choose_link(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        let folder_id = pending_folder(session)?;
        if !self.authorize(event, &folder_id, Requirement::Edit).await? {
            return Ok(Outcome::Complete);
        }

        let tags = self
            .storage
            .list_tags(&folder_id)
            .await
            .context("can't list links")?;
        if tags.is_empty() {
            self.send(event.chat_id, messages::EMPTY_FOLDER).await?;
            return Ok(Outcome::Empty);
        }

        let buttons: Vec<Button> = tags
            .into_iter()
            .map(|tag| {
                let data = Payload::Tag(tag.clone()).encode();
                Button::new(tag, data)
            })
            .collect();
        session.begin(Operation::DeleteLink);
        self.send_menu(session, event.chat_id, messages::CHOOSE_LINK, &buttons)
            .await?;
        Ok(Outcome::Continue)
    }

    pub(super) async fn delete_link(&self, session: &mut Session, event: &Event) -> Result<Outcome> {
        session.finishing();
        let folder_id = pending_folder(session)?;
        let tag = session
            .pending_tag
            .clone()
            .ok_or_else(|| Error::Internal("no link selected".to_string()))?;
        if !self.authorize(event, &folder_id, Requirement::Edit).await? {
            return Ok(Outcome::Complete);
        }

        // Tags are unique within a folder, so the URL plays no part
        self.storage
            .remove_page(&Page::new("", tag, folder_id))
            .await
            .context("can't delete link")?;
        self.send(event.chat_id, messages::PAGE_DELETED).await?;
        Ok(Outcome::Complete)
    }

    pub(super) async fn send_random(&self, event: &Event) -> Result<Outcome> {
        match self.storage.pick_random_page(event.user_id).await {
            Ok(page) => {
                self.send(event.chat_id, &messages::escape_html(&page.url))
                    .await?;
                Ok(Outcome::Complete)
            }
            Err(StorageError::NoSavedPages) => {
                self.send(event.chat_id, messages::NO_SAVED_PAGES).await?;
                Ok(Outcome::Empty)
            }
            Err(e) => Err(e).context("can't send random page"),
        }
    }
}
