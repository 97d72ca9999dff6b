//! Persistent store
//!
//! Folders, pages, keys and per-folder access grants. The [`Storage`] trait
//! is the seam the processor talks to; [`SqliteStorage`] is the production
//! implementation.
//!
//! The access grant is the only place an access level lives. Exactly one
//! grant per folder carries [`AccessLevel::Owner`]; it is written in the same
//! transaction that creates the folder and removed with it.

mod migrations;
mod sqlite;

pub use sqlite::SqliteStorage;

use crate::access::AccessLevel;
use async_trait::async_trait;
use thiserror::Error;

/// Length of a folder id
pub const FOLDER_ID_LEN: usize = 12;

/// Storage error type
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("no rows affected")]
    NoRows,

    #[error("no passwords")]
    NoPasswords,

    #[error("no saved pages")]
    NoSavedPages,

    #[error("no folders")]
    NoFolders,

    #[error("already exists")]
    AlreadyExists,

    #[error("access level {0} can't be stored")]
    InvalidLevel(AccessLevel),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection lock poisoned")]
    Poisoned,

    #[error("blocking task failed: {0}")]
    Task(String),
}

impl StorageError {
    /// Expected "nothing here yet" conditions, shown to users but never logged as failures
    pub fn is_empty_state(&self) -> bool {
        matches!(
            self,
            StorageError::NoFolders | StorageError::NoSavedPages | StorageError::NoPasswords
        )
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A bookmark collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub owner_id: i64,
}

impl Folder {
    /// Fresh short folder id: the last 12 hex digits of a v4 UUID
    pub fn generate_id() -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        id[id.len() - FOLDER_ID_LEN..].to_string()
    }
}

/// One user's access to one folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub user_id: i64,
    pub folder_id: String,
    pub level: AccessLevel,
    /// Username of the grantee, kept for display
    pub username: String,
    /// Folder name at read time, kept for display
    pub folder_name: String,
    /// Obtained through a key rather than by creating the folder
    pub shared: bool,
}

impl AccessGrant {
    /// The owner grant for a brand-new folder
    pub fn owner(folder: &Folder, username: impl Into<String>) -> Self {
        Self {
            user_id: folder.owner_id,
            folder_id: folder.id.clone(),
            level: AccessLevel::Owner,
            username: username.into(),
            folder_name: folder.name.clone(),
            shared: false,
        }
    }

    /// A grant obtained through a key
    pub fn shared(
        user_id: i64,
        folder_id: impl Into<String>,
        level: AccessLevel,
        username: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            folder_id: folder_id.into(),
            level,
            username: username.into(),
            folder_name: String::new(),
            shared: true,
        }
    }
}

/// Folder as listed for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
    pub shared: bool,
}

/// A saved bookmark. The tag is unique within its folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub tag: String,
    pub folder_id: String,
}

impl Page {
    pub fn new(
        url: impl Into<String>,
        tag: impl Into<String>,
        folder_id: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            tag: tag.into(),
            folder_id: folder_id.into(),
        }
    }
}

/// Operations the conversation processor needs from persistence
#[async_trait]
pub trait Storage: Send + Sync {
    /// Add a grant. An `Owner` grant creates the folder in the same transaction;
    /// any other level requires the folder to exist.
    async fn add_folder(&self, grant: &AccessGrant) -> StorageResult<()>;

    /// Remove a folder with all its pages, keys and grants
    async fn remove_folder(&self, folder_id: &str) -> StorageResult<()>;

    async fn rename_folder(&self, folder_id: &str, new_name: &str) -> StorageResult<()>;

    /// Remove one user's grant, leaving the folder alone
    async fn delete_access(&self, user_id: i64, folder_id: &str) -> StorageResult<()>;

    /// Folders the user can at least read, in the order they were obtained
    async fn list_folders(&self, user_id: i64) -> StorageResult<Vec<FolderEntry>>;

    async fn folder_name(&self, folder_id: &str) -> StorageResult<String>;

    async fn owner(&self, folder_id: &str) -> StorageResult<i64>;

    /// `Undefined` when the user holds no grant
    async fn access_level(&self, folder_id: &str, user_id: i64) -> StorageResult<AccessLevel>;

    async fn list_members(&self, folder_id: &str) -> StorageResult<Vec<AccessGrant>>;

    async fn save_page(&self, page: &Page) -> StorageResult<()>;

    /// Remove by folder and tag; the URL is ignored
    async fn remove_page(&self, page: &Page) -> StorageResult<()>;

    async fn page_exists(&self, page: &Page) -> StorageResult<bool>;

    async fn list_urls(&self, folder_id: &str) -> StorageResult<Vec<String>>;

    async fn list_tags(&self, folder_id: &str) -> StorageResult<Vec<String>>;

    /// Uniform pick across every page in every folder the user can read
    async fn pick_random_page(&self, user_id: i64) -> StorageResult<Page>;

    /// Issue a fresh secret for the level, replacing any previous one
    async fn create_password(&self, folder_id: &str, level: AccessLevel) -> StorageResult<String>;

    async fn delete_password(&self, folder_id: &str, level: AccessLevel) -> StorageResult<()>;

    async fn get_password(&self, folder_id: &str, level: AccessLevel) -> StorageResult<String>;

    /// Exact match on (folder, secret)
    async fn resolve_level(&self, folder_id: &str, secret: &str) -> StorageResult<AccessLevel>;
}
