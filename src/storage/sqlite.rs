//! SQLite-backed [`Storage`]
//!
//! `rusqlite` is synchronous, so every call hops onto the blocking pool and
//! takes the connection lock there. The lock is never held across an await.

use super::migrations;
use super::{AccessGrant, FolderEntry, Page, Storage, StorageError, StorageResult};
use crate::access::AccessLevel;
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Length of a generated key secret
pub const SECRET_LEN: usize = 16;

/// SQLite storage shared by all event workers
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the database file, creating its directory if absent
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        migrations::run_all(&conn)?;
        tracing::info!("Opened storage at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// In-memory database, discarded on drop
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_all(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn call<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StorageError::Poisoned)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}

/// Map constraint violations onto domain errors
fn map_constraint(err: rusqlite::Error) -> StorageError {
    if let rusqlite::Error::SqliteFailure(ref e, _) = err {
        match e.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
                return StorageError::AlreadyExists
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return StorageError::NotFound,
            _ => {}
        }
    }
    StorageError::Database(err)
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn column_list(conn: &Connection, sql: &str, folder_id: &str) -> StorageResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![folder_id], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<String>, _>>()?)
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn add_folder(&self, grant: &AccessGrant) -> StorageResult<()> {
        if grant.level == AccessLevel::Undefined {
            return Err(StorageError::InvalidLevel(grant.level));
        }
        let grant = grant.clone();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let now = now();
            if grant.level == AccessLevel::Owner {
                tx.execute(
                    "INSERT INTO folders (id, name, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![grant.folder_id, grant.folder_name, grant.user_id, now],
                )
                .map_err(map_constraint)?;
            }
            tx.execute(
                "INSERT INTO access (user_id, folder_id, access_level, username, shared, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    grant.user_id,
                    grant.folder_id,
                    grant.level.as_i64(),
                    grant.username,
                    grant.shared,
                    now
                ],
            )
            .map_err(map_constraint)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn remove_folder(&self, folder_id: &str) -> StorageResult<()> {
        let folder_id = folder_id.to_string();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM folders WHERE id = ?1",
                params![folder_id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(StorageError::NotFound);
            }
            tx.execute("DELETE FROM pages WHERE folder_id = ?1", params![folder_id])?;
            tx.execute("DELETE FROM passwords WHERE folder_id = ?1", params![folder_id])?;
            tx.execute("DELETE FROM access WHERE folder_id = ?1", params![folder_id])?;
            tx.execute("DELETE FROM folders WHERE id = ?1", params![folder_id])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn rename_folder(&self, folder_id: &str, new_name: &str) -> StorageResult<()> {
        let (folder_id, new_name) = (folder_id.to_string(), new_name.to_string());
        self.call(move |conn| {
            let affected = conn.execute(
                "UPDATE folders SET name = ?1 WHERE id = ?2",
                params![new_name, folder_id],
            )?;
            if affected == 0 {
                return Err(StorageError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn delete_access(&self, user_id: i64, folder_id: &str) -> StorageResult<()> {
        let folder_id = folder_id.to_string();
        self.call(move |conn| {
            let affected = conn.execute(
                "DELETE FROM access WHERE folder_id = ?1 AND user_id = ?2",
                params![folder_id, user_id],
            )?;
            if affected == 0 {
                return Err(StorageError::NoRows);
            }
            Ok(())
        })
        .await
    }

    async fn list_folders(&self, user_id: i64) -> StorageResult<Vec<FolderEntry>> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT f.id, f.name, a.shared FROM access a
                 JOIN folders f ON f.id = a.folder_id
                 WHERE a.user_id = ?1 AND a.access_level >= ?2
                 ORDER BY a.created_at, a.rowid",
            )?;
            let rows = stmt.query_map(params![user_id, AccessLevel::Reader.as_i64()], |row| {
                Ok(FolderEntry {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    shared: row.get(2)?,
                })
            })?;
            let folders = rows.collect::<Result<Vec<_>, _>>()?;
            if folders.is_empty() {
                return Err(StorageError::NoFolders);
            }
            Ok(folders)
        })
        .await
    }

    async fn folder_name(&self, folder_id: &str) -> StorageResult<String> {
        let folder_id = folder_id.to_string();
        self.call(move |conn| {
            conn.query_row(
                "SELECT name FROM folders WHERE id = ?1",
                params![folder_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StorageError::NotFound)
        })
        .await
    }

    async fn owner(&self, folder_id: &str) -> StorageResult<i64> {
        let folder_id = folder_id.to_string();
        self.call(move |conn| {
            conn.query_row(
                "SELECT user_id FROM access WHERE folder_id = ?1 AND access_level = ?2",
                params![folder_id, AccessLevel::Owner.as_i64()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StorageError::NotFound)
        })
        .await
    }

    async fn access_level(&self, folder_id: &str, user_id: i64) -> StorageResult<AccessLevel> {
        let folder_id = folder_id.to_string();
        self.call(move |conn| {
            let level: Option<i64> = conn
                .query_row(
                    "SELECT access_level FROM access WHERE folder_id = ?1 AND user_id = ?2",
                    params![folder_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(level.map_or(AccessLevel::Undefined, AccessLevel::from_i64))
        })
        .await
    }

    async fn list_members(&self, folder_id: &str) -> StorageResult<Vec<AccessGrant>> {
        let folder_id = folder_id.to_string();
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.user_id, a.folder_id, a.access_level, a.username, f.name, a.shared
                 FROM access a JOIN folders f ON f.id = a.folder_id
                 WHERE a.folder_id = ?1
                 ORDER BY a.access_level DESC, a.created_at, a.rowid",
            )?;
            let rows = stmt.query_map(params![folder_id], |row| {
                Ok(AccessGrant {
                    user_id: row.get(0)?,
                    folder_id: row.get(1)?,
                    level: AccessLevel::from_i64(row.get(2)?),
                    username: row.get(3)?,
                    folder_name: row.get(4)?,
                    shared: row.get(5)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn save_page(&self, page: &Page) -> StorageResult<()> {
        let page = page.clone();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO pages (folder_id, tag, url, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![page.folder_id, page.tag, page.url, now()],
            )
            .map_err(map_constraint)?;
            Ok(())
        })
        .await
    }

    async fn remove_page(&self, page: &Page) -> StorageResult<()> {
        let page = page.clone();
        self.call(move |conn| {
            let affected = conn.execute(
                "DELETE FROM pages WHERE folder_id = ?1 AND tag = ?2",
                params![page.folder_id, page.tag],
            )?;
            if affected == 0 {
                return Err(StorageError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn page_exists(&self, page: &Page) -> StorageResult<bool> {
        let page = page.clone();
        self.call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM pages WHERE folder_id = ?1 AND tag = ?2",
                params![page.folder_id, page.tag],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    async fn list_urls(&self, folder_id: &str) -> StorageResult<Vec<String>> {
        let folder_id = folder_id.to_string();
        self.call(move |conn| {
            column_list(
                conn,
                "SELECT url FROM pages WHERE folder_id = ?1 ORDER BY created_at, rowid",
                &folder_id,
            )
        })
        .await
    }

    async fn list_tags(&self, folder_id: &str) -> StorageResult<Vec<String>> {
        let folder_id = folder_id.to_string();
        self.call(move |conn| {
            column_list(
                conn,
                "SELECT tag FROM pages WHERE folder_id = ?1 ORDER BY created_at, rowid",
                &folder_id,
            )
        })
        .await
    }

    async fn pick_random_page(&self, user_id: i64) -> StorageResult<Page> {
        self.call(move |conn| {
            conn.query_row(
                "SELECT p.url, p.tag, p.folder_id FROM pages p
                 JOIN access a ON a.folder_id = p.folder_id
                 WHERE a.user_id = ?1 AND a.access_level >= ?2
                 ORDER BY RANDOM() LIMIT 1",
                params![user_id, AccessLevel::Reader.as_i64()],
                |row| {
                    Ok(Page {
                        url: row.get(0)?,
                        tag: row.get(1)?,
                        folder_id: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or(StorageError::NoSavedPages)
        })
        .await
    }

    async fn create_password(&self, folder_id: &str, level: AccessLevel) -> StorageResult<String> {
        if !level.is_grantable() {
            return Err(StorageError::InvalidLevel(level));
        }
        let folder_id = folder_id.to_string();
        let secret = generate_secret();
        self.call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO passwords (folder_id, access_level, secret) VALUES (?1, ?2, ?3)",
                params![folder_id, level.as_i64(), secret],
            )
            .map_err(map_constraint)?;
            Ok(secret)
        })
        .await
    }

    async fn delete_password(&self, folder_id: &str, level: AccessLevel) -> StorageResult<()> {
        let folder_id = folder_id.to_string();
        self.call(move |conn| {
            let affected = conn.execute(
                "DELETE FROM passwords WHERE folder_id = ?1 AND access_level = ?2",
                params![folder_id, level.as_i64()],
            )?;
            if affected == 0 {
                return Err(StorageError::NoPasswords);
            }
            Ok(())
        })
        .await
    }

    async fn get_password(&self, folder_id: &str, level: AccessLevel) -> StorageResult<String> {
        let folder_id = folder_id.to_string();
        self.call(move |conn| {
            conn.query_row(
                "SELECT secret FROM passwords WHERE folder_id = ?1 AND access_level = ?2",
                params![folder_id, level.as_i64()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StorageError::NoPasswords)
        })
        .await
    }

    async fn resolve_level(&self, folder_id: &str, secret: &str) -> StorageResult<AccessLevel> {
        let (folder_id, secret) = (folder_id.to_string(), secret.to_string());
        self.call(move |conn| {
            let level: Option<i64> = conn
                .query_row(
                    "SELECT access_level FROM passwords WHERE folder_id = ?1 AND secret = ?2",
                    params![folder_id, secret],
                    |row| row.get(0),
                )
                .optional()?;
            level.map(AccessLevel::from_i64).ok_or(StorageError::NotFound)
        })
        .await
    }
}
