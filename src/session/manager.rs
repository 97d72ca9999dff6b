//! Session management

use super::Operation;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Whether the current flow has reached its terminal step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Terminal step reached; the flow closes once the step returns
    Ok,
    /// Waiting for more input
    InProgress,
}

/// A user's conversation state
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub operation: Operation,
    pub status: SessionStatus,
    pub pending_url: Option<String>,
    pub pending_tag: Option<String>,
    pub pending_folder_id: Option<String>,
    /// Last message with buttons sent to this user
    pub last_message_id: Option<i64>,
    /// Last activity timestamp (ms)
    last_activity: i64,
    /// Set when the sweeper dropped this entry
    evicted: bool,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            operation: Operation::Idle,
            status: SessionStatus::Ok,
            pending_url: None,
            pending_tag: None,
            pending_folder_id: None,
            last_message_id: None,
            last_activity: chrono::Utc::now().timestamp_millis(),
            evicted: false,
        }
    }

    /// Open (or move to) a step that waits for more input
    pub fn begin(&mut self, operation: Operation) {
        self.operation = operation;
        self.status = SessionStatus::InProgress;
    }

    /// Mark the current step as terminal
    pub fn finishing(&mut self) {
        self.status = SessionStatus::Ok;
    }

    /// Close any open flow
    pub fn reset(&mut self) {
        self.operation = Operation::Idle;
        self.status = SessionStatus::Ok;
    }

    pub fn is_idle(&self) -> bool {
        self.operation == Operation::Idle
    }

    pub fn touch(&mut self) {
        self.last_activity = chrono::Utc::now().timestamp_millis();
    }

    pub fn last_activity(&self) -> i64 {
        self.last_activity
    }
}

/// Exclusive access to one user's session for the duration of an event
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<i64, Arc<Mutex<Session>>>>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Lock the user's session, creating it on first contact.
    ///
    /// Waits while another event for the same user is being processed.
    pub async fn acquire(&self, user_id: i64) -> SessionGuard {
        loop {
            let entry = self.entry(user_id).await;
            let mut guard = entry.lock_owned().await;
            // Evicted between lookup and lock: start over with a fresh entry
            if guard.evicted {
                continue;
            }
            guard.touch();
            return guard;
        }
    }

    async fn entry(&self, user_id: i64) -> Arc<Mutex<Session>> {
        if let Some(entry) = self.sessions.read().await.get(&user_id) {
            return entry.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(user_id)
            .or_insert_with(|| {
                tracing::debug!("Created session for user {}", user_id);
                Arc::new(Mutex::new(Session::new(user_id)))
            })
            .clone()
    }

    /// Copy of the user's session, if one exists and is not locked
    pub async fn snapshot(&self, user_id: i64) -> Option<Session> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(&user_id)?;
        let guard = entry.try_lock().ok()?;
        Some(guard.clone())
    }

    /// Get session count
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than `max_idle_ms`. Locked sessions are kept.
    pub async fn cleanup_inactive(&self, max_idle_ms: i64) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, entry| match entry.try_lock() {
            Ok(mut session) => {
                if now - session.last_activity > max_idle_ms {
                    session.evicted = true;
                    false
                } else {
                    true
                }
            }
            Err(_) => true,
        });

        let cleaned = before - sessions.len();
        if cleaned > 0 {
            tracing::info!("Cleaned up {} inactive sessions", cleaned);
        }
        cleaned
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
