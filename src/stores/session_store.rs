use crate::core::error::LedgerError;
use crate::models::session::Session;
use dashmap::DashMap;

/// In-memory document store for session records
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Insert or replace a session record
    pub fn upsert(&self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    /// Point read; returns a clone of the record if found
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    /// Apply a fallible mutation under the session entry's write lock.
    ///
    /// State guards evaluated inside the closure are atomic with the
    /// mutation, so concurrent duplicate requests cannot both pass a
    /// status check before either commits.
    pub fn with_session<T, F>(&self, session_id: &str, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Session) -> Result<T, LedgerError>,
    {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(LedgerError::NotFound)?;
        f(entry.value_mut())
    }

    /// Ids of non-terminal sessions started before the cutoff (reaper scan)
    pub fn stale_active_ids(&self, cutoff_millis: i64) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|e| !e.value().is_terminal() && e.value().started_at < cutoff_millis)
            .map(|e| e.key().clone())
            .collect()
    }

    /// Ids of users that currently own a non-terminal session
    pub fn users_with_open_sessions(&self) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|e| !e.value().is_terminal())
            .map(|e| e.value().user_id.clone())
            .collect()
    }

    pub fn count_non_terminal(&self) -> usize {
        self.sessions.iter().filter(|e| !e.value().is_terminal()).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
