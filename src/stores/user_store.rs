use crate::core::error::LedgerError;
use crate::models::user::User;
use dashmap::DashMap;

/// In-memory document store for user records
pub struct UserStore {
    users: DashMap<String, User>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    /// Insert or replace a user record (WAL replay path)
    pub fn upsert(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Point read; returns a clone of the record if found
    pub fn get(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|entry| entry.value().clone())
    }

    /// Atomically claim the active-session slot for a user.
    ///
    /// The check and the flag flip happen under the entry's write lock, so
    /// of two concurrent starts exactly one wins and the other observes
    /// `AlreadyActive`. A missing record is initialized with zero points.
    pub fn begin_session(
        &self,
        user_id: &str,
        email: &str,
        now_millis: i64,
    ) -> Result<User, LedgerError> {
        let mut entry = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| User::new(user_id.to_string(), email.to_string(), now_millis));

        if entry.active_session {
            return Err(LedgerError::AlreadyActive);
        }

        entry.active_session = true;
        entry.last_active = now_millis;
        if entry.email.is_empty() {
            entry.email = email.to_string();
        }
        Ok(entry.value().clone())
    }

    /// Release the active-session slot and credit points for a completed
    /// session. Returns the updated record, or None if the user is unknown.
    pub fn finish_session(&self, user_id: &str, now_millis: i64, points_delta: i64) -> Option<User> {
        let mut entry = self.users.get_mut(user_id)?;
        entry.active_session = false;
        entry.last_session_end = Some(now_millis);
        entry.last_active = now_millis;
        entry.points += points_delta;
        Some(entry.value().clone())
    }

    /// Force the active-session flag (replay reconciliation).
    /// Returns false if the user is unknown.
    pub fn set_active_session(&self, user_id: &str, active: bool) -> bool {
        match self.users.get_mut(user_id) {
            Some(mut entry) => {
                entry.active_session = active;
                true
            }
            None => false,
        }
    }

    /// Record a verified payment against the user.
    /// Returns the updated record, or None if the user is unknown.
    pub fn mark_paid(&self, user_id: &str, reference: &str, now_millis: i64) -> Option<User> {
        let mut entry = self.users.get_mut(user_id)?;
        entry.payment_status = true;
        entry.payment_reference = Some(reference.to_string());
        entry.payment_verified_at = Some(now_millis);
        Some(entry.value().clone())
    }

    /// Users ordered by points descending, ties broken by id for a stable
    /// order, limited to `limit`
    pub fn top_by_points(&self, limit: usize) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.id.cmp(&b.id)));
        users.truncate(limit);
        users
    }

    /// Ids of users whose active-session flag is set
    pub fn flagged_active_ids(&self) -> Vec<String> {
        self.users
            .iter()
            .filter(|e| e.value().active_session)
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_session_initializes_missing_user() {
        let store = UserStore::new();
        let user = store.begin_session("u1", "u1@example.com", 1_000).unwrap();

        assert_eq!(user.points, 0);
        assert!(user.active_session);
        assert_eq!(user.email, "u1@example.com");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_begin_session_rejects_second_start() {
        let store = UserStore::new();
        store.begin_session("u1", "u1@example.com", 1_000).unwrap();

        let err = store.begin_session("u1", "u1@example.com", 2_000).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyActive));
    }

    #[test]
    fn test_begin_session_after_finish_succeeds() {
        let store = UserStore::new();
        store.begin_session("u1", "u1@example.com", 1_000).unwrap();
        store.finish_session("u1", 2_000, 1).unwrap();

        let user = store.begin_session("u1", "u1@example.com", 3_000).unwrap();
        assert!(user.active_session);
        assert_eq!(user.points, 1);
    }

    #[test]
    fn test_finish_session_awards_points_and_clears_flag() {
        let store = UserStore::new();
        store.begin_session("u1", "u1@example.com", 1_000).unwrap();

        let user = store.finish_session("u1", 5_000, 1).unwrap();
        assert!(!user.active_session);
        assert_eq!(user.points, 1);
        assert_eq!(user.last_session_end, Some(5_000));
    }

    #[test]
    fn test_finish_session_unknown_user() {
        let store = UserStore::new();
        assert!(store.finish_session("ghost", 1_000, 1).is_none());
    }

    #[test]
    fn test_concurrent_begin_session_single_winner() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(UserStore::new());
        let wins = Arc::new(AtomicU32::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let store = Arc::clone(&store);
            let wins = Arc::clone(&wins);
            handles.push(thread::spawn(move || {
                if store.begin_session("u1", "u1@example.com", 1_000).is_ok() {
                    wins.fetch_add(1, Ordering::Relaxed);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // Exactly one concurrent start may claim the slot
        assert_eq!(wins.load(Ordering::Relaxed), 1);
        assert!(store.get("u1").unwrap().active_session);
    }

    #[test]
    fn test_mark_paid() {
        let store = UserStore::new();
        store.begin_session("u1", "u1@example.com", 1_000).unwrap();

        let user = store.mark_paid("u1", "rs_ref_1", 2_000).unwrap();
        assert!(user.payment_status);
        assert_eq!(user.payment_reference.as_deref(), Some("rs_ref_1"));
        assert_eq!(user.payment_verified_at, Some(2_000));
    }

    #[test]
    fn test_top_by_points_orders_and_limits() {
        let store = UserStore::new();
        for (id, points) in [("a", 3), ("b", 7), ("c", 7), ("d", 1)] {
            let mut user = User::new(id.to_string(), format!("{}@example.com", id), 0);
            user.points = points;
            store.upsert(user);
        }

        let top = store.top_by_points(3);
        let ids: Vec<&str> = top.iter().map(|u| u.id.as_str()).collect();
        // Ties broken by id: b before c
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_flagged_active_ids() {
        let store = UserStore::new();
        store.begin_session("u1", "u1@example.com", 1_000).unwrap();
        let mut idle = User::new("u2".to_string(), "u2@example.com".to_string(), 0);
        idle.active_session = false;
        store.upsert(idle);

        assert_eq!(store.flagged_active_ids(), vec!["u1".to_string()]);
    }
}
