use crate::stores::payment_store::PaymentStore;
use crate::stores::session_store::SessionStore;
use crate::stores::user_store::UserStore;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Metrics {
    pub total_requests: AtomicU64,
    pub successful_requests: AtomicU64,
    pub failed_requests: AtomicU64,
    pub rate_limited_requests: AtomicU64,
    pub sessions_started: AtomicU64,
    pub sessions_completed: AtomicU64,
    pub sessions_auto_ended: AtomicU64,
    pub points_awarded: AtomicU64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub rate_limited_requests: u64,
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub sessions_auto_ended: u64,
    pub points_awarded: u64,
    pub tracked_users: usize,
    pub tracked_sessions: usize,
    pub open_sessions: usize,
    pub tracked_payments: usize,
    pub uptime_seconds: i64,
    pub requests_per_second: f64,
}

impl Metrics {
    pub fn new() -> Self {
        let start_time = crate::utils::time::current_timestamp();

        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            rate_limited_requests: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            sessions_auto_ended: AtomicU64::new(0),
            points_awarded: AtomicU64::new(0),
            start_time,
        }
    }

    pub fn increment_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_successful(&self) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limited(&self) {
        self.rate_limited_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sessions_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sessions_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_sessions_auto_ended(&self, count: u64) {
        self.sessions_auto_ended.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_points_awarded(&self) {
        self.points_awarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Collects counters from all components and calculates derived metrics
    /// like success_rate, requests_per_second, and uptime_seconds.
    pub fn get_snapshot(
        &self,
        users: &UserStore,
        sessions: &SessionStore,
        payments: &PaymentStore,
    ) -> MetricsSnapshot {
        let current_time = crate::utils::time::current_timestamp();

        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let successful_requests = self.successful_requests.load(Ordering::Relaxed);
        let failed_requests = self.failed_requests.load(Ordering::Relaxed);

        let success_rate = if total_requests > 0 {
            (successful_requests as f64 / total_requests as f64) * 100.0
        } else {
            0.0
        };

        let uptime_seconds = current_time - self.start_time;

        let requests_per_second = if uptime_seconds > 0 {
            total_requests as f64 / uptime_seconds as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            total_requests,
            successful_requests,
            failed_requests,
            success_rate,
            rate_limited_requests: self.rate_limited_requests.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_auto_ended: self.sessions_auto_ended.load(Ordering::Relaxed),
            points_awarded: self.points_awarded.load(Ordering::Relaxed),
            tracked_users: users.len(),
            tracked_sessions: sessions.len(),
            open_sessions: sessions.count_non_terminal(),
            tracked_payments: payments.len(),
            uptime_seconds,
            requests_per_second,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::Session;
    use crate::models::user::User;

    #[test]
    fn test_new_metrics() {
        let metrics = Metrics::new();

        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.sessions_started.load(Ordering::Relaxed), 0);
        assert!(metrics.start_time > 0);
    }

    #[test]
    fn test_increment_counters() {
        let metrics = Metrics::new();

        metrics.increment_requests();
        metrics.increment_requests();
        metrics.increment_successful();
        metrics.increment_failed();
        metrics.increment_rate_limited();
        metrics.increment_sessions_started();
        metrics.increment_sessions_completed();
        metrics.add_sessions_auto_ended(3);
        metrics.increment_points_awarded();

        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.successful_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.failed_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.rate_limited_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.sessions_started.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.sessions_completed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.sessions_auto_ended.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.points_awarded.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_get_snapshot_empty() {
        let metrics = Metrics::new();
        let users = UserStore::new();
        let sessions = SessionStore::new();
        let payments = PaymentStore::new();

        let snapshot = metrics.get_snapshot(&users, &sessions, &payments);

        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.success_rate, 0.0);
        assert_eq!(snapshot.tracked_users, 0);
        assert_eq!(snapshot.open_sessions, 0);
        assert!(snapshot.uptime_seconds >= 0);
        assert_eq!(snapshot.requests_per_second, 0.0);
    }

    #[test]
    fn test_get_snapshot_with_data() {
        let metrics = Metrics::new();
        let users = UserStore::new();
        let sessions = SessionStore::new();
        let payments = PaymentStore::new();

        users.upsert(User::new("u1".to_string(), "u1@example.com".to_string(), 0));
        sessions.upsert(Session::new("s1".to_string(), "u1".to_string(), 1_000));
        let mut ended = Session::new("s2".to_string(), "u1".to_string(), 1_000);
        ended.auto_end(2_000);
        sessions.upsert(ended);

        metrics.increment_requests();
        metrics.increment_successful();

        let snapshot = metrics.get_snapshot(&users, &sessions, &payments);

        assert_eq!(snapshot.tracked_users, 1);
        assert_eq!(snapshot.tracked_sessions, 2);
        assert_eq!(snapshot.open_sessions, 1);
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.success_rate, 100.0);
    }

    #[test]
    fn test_success_rate_calculation() {
        let metrics = Metrics::new();
        let users = UserStore::new();
        let sessions = SessionStore::new();
        let payments = PaymentStore::new();

        // 8 successful out of 10 total = 80%
        for _ in 0..10 {
            metrics.increment_requests();
        }
        for _ in 0..8 {
            metrics.increment_successful();
        }
        for _ in 0..2 {
            metrics.increment_failed();
        }

        let snapshot = metrics.get_snapshot(&users, &sessions, &payments);
        assert_eq!(snapshot.success_rate, 80.0);
    }
}
