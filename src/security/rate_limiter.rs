use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

/// Fixed-window request limiter keyed by authenticated user id.
///
/// Every ledger operation is authenticated, so limiting per user rather
/// than per address also covers callers behind a shared NAT.
pub struct RateLimiter {
    requests: DashMap<String, (AtomicU32, AtomicI64)>,
    max_requests_per_minute: u32,
}

impl RateLimiter {
    pub fn new(max_requests_per_minute: u32) -> Self {
        Self {
            requests: DashMap::new(),
            max_requests_per_minute,
        }
    }

    pub fn check_and_increment(&self, user_id: &str, current_time: i64) -> bool {
        let entry = self
            .requests
            .entry(user_id.to_string())
            .or_insert_with(|| (AtomicU32::new(0), AtomicI64::new(current_time)));

        let (count, window_start) = entry.value();
        let window_start_time = window_start.load(Ordering::Relaxed);

        if current_time - window_start_time >= 60 {
            window_start.store(current_time, Ordering::Relaxed);
            count.store(1, Ordering::Relaxed);
            return true;
        }

        let current_count = count.fetch_add(1, Ordering::Relaxed) + 1;

        current_count <= self.max_requests_per_minute
    }

    pub fn cleanup_old_entries(&self, current_time: i64) {
        self.requests.retain(|_, (_, window_start)| {
            current_time - window_start.load(Ordering::Relaxed) < 60
        });
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_first_request() {
        let limiter = RateLimiter::new(10);
        assert!(limiter.check_and_increment("u1", 1000));
    }

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let limiter = RateLimiter::new(5);

        for _ in 0..5 {
            assert!(limiter.check_and_increment("u1", 1000));
        }

        assert!(!limiter.check_and_increment("u1", 1000));
    }

    #[test]
    fn test_rate_limiter_resets_after_window() {
        let limiter = RateLimiter::new(5);

        for _ in 0..5 {
            assert!(limiter.check_and_increment("u1", 1000));
        }
        assert!(!limiter.check_and_increment("u1", 1000));

        // After 60 seconds, window should reset
        assert!(limiter.check_and_increment("u1", 1060));
    }

    #[test]
    fn test_rate_limiter_isolates_users() {
        let limiter = RateLimiter::new(5);

        for _ in 0..5 {
            assert!(limiter.check_and_increment("u1", 1000));
        }
        assert!(!limiter.check_and_increment("u1", 1000));

        assert!(limiter.check_and_increment("u2", 1000));
    }

    #[test]
    fn test_cleanup_old_entries() {
        let limiter = RateLimiter::new(10);

        limiter.check_and_increment("u1", 1000);
        limiter.check_and_increment("u2", 1030);
        assert_eq!(limiter.len(), 2);

        // u1's window is 70 seconds old, u2's only 40
        limiter.cleanup_old_entries(1070);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_concurrent_increments_are_counted() {
        use std::sync::Arc;
        use std::thread;

        let limiter = Arc::new(RateLimiter::new(100));
        let mut handles = vec![];

        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    limiter.check_and_increment("u1", 1000);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // All 100 requests counted; the 101st is rejected
        assert!(!limiter.check_and_increment("u1", 1000));
    }
}
