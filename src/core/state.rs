// Application state (AppState)

use crate::api::client::PaymentClient;
use crate::core::config::Config;
use crate::ledger::SessionLedger;
use crate::metrics::collector::Metrics;
use crate::security::rate_limiter::RateLimiter;
use crate::stores::{
    payment_store::PaymentStore, session_store::SessionStore, user_store::UserStore,
};
use crate::wal::wal::Wal;
use std::sync::Arc;

/// Shared application state
///
/// Contains all shared components that are accessed by request handlers.
/// All fields are wrapped in Arc for efficient cloning across threads.
#[derive(Clone)]
pub struct AppState {
    /// User records (points, active-session flag, payment gate)
    pub users: Arc<UserStore>,

    /// Session records
    pub sessions: Arc<SessionStore>,

    /// Payment records keyed by reference
    pub payments: Arc<PaymentStore>,

    /// Session lifecycle rules and duration accounting
    pub ledger: Arc<SessionLedger>,

    /// Per-user request limiter
    pub rate_limiter: Arc<RateLimiter>,

    /// Metrics collector for tracking statistics
    pub metrics: Arc<Metrics>,

    /// Write-Ahead Log for persistence
    pub wal: Arc<Wal>,

    /// Payment provider client; None when no provider secret is configured
    pub payment_client: Option<Arc<PaymentClient>>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, wal: Wal, payment_client: Option<PaymentClient>) -> Self {
        let config = Arc::new(config);
        let wal = Arc::new(wal);

        let users = Arc::new(UserStore::new());
        let sessions = Arc::new(SessionStore::new());

        let ledger = Arc::new(SessionLedger::new(
            Arc::clone(&users),
            Arc::clone(&sessions),
            Arc::clone(&wal),
            config.session.clone(),
        ));

        let rate_limiter = Arc::new(RateLimiter::new(config.performance.max_requests_per_minute));

        Self {
            users,
            sessions,
            payments: Arc::new(PaymentStore::new()),
            ledger,
            rate_limiter,
            metrics: Arc::new(Metrics::new()),
            wal,
            payment_client: payment_client.map(Arc::new),
            config,
        }
    }
}
