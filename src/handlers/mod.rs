pub mod fallback;
pub mod health;
pub mod leaderboard;
pub mod metrics;
pub mod payment;
pub mod session;
