use serde::{Deserialize, Serialize};

/// A tracked user and their point balance
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// User ID assigned by the auth provider
    pub id: String,
    /// Email address (display only)
    pub email: String,
    /// Display name (display only)
    #[serde(default)]
    pub display_name: Option<String>,
    /// Points earned from completed sessions
    pub points: i64,
    /// True iff the user currently owns a non-terminal session
    pub active_session: bool,
    /// Payment gate read by the dashboard, never by session logic
    #[serde(default)]
    pub payment_status: bool,
    /// Reference of the verified payment, if any
    #[serde(default)]
    pub payment_reference: Option<String>,
    /// Unix millis of payment verification, if any
    #[serde(default)]
    pub payment_verified_at: Option<i64>,
    /// Unix millis of record creation
    pub created_at: i64,
    /// Unix millis of last ledger activity
    pub last_active: i64,
    /// Unix millis of the last session end, if any
    #[serde(default)]
    pub last_session_end: Option<i64>,
}

impl User {
    pub fn new(id: String, email: String, now_millis: i64) -> Self {
        Self {
            id,
            email,
            display_name: None,
            points: 0,
            active_session: false,
            payment_status: false,
            payment_reference: None,
            payment_verified_at: None,
            created_at: now_millis,
            last_active: now_millis,
            last_session_end: None,
        }
    }
}
