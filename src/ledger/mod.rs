// Session lifecycle ledger
//
// All transition rules and duration accounting live here and in the
// Session model; handlers stay thin. Every method takes the current time
// from the caller so the logic is deterministic under test.

use crate::core::config::SessionConfig;
use crate::core::error::LedgerError;
use crate::models::api::LeaderboardEntry;
use crate::models::session::{EndOutcome, PauseOutcome, Session};
use crate::stores::session_store::SessionStore;
use crate::stores::user_store::UserStore;
use crate::utils::id::new_session_id;
use crate::wal::wal::{Wal, WalOperation};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a successful (or idempotent) EndSession
#[derive(Debug, PartialEq, Eq)]
pub struct EndReceipt {
    pub total_active_millis: i64,
    pub points_awarded: bool,
    pub points: i64,
}

pub struct SessionLedger {
    users: Arc<UserStore>,
    sessions: Arc<SessionStore>,
    wal: Arc<Wal>,
    config: SessionConfig,
}

impl SessionLedger {
    pub fn new(
        users: Arc<UserStore>,
        sessions: Arc<SessionStore>,
        wal: Arc<Wal>,
        config: SessionConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            wal,
            config,
        }
    }

    /// Create a new active session for the user.
    ///
    /// The active-session claim is a single conditional update on the user
    /// record; concurrent starts cannot both pass it.
    pub fn start_session(
        &self,
        user_id: &str,
        email: &str,
        now_millis: i64,
    ) -> Result<Session, LedgerError> {
        let user = self.users.begin_session(user_id, email, now_millis)?;

        let session = Session::new(new_session_id(), user_id.to_string(), now_millis);
        self.sessions.upsert(session.clone());

        self.log_wal(WalOperation::UpsertUser { user });
        self.log_wal(WalOperation::UpsertSession {
            session: session.clone(),
        });

        info!(
            user_id = %user_id,
            session_id = %session.id,
            "Session started"
        );

        Ok(session)
    }

    /// active -> paused; pausing a paused session is a successful no-op
    pub fn pause_session(
        &self,
        user_id: &str,
        session_id: &str,
        now_millis: i64,
    ) -> Result<PauseOutcome, LedgerError> {
        let (outcome, snapshot) = self.sessions.with_session(session_id, |s| {
            if s.user_id != user_id {
                return Err(LedgerError::NotOwner);
            }
            let outcome = s.pause(now_millis)?;
            let snapshot = match outcome {
                PauseOutcome::Paused => Some(s.clone()),
                PauseOutcome::AlreadyPaused => None,
            };
            Ok((outcome, snapshot))
        })?;

        if let Some(session) = snapshot {
            self.log_wal(WalOperation::UpsertSession { session });
            info!(user_id = %user_id, session_id = %session_id, "Session paused");
        }

        Ok(outcome)
    }

    /// paused -> active; returns the new cumulative paused duration
    pub fn resume_session(
        &self,
        user_id: &str,
        session_id: &str,
        now_millis: i64,
    ) -> Result<i64, LedgerError> {
        let (outcome, snapshot) = self.sessions.with_session(session_id, |s| {
            if s.user_id != user_id {
                return Err(LedgerError::NotOwner);
            }
            let outcome = s.resume(now_millis)?;
            Ok((outcome, s.clone()))
        })?;

        if outcome.missing_paused_at {
            warn!(
                user_id = %user_id,
                session_id = %session_id,
                "Paused session had no pause timestamp, treating paused delta as zero"
            );
        }

        self.log_wal(WalOperation::UpsertSession { session: snapshot });
        info!(
            user_id = %user_id,
            session_id = %session_id,
            paused_accumulated_millis = outcome.paused_accumulated_millis,
            "Session resumed"
        );

        Ok(outcome.paused_accumulated_millis)
    }

    /// -> ended; awards points exactly once, on the terminal transition
    pub fn end_session(
        &self,
        user_id: &str,
        session_id: &str,
        now_millis: i64,
    ) -> Result<EndReceipt, LedgerError> {
        let (outcome, snapshot) = self.sessions.with_session(session_id, |s| {
            if s.user_id != user_id {
                return Err(LedgerError::NotOwner);
            }
            let outcome = s.end(now_millis, self.config.min_duration_millis())?;
            let snapshot = match outcome {
                EndOutcome::Ended { .. } => Some(s.clone()),
                EndOutcome::AlreadyEnded { .. } => None,
            };
            Ok((outcome, snapshot))
        })?;

        match outcome {
            EndOutcome::Ended { total_active_millis } => {
                // The terminal transition above happens at most once per
                // session, so the award cannot be repeated by retries.
                let points = match self.users.finish_session(
                    user_id,
                    now_millis,
                    self.config.points_per_session,
                ) {
                    Some(user) => {
                        self.log_wal(WalOperation::UpsertUser { user: user.clone() });
                        user.points
                    }
                    None => {
                        warn!(user_id = %user_id, "Ended a session for an unknown user record");
                        0
                    }
                };

                if let Some(session) = snapshot {
                    self.log_wal(WalOperation::UpsertSession { session });
                }

                info!(
                    user_id = %user_id,
                    session_id = %session_id,
                    total_active_millis = total_active_millis,
                    points = points,
                    "Session ended"
                );

                Ok(EndReceipt {
                    total_active_millis,
                    points_awarded: true,
                    points,
                })
            }
            EndOutcome::AlreadyEnded { total_active_millis } => Ok(EndReceipt {
                total_active_millis,
                points_awarded: false,
                points: self.users.get(user_id).map(|u| u.points).unwrap_or(0),
            }),
        }
    }

    /// Users ranked by points, descending
    pub fn leaderboard(&self, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        let limit = limit
            .unwrap_or(self.config.leaderboard_limit)
            .min(self.config.max_leaderboard_limit);

        self.users
            .top_by_points(limit)
            .into_iter()
            .map(|user| {
                let display_name = user
                    .display_name
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| {
                        if user.email.is_empty() {
                            "User".to_string()
                        } else {
                            user.email.clone()
                        }
                    });
                LeaderboardEntry {
                    user_id: user.id,
                    display_name,
                    points: user.points,
                }
            })
            .collect()
    }

    /// End sessions that have been open longer than the configured maximum.
    /// Reaped sessions award no points. Returns the number reaped.
    pub fn reap_stale_sessions(&self, now_millis: i64) -> usize {
        let cutoff = now_millis - self.config.auto_end_after_millis();
        let stale = self.sessions.stale_active_ids(cutoff);
        let mut reaped = 0;

        for session_id in stale {
            let result = self.sessions.with_session(&session_id, |s| {
                match s.auto_end(now_millis) {
                    Some(total) => Ok(Some((s.clone(), total))),
                    None => Ok(None),
                }
            });

            match result {
                Ok(Some((session, total_active_millis))) => {
                    if self
                        .users
                        .finish_session(&session.user_id, now_millis, 0)
                        .map(|user| self.log_wal(WalOperation::UpsertUser { user }))
                        .is_none()
                    {
                        warn!(
                            session_id = %session_id,
                            user_id = %session.user_id,
                            "Reaped a session for an unknown user record"
                        );
                    }

                    info!(
                        session_id = %session_id,
                        user_id = %session.user_id,
                        total_active_millis = total_active_millis,
                        "Session auto-ended"
                    );
                    self.log_wal(WalOperation::UpsertSession { session });
                    reaped += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Failed to reap session");
                }
            }
        }

        reaped
    }

    // A WAL append failure must not fail the request; the store is already
    // updated and the operator sees the warning.
    fn log_wal(&self, op: WalOperation) {
        if let Err(e) = self.wal.log_operation(op) {
            warn!(error = %e, "Failed to write to WAL");
        }
    }
}
