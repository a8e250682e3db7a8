use crate::core::error::LedgerError;
use serde::{Deserialize, Serialize};

pub const END_REASON_MANUAL: &str = "manual_end";
pub const END_REASON_AUTO_TIMEOUT: &str = "auto_end_timeout";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Ended => "ended",
        }
    }
}

/// Outcome of a pause request
#[derive(Debug, PartialEq, Eq)]
pub enum PauseOutcome {
    /// The session transitioned active -> paused
    Paused,
    /// The session was already paused; nothing was mutated
    AlreadyPaused,
}

/// Outcome of a resume request
#[derive(Debug, PartialEq, Eq)]
pub struct ResumeOutcome {
    pub paused_accumulated_millis: i64,
    /// The record was paused but had no pause timestamp; the delta was
    /// treated as zero
    pub missing_paused_at: bool,
}

/// Outcome of an end request
#[derive(Debug, PartialEq, Eq)]
pub enum EndOutcome {
    /// The session transitioned to ended
    Ended { total_active_millis: i64 },
    /// The session was already terminal; nothing was mutated
    AlreadyEnded { total_active_millis: i64 },
}

/// One timed reading interval owned by a user
///
/// Lifecycle: active -> paused -> active (repeatable) -> ended.
/// Ended is terminal; no further transitions are permitted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Session ID generated at creation
    pub id: String,
    /// Owning user; immutable after creation
    pub user_id: String,
    /// Lifecycle state
    pub status: SessionStatus,
    /// Unix millis at creation; immutable
    pub started_at: i64,
    /// Unix millis of the current pause; present only while paused
    #[serde(default)]
    pub paused_at: Option<i64>,
    /// Total paused duration across all pause/resume cycles
    pub paused_accumulated_millis: i64,
    /// Unix millis at the ended transition
    #[serde(default)]
    pub ended_at: Option<i64>,
    /// Active duration recorded at the ended transition
    #[serde(default)]
    pub total_active_millis: Option<i64>,
    /// Redundant terminal flag kept for older records; must agree with status
    pub completed: bool,
    /// True when the reaper ended this session rather than the owner
    #[serde(default)]
    pub auto_ended: bool,
    /// Why the session ended
    #[serde(default)]
    pub end_reason: Option<String>,
}

impl Session {
    pub fn new(id: String, user_id: String, started_at: i64) -> Self {
        Self {
            id,
            user_id,
            status: SessionStatus::Active,
            started_at,
            paused_at: None,
            paused_accumulated_millis: 0,
            ended_at: None,
            total_active_millis: None,
            completed: false,
            auto_ended: false,
            end_reason: None,
        }
    }

    /// Older records may carry `completed` without `status == ended`;
    /// either marker makes the session terminal.
    pub fn is_terminal(&self) -> bool {
        self.completed || self.status == SessionStatus::Ended
    }

    /// active -> paused. Pausing a paused session is a no-op.
    pub fn pause(&mut self, now_millis: i64) -> Result<PauseOutcome, LedgerError> {
        if self.is_terminal() {
            return Err(LedgerError::AlreadyEnded);
        }
        if self.status == SessionStatus::Paused {
            return Ok(PauseOutcome::AlreadyPaused);
        }

        self.status = SessionStatus::Paused;
        self.paused_at = Some(now_millis);
        Ok(PauseOutcome::Paused)
    }

    /// paused -> active, folding the pause window into the accumulator.
    ///
    /// A missing pause timestamp contributes zero rather than failing;
    /// a negative delta (clock stepped backwards) is clamped to zero so the
    /// accumulator stays monotonic.
    pub fn resume(&mut self, now_millis: i64) -> Result<ResumeOutcome, LedgerError> {
        if self.is_terminal() {
            return Err(LedgerError::AlreadyEnded);
        }
        if self.status != SessionStatus::Paused {
            return Err(LedgerError::NotPaused);
        }

        let missing_paused_at = self.paused_at.is_none();
        if let Some(paused_at) = self.paused_at {
            let delta = now_millis - paused_at;
            if delta > 0 {
                self.paused_accumulated_millis += delta;
            }
        }

        self.paused_at = None;
        self.status = SessionStatus::Active;
        Ok(ResumeOutcome {
            paused_accumulated_millis: self.paused_accumulated_millis,
            missing_paused_at,
        })
    }

    /// -> ended, with the minimum-duration gate.
    ///
    /// Ending an ended session is an idempotent success. An open pause
    /// window is not folded into the accumulator: the recorded total is
    /// `max(0, now - started_at - paused_accumulated_millis)`.
    pub fn end(&mut self, now_millis: i64, min_active_millis: i64) -> Result<EndOutcome, LedgerError> {
        if self.is_terminal() {
            return Ok(EndOutcome::AlreadyEnded {
                total_active_millis: self.total_active_millis.unwrap_or(0),
            });
        }

        let total_active_millis = self.compute_total_active(now_millis);
        if total_active_millis < min_active_millis {
            return Err(LedgerError::SessionTooShort {
                actual_millis: total_active_millis,
                min_millis: min_active_millis,
            });
        }

        self.finish(now_millis, total_active_millis, false, END_REASON_MANUAL);
        Ok(EndOutcome::Ended { total_active_millis })
    }

    /// Terminal transition used by the reaper: no minimum-duration gate.
    /// Returns the recorded total, or None if the session was already
    /// terminal.
    pub fn auto_end(&mut self, now_millis: i64) -> Option<i64> {
        if self.is_terminal() {
            return None;
        }

        let total_active_millis = self.compute_total_active(now_millis);
        self.finish(now_millis, total_active_millis, true, END_REASON_AUTO_TIMEOUT);
        Some(total_active_millis)
    }

    // Duration floor at zero guards against clock skew or a corrupted
    // accumulator producing a negative total.
    fn compute_total_active(&self, now_millis: i64) -> i64 {
        (now_millis - self.started_at - self.paused_accumulated_millis).max(0)
    }

    fn finish(&mut self, now_millis: i64, total_active_millis: i64, auto: bool, reason: &str) {
        self.status = SessionStatus::Ended;
        self.completed = true;
        self.ended_at = Some(now_millis);
        self.total_active_millis = Some(total_active_millis);
        self.auto_ended = auto;
        self.end_reason = Some(reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = 5 * 60 * 1000;

    fn session(started_at: i64) -> Session {
        Session::new("sess00000000000000001".to_string(), "user-1".to_string(), started_at)
    }

    #[test]
    fn test_new_session_is_active() {
        let s = session(1_000);
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.paused_accumulated_millis, 0);
        assert!(!s.completed);
        assert!(!s.is_terminal());
    }

    #[test]
    fn test_pause_sets_paused_at() {
        let mut s = session(1_000);
        let outcome = s.pause(5_000).unwrap();
        assert_eq!(outcome, PauseOutcome::Paused);
        assert_eq!(s.status, SessionStatus::Paused);
        assert_eq!(s.paused_at, Some(5_000));
    }

    #[test]
    fn test_pause_is_idempotent() {
        let mut s = session(1_000);
        s.pause(5_000).unwrap();
        let outcome = s.pause(9_000).unwrap();
        assert_eq!(outcome, PauseOutcome::AlreadyPaused);
        // The original pause timestamp is untouched
        assert_eq!(s.paused_at, Some(5_000));
        assert_eq!(s.status, SessionStatus::Paused);
    }

    #[test]
    fn test_pause_after_end_fails() {
        let mut s = session(0);
        s.end(MIN + 1_000, MIN).unwrap();
        assert!(matches!(s.pause(MIN + 2_000), Err(LedgerError::AlreadyEnded)));
    }

    #[test]
    fn test_resume_accumulates_pause_window() {
        let mut s = session(1_000);
        s.pause(10_000).unwrap();
        let outcome = s.resume(25_000).unwrap();
        assert_eq!(outcome.paused_accumulated_millis, 15_000);
        assert!(!outcome.missing_paused_at);
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.paused_at, None);
    }

    #[test]
    fn test_resume_accumulates_across_cycles() {
        let mut s = session(0);
        s.pause(10_000).unwrap();
        s.resume(15_000).unwrap();
        s.pause(30_000).unwrap();
        let outcome = s.resume(40_000).unwrap();
        assert_eq!(outcome.paused_accumulated_millis, 15_000);
    }

    #[test]
    fn test_resume_active_session_fails() {
        let mut s = session(1_000);
        assert!(matches!(s.resume(5_000), Err(LedgerError::NotPaused)));
    }

    #[test]
    fn test_resume_with_missing_paused_at() {
        let mut s = session(1_000);
        s.pause(5_000).unwrap();
        s.paused_at = None; // simulate a legacy/corrupt record
        let outcome = s.resume(20_000).unwrap();
        assert!(outcome.missing_paused_at);
        assert_eq!(outcome.paused_accumulated_millis, 0);
        assert_eq!(s.status, SessionStatus::Active);
    }

    #[test]
    fn test_resume_clamps_backward_clock() {
        let mut s = session(1_000);
        s.pause(10_000).unwrap();
        // Clock stepped backwards while paused
        let outcome = s.resume(8_000).unwrap();
        assert_eq!(outcome.paused_accumulated_millis, 0);
        assert_eq!(s.status, SessionStatus::Active);
    }

    #[test]
    fn test_end_computes_total_minus_paused() {
        // start T0, pause T0+10min, resume T0+15min, end T0+25min => 20min
        let t0 = 1_700_000_000_000;
        let min10 = 10 * 60 * 1000;
        let mut s = session(t0);
        s.pause(t0 + min10).unwrap();
        s.resume(t0 + min10 + 5 * 60 * 1000).unwrap();
        let outcome = s.end(t0 + 25 * 60 * 1000, MIN).unwrap();
        assert_eq!(
            outcome,
            EndOutcome::Ended {
                total_active_millis: 20 * 60 * 1000
            }
        );
        assert_eq!(s.status, SessionStatus::Ended);
        assert!(s.completed);
        assert_eq!(s.ended_at, Some(t0 + 25 * 60 * 1000));
        assert_eq!(s.end_reason.as_deref(), Some(END_REASON_MANUAL));
        assert!(!s.auto_ended);
    }

    #[test]
    fn test_end_while_paused_counts_open_window_as_active() {
        let t0 = 0;
        let mut s = session(t0);
        s.pause(6 * 60 * 1000).unwrap();
        // Ended without resuming: the open pause window is not accumulated
        let outcome = s.end(20 * 60 * 1000, MIN).unwrap();
        assert_eq!(
            outcome,
            EndOutcome::Ended {
                total_active_millis: 20 * 60 * 1000
            }
        );
    }

    #[test]
    fn test_end_floors_negative_total_at_zero() {
        let mut s = session(100_000);
        s.paused_accumulated_millis = 500_000;
        // now - started - paused would be negative
        let err = s.end(200_000, MIN).unwrap_err();
        match err {
            LedgerError::SessionTooShort { actual_millis, .. } => {
                assert_eq!(actual_millis, 0)
            }
            other => panic!("Expected SessionTooShort, got {:?}", other),
        }
    }

    #[test]
    fn test_end_too_short_leaves_session_non_terminal() {
        let mut s = session(0);
        let err = s.end(2 * 60 * 1000, MIN).unwrap_err();
        assert!(matches!(err, LedgerError::SessionTooShort { .. }));
        assert!(!s.is_terminal());
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.ended_at, None);
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut s = session(0);
        s.end(MIN + 60_000, MIN).unwrap();
        let outcome = s.end(MIN + 120_000, MIN).unwrap();
        assert_eq!(
            outcome,
            EndOutcome::AlreadyEnded {
                total_active_millis: MIN + 60_000
            }
        );
        // The first end's record is untouched
        assert_eq!(s.ended_at, Some(MIN + 60_000));
    }

    #[test]
    fn test_legacy_completed_flag_is_terminal() {
        let mut s = session(0);
        s.completed = true; // older record: flag set without status
        assert!(s.is_terminal());
        assert!(matches!(s.pause(1_000), Err(LedgerError::AlreadyEnded)));
        assert!(matches!(
            s.end(MIN + 1_000, MIN),
            Ok(EndOutcome::AlreadyEnded { .. })
        ));
    }

    #[test]
    fn test_auto_end_skips_duration_gate() {
        let mut s = session(0);
        let total = s.auto_end(60_000).unwrap();
        assert_eq!(total, 60_000);
        assert!(s.is_terminal());
        assert!(s.auto_ended);
        assert_eq!(s.end_reason.as_deref(), Some(END_REASON_AUTO_TIMEOUT));
    }

    #[test]
    fn test_auto_end_on_terminal_session_is_none() {
        let mut s = session(0);
        s.end(MIN + 1_000, MIN).unwrap();
        assert_eq!(s.auto_end(MIN + 2_000), None);
        assert!(!s.auto_ended);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let s = session(0);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"status\":\"active\""));
    }
}
