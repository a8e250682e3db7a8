use crate::core::state::AppState;
use crate::wal::wal::WalOperation;
use anyhow::Result;
use std::collections::HashSet;
use tracing::{info, warn};

// this runs at boot time
pub fn apply_wal_operations(state: &AppState, operations: &[WalOperation]) -> Result<()> {
    for op in operations {
        match op {
            WalOperation::UpsertUser { user } => {
                state.users.upsert(user.clone());
            }
            WalOperation::UpsertSession { session } => {
                state.sessions.upsert(session.clone());
            }
            WalOperation::UpsertPayment { payment } => {
                state.payments.upsert(payment.clone());
            }
        }
    }
    Ok(())
}

/// Re-establish the invariant that `active_session` is set exactly for users
/// owning a non-terminal session.
///
/// Replay applies snapshots in order, so a crash between a session write and
/// the matching user write can leave the flag stale. Returns the number of
/// flags repaired.
pub fn reconcile_active_flags(state: &AppState) -> usize {
    let open_owners: HashSet<String> = state
        .sessions
        .users_with_open_sessions()
        .into_iter()
        .collect();

    let mut repaired = 0;

    for user_id in state.users.flagged_active_ids() {
        if !open_owners.contains(&user_id) {
            state.users.set_active_session(&user_id, false);
            warn!(user_id = %user_id, "Cleared stale active-session flag after replay");
            repaired += 1;
        }
    }

    for user_id in &open_owners {
        match state.users.get(user_id) {
            Some(user) if !user.active_session => {
                state.users.set_active_session(user_id, true);
                warn!(user_id = %user_id, "Restored missing active-session flag after replay");
                repaired += 1;
            }
            Some(_) => {}
            None => {
                warn!(user_id = %user_id, "Open session owned by unknown user after replay");
            }
        }
    }

    if repaired > 0 {
        info!(repaired = repaired, "Active-session flags reconciled");
    }

    repaired
}
