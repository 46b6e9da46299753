use std::time::Duration;

use muster_domain::{AttendanceRecord, MemberId, Verification};
use tracing::warn;

use crate::commands::attendance_commands;
use crate::{AppState, AttendanceError};

/// Verifies the member's credential, then marks attendance.
pub async fn check_in(
    state: &AppState,
    member_id: &str,
    event_id: &str,
) -> Result<AttendanceRecord, AttendanceError> {
    let member = MemberId::parse(member_id)?;
    verify_credential(state, member.as_str()).await?;
    attendance_commands::mark_attendance(state, member.as_str(), event_id).await
}

async fn verify_credential(state: &AppState, member_id: &str) -> Result<(), AttendanceError> {
    let limit = Duration::from_secs(state.config.credential_timeout_seconds.max(1));
    let verdict = match tokio::time::timeout(limit, state.credentials.verify(member_id)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(member_id, timeout_secs = limit.as_secs(), "credential check timed out");
            Verification::Fail("credential check timed out".to_string())
        }
    };
    match verdict {
        Verification::Pass => Ok(()),
        Verification::Fail(reason) => {
            state.metrics.record_rejection(false);
            warn!(member_id, %reason, "credential rejected");
            Err(AttendanceError::CredentialRejected(reason))
        }
    }
}
