use muster_domain::{analysis, preview_risk, MemberId, Penalty, PenaltyAnalysis, RiskLevel};

use crate::{AppState, AttendanceError};

pub async fn analyze_member(
    state: &AppState,
    member_id: &str,
) -> Result<PenaltyAnalysis, AttendanceError> {
    let member = MemberId::parse(member_id)?;
    let records = state.local_store.list_member_records(member.as_str()).await?;
    Ok(analysis(member.as_str(), &records))
}

/// Risk level the member would reach if `candidate` were added to their history.
pub async fn preview_member_risk(
    state: &AppState,
    member_id: &str,
    candidate: Option<Penalty>,
) -> Result<RiskLevel, AttendanceError> {
    let member = MemberId::parse(member_id)?;
    let records = state.local_store.list_member_records(member.as_str()).await?;
    Ok(preview_risk(&records, candidate))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use muster_domain::{AttendanceRecord, AttendanceStatus, LocalStore};

    use super::*;
    use crate::test_support::{harness, FakeLocation, CENTER};

    async fn seed(h: &crate::test_support::Harness, id: &str, event: &str, penalty: Option<Penalty>) {
        let record = AttendanceRecord {
            id: id.to_string(),
            member_id: "m1".to_string(),
            event_id: event.to_string(),
            arrived_at: Utc::now(),
            status: if penalty == Some(Penalty::Critical) {
                AttendanceStatus::Absent
            } else {
                AttendanceStatus::Late
            },
            penalty,
            fix: None,
            synced: true,
            note: None,
            departed_at: None,
            departure_status: None,
            departure_penalty: None,
            updated_at: Utc::now(),
        };
        h.local.upsert_record(&record).await.unwrap();
    }

    #[tokio::test]
    async fn analysis_covers_stored_history() {
        let h = harness(FakeLocation::At(CENTER));
        seed(&h, "r1", "e1", Some(Penalty::Warning)).await;
        seed(&h, "r2", "e2", Some(Penalty::Warning)).await;
        seed(&h, "r3", "e3", Some(Penalty::Major)).await;

        let report = analyze_member(&h.state, "m1").await.unwrap();
        assert_eq!(report.points, 10);
        assert_eq!(report.risk_level, RiskLevel::Low);

        let preview = preview_member_risk(&h.state, "m1", Some(Penalty::Critical))
            .await
            .unwrap();
        assert_eq!(preview, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn blank_member_is_rejected() {
        let h = harness(FakeLocation::At(CENTER));
        let err = analyze_member(&h.state, "  ").await.unwrap_err();
        assert!(matches!(err, AttendanceError::Validation(_)));
    }
}
