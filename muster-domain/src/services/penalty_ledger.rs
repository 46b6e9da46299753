use serde::{Deserialize, Serialize};

use crate::entities::AttendanceRecord;
use crate::value_objects::{penalty_points, Penalty, RiskLevel};

/// Attendance rate (percent) under which extra recommendations apply.
pub const ATTENDANCE_RATE_THRESHOLD: f64 = 95.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakdown {
    pub warning: usize,
    pub minor: usize,
    pub major: usize,
    pub critical: usize,
}

impl TierBreakdown {
    fn record(&mut self, penalty: Penalty) {
        match penalty {
            Penalty::Warning => self.warning += 1,
            Penalty::Minor => self.minor += 1,
            Penalty::Major => self.major += 1,
            Penalty::Critical => self.critical += 1,
        }
    }

    pub fn count(&self, penalty: Penalty) -> usize {
        match penalty {
            Penalty::Warning => self.warning,
            Penalty::Minor => self.minor,
            Penalty::Major => self.major,
            Penalty::Critical => self.critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyAnalysis {
    pub member_id: String,
    pub points: u32,
    pub risk_level: RiskLevel,
    pub breakdown: TierBreakdown,
    pub attendance_rate: f64,
    pub flagged_for_review: bool,
    pub recommendations: Vec<String>,
}

pub fn total_points(records: &[AttendanceRecord]) -> u32 {
    records
        .iter()
        .flat_map(AttendanceRecord::penalties)
        .map(Penalty::points)
        .sum()
}

/// Total including a penalty that has not been persisted yet.
pub fn preview_points(records: &[AttendanceRecord], candidate: Option<Penalty>) -> u32 {
    total_points(records) + penalty_points(candidate)
}

pub fn preview_risk(records: &[AttendanceRecord], candidate: Option<Penalty>) -> RiskLevel {
    risk_level(preview_points(records, candidate))
}

pub fn risk_level(points: u32) -> RiskLevel {
    RiskLevel::from_points(points)
}

/// Share of records marked present or late, in percent. No history counts as perfect.
pub fn attendance_rate(records: &[AttendanceRecord]) -> f64 {
    if records.is_empty() {
        return 100.0;
    }
    let attended = records
        .iter()
        .filter(|record| record.status.counts_as_attended())
        .count();
    attended as f64 / records.len() as f64 * 100.0
}

/// Builds the member's standing. Records belonging to other members are ignored.
pub fn analysis(member_id: &str, records: &[AttendanceRecord]) -> PenaltyAnalysis {
    let own: Vec<AttendanceRecord> = records
        .iter()
        .filter(|record| record.member_id == member_id)
        .cloned()
        .collect();

    let mut breakdown = TierBreakdown::default();
    for penalty in own.iter().flat_map(AttendanceRecord::penalties) {
        breakdown.record(penalty);
    }

    let points = total_points(&own);
    let risk_level = risk_level(points);
    let attendance_rate = attendance_rate(&own);

    PenaltyAnalysis {
        member_id: member_id.to_string(),
        points,
        risk_level,
        breakdown,
        attendance_rate,
        flagged_for_review: risk_level == RiskLevel::Critical,
        recommendations: recommendations(risk_level, attendance_rate),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateBand {
    Any,
    BelowThreshold,
    AtOrAboveThreshold,
}

impl RateBand {
    fn matches(self, rate: f64) -> bool {
        match self {
            RateBand::Any => true,
            RateBand::BelowThreshold => rate < ATTENDANCE_RATE_THRESHOLD,
            RateBand::AtOrAboveThreshold => rate >= ATTENDANCE_RATE_THRESHOLD,
        }
    }
}

struct RecommendationRule {
    level: RiskLevel,
    band: RateBand,
    text: &'static str,
}

const RECOMMENDATION_TABLE: &[RecommendationRule] = &[
    RecommendationRule {
        level: RiskLevel::Low,
        band: RateBand::AtOrAboveThreshold,
        text: "Attendance is in good standing; no action required.",
    },
    RecommendationRule {
        level: RiskLevel::Low,
        band: RateBand::BelowThreshold,
        text: "Send a friendly reminder about upcoming events.",
    },
    RecommendationRule {
        level: RiskLevel::Medium,
        band: RateBand::Any,
        text: "Send a formal punctuality reminder.",
    },
    RecommendationRule {
        level: RiskLevel::Medium,
        band: RateBand::BelowThreshold,
        text: "Schedule a check-in conversation about missed events.",
    },
    RecommendationRule {
        level: RiskLevel::High,
        band: RateBand::Any,
        text: "Issue a written warning.",
    },
    RecommendationRule {
        level: RiskLevel::High,
        band: RateBand::Any,
        text: "Require a meeting with the event coordinator.",
    },
    RecommendationRule {
        level: RiskLevel::High,
        band: RateBand::BelowThreshold,
        text: "Place the member on an attendance improvement plan.",
    },
    RecommendationRule {
        level: RiskLevel::Critical,
        band: RateBand::Any,
        text: "Refer the member for disciplinary review.",
    },
    RecommendationRule {
        level: RiskLevel::Critical,
        band: RateBand::Any,
        text: "Suspend event privileges until the review concludes.",
    },
];

/// Table lookup; output order follows table order.
pub fn recommendations(level: RiskLevel, attendance_rate: f64) -> Vec<String> {
    RECOMMENDATION_TABLE
        .iter()
        .filter(|rule| rule.level == level && rule.band.matches(attendance_rate))
        .map(|rule| rule.text.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::AttendanceStatus;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn record(member_id: &str, status: AttendanceStatus, penalty: Option<Penalty>) -> AttendanceRecord {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        AttendanceRecord {
            id: crate::value_objects::new_record_id(),
            member_id: member_id.to_string(),
            event_id: "e".to_string(),
            arrived_at: at,
            status,
            penalty,
            fix: None,
            synced: false,
            note: None,
            departed_at: None,
            departure_status: None,
            departure_penalty: None,
            updated_at: at,
        }
    }

    fn late(penalty: Penalty) -> AttendanceRecord {
        record("m1", AttendanceStatus::Late, Some(penalty))
    }

    #[test]
    fn documented_example_low_then_medium() {
        let mut records = vec![
            late(Penalty::Warning),
            late(Penalty::Warning),
            late(Penalty::Major),
        ];
        assert_eq!(total_points(&records), 10);
        assert_eq!(risk_level(total_points(&records)), RiskLevel::Low);

        assert_eq!(preview_points(&records, Some(Penalty::Critical)), 25);
        assert_eq!(preview_risk(&records, Some(Penalty::Critical)), RiskLevel::Medium);

        records.push(record("m1", AttendanceStatus::Absent, Some(Penalty::Critical)));
        assert_eq!(total_points(&records), 25);
        assert_eq!(risk_level(total_points(&records)), RiskLevel::Medium);
    }

    #[test]
    fn departure_penalties_count() {
        let mut r = record("m1", AttendanceStatus::Present, None);
        r.departure_penalty = Some(Penalty::Minor);
        let records = vec![r, late(Penalty::Warning)];
        assert_eq!(total_points(&records), 4);
        let report = analysis("m1", &records);
        assert_eq!(report.breakdown.minor, 1);
        assert_eq!(report.breakdown.warning, 1);
    }

    #[test]
    fn empty_history_is_perfect() {
        let report = analysis("nobody", &[]);
        assert_eq!(report.points, 0);
        assert_eq!(report.attendance_rate, 100.0);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert!(!report.flagged_for_review);
        assert_eq!(
            report.recommendations,
            vec!["Attendance is in good standing; no action required.".to_string()]
        );
    }

    #[test]
    fn attendance_rate_counts_present_and_late() {
        let records = vec![
            record("m1", AttendanceStatus::Present, None),
            late(Penalty::Warning),
            record("m1", AttendanceStatus::Absent, Some(Penalty::Critical)),
            record("m1", AttendanceStatus::Excused, None),
        ];
        assert_eq!(attendance_rate(&records), 50.0);
    }

    #[test]
    fn critical_members_are_flagged() {
        let records: Vec<_> = (0..5)
            .map(|_| record("m1", AttendanceStatus::Absent, Some(Penalty::Critical)))
            .collect();
        let report = analysis("m1", &records);
        assert_eq!(report.points, 75);
        assert_eq!(report.risk_level, RiskLevel::Critical);
        assert!(report.flagged_for_review);
        assert_eq!(report.breakdown.count(Penalty::Critical), 5);
        assert_eq!(report.attendance_rate, 0.0);
        assert_eq!(report.recommendations.len(), 2);
    }

    #[test]
    fn analysis_ignores_other_members() {
        let records = vec![
            late(Penalty::Major),
            record("m2", AttendanceStatus::Absent, Some(Penalty::Critical)),
        ];
        let report = analysis("m1", &records);
        assert_eq!(report.points, 8);
        assert_eq!(report.attendance_rate, 100.0);
    }

    #[test]
    fn recommendations_follow_rate_threshold() {
        let at = recommendations(RiskLevel::Medium, 95.0);
        let below = recommendations(RiskLevel::Medium, 94.9);
        assert_eq!(at.len(), 1);
        assert_eq!(below.len(), 2);
        assert_eq!(below[0], at[0]);
    }

    #[test]
    fn every_level_has_advice_in_both_bands() {
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical] {
            assert!(!recommendations(level, 100.0).is_empty());
            assert!(!recommendations(level, 10.0).is_empty());
        }
    }

    proptest! {
        #[test]
        fn totals_ignore_order(tiers in proptest::collection::vec(0usize..5, 0..40), rotate in 0usize..40) {
            let records: Vec<_> = tiers
                .iter()
                .map(|&i| {
                    let penalty = Penalty::ALL.get(i).copied();
                    record("m1", AttendanceStatus::Late, penalty)
                })
                .collect();
            let mut shuffled = records.clone();
            shuffled.reverse();
            if !shuffled.is_empty() {
                let k = rotate % shuffled.len();
                shuffled.rotate_left(k);
            }
            prop_assert_eq!(total_points(&records), total_points(&shuffled));
        }
    }
}
