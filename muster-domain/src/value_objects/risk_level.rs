// Risk level value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const LOW_MAX_POINTS: u32 = 20;
    pub const MEDIUM_MAX_POINTS: u32 = 40;
    pub const HIGH_MAX_POINTS: u32 = 60;

    /// Upper bounds are inclusive.
    pub fn from_points(points: u32) -> Self {
        if points <= Self::LOW_MAX_POINTS {
            RiskLevel::Low
        } else if points <= Self::MEDIUM_MAX_POINTS {
            RiskLevel::Medium
        } else if points <= Self::HIGH_MAX_POINTS {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(RiskLevel::from_points(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_points(20), RiskLevel::Low);
        assert_eq!(RiskLevel::from_points(21), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_points(40), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_points(41), RiskLevel::High);
        assert_eq!(RiskLevel::from_points(60), RiskLevel::High);
        assert_eq!(RiskLevel::from_points(61), RiskLevel::Critical);
    }
}
