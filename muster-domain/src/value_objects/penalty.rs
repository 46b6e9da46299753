// Penalty tier value object

use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Ordered by severity: `Warning < Minor < Major < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Penalty {
    Warning,
    Minor,
    Major,
    Critical,
}

impl Penalty {
    pub const ALL: [Penalty; 4] = [
        Penalty::Warning,
        Penalty::Minor,
        Penalty::Major,
        Penalty::Critical,
    ];

    pub fn points(self) -> u32 {
        match self {
            Penalty::Warning => 1,
            Penalty::Minor => 3,
            Penalty::Major => 8,
            Penalty::Critical => 15,
        }
    }

    /// Tier for a positive lateness (or early leave) inside the window.
    pub fn for_lateness(late: Duration) -> Self {
        if late <= Duration::minutes(5) {
            Penalty::Warning
        } else if late <= Duration::minutes(15) {
            Penalty::Minor
        } else if late <= Duration::minutes(30) {
            Penalty::Major
        } else {
            Penalty::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Penalty::Warning => "WARNING",
            Penalty::Minor => "MINOR",
            Penalty::Major => "MAJOR",
            Penalty::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Penalty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WARNING" => Ok(Penalty::Warning),
            "MINOR" => Ok(Penalty::Minor),
            "MAJOR" => Ok(Penalty::Major),
            "CRITICAL" => Ok(Penalty::Critical),
            _ => Err(ValidationError::UnknownVariant {
                kind: "penalty",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Penalty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points for an optional penalty; `None` is worth nothing.
pub fn penalty_points(penalty: Option<Penalty>) -> u32 {
    penalty.map(Penalty::points).unwrap_or(0)
}
