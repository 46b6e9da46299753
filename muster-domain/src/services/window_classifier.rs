use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Event;
use crate::value_objects::{AttendanceStatus, Penalty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub status: AttendanceStatus,
    pub penalty: Option<Penalty>,
}

impl Classification {
    fn present() -> Self {
        Self {
            status: AttendanceStatus::Present,
            penalty: None,
        }
    }

    fn absent() -> Self {
        Self {
            status: AttendanceStatus::Absent,
            penalty: Some(Penalty::Critical),
        }
    }

    fn late(penalty: Penalty) -> Self {
        Self {
            status: AttendanceStatus::Late,
            penalty: Some(penalty),
        }
    }
}

/// Classifies an arrival against the sign-in window.
///
/// Arriving before the window opens is treated like arriving inside it: there is
/// no lower bound and early arrival is never penalized.
pub fn classify_arrival(event: &Event, arrived_at: DateTime<Utc>) -> Classification {
    let start = event.starts_at;
    if arrived_at <= start {
        return Classification::present();
    }
    if arrived_at <= event.sign_in_closes_at() {
        return Classification::late(Penalty::for_lateness(arrived_at - start));
    }
    Classification::absent()
}

/// Classifies a departure against the sign-out window, mirroring
/// [`classify_arrival`] around the event end.
pub fn classify_departure(event: &Event, departed_at: DateTime<Utc>) -> Classification {
    let end = event.ends_at;
    if departed_at >= end {
        return Classification::present();
    }
    if departed_at >= event.sign_out_opens_at() {
        return Classification::late(Penalty::for_lateness(end - departed_at));
    }
    Classification::absent()
}
