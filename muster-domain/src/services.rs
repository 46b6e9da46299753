// Pure domain services; safe to call from any task concurrently

pub mod geofence;
pub mod penalty_ledger;
pub mod record_merge;
pub mod window_classifier;

pub use geofence::*;
pub use penalty_ledger::*;
pub use record_merge::*;
pub use window_classifier::*;
