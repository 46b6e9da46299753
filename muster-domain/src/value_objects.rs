// Domain value objects
pub mod attendance_status;
pub mod geo;
pub mod identifiers;
pub mod penalty;
pub mod risk_level;
pub mod watermark;

pub use attendance_status::*;
pub use geo::*;
pub use identifiers::*;
pub use penalty::*;
pub use risk_level::*;
pub use watermark::*;
