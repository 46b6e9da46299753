// Domain entities

pub mod attendance_record;
pub mod event;
pub mod runtime_config;

pub use attendance_record::*;
pub use event::*;
pub use runtime_config::*;
