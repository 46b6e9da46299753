pub mod attendance_commands;
pub mod check_in_commands;
pub mod event_commands;
pub mod sync_commands;
