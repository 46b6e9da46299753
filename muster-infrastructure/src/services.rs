pub mod clock_service;
pub mod credential_service;
pub mod health_service;
pub mod location_service;
pub mod sync_scheduler;

pub use clock_service::*;
pub use credential_service::*;
pub use health_service::*;
pub use location_service::*;
pub use sync_scheduler::*;
