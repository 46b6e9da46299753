pub mod http_remote;
pub mod memory_store;
pub mod sqlite_store;

pub use http_remote::*;
pub use memory_store::*;
pub use sqlite_store::*;
