pub mod context;
pub mod lifecycle;
pub mod logging;

pub use context::{AppContext, ContextOptions};
pub use lifecycle::{run_daemon, shutdown_signal, SyncDaemonHandle};
pub use logging::init_tracing;
