//! Sync agent runtime: watcher, per-event sessions, worker pool, uploads.

pub mod dispatch;
pub mod enumerate;
mod error;
pub mod logging;
pub mod pending;
pub mod pool;
mod runtime;
pub mod session;
pub mod upload;
pub mod watcher;

pub use dispatch::Dispatcher;
pub use error::{DaemonError, SessionError, UploadError};
pub use pending::{PendingClaim, PendingDirs};
pub use pool::{PoolTally, WorkerPool};
pub use runtime::{push, push_blocking, run, start_blocking};
pub use session::{SessionReport, SessionScheduler};
pub use upload::{UploadExecutor, UploadReceipt};
pub use watcher::WatchOptions;
