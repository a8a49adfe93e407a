//! Store backends for svcwatch.
//!
//! - [`MemoryStore`]: process-local, for tests and ephemeral runs
//! - [`SqliteStore`]: durable, one file per registry
//! - [`TimedStore`]: wraps any backend and bounds every call with a deadline

mod memory;
mod schema;
mod sqlite;
mod timed;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use timed::TimedStore;
