//! Database layer for the Hypergate grid services.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. The region directory — including persisted
//! hyperlink rows — and the minimal local-account table live here; everything
//! else about accounts is the responsibility of the surrounding grid stack.
//!
//! SQLite in WAL mode fits the access pattern of a grid service: many
//! concurrent readers (region lookups from request handlers) with a single
//! writer (link/unlink). Migrations are compiled into the binary via
//! `include_str!` so the schema cannot drift from the code that depends
//! on it.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
