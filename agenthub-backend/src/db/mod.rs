//! Database layer - SQLite storage behind a single `Database` handle
//!
//! `sqlite.rs` owns the connection and schema; `tables/` holds the
//! per-table-group `impl Database` blocks.

mod sqlite;
pub mod tables;

pub use sqlite::Database;
