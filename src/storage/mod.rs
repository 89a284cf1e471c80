//! Storage layer for pitcher statistics
//!
//! This module provides a clean abstraction over the SQLite database,
//! organized into logical components:
//! - `models`: Data structures
//! - `schema`: Database connection and schema management
//! - `queries`: Pitcher, game, appearance and pitch event operations
//! - `sync_state`: Per-unit synchronization bookkeeping
//! - `derived`: Cached metric payloads

pub mod derived;
pub mod models;
pub mod queries;
pub mod schema;
pub mod sync_state;

#[cfg(test)]
mod tests;

// Re-export the main types and database struct for easy access
pub use models::*;
pub use schema::{DatabaseLocation, Repository};
