//! courtside adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `state`: SQLite and in-memory state stores
//! - `x_api`: X (Twitter) timeline reader via RapidAPI
//! - `bluesky`: Bluesky XRPC destination
//! - `http`: shared HTTP client, schedule page and media downloads

mod state_memory;
mod state_sqlite;

pub mod bluesky;
pub mod http;
pub mod x_api;

/// Re-exports for state adapters
pub mod state {
    pub use crate::state_memory::InMemoryStateStore;
    pub use crate::state_sqlite::SqliteStateStore;
}
