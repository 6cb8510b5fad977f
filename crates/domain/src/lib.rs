//! courtside domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Application use cases / business logic
//! - `schedule`, `sanitize`, `cursor`: Pure, I/O-free building blocks
//! - `state`: Typed access to the persisted key-value state

pub mod cursor;
pub mod model;
pub mod ports;
pub mod sanitize;
pub mod schedule;
pub mod state;
pub mod usecases;

pub use model::*;
pub use ports::*;
