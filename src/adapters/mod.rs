//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - Transactional in-memory store for tests and local runs
//! - `postgres` - PostgreSQL store and device directory
//! - `push` - Push gateways (HTTP relay, recording)

pub mod memory;
pub mod postgres;
pub mod push;

pub use memory::{InMemoryStore, StoreOp};
pub use postgres::PostgresStore;
pub use push::{HttpPushConfig, HttpPushGateway, RecordingPushGateway};
