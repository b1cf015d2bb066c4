//! In-memory adapters for tests and local runs.

mod store;

pub use store::{InMemoryStore, StoreOp, UserParticipantLink};
