//! PostgreSQL adapter.
//!
//! - `PostgresStore` - Store and DeviceDirectory over a connection pool
//! - Transactions map one-to-one onto database transactions
//!
//! Schema lives in `migrations/`; the unique indexes there back the
//! join-order and one-record-per-flavour invariants.

mod rows;
mod store;
mod tx;

pub use store::PostgresStore;
