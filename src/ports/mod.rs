//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `Store` / `StoreTx` - Transactional persistence with cursor reads
//! - `DeviceDirectory` - Device lookup by user
//! - `PushGateway` - Push payload delivery

mod device_directory;
mod push_gateway;
mod store;

pub use device_directory::DeviceDirectory;
pub use push_gateway::PushGateway;
pub use store::{collect_cursor, BufferedCursor, Cursor, RecordCursor, Store, StoreTx};
