//! Conclave - discussion membership core
//!
//! Pseudonymous participant identities, invitation and access-request
//! workflows, and best-effort push fan-out for new posts.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
