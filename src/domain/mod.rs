//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `identity` - Deterministic pseudonym generation
//! - `participant` - Dual-identity membership records
//! - `access` - Invites, access requests and access rows
//! - `discussion` - Discussions, posts and flair
//! - `notification` - Devices, push payloads and send status

pub mod access;
pub mod discussion;
pub mod foundation;
pub mod identity;
pub mod notification;
pub mod participant;
