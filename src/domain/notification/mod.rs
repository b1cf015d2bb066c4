//! Notification module - devices, push payloads and per-target status.
//!
//! # Module Structure
//!
//! - `device` - UserDevice records supplied by the device directory
//! - `payload` - Push payload construction with character truncation
//! - `status` - Per-target send status emitted by the dispatcher
//! - `errors` - Dispatcher errors

mod device;
mod errors;
mod payload;
mod status;

pub use device::{most_recent_device, UserDevice};
pub use errors::NotificationError;
pub use payload::{PayloadLimits, PushNotification};
pub use status::SendStatus;
