//! Notification fan-out for new posts.

mod dispatcher;
mod handle;

pub use dispatcher::{DispatchSettings, NotificationDispatcher, NotifyCommand};
pub use handle::{DispatchHandle, DispatchStats};
