//! Access module - invites, access requests and per-user access rows.
//!
//! # Module Structure
//!
//! - `status` - Pending → Accepted | Rejected state machine and invite types
//! - `invite` - DiscussionInvite and DiscussionAccessRequest
//! - `user_access` - DiscussionUserAccess with merge-on-upsert semantics
//! - `link` - Shareable access links with random slugs
//! - `errors` - Access-workflow errors

mod errors;
mod invite;
mod link;
mod status;
mod user_access;

pub use errors::AccessError;
pub use invite::{DiscussionAccessRequest, DiscussionInvite};
pub use link::{DiscussionAccessLink, LinkSlug, SLUG_LENGTH};
pub use status::{InviteRequestStatus, InviteType};
pub use user_access::{
    merge_user_access, AccessState, DiscussionUserAccess, NotificationSetting, UserAccessUpdate,
};
