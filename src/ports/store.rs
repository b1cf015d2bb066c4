//! Store port - transactional persistence for the membership core.
//!
//! Reads that may return many rows hand back a [`RecordCursor`]. A cursor
//! yields rows until exhausted and reports any failure from `close`, which
//! callers must invoke exactly once, including after an early exit. A
//! failed close fails the whole read; [`collect_cursor`] does this for you.
//!
//! Writes happen through a [`StoreTx`] obtained from [`Store::begin_tx`].
//! The transaction is owned by the operation that opened it and must end
//! in exactly one of `commit` or `rollback`.
//!
//! Uniqueness rules are enforced by the store, not by callers: a write or
//! commit that would break one fails with [`ErrorCode::Conflict`] and the
//! transaction is left for the caller to roll back.
//!
//! [`ErrorCode::Conflict`]: crate::domain::foundation::ErrorCode::Conflict
//!
//! # Example
//!
//! ```ignore
//! let mut tx = store.begin_tx().await?;
//! match tx.put_access_request(&request).await {
//!     Ok(saved) => {
//!         tx.commit().await?;
//!         Ok(saved)
//!     }
//!     Err(err) => Err(abort(tx, err).await),
//! }
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;

use crate::domain::access::{
    DiscussionAccessLink, DiscussionAccessRequest, DiscussionInvite, DiscussionUserAccess,
    LinkSlug,
};
use crate::domain::discussion::{Discussion, Flair, Post};
use crate::domain::foundation::{
    AccessRequestId, DiscussionId, DomainError, Handle, InviteId, ParticipantId, UserId,
};
use crate::domain::participant::{Participant, Viewer};

/// Forward-only cursor over stored records.
#[async_trait]
pub trait RecordCursor<T: Send>: Send {
    /// Next record, or `None` once exhausted or after a failure.
    async fn next(&mut self) -> Option<T>;

    /// Releases the cursor, surfacing any failure hit while reading.
    async fn close(self: Box<Self>) -> Result<(), DomainError>;
}

pub type Cursor<T> = Box<dyn RecordCursor<T>>;

/// Drains `cursor` and closes it, failing if the close fails.
pub async fn collect_cursor<T: Send>(mut cursor: Cursor<T>) -> Result<Vec<T>, DomainError> {
    let mut records = Vec::new();
    while let Some(record) = cursor.next().await {
        records.push(record);
    }
    cursor.close().await?;
    Ok(records)
}

/// Cursor over rows that are already in memory.
///
/// An optional deferred error is reported from `close`, the way a driver
/// reports a failure that interrupted the row stream.
pub struct BufferedCursor<T> {
    rows: VecDeque<T>,
    deferred: Option<DomainError>,
}

impl<T> BufferedCursor<T> {
    pub fn new(rows: impl IntoIterator<Item = T>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
            deferred: None,
        }
    }

    /// A cursor that yields nothing and fails on close.
    pub fn failed(error: DomainError) -> Self {
        Self {
            rows: VecDeque::new(),
            deferred: Some(error),
        }
    }

    pub fn boxed(self) -> Cursor<T>
    where
        T: Send + 'static,
    {
        Box::new(self)
    }
}

#[async_trait]
impl<T: Send> RecordCursor<T> for BufferedCursor<T> {
    async fn next(&mut self) -> Option<T> {
        self.rows.pop_front()
    }

    async fn close(self: Box<Self>) -> Result<(), DomainError> {
        match self.deferred {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Read side of the store, usable outside a transaction.
///
/// Absence is `Ok(None)` or an empty cursor, never an error.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction owned by the caller.
    async fn begin_tx(&self) -> Result<Box<dyn StoreTx>, DomainError>;

    async fn find_discussion(&self, id: &DiscussionId) -> Result<Option<Discussion>, DomainError>;

    async fn find_participant(&self, id: &ParticipantId)
        -> Result<Option<Participant>, DomainError>;

    /// Members of a discussion in join order.
    async fn participants_for_discussion(&self, id: &DiscussionId) -> Cursor<Participant>;

    /// A user's (at most two) records in a discussion.
    async fn participants_for_user(
        &self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Vec<Participant>, DomainError>;

    async fn find_invite(&self, id: &InviteId) -> Result<Option<DiscussionInvite>, DomainError>;

    async fn pending_invites_for_user(&self, user_id: &UserId) -> Cursor<DiscussionInvite>;

    async fn sent_invites(&self, inviter: &ParticipantId) -> Cursor<DiscussionInvite>;

    async fn find_access_request(
        &self,
        id: &AccessRequestId,
    ) -> Result<Option<DiscussionAccessRequest>, DomainError>;

    async fn requests_for_discussion(
        &self,
        discussion_id: &DiscussionId,
    ) -> Cursor<DiscussionAccessRequest>;

    async fn requests_by_user(&self, user_id: &UserId) -> Cursor<DiscussionAccessRequest>;

    async fn find_user_access(
        &self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Option<DiscussionUserAccess>, DomainError>;

    async fn find_user_by_handle(&self, handle: &Handle) -> Result<Option<UserId>, DomainError>;

    /// Users with active access to the discussion who are notified of
    /// every post.
    async fn subscribed_users(&self, discussion_id: &DiscussionId) -> Cursor<UserId>;

    async fn find_access_link(
        &self,
        slug: &LinkSlug,
    ) -> Result<Option<DiscussionAccessLink>, DomainError>;

    /// The most recently created link of the discussion.
    async fn latest_access_link(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Option<DiscussionAccessLink>, DomainError>;
}

/// A unit of work against the store.
#[async_trait]
pub trait StoreTx: Send {
    async fn find_discussion(
        &mut self,
        id: &DiscussionId,
    ) -> Result<Option<Discussion>, DomainError>;

    async fn find_participant(
        &mut self,
        id: &ParticipantId,
    ) -> Result<Option<Participant>, DomainError>;

    /// Number of participant records in the discussion.
    async fn count_participants(&mut self, discussion_id: &DiscussionId)
        -> Result<u32, DomainError>;

    async fn participants_for_user(
        &mut self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Vec<Participant>, DomainError>;

    /// Returns the user's read cursor for the discussion, creating it on
    /// first use.
    async fn get_or_create_viewer(
        &mut self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Viewer, DomainError>;

    /// Inserts or replaces a participant record. Two records of one
    /// discussion sharing a join index conflict.
    async fn put_participant(&mut self, participant: &Participant)
        -> Result<Participant, DomainError>;

    /// Records the (user, participant, viewer) linkage on the user's profile.
    async fn link_user_participant(
        &mut self,
        user_id: &UserId,
        participant: &Participant,
    ) -> Result<(), DomainError>;

    async fn flairs_for_user(&mut self, user_id: &UserId) -> Cursor<Flair>;

    async fn find_invite(&mut self, id: &InviteId) -> Result<Option<DiscussionInvite>, DomainError>;

    async fn find_pending_invite(
        &mut self,
        user_id: &UserId,
        discussion_id: &DiscussionId,
    ) -> Result<Option<DiscussionInvite>, DomainError>;

    /// Inserts an invite. A second pending invite for the same
    /// (user, discussion) conflicts.
    async fn put_invite(&mut self, invite: &DiscussionInvite)
        -> Result<DiscussionInvite, DomainError>;

    /// Persists a status change on an existing invite.
    async fn update_invite(
        &mut self,
        invite: &DiscussionInvite,
    ) -> Result<DiscussionInvite, DomainError>;

    async fn find_access_request(
        &mut self,
        id: &AccessRequestId,
    ) -> Result<Option<DiscussionAccessRequest>, DomainError>;

    async fn find_pending_request(
        &mut self,
        user_id: &UserId,
        discussion_id: &DiscussionId,
    ) -> Result<Option<DiscussionAccessRequest>, DomainError>;

    /// Inserts a request. A second pending request for the same
    /// (user, discussion) conflicts.
    async fn put_access_request(
        &mut self,
        request: &DiscussionAccessRequest,
    ) -> Result<DiscussionAccessRequest, DomainError>;

    /// Persists a status change on an existing access request.
    async fn update_access_request(
        &mut self,
        request: &DiscussionAccessRequest,
    ) -> Result<DiscussionAccessRequest, DomainError>;

    async fn find_user_access(
        &mut self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Option<DiscussionUserAccess>, DomainError>;

    /// Writes the full access row, replacing any existing one.
    async fn put_user_access(
        &mut self,
        access: &DiscussionUserAccess,
    ) -> Result<DiscussionUserAccess, DomainError>;

    async fn put_post(&mut self, post: &Post) -> Result<Post, DomainError>;

    /// Inserts a link. A slug that is already taken conflicts.
    async fn put_access_link(
        &mut self,
        link: &DiscussionAccessLink,
    ) -> Result<DiscussionAccessLink, DomainError>;

    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_cursor_returns_rows_in_order() {
        let rows = collect_cursor(BufferedCursor::new(vec![1, 2, 3]).boxed())
            .await
            .unwrap();
        assert_eq!(rows, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn collect_cursor_fails_when_close_fails() {
        let cursor: Cursor<u8> = BufferedCursor::failed(DomainError::database("stream broke")).boxed();
        let err = collect_cursor(cursor).await.unwrap_err();
        assert_eq!(err.message, "stream broke");
    }

    #[tokio::test]
    async fn close_after_partial_read_succeeds() {
        let mut cursor = BufferedCursor::new(vec!["a", "b"]).boxed();
        assert_eq!(cursor.next().await, Some("a"));
        assert!(cursor.close().await.is_ok());
    }
}
