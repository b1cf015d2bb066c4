//! In-memory Store and DeviceDirectory.
//!
//! A transaction works on a private copy of the state taken at `begin_tx`
//! and journals every write. `commit` replays the journal onto the shared
//! state; `rollback` discards it. Reads inside the transaction see its own
//! writes, reads outside see only committed data.
//!
//! The uniqueness rules of the SQL schema are checked twice: against the
//! transaction's copy when a row is written, and against the shared state
//! when the journal is replayed. A commit that loses a race therefore
//! fails with `Conflict` and applies nothing, as a unique index would.
//!
//! Operations can be made to fail with [`InMemoryStore::fail_on`] to drive
//! error paths in tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::domain::access::{
    AccessState, DiscussionAccessLink, DiscussionAccessRequest, DiscussionInvite,
    DiscussionUserAccess, InviteRequestStatus, LinkSlug, NotificationSetting,
};
use crate::domain::discussion::{Discussion, Flair, Post};
use crate::domain::foundation::{
    AccessRequestId, DiscussionId, DomainError, ErrorCode, Handle, InviteId, ParticipantId,
    UserId, ViewerId,
};
use crate::domain::notification::UserDevice;
use crate::domain::participant::{Participant, Viewer};
use crate::ports::{BufferedCursor, Cursor, DeviceDirectory, Store, StoreTx};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Begin,
    Commit,
    Rollback,
    CountParticipants,
    GetOrCreateViewer,
    PutParticipant,
    LinkUserParticipant,
    PutInvite,
    UpdateInvite,
    PutAccessRequest,
    UpdateAccessRequest,
    PutUserAccess,
    PutPost,
    PutAccessLink,
    /// Every cursor read fails on close.
    CursorRead,
    DeviceLookup,
}

/// Link between a user and one of their participant records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserParticipantLink {
    pub user_id: UserId,
    pub participant_id: ParticipantId,
    pub viewer_id: ViewerId,
}

#[derive(Debug, Clone)]
enum Write {
    Participant(Participant),
    Viewer(Viewer),
    Link(UserParticipantLink),
    Invite(DiscussionInvite),
    Request(DiscussionAccessRequest),
    Access(DiscussionUserAccess),
    Post(Post),
    AccessLink(DiscussionAccessLink),
}

#[derive(Debug, Clone, Default)]
struct State {
    discussions: HashMap<DiscussionId, Discussion>,
    participants: Vec<Participant>,
    viewers: HashMap<(DiscussionId, UserId), Viewer>,
    links: Vec<UserParticipantLink>,
    invites: Vec<DiscussionInvite>,
    requests: Vec<DiscussionAccessRequest>,
    access: HashMap<(DiscussionId, UserId), DiscussionUserAccess>,
    posts: Vec<Post>,
    access_links: Vec<DiscussionAccessLink>,
    flairs: Vec<Flair>,
    handles: HashMap<Handle, UserId>,
    devices: Vec<UserDevice>,
}

impl State {
    fn apply(&mut self, write: Write) {
        match write {
            Write::Participant(p) => upsert_by(&mut self.participants, p, |a, b| a.id == b.id),
            Write::Viewer(v) => {
                self.viewers.insert((v.discussion_id, v.user_id.clone()), v);
            }
            Write::Link(link) => {
                if !self.links.contains(&link) {
                    self.links.push(link);
                }
            }
            Write::Invite(i) => upsert_by(&mut self.invites, i, |a, b| a.id == b.id),
            Write::Request(r) => upsert_by(&mut self.requests, r, |a, b| a.id == b.id),
            Write::Access(a) => {
                self.access.insert((a.discussion_id, a.user_id.clone()), a);
            }
            Write::Post(p) => self.posts.push(p),
            Write::AccessLink(l) => self.access_links.push(l),
        }
    }

    /// The unique-index violation `write` would cause, if any.
    fn conflict(&self, write: &Write) -> Option<DomainError> {
        let clash = match write {
            Write::Participant(p) => self.participants.iter().any(|other| {
                other.id != p.id
                    && other.discussion_id == p.discussion_id
                    && other.participant_index == p.participant_index
            }),
            Write::Invite(i) if i.is_pending() => self.invites.iter().any(|other| {
                other.id != i.id
                    && other.is_pending()
                    && other.user_id == i.user_id
                    && other.discussion_id == i.discussion_id
            }),
            Write::Request(r) if r.status == InviteRequestStatus::Pending => {
                self.requests.iter().any(|other| {
                    other.id != r.id
                        && other.status == InviteRequestStatus::Pending
                        && other.user_id == r.user_id
                        && other.discussion_id == r.discussion_id
                })
            }
            Write::AccessLink(l) => self.access_links.iter().any(|o| o.link_slug == l.link_slug),
            _ => false,
        };
        clash.then(|| {
            DomainError::new(ErrorCode::Conflict, format!("{} already taken", write.describe()))
        })
    }

    fn participants_in(&self, discussion_id: &DiscussionId) -> Vec<Participant> {
        let mut rows: Vec<Participant> = self
            .participants
            .iter()
            .filter(|p| &p.discussion_id == discussion_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.participant_index);
        rows
    }

    fn participants_for_user(&self, discussion_id: &DiscussionId, user_id: &UserId) -> Vec<Participant> {
        self.participants
            .iter()
            .filter(|p| &p.discussion_id == discussion_id && p.is_owned_by(user_id))
            .cloned()
            .collect()
    }

    fn find_participant(&self, id: &ParticipantId) -> Option<Participant> {
        self.participants.iter().find(|p| &p.id == id).cloned()
    }

    fn find_invite(&self, id: &InviteId) -> Option<DiscussionInvite> {
        self.invites.iter().find(|i| &i.id == id).cloned()
    }

    fn find_request(&self, id: &AccessRequestId) -> Option<DiscussionAccessRequest> {
        self.requests.iter().find(|r| &r.id == id).cloned()
    }
}

impl Write {
    fn describe(&self) -> &'static str {
        match self {
            Write::Participant(_) => "Participant index",
            Write::Invite(_) => "Pending invite",
            Write::Request(_) => "Pending access request",
            Write::AccessLink(_) => "Access link slug",
            Write::Viewer(_) | Write::Link(_) | Write::Access(_) | Write::Post(_) => "Row",
        }
    }
}

fn upsert_by<T>(rows: &mut Vec<T>, row: T, same: impl Fn(&T, &T) -> bool) {
    match rows.iter_mut().find(|existing| same(existing, &row)) {
        Some(slot) => *slot = row,
        None => rows.push(row),
    }
}

fn poisoned() -> DomainError {
    DomainError::new(ErrorCode::InternalError, "In-memory store lock poisoned")
}

fn injected(op: StoreOp) -> DomainError {
    DomainError::database(format!("Injected failure: {:?}", op)).with_detail("op", format!("{:?}", op))
}

#[derive(Debug, Default)]
struct Failures(RwLock<HashSet<StoreOp>>);

impl Failures {
    fn check(&self, op: StoreOp) -> Result<(), DomainError> {
        let set = self.0.read().map_err(|_| poisoned())?;
        if set.contains(&op) {
            Err(injected(op))
        } else {
            Ok(())
        }
    }

    fn cursor<T: Send + 'static>(&self, rows: Result<Vec<T>, DomainError>) -> Cursor<T> {
        match rows.and_then(|rows| self.check(StoreOp::CursorRead).map(|_| rows)) {
            Ok(rows) => BufferedCursor::new(rows).boxed(),
            Err(err) => BufferedCursor::failed(err).boxed(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// Transactional in-memory store for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    failures: Arc<Failures>,
    counters: Arc<Counters>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<R>(&self, f: impl FnOnce(&State) -> R) -> Result<R, DomainError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(f(&state))
    }

    fn write<R>(&self, f: impl FnOnce(&mut State) -> R) -> Result<R, DomainError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        Ok(f(&mut state))
    }

    // === Failure injection ===

    /// Makes every later `op` fail until [`InMemoryStore::clear_failures`].
    pub fn fail_on(&self, op: StoreOp) -> Result<(), DomainError> {
        self.failures.0.write().map_err(|_| poisoned())?.insert(op);
        Ok(())
    }

    pub fn clear_failures(&self) -> Result<(), DomainError> {
        self.failures.0.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }

    // === Seeding ===

    pub fn insert_discussion(&self, discussion: Discussion) -> Result<(), DomainError> {
        self.write(|s| {
            s.discussions.insert(discussion.id, discussion);
        })
    }

    pub fn insert_flair(&self, flair: Flair) -> Result<(), DomainError> {
        self.write(|s| s.flairs.push(flair))
    }

    pub fn register_handle(&self, handle: Handle, user_id: UserId) -> Result<(), DomainError> {
        self.write(|s| {
            s.handles.insert(handle, user_id);
        })
    }

    pub fn insert_device(&self, device: UserDevice) -> Result<(), DomainError> {
        self.write(|s| s.devices.push(device))
    }

    // === Inspection ===

    pub fn participants(&self) -> Result<Vec<Participant>, DomainError> {
        self.read(|s| s.participants.clone())
    }

    pub fn invites(&self) -> Result<Vec<DiscussionInvite>, DomainError> {
        self.read(|s| s.invites.clone())
    }

    pub fn access_requests(&self) -> Result<Vec<DiscussionAccessRequest>, DomainError> {
        self.read(|s| s.requests.clone())
    }

    pub fn posts(&self) -> Result<Vec<Post>, DomainError> {
        self.read(|s| s.posts.clone())
    }

    pub fn viewers(&self) -> Result<Vec<Viewer>, DomainError> {
        self.read(|s| s.viewers.values().cloned().collect())
    }

    pub fn links(&self) -> Result<Vec<UserParticipantLink>, DomainError> {
        self.read(|s| s.links.clone())
    }

    pub fn access_links(&self) -> Result<Vec<DiscussionAccessLink>, DomainError> {
        self.read(|s| s.access_links.clone())
    }

    pub fn commit_count(&self) -> usize {
        self.counters.commits.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> usize {
        self.counters.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin_tx(&self) -> Result<Box<dyn StoreTx>, DomainError> {
        self.failures.check(StoreOp::Begin)?;
        let working = self.read(State::clone)?;
        Ok(Box::new(InMemoryTx {
            shared: Arc::clone(&self.state),
            failures: Arc::clone(&self.failures),
            counters: Arc::clone(&self.counters),
            working,
            journal: Vec::new(),
        }))
    }

    async fn find_discussion(&self, id: &DiscussionId) -> Result<Option<Discussion>, DomainError> {
        self.read(|s| s.discussions.get(id).cloned())
    }

    async fn find_participant(
        &self,
        id: &ParticipantId,
    ) -> Result<Option<Participant>, DomainError> {
        self.read(|s| s.find_participant(id))
    }

    async fn participants_for_discussion(&self, id: &DiscussionId) -> Cursor<Participant> {
        self.failures.cursor(self.read(|s| s.participants_in(id)))
    }

    async fn participants_for_user(
        &self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Vec<Participant>, DomainError> {
        self.read(|s| s.participants_for_user(discussion_id, user_id))
    }

    async fn find_invite(&self, id: &InviteId) -> Result<Option<DiscussionInvite>, DomainError> {
        self.read(|s| s.find_invite(id))
    }

    async fn pending_invites_for_user(&self, user_id: &UserId) -> Cursor<DiscussionInvite> {
        self.failures.cursor(self.read(|s| {
            s.invites
                .iter()
                .filter(|i| &i.user_id == user_id && i.is_pending())
                .cloned()
                .collect()
        }))
    }

    async fn sent_invites(&self, inviter: &ParticipantId) -> Cursor<DiscussionInvite> {
        self.failures.cursor(self.read(|s| {
            s.invites
                .iter()
                .filter(|i| &i.inviting_participant_id == inviter)
                .cloned()
                .collect()
        }))
    }

    async fn find_access_request(
        &self,
        id: &AccessRequestId,
    ) -> Result<Option<DiscussionAccessRequest>, DomainError> {
        self.read(|s| s.find_request(id))
    }

    async fn requests_for_discussion(
        &self,
        discussion_id: &DiscussionId,
    ) -> Cursor<DiscussionAccessRequest> {
        self.failures.cursor(self.read(|s| {
            s.requests
                .iter()
                .filter(|r| &r.discussion_id == discussion_id)
                .cloned()
                .collect()
        }))
    }

    async fn requests_by_user(&self, user_id: &UserId) -> Cursor<DiscussionAccessRequest> {
        self.failures.cursor(self.read(|s| {
            s.requests
                .iter()
                .filter(|r| &r.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn find_user_access(
        &self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Option<DiscussionUserAccess>, DomainError> {
        self.read(|s| s.access.get(&(*discussion_id, user_id.clone())).cloned())
    }

    async fn find_user_by_handle(&self, handle: &Handle) -> Result<Option<UserId>, DomainError> {
        self.read(|s| s.handles.get(handle).cloned())
    }

    async fn subscribed_users(&self, discussion_id: &DiscussionId) -> Cursor<UserId> {
        self.failures.cursor(self.read(|s| {
            s.access
                .values()
                .filter(|a| {
                    &a.discussion_id == discussion_id
                        && a.state == AccessState::Active
                        && a.notification_setting == NotificationSetting::Everything
                })
                .map(|a| a.user_id.clone())
                .collect()
        }))
    }

    async fn find_access_link(
        &self,
        slug: &LinkSlug,
    ) -> Result<Option<DiscussionAccessLink>, DomainError> {
        self.read(|s| s.access_links.iter().find(|l| &l.link_slug == slug).cloned())
    }

    async fn latest_access_link(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Option<DiscussionAccessLink>, DomainError> {
        self.read(|s| {
            s.access_links
                .iter()
                .rev()
                .find(|l| &l.discussion_id == discussion_id)
                .cloned()
        })
    }
}

#[async_trait]
impl DeviceDirectory for InMemoryStore {
    async fn devices_for_user(&self, user_id: &UserId) -> Result<Vec<UserDevice>, DomainError> {
        self.failures.check(StoreOp::DeviceLookup)?;
        self.read(|s| {
            s.devices
                .iter()
                .filter(|d| &d.user_id == user_id)
                .cloned()
                .collect()
        })
    }
}

struct InMemoryTx {
    shared: Arc<RwLock<State>>,
    failures: Arc<Failures>,
    counters: Arc<Counters>,
    working: State,
    journal: Vec<Write>,
}

impl InMemoryTx {
    fn stage(&mut self, op: StoreOp, write: Write) -> Result<(), DomainError> {
        self.failures.check(op)?;
        if let Some(conflict) = self.working.conflict(&write) {
            return Err(conflict);
        }
        self.working.apply(write.clone());
        self.journal.push(write);
        Ok(())
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn find_discussion(
        &mut self,
        id: &DiscussionId,
    ) -> Result<Option<Discussion>, DomainError> {
        Ok(self.working.discussions.get(id).cloned())
    }

    async fn find_participant(
        &mut self,
        id: &ParticipantId,
    ) -> Result<Option<Participant>, DomainError> {
        Ok(self.working.find_participant(id))
    }

    async fn count_participants(
        &mut self,
        discussion_id: &DiscussionId,
    ) -> Result<u32, DomainError> {
        self.failures.check(StoreOp::CountParticipants)?;
        let count = self
            .working
            .participants
            .iter()
            .filter(|p| &p.discussion_id == discussion_id)
            .count();
        u32::try_from(count).map_err(|_| DomainError::database("participant count overflow"))
    }

    async fn participants_for_user(
        &mut self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Vec<Participant>, DomainError> {
        Ok(self.working.participants_for_user(discussion_id, user_id))
    }

    async fn get_or_create_viewer(
        &mut self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Viewer, DomainError> {
        self.failures.check(StoreOp::GetOrCreateViewer)?;
        if let Some(viewer) = self.working.viewers.get(&(*discussion_id, user_id.clone())) {
            return Ok(viewer.clone());
        }
        let viewer = Viewer::new(*discussion_id, user_id.clone());
        self.stage(StoreOp::GetOrCreateViewer, Write::Viewer(viewer.clone()))?;
        Ok(viewer)
    }

    async fn put_participant(
        &mut self,
        participant: &Participant,
    ) -> Result<Participant, DomainError> {
        self.stage(
            StoreOp::PutParticipant,
            Write::Participant(participant.clone()),
        )?;
        Ok(participant.clone())
    }

    async fn link_user_participant(
        &mut self,
        user_id: &UserId,
        participant: &Participant,
    ) -> Result<(), DomainError> {
        self.stage(
            StoreOp::LinkUserParticipant,
            Write::Link(UserParticipantLink {
                user_id: user_id.clone(),
                participant_id: participant.id,
                viewer_id: participant.viewer_id,
            }),
        )
    }

    async fn flairs_for_user(&mut self, user_id: &UserId) -> Cursor<Flair> {
        let rows = self
            .working
            .flairs
            .iter()
            .filter(|f| &f.user_id == user_id)
            .cloned()
            .collect();
        self.failures.cursor(Ok(rows))
    }

    async fn find_invite(&mut self, id: &InviteId) -> Result<Option<DiscussionInvite>, DomainError> {
        Ok(self.working.find_invite(id))
    }

    async fn find_pending_invite(
        &mut self,
        user_id: &UserId,
        discussion_id: &DiscussionId,
    ) -> Result<Option<DiscussionInvite>, DomainError> {
        Ok(self
            .working
            .invites
            .iter()
            .find(|i| &i.user_id == user_id && &i.discussion_id == discussion_id && i.is_pending())
            .cloned())
    }

    async fn put_invite(
        &mut self,
        invite: &DiscussionInvite,
    ) -> Result<DiscussionInvite, DomainError> {
        self.stage(StoreOp::PutInvite, Write::Invite(invite.clone()))?;
        Ok(invite.clone())
    }

    async fn update_invite(
        &mut self,
        invite: &DiscussionInvite,
    ) -> Result<DiscussionInvite, DomainError> {
        if self.working.find_invite(&invite.id).is_none() {
            return Err(DomainError::new(ErrorCode::InviteNotFound, "Invite not found"));
        }
        self.stage(StoreOp::UpdateInvite, Write::Invite(invite.clone()))?;
        Ok(invite.clone())
    }

    async fn find_access_request(
        &mut self,
        id: &AccessRequestId,
    ) -> Result<Option<DiscussionAccessRequest>, DomainError> {
        Ok(self.working.find_request(id))
    }

    async fn find_pending_request(
        &mut self,
        user_id: &UserId,
        discussion_id: &DiscussionId,
    ) -> Result<Option<DiscussionAccessRequest>, DomainError> {
        Ok(self
            .working
            .requests
            .iter()
            .find(|r| {
                &r.user_id == user_id
                    && &r.discussion_id == discussion_id
                    && r.status == InviteRequestStatus::Pending
            })
            .cloned())
    }

    async fn put_access_request(
        &mut self,
        request: &DiscussionAccessRequest,
    ) -> Result<DiscussionAccessRequest, DomainError> {
        self.stage(StoreOp::PutAccessRequest, Write::Request(request.clone()))?;
        Ok(request.clone())
    }

    async fn update_access_request(
        &mut self,
        request: &DiscussionAccessRequest,
    ) -> Result<DiscussionAccessRequest, DomainError> {
        if self.working.find_request(&request.id).is_none() {
            return Err(DomainError::new(
                ErrorCode::AccessRequestNotFound,
                "Access request not found",
            ));
        }
        self.stage(StoreOp::UpdateAccessRequest, Write::Request(request.clone()))?;
        Ok(request.clone())
    }

    async fn find_user_access(
        &mut self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Option<DiscussionUserAccess>, DomainError> {
        Ok(self
            .working
            .access
            .get(&(*discussion_id, user_id.clone()))
            .cloned())
    }

    async fn put_user_access(
        &mut self,
        access: &DiscussionUserAccess,
    ) -> Result<DiscussionUserAccess, DomainError> {
        self.stage(StoreOp::PutUserAccess, Write::Access(access.clone()))?;
        Ok(access.clone())
    }

    async fn put_post(&mut self, post: &Post) -> Result<Post, DomainError> {
        self.stage(StoreOp::PutPost, Write::Post(post.clone()))?;
        Ok(post.clone())
    }

    async fn put_access_link(
        &mut self,
        link: &DiscussionAccessLink,
    ) -> Result<DiscussionAccessLink, DomainError> {
        self.stage(StoreOp::PutAccessLink, Write::AccessLink(link.clone()))?;
        Ok(link.clone())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.failures.check(StoreOp::Commit)?;
        let mut shared = self.shared.write().map_err(|_| poisoned())?;
        let mut next = shared.clone();
        for write in self.journal {
            if let Some(conflict) = next.conflict(&write) {
                return Err(conflict);
            }
            next.apply(write);
        }
        *shared = next;
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.failures.check(StoreOp::Rollback)
    }
}
