//! ParticipantManager - creates and changes membership records.

use std::sync::Arc;

use tracing::{debug, info};

use crate::application::transaction::{abort, begin, commit, retry_on_conflict};
use crate::domain::foundation::{DiscussionId, ParticipantId, UserId};
use crate::domain::participant::{
    JoinParams, Participant, ParticipantChanges, ParticipantError, UserIdentities,
};
use crate::ports::{collect_cursor, Store, StoreTx};

use super::join_guard::{JoinGuard, JoinLocks};

/// Command to materialize a new membership record.
#[derive(Debug, Clone)]
pub struct CreateParticipantCommand {
    pub discussion_id: DiscussionId,
    pub user_id: UserId,
    pub params: JoinParams,
}

/// Command to change one of a user's identities.
#[derive(Debug, Clone)]
pub struct ChangeParticipantCommand {
    pub discussion_id: DiscussionId,
    pub user_id: UserId,
    pub target: ParticipantId,
    pub changes: ParticipantChanges,
}

pub struct ParticipantManager {
    store: Arc<dyn Store>,
    join_locks: JoinLocks,
}

impl ParticipantManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            join_locks: JoinLocks::default(),
        }
    }

    /// Serializes participant creation in `discussion_id` until the guard
    /// is dropped.
    pub async fn lock_joins(&self, discussion_id: DiscussionId) -> JoinGuard {
        self.join_locks.acquire(discussion_id).await
    }

    /// Creates a participant inside the caller's transaction.
    ///
    /// Steps: reject a second record of the same flavor, take the current
    /// participant count as join order, get or create the viewer, attach
    /// the flair if the user owns it, persist, then link the record to the
    /// user. The first failing step aborts the call with its error; the
    /// caller owns rollback.
    pub async fn create_participant(
        &self,
        tx: &mut dyn StoreTx,
        guard: &JoinGuard,
        cmd: CreateParticipantCommand,
    ) -> Result<Participant, ParticipantError> {
        if guard.discussion_id() != cmd.discussion_id {
            return Err(ParticipantError::GuardMismatch {
                held: guard.discussion_id(),
                requested: cmd.discussion_id,
            });
        }

        let existing = tx
            .participants_for_user(&cmd.discussion_id, &cmd.user_id)
            .await?;
        if let Some(identities) = UserIdentities::from_records(existing)? {
            if identities.has_flavor(cmd.params.is_anonymous) {
                return Err(ParticipantError::DuplicateIdentity {
                    discussion_id: cmd.discussion_id,
                    anonymous: cmd.params.is_anonymous,
                });
            }
        }

        let index = tx.count_participants(&cmd.discussion_id).await?;
        let viewer = tx
            .get_or_create_viewer(&cmd.discussion_id, &cmd.user_id)
            .await?;

        let mut participant = Participant::create(
            cmd.discussion_id,
            cmd.user_id.clone(),
            index,
            viewer.id,
            &cmd.params,
        );

        if let Some(flair_id) = cmd.params.flair_id {
            let flairs = collect_cursor(tx.flairs_for_user(&cmd.user_id).await).await?;
            if flairs.iter().any(|flair| flair.id == flair_id) {
                participant.flair_id = Some(flair_id);
            } else {
                debug!(%flair_id, user_id = %cmd.user_id, "Ignoring flair the user does not own");
            }
        }

        let saved = tx.put_participant(&participant).await?;
        tx.link_user_participant(&cmd.user_id, &saved).await?;

        info!(
            participant_id = %saved.id,
            discussion_id = %saved.discussion_id,
            participant_index = saved.participant_index,
            anonymous = saved.is_anonymous,
            "Participant created"
        );
        Ok(saved)
    }

    /// Applies `changes` to the identity `target` and persists the result.
    ///
    /// See [`UserIdentities::resolve_update`] for how anonymity flips pick
    /// between converting in place and reactivating the counterpart.
    pub async fn update_participant(
        &self,
        tx: &mut dyn StoreTx,
        identities: &UserIdentities,
        target: ParticipantId,
        changes: &ParticipantChanges,
    ) -> Result<Participant, ParticipantError> {
        let resolved = identities.resolve_update(target, changes)?;
        // The write must leave at most one record per flavor.
        identities.clone().replace(resolved.clone())?;
        let saved = tx.put_participant(&resolved).await?;
        debug!(
            participant_id = %saved.id,
            requested = %target,
            anonymous = saved.is_anonymous,
            has_joined = saved.has_joined,
            "Participant updated"
        );
        Ok(saved)
    }

    /// Joins `user_id` to a discussion in a transaction of its own.
    ///
    /// A join that loses the index race to another process is rerun with a
    /// fresh count.
    pub async fn join_discussion(
        &self,
        cmd: CreateParticipantCommand,
    ) -> Result<Participant, ParticipantError> {
        retry_on_conflict("join_discussion", || self.join_once(cmd.clone())).await
    }

    async fn join_once(
        &self,
        cmd: CreateParticipantCommand,
    ) -> Result<Participant, ParticipantError> {
        let guard = self.lock_joins(cmd.discussion_id).await;
        let mut tx = begin(self.store.as_ref(), "join_discussion").await?;

        match self.create_participant(tx.as_mut(), &guard, cmd).await {
            Ok(participant) => {
                commit(tx, "join_discussion").await?;
                Ok(participant)
            }
            Err(err) => Err(abort(tx, "join_discussion", err).await),
        }
    }

    /// Reads a user's identities in a discussion.
    pub async fn identities_for(
        &self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Option<UserIdentities>, ParticipantError> {
        let records = self
            .store
            .participants_for_user(discussion_id, user_id)
            .await?;
        UserIdentities::from_records(records)
    }

    /// Transactional wrapper over [`ParticipantManager::update_participant`].
    pub async fn change_participant(
        &self,
        cmd: ChangeParticipantCommand,
    ) -> Result<Participant, ParticipantError> {
        let mut tx = begin(self.store.as_ref(), "change_participant").await?;

        match self.change_in_tx(tx.as_mut(), &cmd).await {
            Ok(participant) => {
                commit(tx, "change_participant").await?;
                Ok(participant)
            }
            Err(err) => Err(abort(tx, "change_participant", err).await),
        }
    }

    async fn change_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        cmd: &ChangeParticipantCommand,
    ) -> Result<Participant, ParticipantError> {
        let records = tx
            .participants_for_user(&cmd.discussion_id, &cmd.user_id)
            .await?;
        let identities = UserIdentities::from_records(records)?
            .ok_or(ParticipantError::NoMatchingParticipant(cmd.target))?;
        self.update_participant(tx, &identities, cmd.target, &cmd.changes)
            .await
    }
}
