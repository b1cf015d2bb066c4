//! A Store transaction over one PostgreSQL transaction.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use super::rows::{
    convert_all, db_error, index_to_db, AccessRequestRow, DiscussionRow, FlairRow, InviteRow,
    ParticipantRow, UserAccessRow, ViewerRow, INVITE_COLUMNS, PARTICIPANT_COLUMNS,
    REQUEST_COLUMNS,
};
use crate::domain::access::{
    DiscussionAccessLink, DiscussionAccessRequest, DiscussionInvite, DiscussionUserAccess,
};
use crate::domain::discussion::{Discussion, Flair, Post};
use crate::domain::foundation::{
    AccessRequestId, DiscussionId, DomainError, ErrorCode, InviteId, ParticipantId, UserId,
};
use crate::domain::participant::{Participant, Viewer};
use crate::ports::{BufferedCursor, Cursor, StoreTx};

pub(super) struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

impl PgStoreTx {
    pub(super) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

fn not_found(code: ErrorCode, what: &str) -> DomainError {
    DomainError::new(code, format!("{} not found", what))
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn find_discussion(
        &mut self,
        id: &DiscussionId,
    ) -> Result<Option<Discussion>, DomainError> {
        let row: Option<DiscussionRow> = sqlx::query_as(
            "SELECT id, title, shuffle_count, created_at, updated_at FROM discussions WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find discussion", e))?;

        row.map(Discussion::try_from).transpose()
    }

    async fn find_participant(
        &mut self,
        id: &ParticipantId,
    ) -> Result<Option<Participant>, DomainError> {
        let sql = format!("SELECT {} FROM participants WHERE id = $1", PARTICIPANT_COLUMNS);
        let row: Option<ParticipantRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to find participant", e))?;

        row.map(Participant::try_from).transpose()
    }

    async fn count_participants(
        &mut self,
        discussion_id: &DiscussionId,
    ) -> Result<u32, DomainError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM participants WHERE discussion_id = $1")
                .bind(discussion_id.as_uuid())
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| db_error("Failed to count participants", e))?;

        u32::try_from(count).map_err(|_| DomainError::database("participant count overflow"))
    }

    async fn participants_for_user(
        &mut self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Vec<Participant>, DomainError> {
        // Locks the user's records so concurrent identity changes serialize.
        let sql = format!(
            "SELECT {} FROM participants WHERE discussion_id = $1 AND user_id = $2 FOR UPDATE",
            PARTICIPANT_COLUMNS
        );
        let rows: Vec<ParticipantRow> = sqlx::query_as(&sql)
            .bind(discussion_id.as_uuid())
            .bind(user_id.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to list user participants", e))?;

        convert_all(rows)
    }

    async fn get_or_create_viewer(
        &mut self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Viewer, DomainError> {
        let fresh = Viewer::new(*discussion_id, user_id.clone());

        sqlx::query(
            r#"
            INSERT INTO viewers (id, discussion_id, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (discussion_id, user_id) DO NOTHING
            "#,
        )
        .bind(fresh.id.as_uuid())
        .bind(discussion_id.as_uuid())
        .bind(user_id.as_str())
        .bind(fresh.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to create viewer", e))?;

        let row: ViewerRow = sqlx::query_as(
            r#"
            SELECT id, discussion_id, user_id, last_viewed_post_id, last_viewed_at,
                   created_at, updated_at
            FROM viewers
            WHERE discussion_id = $1 AND user_id = $2
            "#,
        )
        .bind(discussion_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to load viewer", e))?;

        Viewer::try_from(row)
    }

    async fn put_participant(
        &mut self,
        participant: &Participant,
    ) -> Result<Participant, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO participants (
                id, discussion_id, participant_index, viewer_id, flair_id, gradient_color,
                user_id, is_anonymous, has_joined, inviter_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                flair_id = EXCLUDED.flair_id,
                gradient_color = EXCLUDED.gradient_color,
                is_anonymous = EXCLUDED.is_anonymous,
                has_joined = EXCLUDED.has_joined,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(participant.id.as_uuid())
        .bind(participant.discussion_id.as_uuid())
        .bind(index_to_db(participant.participant_index)?)
        .bind(participant.viewer_id.as_uuid())
        .bind(participant.flair_id.map(|f| *f.as_uuid()))
        .bind(participant.gradient_color.map(|g| g.as_str()))
        .bind(participant.user_id.as_ref().map(|u| u.as_str().to_string()))
        .bind(participant.is_anonymous)
        .bind(participant.has_joined)
        .bind(participant.inviter_id.map(|p| *p.as_uuid()))
        .bind(participant.created_at.as_datetime())
        .bind(participant.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save participant", e))?;

        Ok(participant.clone())
    }

    async fn link_user_participant(
        &mut self,
        user_id: &UserId,
        participant: &Participant,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO user_participants (user_id, participant_id, viewer_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, participant_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(participant.id.as_uuid())
        .bind(participant.viewer_id.as_uuid())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to link participant", e))?;

        Ok(())
    }

    async fn flairs_for_user(&mut self, user_id: &UserId) -> Cursor<Flair> {
        let rows = sqlx::query_as::<_, FlairRow>(
            "SELECT id, user_id, display_name, image_url, source FROM flairs WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to list flairs", e))
        .and_then(convert_all);

        match rows {
            Ok(rows) => BufferedCursor::new(rows).boxed(),
            Err(err) => BufferedCursor::failed(err).boxed(),
        }
    }

    async fn find_invite(&mut self, id: &InviteId) -> Result<Option<DiscussionInvite>, DomainError> {
        let sql = format!("SELECT {} FROM discussion_invites WHERE id = $1", INVITE_COLUMNS);
        let row: Option<InviteRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to find invite", e))?;

        row.map(DiscussionInvite::try_from).transpose()
    }

    async fn find_pending_invite(
        &mut self,
        user_id: &UserId,
        discussion_id: &DiscussionId,
    ) -> Result<Option<DiscussionInvite>, DomainError> {
        let sql = format!(
            "SELECT {} FROM discussion_invites \
             WHERE user_id = $1 AND discussion_id = $2 AND status = 'pending' \
             ORDER BY created_at LIMIT 1",
            INVITE_COLUMNS
        );
        let row: Option<InviteRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(discussion_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to find pending invite", e))?;

        row.map(DiscussionInvite::try_from).transpose()
    }

    async fn put_invite(
        &mut self,
        invite: &DiscussionInvite,
    ) -> Result<DiscussionInvite, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO discussion_invites (
                id, user_id, discussion_id, inviting_participant_id, status, invite_type,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(invite.id.as_uuid())
        .bind(invite.user_id.as_str())
        .bind(invite.discussion_id.as_uuid())
        .bind(invite.inviting_participant_id.as_uuid())
        .bind(invite.status.as_str())
        .bind(invite.invite_type.as_str())
        .bind(invite.created_at.as_datetime())
        .bind(invite.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save invite", e))?;

        Ok(invite.clone())
    }

    async fn update_invite(
        &mut self,
        invite: &DiscussionInvite,
    ) -> Result<DiscussionInvite, DomainError> {
        let result = sqlx::query(
            "UPDATE discussion_invites SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(invite.id.as_uuid())
        .bind(invite.status.as_str())
        .bind(invite.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to update invite", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(ErrorCode::InviteNotFound, "Invite"));
        }
        Ok(invite.clone())
    }

    async fn find_access_request(
        &mut self,
        id: &AccessRequestId,
    ) -> Result<Option<DiscussionAccessRequest>, DomainError> {
        let sql = format!(
            "SELECT {} FROM discussion_access_requests WHERE id = $1",
            REQUEST_COLUMNS
        );
        let row: Option<AccessRequestRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to find access request", e))?;

        row.map(DiscussionAccessRequest::try_from).transpose()
    }

    async fn find_pending_request(
        &mut self,
        user_id: &UserId,
        discussion_id: &DiscussionId,
    ) -> Result<Option<DiscussionAccessRequest>, DomainError> {
        let sql = format!(
            "SELECT {} FROM discussion_access_requests \
             WHERE user_id = $1 AND discussion_id = $2 AND status = 'pending' \
             ORDER BY created_at LIMIT 1",
            REQUEST_COLUMNS
        );
        let row: Option<AccessRequestRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(discussion_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to find pending request", e))?;

        row.map(DiscussionAccessRequest::try_from).transpose()
    }

    async fn put_access_request(
        &mut self,
        request: &DiscussionAccessRequest,
    ) -> Result<DiscussionAccessRequest, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO discussion_access_requests (
                id, user_id, discussion_id, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.user_id.as_str())
        .bind(request.discussion_id.as_uuid())
        .bind(request.status.as_str())
        .bind(request.created_at.as_datetime())
        .bind(request.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save access request", e))?;

        Ok(request.clone())
    }

    async fn update_access_request(
        &mut self,
        request: &DiscussionAccessRequest,
    ) -> Result<DiscussionAccessRequest, DomainError> {
        let result = sqlx::query(
            "UPDATE discussion_access_requests SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(request.id.as_uuid())
        .bind(request.status.as_str())
        .bind(request.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to update access request", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(ErrorCode::AccessRequestNotFound, "Access request"));
        }
        Ok(request.clone())
    }

    async fn find_user_access(
        &mut self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Option<DiscussionUserAccess>, DomainError> {
        let row: Option<UserAccessRow> = sqlx::query_as(
            r#"
            SELECT discussion_id, user_id, state, notification_setting, request_id,
                   created_at, updated_at
            FROM discussion_user_access
            WHERE discussion_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(discussion_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find user access", e))?;

        row.map(DiscussionUserAccess::try_from).transpose()
    }

    async fn put_user_access(
        &mut self,
        access: &DiscussionUserAccess,
    ) -> Result<DiscussionUserAccess, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO discussion_user_access (
                discussion_id, user_id, state, notification_setting, request_id,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (discussion_id, user_id) DO UPDATE SET
                state = EXCLUDED.state,
                notification_setting = EXCLUDED.notification_setting,
                request_id = EXCLUDED.request_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(access.discussion_id.as_uuid())
        .bind(access.user_id.as_str())
        .bind(access.state.as_str())
        .bind(access.notification_setting.as_str())
        .bind(access.request_id.map(|r| *r.as_uuid()))
        .bind(access.created_at.as_datetime())
        .bind(access.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save user access", e))?;

        Ok(access.clone())
    }

    async fn put_access_link(
        &mut self,
        link: &DiscussionAccessLink,
    ) -> Result<DiscussionAccessLink, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO discussion_access_links (link_slug, discussion_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(link.link_slug.as_str())
        .bind(link.discussion_id.as_uuid())
        .bind(link.created_at.as_datetime())
        .bind(link.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save access link", e))?;

        Ok(link.clone())
    }

    async fn put_post(&mut self, post: &Post) -> Result<Post, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, discussion_id, participant_id, kind, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(post.id.as_uuid())
        .bind(post.discussion_id.as_uuid())
        .bind(post.participant_id.as_uuid())
        .bind(post.kind.as_str())
        .bind(&post.content)
        .bind(post.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save post", e))?;

        Ok(post.clone())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| db_error("Failed to roll back transaction", e))
    }
}
