//! PostgreSQL implementation of the Store and DeviceDirectory ports.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::rows::{
    convert_all, db_error, AccessLinkRow, AccessRequestRow, DeviceRow, DiscussionRow,
    InviteRow, ParticipantRow, UserAccessRow, INVITE_COLUMNS, LINK_COLUMNS,
    PARTICIPANT_COLUMNS, REQUEST_COLUMNS,
};
use super::tx::PgStoreTx;
use crate::config::DatabaseConfig;
use crate::domain::access::{
    AccessState, DiscussionAccessLink, DiscussionAccessRequest, DiscussionInvite,
    DiscussionUserAccess, LinkSlug, NotificationSetting,
};
use crate::domain::discussion::Discussion;
use crate::domain::foundation::{
    AccessRequestId, DiscussionId, DomainError, ErrorCode, Handle, InviteId, ParticipantId,
    UserId,
};
use crate::domain::notification::UserDevice;
use crate::domain::participant::Participant;
use crate::ports::{BufferedCursor, Cursor, DeviceDirectory, Store, StoreTx};

/// PostgreSQL-backed store.
///
/// Multi-row reads are fetched eagerly; a fetch failure is reported from
/// the cursor's `close`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool sized by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .max_lifetime(config.max_lifetime())
            .connect(config.url())
            .await
            .map_err(|e| db_error("Failed to connect", e))?;

        Ok(Self { pool })
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Migration failed: {}", e))
            })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn cursor<T: Send + 'static>(rows: Result<Vec<T>, DomainError>) -> Cursor<T> {
    match rows {
        Ok(rows) => BufferedCursor::new(rows).boxed(),
        Err(err) => BufferedCursor::failed(err).boxed(),
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin_tx(&self) -> Result<Box<dyn StoreTx>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;
        Ok(Box::new(PgStoreTx::new(tx)))
    }

    async fn find_discussion(&self, id: &DiscussionId) -> Result<Option<Discussion>, DomainError> {
        let row: Option<DiscussionRow> = sqlx::query_as(
            "SELECT id, title, shuffle_count, created_at, updated_at FROM discussions WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find discussion", e))?;

        row.map(Discussion::try_from).transpose()
    }

    async fn find_participant(
        &self,
        id: &ParticipantId,
    ) -> Result<Option<Participant>, DomainError> {
        let sql = format!("SELECT {} FROM participants WHERE id = $1", PARTICIPANT_COLUMNS);
        let row: Option<ParticipantRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find participant", e))?;

        row.map(Participant::try_from).transpose()
    }

    async fn participants_for_discussion(&self, id: &DiscussionId) -> Cursor<Participant> {
        let sql = format!(
            "SELECT {} FROM participants WHERE discussion_id = $1 ORDER BY participant_index",
            PARTICIPANT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list participants", e))
            .and_then(convert_all);
        cursor(rows)
    }

    async fn participants_for_user(
        &self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Vec<Participant>, DomainError> {
        let sql = format!(
            "SELECT {} FROM participants WHERE discussion_id = $1 AND user_id = $2",
            PARTICIPANT_COLUMNS
        );
        let rows: Vec<ParticipantRow> = sqlx::query_as(&sql)
            .bind(discussion_id.as_uuid())
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list user participants", e))?;
        convert_all(rows)
    }

    async fn find_invite(&self, id: &InviteId) -> Result<Option<DiscussionInvite>, DomainError> {
        let sql = format!("SELECT {} FROM discussion_invites WHERE id = $1", INVITE_COLUMNS);
        let row: Option<InviteRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find invite", e))?;

        row.map(DiscussionInvite::try_from).transpose()
    }

    async fn pending_invites_for_user(&self, user_id: &UserId) -> Cursor<DiscussionInvite> {
        let sql = format!(
            "SELECT {} FROM discussion_invites WHERE user_id = $1 AND status = 'pending' \
             ORDER BY created_at",
            INVITE_COLUMNS
        );
        let rows = sqlx::query_as::<_, InviteRow>(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list pending invites", e))
            .and_then(convert_all);
        cursor(rows)
    }

    async fn sent_invites(&self, inviter: &ParticipantId) -> Cursor<DiscussionInvite> {
        let sql = format!(
            "SELECT {} FROM discussion_invites WHERE inviting_participant_id = $1 \
             ORDER BY created_at",
            INVITE_COLUMNS
        );
        let rows = sqlx::query_as::<_, InviteRow>(&sql)
            .bind(inviter.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list sent invites", e))
            .and_then(convert_all);
        cursor(rows)
    }

    async fn find_access_request(
        &self,
        id: &AccessRequestId,
    ) -> Result<Option<DiscussionAccessRequest>, DomainError> {
        let sql = format!(
            "SELECT {} FROM discussion_access_requests WHERE id = $1",
            REQUEST_COLUMNS
        );
        let row: Option<AccessRequestRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find access request", e))?;

        row.map(DiscussionAccessRequest::try_from).transpose()
    }

    async fn requests_for_discussion(
        &self,
        discussion_id: &DiscussionId,
    ) -> Cursor<DiscussionAccessRequest> {
        let sql = format!(
            "SELECT {} FROM discussion_access_requests WHERE discussion_id = $1 \
             ORDER BY created_at",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, AccessRequestRow>(&sql)
            .bind(discussion_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list access requests", e))
            .and_then(convert_all);
        cursor(rows)
    }

    async fn requests_by_user(&self, user_id: &UserId) -> Cursor<DiscussionAccessRequest> {
        let sql = format!(
            "SELECT {} FROM discussion_access_requests WHERE user_id = $1 ORDER BY created_at",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, AccessRequestRow>(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list access requests", e))
            .and_then(convert_all);
        cursor(rows)
    }

    async fn find_user_access(
        &self,
        discussion_id: &DiscussionId,
        user_id: &UserId,
    ) -> Result<Option<DiscussionUserAccess>, DomainError> {
        let row: Option<UserAccessRow> = sqlx::query_as(
            r#"
            SELECT discussion_id, user_id, state, notification_setting, request_id,
                   created_at, updated_at
            FROM discussion_user_access
            WHERE discussion_id = $1 AND user_id = $2
            "#,
        )
        .bind(discussion_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find user access", e))?;

        row.map(DiscussionUserAccess::try_from).transpose()
    }

    async fn subscribed_users(&self, discussion_id: &DiscussionId) -> Cursor<UserId> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT user_id
            FROM discussion_user_access
            WHERE discussion_id = $1 AND state = $2 AND notification_setting = $3
            ORDER BY user_id
            "#,
        )
        .bind(discussion_id.as_uuid())
        .bind(AccessState::Active.as_str())
        .bind(NotificationSetting::Everything.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list subscribed users", e))
        .and_then(|ids| {
            ids.into_iter()
                .map(|id| {
                    UserId::new(id).map_err(|e| {
                        DomainError::new(
                            ErrorCode::DatabaseError,
                            format!("Invalid user_id: {}", e),
                        )
                    })
                })
                .collect()
        });
        cursor(rows)
    }

    async fn find_access_link(
        &self,
        slug: &LinkSlug,
    ) -> Result<Option<DiscussionAccessLink>, DomainError> {
        let sql = format!(
            "SELECT {} FROM discussion_access_links WHERE link_slug = $1",
            LINK_COLUMNS
        );
        let row: Option<AccessLinkRow> = sqlx::query_as(&sql)
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find access link", e))?;

        row.map(DiscussionAccessLink::try_from).transpose()
    }

    async fn latest_access_link(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Option<DiscussionAccessLink>, DomainError> {
        let sql = format!(
            "SELECT {} FROM discussion_access_links WHERE discussion_id = $1 \
             ORDER BY created_at DESC LIMIT 1",
            LINK_COLUMNS
        );
        let row: Option<AccessLinkRow> = sqlx::query_as(&sql)
            .bind(discussion_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find access link", e))?;

        row.map(DiscussionAccessLink::try_from).transpose()
    }

    async fn find_user_by_handle(&self, handle: &Handle) -> Result<Option<UserId>, DomainError> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM user_handles WHERE handle = $1")
                .bind(handle.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to resolve handle", e))?;

        raw.map(|id| {
            UserId::new(id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })
        })
        .transpose()
    }
}

#[async_trait]
impl DeviceDirectory for PostgresStore {
    async fn devices_for_user(&self, user_id: &UserId) -> Result<Vec<UserDevice>, DomainError> {
        let rows: Vec<DeviceRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, platform, token, last_seen
            FROM user_devices
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list devices", e))?;

        convert_all(rows)
    }
}
