//! Row structs and their conversions into domain types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::access::{
    AccessState, DiscussionAccessLink, DiscussionAccessRequest, DiscussionInvite,
    DiscussionUserAccess, InviteRequestStatus, InviteType, LinkSlug, NotificationSetting,
};
use crate::domain::discussion::{Discussion, Flair};
use crate::domain::foundation::{
    AccessRequestId, DeviceId, DiscussionId, DomainError, ErrorCode, FlairId, InviteId,
    ParticipantId, PostId, Timestamp, UserId, ViewerId,
};
use crate::domain::identity::GradientColor;
use crate::domain::notification::UserDevice;
use crate::domain::participant::{Participant, Viewer};

fn invalid(column: &str, value: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, value),
    )
}

fn user_id(raw: String) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(|e| invalid("user_id", e))
}

fn ts(dt: DateTime<Utc>) -> Timestamp {
    Timestamp::from_datetime(dt)
}

pub(super) fn index_to_db(index: u32) -> Result<i32, DomainError> {
    i32::try_from(index).map_err(|_| invalid("participant_index", index))
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct DiscussionRow {
    id: Uuid,
    title: String,
    shuffle_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DiscussionRow> for Discussion {
    type Error = DomainError;

    fn try_from(row: DiscussionRow) -> Result<Self, Self::Error> {
        Ok(Discussion {
            id: DiscussionId::from_uuid(row.id),
            title: row.title,
            shuffle_count: u32::try_from(row.shuffle_count)
                .map_err(|_| invalid("shuffle_count", row.shuffle_count))?,
            participants: None,
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ParticipantRow {
    id: Uuid,
    discussion_id: Uuid,
    participant_index: i32,
    viewer_id: Uuid,
    flair_id: Option<Uuid>,
    gradient_color: Option<String>,
    user_id: Option<String>,
    is_anonymous: bool,
    has_joined: bool,
    inviter_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = DomainError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        let gradient_color = row
            .gradient_color
            .map(|raw| GradientColor::parse(&raw).ok_or_else(|| invalid("gradient_color", raw)))
            .transpose()?;

        Ok(Participant {
            id: ParticipantId::from_uuid(row.id),
            discussion_id: DiscussionId::from_uuid(row.discussion_id),
            participant_index: u32::try_from(row.participant_index)
                .map_err(|_| invalid("participant_index", row.participant_index))?,
            viewer_id: ViewerId::from_uuid(row.viewer_id),
            flair_id: row.flair_id.map(FlairId::from_uuid),
            gradient_color,
            user_id: row.user_id.map(user_id).transpose()?,
            is_anonymous: row.is_anonymous,
            has_joined: row.has_joined,
            inviter_id: row.inviter_id.map(ParticipantId::from_uuid),
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

pub(super) const PARTICIPANT_COLUMNS: &str = "id, discussion_id, participant_index, viewer_id, \
     flair_id, gradient_color, user_id, is_anonymous, has_joined, inviter_id, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ViewerRow {
    id: Uuid,
    discussion_id: Uuid,
    user_id: String,
    last_viewed_post_id: Option<Uuid>,
    last_viewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ViewerRow> for Viewer {
    type Error = DomainError;

    fn try_from(row: ViewerRow) -> Result<Self, Self::Error> {
        Ok(Viewer {
            id: ViewerId::from_uuid(row.id),
            discussion_id: DiscussionId::from_uuid(row.discussion_id),
            user_id: user_id(row.user_id)?,
            last_viewed_post_id: row.last_viewed_post_id.map(PostId::from_uuid),
            last_viewed_at: row.last_viewed_at.map(ts),
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct FlairRow {
    id: Uuid,
    user_id: String,
    display_name: String,
    image_url: Option<String>,
    source: String,
}

impl TryFrom<FlairRow> for Flair {
    type Error = DomainError;

    fn try_from(row: FlairRow) -> Result<Self, Self::Error> {
        Ok(Flair {
            id: FlairId::from_uuid(row.id),
            user_id: user_id(row.user_id)?,
            display_name: row.display_name,
            image_url: row.image_url,
            source: row.source,
        })
    }
}

fn parse_status(raw: &str) -> Result<InviteRequestStatus, DomainError> {
    InviteRequestStatus::parse(raw).ok_or_else(|| invalid("status", raw))
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct InviteRow {
    id: Uuid,
    user_id: String,
    discussion_id: Uuid,
    inviting_participant_id: Uuid,
    status: String,
    invite_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InviteRow> for DiscussionInvite {
    type Error = DomainError;

    fn try_from(row: InviteRow) -> Result<Self, Self::Error> {
        Ok(DiscussionInvite {
            id: InviteId::from_uuid(row.id),
            user_id: user_id(row.user_id)?,
            discussion_id: DiscussionId::from_uuid(row.discussion_id),
            inviting_participant_id: ParticipantId::from_uuid(row.inviting_participant_id),
            status: parse_status(&row.status)?,
            invite_type: InviteType::parse(&row.invite_type)
                .ok_or_else(|| invalid("invite_type", &row.invite_type))?,
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

pub(super) const INVITE_COLUMNS: &str = "id, user_id, discussion_id, inviting_participant_id, \
     status, invite_type, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct AccessRequestRow {
    id: Uuid,
    user_id: String,
    discussion_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccessRequestRow> for DiscussionAccessRequest {
    type Error = DomainError;

    fn try_from(row: AccessRequestRow) -> Result<Self, Self::Error> {
        Ok(DiscussionAccessRequest {
            id: AccessRequestId::from_uuid(row.id),
            user_id: user_id(row.user_id)?,
            discussion_id: DiscussionId::from_uuid(row.discussion_id),
            status: parse_status(&row.status)?,
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

pub(super) const REQUEST_COLUMNS: &str =
    "id, user_id, discussion_id, status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserAccessRow {
    discussion_id: Uuid,
    user_id: String,
    state: String,
    notification_setting: String,
    request_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserAccessRow> for DiscussionUserAccess {
    type Error = DomainError;

    fn try_from(row: UserAccessRow) -> Result<Self, Self::Error> {
        Ok(DiscussionUserAccess {
            discussion_id: DiscussionId::from_uuid(row.discussion_id),
            user_id: user_id(row.user_id)?,
            state: AccessState::parse(&row.state).ok_or_else(|| invalid("state", &row.state))?,
            notification_setting: NotificationSetting::parse(&row.notification_setting)
                .ok_or_else(|| invalid("notification_setting", &row.notification_setting))?,
            request_id: row.request_id.map(AccessRequestId::from_uuid),
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct DeviceRow {
    id: String,
    user_id: String,
    platform: String,
    token: Option<String>,
    last_seen: DateTime<Utc>,
}

impl TryFrom<DeviceRow> for UserDevice {
    type Error = DomainError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        Ok(UserDevice {
            id: DeviceId::new(row.id).map_err(|e| invalid("device id", e))?,
            user_id: user_id(row.user_id)?,
            platform: row.platform,
            token: row.token,
            last_seen: ts(row.last_seen),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct AccessLinkRow {
    link_slug: String,
    discussion_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccessLinkRow> for DiscussionAccessLink {
    type Error = DomainError;

    fn try_from(row: AccessLinkRow) -> Result<Self, Self::Error> {
        Ok(DiscussionAccessLink {
            discussion_id: DiscussionId::from_uuid(row.discussion_id),
            link_slug: LinkSlug::parse(&row.link_slug).map_err(|e| invalid("link_slug", e))?,
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

pub(super) const LINK_COLUMNS: &str = "link_slug, discussion_id, created_at, updated_at";

/// Converts a batch of rows, failing on the first bad one.
pub(super) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DomainError>
where
    T: TryFrom<R, Error = DomainError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Maps a sqlx error, turning unique violations into conflicts.
pub(super) fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return DomainError::new(ErrorCode::Conflict, format!("{}: duplicate row", context))
                .with_detail("constraint", constraint);
        }
    }
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, err))
}
