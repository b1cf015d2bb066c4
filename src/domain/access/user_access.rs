//! Per-(discussion, user) access row.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccessRequestId, DiscussionId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Inactive,
    Active,
    Archived,
}

impl AccessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessState::Inactive => "inactive",
            AccessState::Active => "active",
            AccessState::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inactive" => Some(AccessState::Inactive),
            "active" => Some(AccessState::Active),
            "archived" => Some(AccessState::Archived),
            _ => None,
        }
    }
}

/// Which posts trigger a push for this user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSetting {
    Everything,
    Mentions,
    None,
}

impl NotificationSetting {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationSetting::Everything => "everything",
            NotificationSetting::Mentions => "mentions",
            NotificationSetting::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "everything" => Some(NotificationSetting::Everything),
            "mentions" => Some(NotificationSetting::Mentions),
            "none" => Some(NotificationSetting::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionUserAccess {
    pub discussion_id: DiscussionId,
    pub user_id: UserId,
    pub state: AccessState,
    pub notification_setting: NotificationSetting,
    pub request_id: Option<AccessRequestId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DiscussionUserAccess {
    pub fn is_active(&self) -> bool {
        self.state == AccessState::Active
    }
}

/// Fields to write on an access upsert. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAccessUpdate {
    pub state: Option<AccessState>,
    pub notification_setting: Option<NotificationSetting>,
    pub request_id: Option<AccessRequestId>,
}

impl UserAccessUpdate {
    /// Active access with every post notifying, as granted on acceptance.
    pub fn granted(request_id: Option<AccessRequestId>) -> Self {
        Self {
            state: Some(AccessState::Active),
            notification_setting: Some(NotificationSetting::Everything),
            request_id,
        }
    }
}

/// Merges `update` over `existing`, keeping every field the update omits.
///
/// Without an existing row, omitted fields fall back to an inactive state
/// with every post notifying.
pub fn merge_user_access(
    existing: Option<DiscussionUserAccess>,
    discussion_id: DiscussionId,
    user_id: UserId,
    update: &UserAccessUpdate,
) -> DiscussionUserAccess {
    let now = Timestamp::now();
    let mut row = existing.unwrap_or_else(|| DiscussionUserAccess {
        discussion_id,
        user_id,
        state: AccessState::Inactive,
        notification_setting: NotificationSetting::Everything,
        request_id: None,
        created_at: now,
        updated_at: now,
    });

    if let Some(state) = update.state {
        row.state = state;
    }
    if let Some(setting) = update.notification_setting {
        row.notification_setting = setting;
    }
    if update.request_id.is_some() {
        row.request_id = update.request_id;
    }
    row.updated_at = now;
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (DiscussionId, UserId) {
        (DiscussionId::new(), UserId::new("carol").unwrap())
    }

    #[test]
    fn merge_without_existing_uses_defaults() {
        let (d, u) = ids();
        let row = merge_user_access(None, d, u.clone(), &UserAccessUpdate::default());

        assert_eq!(row.state, AccessState::Inactive);
        assert_eq!(row.notification_setting, NotificationSetting::Everything);
        assert_eq!(row.user_id, u);
        assert!(row.request_id.is_none());
    }

    #[test]
    fn merge_preserves_omitted_fields() {
        let (d, u) = ids();
        let request = AccessRequestId::new();
        let first = merge_user_access(
            None,
            d,
            u.clone(),
            &UserAccessUpdate {
                state: Some(AccessState::Active),
                notification_setting: Some(NotificationSetting::Mentions),
                request_id: Some(request),
            },
        );

        let second = merge_user_access(
            Some(first.clone()),
            d,
            u,
            &UserAccessUpdate {
                state: Some(AccessState::Archived),
                ..UserAccessUpdate::default()
            },
        );

        assert_eq!(second.state, AccessState::Archived);
        assert_eq!(second.notification_setting, NotificationSetting::Mentions);
        assert_eq!(second.request_id, Some(request));
        assert_eq!(second.created_at, first.created_at);
    }

    #[test]
    fn granted_is_active_everything() {
        let update = UserAccessUpdate::granted(None);
        assert_eq!(update.state, Some(AccessState::Active));
        assert_eq!(
            update.notification_setting,
            Some(NotificationSetting::Everything)
        );
    }

    #[test]
    fn enum_strings_parse_back() {
        assert_eq!(AccessState::parse("active"), Some(AccessState::Active));
        assert_eq!(
            NotificationSetting::parse(NotificationSetting::None.as_str()),
            Some(NotificationSetting::None)
        );
    }
}
