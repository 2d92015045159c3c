use chrono::{DateTime, Utc};
use common::{ChurchCode, ChurchId, UserId, slugify};
use serde::{Deserialize, Serialize};

use super::str_enum;

str_enum!(
    /// Review status of a church registration.
    ChurchStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
);

str_enum!(
    /// Role a user holds within a church.
    ChurchRole {
        Owner => "OWNER",
        Admin => "ADMIN",
        Moderator => "MODERATOR",
    }
);

impl ChurchRole {
    /// Returns true if the role may mutate the church's catalog and inventory.
    pub fn can_manage(&self) -> bool {
        matches!(self, ChurchRole::Owner | ChurchRole::Admin)
    }
}

/// A tenant organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Church {
    pub id: ChurchId,
    /// Human-meaningful numeric code, unique, allocated monotonically.
    pub code: ChurchCode,
    pub title: String,
    pub slug: String,
    pub status: ChurchStatus,
    pub city: String,
    pub country: String,
    pub owner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Church {
    /// Creates a pending church with a freshly assigned code.
    pub fn new(
        code: ChurchCode,
        title: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
        owner_id: Option<UserId>,
    ) -> Self {
        let title = title.into();
        let slug = slugify(&title);
        Self {
            id: ChurchId::new(),
            code,
            title,
            slug,
            status: ChurchStatus::Pending,
            city: city.into(),
            country: country.into(),
            owner_id,
            created_at: Utc::now(),
        }
    }
}

/// An administrative role assignment, unique per (church, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurchAdmin {
    pub church_id: ChurchId,
    pub user_id: UserId,
    pub role: ChurchRole,
    pub created_at: DateTime<Utc>,
}

impl ChurchAdmin {
    pub fn new(church_id: ChurchId, user_id: UserId, role: ChurchRole) -> Self {
        Self {
            church_id,
            user_id,
            role,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_church_slugifies_title() {
        let church = Church::new(ChurchCode::FIRST, "Grace Chapel", "Douala", "CM", None);
        assert_eq!(church.slug, "grace-chapel");
        assert_eq!(church.status, ChurchStatus::Pending);
    }

    #[test]
    fn moderators_cannot_manage() {
        assert!(ChurchRole::Owner.can_manage());
        assert!(ChurchRole::Admin.can_manage());
        assert!(!ChurchRole::Moderator.can_manage());
    }
}
