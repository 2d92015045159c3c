use chrono::{DateTime, Utc};
use common::{ChurchId, UserId};
use serde::{Deserialize, Serialize};

use super::str_enum;

str_enum!(
    /// Platform-wide role. SADMIN bypasses per-church permission checks.
    UserRole {
        Sadmin => "SADMIN",
        User => "USER",
    }
);

/// A platform user, identified by phone number.
///
/// Authentication (OTP delivery and verification) is handled outside this
/// subsystem; the record exists so orders and tickets have a buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub phone_number: String,
    pub role: UserRole,
    pub current_church: Option<ChurchId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            phone_number: phone_number.into(),
            role: UserRole::User,
            current_church: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_sadmin(&self) -> bool {
        self.role == UserRole::Sadmin
    }
}
