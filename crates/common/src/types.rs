use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Defines a UUID-backed identifier type.
///
/// Wraps a UUID to provide type safety and prevent mixing up identifiers
/// of different record kinds (a `UserId` is not a `ChurchId`).
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a church (tenant).
    ChurchId
);
uuid_id!(
    /// Unique identifier for a user.
    UserId
);
uuid_id!(
    /// Unique identifier for a content item (article, event, book, ...).
    ContentId
);
uuid_id!(
    /// Unique identifier for a ticket type catalog entry.
    TicketTypeId
);
uuid_id!(
    /// Unique identifier for a ticket reservation.
    ReservationId
);
uuid_id!(
    /// Unique identifier for a book/ticket order.
    OrderId
);
uuid_id!(
    /// Unique identifier for an issued ticket.
    TicketId
);

/// Human-meaningful numeric code assigned to a church at registration.
///
/// Codes are unique and allocated monotonically (`max + 1`); the allocation
/// protocol lives in the domain layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChurchCode(i64);

impl ChurchCode {
    /// The first code handed out when no church exists yet.
    pub const FIRST: ChurchCode = ChurchCode(1);

    /// Creates a code from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw numeric value.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Returns the code following this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for ChurchCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Produces a URL-friendly slug from a title.
///
/// Lowercases ASCII, maps runs of non-alphanumeric characters to single
/// hyphens, and trims leading/trailing hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(ChurchId::new(), ChurchId::new());
        assert_ne!(OrderId::new(), OrderId::new());
    }

    #[test]
    fn id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = TicketId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn id_serialization_roundtrip() {
        let id = ContentId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn id_parses_from_string() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn church_code_next_increments() {
        assert_eq!(ChurchCode::new(7).next(), ChurchCode::new(8));
        assert_eq!(ChurchCode::FIRST.value(), 1);
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Grace Chapel"), "grace-chapel");
        assert_eq!(slugify("  Easter  2025!"), "easter-2025");
        assert_eq!(slugify("Église"), "glise");
    }
}
