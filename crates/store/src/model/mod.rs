//! Persisted record types.
//!
//! Enum-like columns are stored as their uppercase text form; the
//! [`str_enum!`] macro keeps the Rust enum, its column representation, and
//! its serde form in lockstep.

mod church;
mod content;
mod order;
mod ticket;
mod user;

pub use church::{Church, ChurchAdmin, ChurchRole, ChurchStatus};
pub use content::{CapacityError, Content, ContentType, DeliveryType, EventTicketing, TierConfig, TierSet};
pub use order::{BookOrder, PaymentGateway};
pub use ticket::{InventorySource, Ticket, TicketReservation, TicketStatus, TicketTier, TicketType};
pub use user::{User, UserRole};

use thiserror::Error;

/// A text column held a value no enum variant maps to.
#[derive(Debug, Clone, Error)]
#[error("invalid {what}: {value:?}")]
pub struct InvalidEnumValue {
    pub what: &'static str,
    pub value: String,
}

/// Defines an enum stored as uppercase text, with `as_str` and `FromStr`
/// kept consistent with the serde representation.
macro_rules! str_enum {
    ($(#[$doc:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Returns the stored text form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::model::InvalidEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::model::InvalidEnumValue {
                        what: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use str_enum;

#[cfg(test)]
mod tests {
    str_enum!(Sample { Alpha => "ALPHA", Beta => "BETA" });

    #[test]
    fn round_trips_through_text() {
        assert_eq!(Sample::Alpha.as_str(), "ALPHA");
        assert_eq!("BETA".parse::<Sample>().unwrap(), Sample::Beta);
        assert!("GAMMA".parse::<Sample>().is_err());
    }

    #[test]
    fn serde_matches_text_form() {
        assert_eq!(serde_json::to_string(&Sample::Alpha).unwrap(), "\"ALPHA\"");
    }
}
