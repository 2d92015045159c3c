use chrono::{DateTime, Utc};
use common::{ContentId, Money, OrderId, ReservationId, TicketId, TicketTypeId, UserId};
use serde::{Deserialize, Serialize};

use super::str_enum;

str_enum!(
    /// Named ticket category sold directly on an event.
    TicketTier {
        Classic => "CLASSIC",
        Vip => "VIP",
        Premium => "PREMIUM",
    }
);

str_enum!(
    /// Lifecycle of an issued ticket.
    TicketStatus {
        New => "NEW",
        Used => "USED",
        Cancelled => "CANCELLED",
    }
);

/// The capacity ledger row governing an availability decision.
///
/// Every reservation, order, and issuance resolves to exactly one variant;
/// locking and decrementing dispatch on it instead of sniffing optional
/// attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventorySource {
    /// A catalog entry with its own price and quantity.
    TicketType(TicketTypeId),
    /// One named tier on an event.
    Tier(ContentId, TicketTier),
    /// An event's flat capacity (or uncapped sales).
    Event(ContentId),
}

/// A catalog inventory entry keyed to one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketType {
    pub id: TicketTypeId,
    pub content_id: ContentId,
    /// Unique per content.
    pub name: String,
    pub price: Money,
    /// None = unlimited.
    pub quantity: Option<u32>,
    /// Units issued against this entry so far.
    pub sold: u32,
    pub created_at: DateTime<Utc>,
}

impl TicketType {
    pub fn new(
        content_id: ContentId,
        name: impl Into<String>,
        price: Money,
        quantity: Option<u32>,
    ) -> Self {
        Self {
            id: TicketTypeId::new(),
            content_id,
            name: name.into(),
            price,
            quantity,
            sold: 0,
            created_at: Utc::now(),
        }
    }

    /// Remaining units given the unexpired reservation sum; `None` when
    /// uncapped, never negative.
    pub fn available(&self, reserved: u32) -> Option<u32> {
        self.quantity.map(|q| q.saturating_sub(self.sold + reserved))
    }
}

/// A time-boxed hold against an inventory source.
///
/// Not itself inventory: purely a subtractive signal consulted by
/// availability computations until `expires_at`, inert afterwards. Expired
/// rows are never deleted, only filtered out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketReservation {
    pub id: ReservationId,
    pub source: InventorySource,
    pub user_id: UserId,
    pub quantity: u32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TicketReservation {
    pub fn new(
        source: InventorySource,
        user_id: UserId,
        quantity: u32,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            source,
            user_id,
            quantity,
            expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// One purchased unit, created only by the ticket issuer.
///
/// Immutable once issued except for `status` and `seat`; `price` is the
/// unit price frozen at issue time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub order_id: OrderId,
    pub content_id: ContentId,
    pub ticket_type_id: Option<TicketTypeId>,
    pub tier: Option<TicketTier>,
    pub user_id: UserId,
    pub price: Money,
    pub status: TicketStatus,
    pub seat: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn issue(
        order_id: OrderId,
        content_id: ContentId,
        ticket_type_id: Option<TicketTypeId>,
        tier: Option<TicketTier>,
        user_id: UserId,
        price: Money,
    ) -> Self {
        Self {
            id: TicketId::new(),
            order_id,
            content_id,
            ticket_type_id,
            tier,
            user_id,
            price,
            status: TicketStatus::New,
            seat: None,
            created_at: Utc::now(),
        }
    }
}
