use chrono::{DateTime, Utc};
use common::{ContentId, Money, OrderId, TicketTypeId, UserId};
use serde::{Deserialize, Serialize};

use super::str_enum;
use super::ticket::{InventorySource, TicketTier};
use super::content::DeliveryType;

str_enum!(
    /// Payment channel used to settle an order.
    PaymentGateway {
        Momo => "MOMO",
        Om => "OM",
        Card => "CARD",
        Cash => "CASH",
        Other => "OTHER",
    }
);

/// A buyer's request for N units of a content item (book copies or event
/// tickets).
///
/// `total_price` is computed and frozen at creation. For ticket orders the
/// inventory counters stay untouched until the issuer runs;
/// `payment_transaction_id` is set exactly once by the issuer and doubles as
/// the already-issued guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub content_id: ContentId,
    pub delivery_type: DeliveryType,
    pub quantity: u32,
    pub total_price: Money,
    pub is_ticket: bool,
    pub ticket_type_id: Option<TicketTypeId>,
    pub ticket_tier: Option<TicketTier>,
    pub payment_gateway: PaymentGateway,
    pub payment_transaction_id: Option<String>,
    pub shipped: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BookOrder {
    /// The ledger row this order draws from; `None` for plain book orders.
    pub fn inventory_source(&self) -> Option<InventorySource> {
        if !self.is_ticket {
            return None;
        }
        Some(match (self.ticket_type_id, self.ticket_tier) {
            (Some(ticket_type_id), _) => InventorySource::TicketType(ticket_type_id),
            (None, Some(tier)) => InventorySource::Tier(self.content_id, tier),
            (None, None) => InventorySource::Event(self.content_id),
        })
    }

    /// True once the issuer has stamped a payment transaction.
    pub fn is_completed(&self) -> bool {
        self.payment_transaction_id.is_some()
    }
}
