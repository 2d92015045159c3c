//! Ticket inventory: the capacity ledger, reservations, orders, and the
//! issuer.

pub(crate) mod ledger;
mod order;
mod reservation;

pub use order::{NewOrder, OrderService};
pub use reservation::ReservationManager;

use common::TicketTypeId;
use store::TicketTier;
use thiserror::Error;

/// Business-rule violations in the ticketing flow.
///
/// These are terminal for the request: surfaced to the caller, never
/// retried, and nothing is committed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketingError {
    /// The requested quantity exceeds what the ledger has left.
    #[error("Not enough tickets available: requested {requested}, {available} remaining")]
    InsufficientInventory { requested: u32, available: u32 },

    /// The named tier is not configured on this event.
    #[error("tier {tier} is not available for this event")]
    InvalidTier { tier: TicketTier },

    /// The event sells tiers, so an order must name one.
    #[error("this event sells tiered tickets: a ticket tier is required")]
    TierRequired,

    /// Zero-unit requests are rejected outright.
    #[error("invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// The order already has a payment transaction stamped on it.
    #[error("order is already completed")]
    AlreadyCompleted,

    /// The ticket type belongs to a different content item.
    #[error("ticket type {ticket_type} does not belong to this content")]
    ForeignTicketType { ticket_type: TicketTypeId },

    /// Ticket types and tiers only exist on events.
    #[error("this content is not an event")]
    NotAnEvent,
}
