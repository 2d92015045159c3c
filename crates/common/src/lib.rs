//! Shared types for the ticketing platform.
//!
//! This crate provides the typed identifiers used across the workspace,
//! the [`Money`] value object, and small text helpers. It deliberately has
//! no knowledge of storage or HTTP concerns.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{
    ChurchCode, ChurchId, ContentId, OrderId, ReservationId, TicketId, TicketTypeId, UserId,
    slugify,
};
