//! Domain layer for the ticketing platform.
//!
//! This crate provides the business services over the persistence layer:
//! - `ChurchRegistry`: tenant registration with monotonic code allocation
//! - `ContentService`: catalog management and capacity invariants
//! - `ReservationManager`: time-boxed inventory holds
//! - `OrderService`: order creation and the ticket issuer
//!
//! All availability decisions run inside a store unit of work holding the
//! exclusive lock on the governing ledger row.

pub mod church;
pub mod content;
pub mod error;
pub mod ticketing;

pub use church::{ChurchRegistry, NewChurch};
pub use content::{ContentService, NewContent, TicketingUpdate, TierPricing};
pub use error::DomainError;
pub use ticketing::{NewOrder, OrderService, ReservationManager, TicketingError};
