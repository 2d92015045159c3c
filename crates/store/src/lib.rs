//! Persistence layer for the ticketing platform.
//!
//! This crate defines the persisted record types, the [`Store`] trait for
//! one-shot atomic operations, the [`StoreTx`] unit-of-work trait that
//! enforces the exclusive-lock-then-validate-then-write sequencing required
//! by the capacity ledger, and two interchangeable implementations:
//! PostgreSQL (row locks via `SELECT ... FOR UPDATE`) and in-memory
//! (one store-wide lock, snapshot rollback) for tests and DB-less runs.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    BookOrder, CapacityError, Church, ChurchAdmin, ChurchRole, ChurchStatus, Content, ContentType,
    DeliveryType, EventTicketing, InvalidEnumValue, InventorySource, PaymentGateway, Ticket,
    TicketReservation, TicketStatus, TicketTier, TicketType, TierConfig, TierSet, User, UserRole,
};
pub use postgres::PostgresStore;
pub use store::{Store, StoreTx};
