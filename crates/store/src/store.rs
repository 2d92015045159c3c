use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ChurchCode, ChurchId, ContentId, OrderId, TicketTypeId, UserId};

use crate::Result;
use crate::model::{
    BookOrder, Church, ChurchAdmin, ChurchRole, Content, EventTicketing, InventorySource, Ticket,
    TicketReservation, TicketType, User,
};

/// Core trait for store implementations.
///
/// Every method is atomic on its own: a single insert or read commits or
/// fails as a unit. Multi-step availability decisions go through [`begin`]
/// and the [`StoreTx`] unit of work instead. All implementations must be
/// thread-safe (Send + Sync).
///
/// [`begin`]: Store::begin
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a unit of work.
    ///
    /// Nothing written through the returned transaction is visible to other
    /// callers until `commit`; dropping it without committing rolls every
    /// write back.
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;

    // -- churches --

    async fn get_church(&self, id: ChurchId) -> Result<Option<Church>>;

    /// The caller's role within a church, if any.
    async fn church_role(&self, church: ChurchId, user: UserId) -> Result<Option<ChurchRole>>;

    // -- users --

    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    // -- contents & ticket types --

    async fn insert_content(&self, content: &Content) -> Result<()>;

    async fn get_content(&self, id: ContentId) -> Result<Option<Content>>;

    /// Fails with `DuplicateName` when the name is taken for the content.
    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<()>;

    async fn get_ticket_type(&self, id: TicketTypeId) -> Result<Option<TicketType>>;

    async fn list_ticket_types(&self, content: ContentId) -> Result<Vec<TicketType>>;

    // -- reservations --

    async fn insert_reservation(&self, reservation: &TicketReservation) -> Result<()>;

    /// Sum of unexpired reservation quantities for a source. Non-locking;
    /// availability decisions re-run this inside a [`StoreTx`].
    async fn reservation_sum(&self, source: &InventorySource, now: DateTime<Utc>) -> Result<u32>;

    // -- orders & tickets --

    async fn get_order(&self, id: OrderId) -> Result<Option<BookOrder>>;

    async fn tickets_for_order(&self, order: OrderId) -> Result<Vec<Ticket>>;

    /// Number of issued tickets for a whole content item.
    async fn ticket_count(&self, content: ContentId) -> Result<u64>;
}

/// A unit of work over the capacity ledger.
///
/// The interface enforces the required sequencing: `lock_*` takes the
/// exclusive row lock, reads and validation happen while it is held, writes
/// are relative updates, and `commit` makes the whole span atomic. Dropping
/// the transaction without committing rolls back every write.
#[async_trait]
pub trait StoreTx: Send {
    /// Highest church code committed so far; `None` when no church exists.
    ///
    /// Read inside the transaction so a code-allocation attempt
    /// (max-then-insert) is one atomic unit of work.
    async fn max_church_code(&mut self) -> Result<Option<ChurchCode>>;

    /// Inserts a church. Fails with `DuplicateCode` / `DuplicateTitle` when
    /// the unique columns collide with a concurrent registration.
    async fn insert_church(&mut self, church: &Church) -> Result<()>;

    /// Upserts an administrative role assignment.
    async fn insert_church_admin(&mut self, admin: &ChurchAdmin) -> Result<()>;

    /// Reads a content row under an exclusive lock, blocking other writers
    /// until this transaction ends.
    async fn lock_content(&mut self, id: ContentId) -> Result<Option<Content>>;

    /// Reads a ticket type row under an exclusive lock.
    async fn lock_ticket_type(&mut self, id: TicketTypeId) -> Result<Option<TicketType>>;

    /// Sum of unexpired reservation quantities for a source, read inside
    /// this transaction.
    async fn reservation_sum(&mut self, source: &InventorySource, now: DateTime<Utc>)
    -> Result<u32>;

    /// Reads an order row under an exclusive lock. Serializes concurrent
    /// completion attempts for the same order.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<BookOrder>>;

    async fn insert_order(&mut self, order: &BookOrder) -> Result<()>;

    async fn insert_tickets(&mut self, tickets: &[Ticket]) -> Result<()>;

    /// Relative increment of the sold counter governing `source`
    /// (never read-modify-write).
    async fn record_sale(&mut self, source: &InventorySource, quantity: u32) -> Result<()>;

    /// Deletes the user's reservations for a source (expired ones included);
    /// returns how many rows went away.
    async fn clear_reservations(&mut self, source: &InventorySource, user: UserId) -> Result<u64>;

    /// Stamps the payment transaction id on an order.
    async fn set_payment_transaction(&mut self, order: OrderId, transaction_id: &str)
    -> Result<()>;

    /// Replaces an event's ledger fields (admin edit path; caller validates
    /// the invariants against the locked row first).
    async fn update_event_ticketing(
        &mut self,
        content: ContentId,
        ticketing: &EventTicketing,
    ) -> Result<()>;

    /// Commits every write performed through this transaction.
    async fn commit(self: Box<Self>) -> Result<()>;
}
