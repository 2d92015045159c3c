use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ChurchCode, ChurchId, ContentId, OrderId, TicketTypeId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{
    BookOrder, CapacityError, Church, ChurchAdmin, ChurchRole, Content, EventTicketing,
    InventorySource, Ticket, TicketReservation, TicketType, User,
};
use crate::store::{Store, StoreTx};
use crate::{Result, StoreError};

#[derive(Debug, Clone, Default)]
struct State {
    churches: HashMap<ChurchId, Church>,
    admins: Vec<ChurchAdmin>,
    users: HashMap<UserId, User>,
    contents: HashMap<ContentId, Content>,
    ticket_types: HashMap<TicketTypeId, TicketType>,
    reservations: Vec<TicketReservation>,
    orders: HashMap<OrderId, BookOrder>,
    tickets: Vec<Ticket>,
}

impl State {
    fn insert_church(&mut self, church: &Church) -> Result<()> {
        if self.churches.values().any(|c| c.code == church.code) {
            return Err(StoreError::DuplicateCode(church.code));
        }
        if self.churches.values().any(|c| c.title == church.title) {
            return Err(StoreError::DuplicateTitle(church.title.clone()));
        }
        self.churches.insert(church.id, church.clone());
        Ok(())
    }

    fn insert_church_admin(&mut self, admin: &ChurchAdmin) {
        if let Some(existing) = self
            .admins
            .iter_mut()
            .find(|a| a.church_id == admin.church_id && a.user_id == admin.user_id)
        {
            existing.role = admin.role;
        } else {
            self.admins.push(admin.clone());
        }
    }

    fn reservation_sum(&self, source: &InventorySource, now: DateTime<Utc>) -> u32 {
        self.reservations
            .iter()
            .filter(|r| r.source == *source && !r.is_expired(now))
            .map(|r| r.quantity)
            .sum()
    }

    fn record_sale(&mut self, source: &InventorySource, quantity: u32) -> Result<()> {
        match source {
            InventorySource::TicketType(id) => {
                let tt = self
                    .ticket_types
                    .get_mut(id)
                    .ok_or_else(|| StoreError::RowNotFound {
                        what: "ticket type",
                        id: id.to_string(),
                    })?;
                tt.sold += quantity;
                if let Some(cap) = tt.quantity
                    && tt.sold > cap
                {
                    return Err(CapacityError::SoldExceedsQuantity {
                        sold: tt.sold,
                        quantity: cap,
                    }
                    .into());
                }
            }
            InventorySource::Tier(content_id, tier) => {
                let content = get_content_mut(&mut self.contents, *content_id)?;
                let cfg = content
                    .ticketing
                    .tiers
                    .slot_mut(*tier)
                    .as_mut()
                    .ok_or_else(|| StoreError::RowNotFound {
                        what: "tier",
                        id: tier.to_string(),
                    })?;
                cfg.sold += quantity;
                content.ticketing.tickets_sold += quantity;
                content.ticketing.validate().map_err(StoreError::Capacity)?;
            }
            InventorySource::Event(content_id) => {
                let content = get_content_mut(&mut self.contents, *content_id)?;
                content.ticketing.tickets_sold += quantity;
                content.ticketing.validate().map_err(StoreError::Capacity)?;
            }
        }
        Ok(())
    }
}

fn get_content_mut(
    contents: &mut HashMap<ContentId, Content>,
    id: ContentId,
) -> Result<&mut Content> {
    contents.get_mut(&id).ok_or_else(|| StoreError::RowNotFound {
        what: "content",
        id: id.to_string(),
    })
}

/// In-memory store implementation for tests and DB-less runs.
///
/// Provides the same interface as the PostgreSQL implementation. One
/// store-wide async mutex stands in for row-level locks: a transaction holds
/// it from `begin` to `commit`, which trivially satisfies the
/// lock-across-check-then-write contract. Rollback restores a snapshot of
/// the whole state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    /// Test hook: number of upcoming church inserts to reject with a code
    /// conflict. Lives outside the snapshotted state so a rollback cannot
    /// restore consumed injections.
    code_conflicts: Arc<AtomicU32>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` church inserts fail with a code conflict, to
    /// exercise the registry's bounded retry.
    pub fn inject_code_conflicts(&self, n: u32) {
        self.code_conflicts.store(n, Ordering::SeqCst);
    }

    /// Total number of issued tickets across the store.
    pub async fn total_ticket_count(&self) -> usize {
        self.state.lock().await.tickets.len()
    }

    /// Total number of reservation rows, expired ones included.
    pub async fn reservation_row_count(&self) -> usize {
        self.state.lock().await.reservations.len()
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    snapshot: Option<State>,
    committed: bool,
    code_conflicts: Arc<AtomicU32>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.committed
            && let Some(snapshot) = self.snapshot.take()
        {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = Some(guard.clone());
        Ok(Box::new(MemoryTx {
            guard,
            snapshot,
            committed: false,
            code_conflicts: self.code_conflicts.clone(),
        }))
    }

    async fn get_church(&self, id: ChurchId) -> Result<Option<Church>> {
        Ok(self.state.lock().await.churches.get(&id).cloned())
    }

    async fn church_role(&self, church: ChurchId, user: UserId) -> Result<Option<ChurchRole>> {
        Ok(self
            .state
            .lock()
            .await
            .admins
            .iter()
            .find(|a| a.church_id == church && a.user_id == user)
            .map(|a| a.role))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|u| u.phone_number == user.phone_number)
        {
            return Err(StoreError::DuplicatePhone(user.phone_number.clone()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn insert_content(&self, content: &Content) -> Result<()> {
        let mut state = self.state.lock().await;
        state.contents.insert(content.id, content.clone());
        Ok(())
    }

    async fn get_content(&self, id: ContentId) -> Result<Option<Content>> {
        Ok(self.state.lock().await.contents.get(&id).cloned())
    }

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<()> {
        let mut state = self.state.lock().await;
        if state
            .ticket_types
            .values()
            .any(|t| t.content_id == ticket_type.content_id && t.name == ticket_type.name)
        {
            return Err(StoreError::DuplicateName(ticket_type.name.clone()));
        }
        state.ticket_types.insert(ticket_type.id, ticket_type.clone());
        Ok(())
    }

    async fn get_ticket_type(&self, id: TicketTypeId) -> Result<Option<TicketType>> {
        Ok(self.state.lock().await.ticket_types.get(&id).cloned())
    }

    async fn list_ticket_types(&self, content: ContentId) -> Result<Vec<TicketType>> {
        let state = self.state.lock().await;
        let mut types: Vec<TicketType> = state
            .ticket_types
            .values()
            .filter(|t| t.content_id == content)
            .cloned()
            .collect();
        types.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(types)
    }

    async fn insert_reservation(&self, reservation: &TicketReservation) -> Result<()> {
        self.state.lock().await.reservations.push(reservation.clone());
        Ok(())
    }

    async fn reservation_sum(&self, source: &InventorySource, now: DateTime<Utc>) -> Result<u32> {
        Ok(self.state.lock().await.reservation_sum(source, now))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<BookOrder>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn tickets_for_order(&self, order: OrderId) -> Result<Vec<Ticket>> {
        Ok(self
            .state
            .lock()
            .await
            .tickets
            .iter()
            .filter(|t| t.order_id == order)
            .cloned()
            .collect())
    }

    async fn ticket_count(&self, content: ContentId) -> Result<u64> {
        Ok(self
            .state
            .lock()
            .await
            .tickets
            .iter()
            .filter(|t| t.content_id == content)
            .count() as u64)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn max_church_code(&mut self) -> Result<Option<ChurchCode>> {
        Ok(self.guard.churches.values().map(|c| c.code).max())
    }

    async fn insert_church(&mut self, church: &Church) -> Result<()> {
        let injected = self
            .code_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::DuplicateCode(church.code));
        }
        self.guard.insert_church(church)
    }

    async fn insert_church_admin(&mut self, admin: &ChurchAdmin) -> Result<()> {
        self.guard.insert_church_admin(admin);
        Ok(())
    }

    async fn lock_content(&mut self, id: ContentId) -> Result<Option<Content>> {
        Ok(self.guard.contents.get(&id).cloned())
    }

    async fn lock_ticket_type(&mut self, id: TicketTypeId) -> Result<Option<TicketType>> {
        Ok(self.guard.ticket_types.get(&id).cloned())
    }

    async fn reservation_sum(
        &mut self,
        source: &InventorySource,
        now: DateTime<Utc>,
    ) -> Result<u32> {
        Ok(self.guard.reservation_sum(source, now))
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<BookOrder>> {
        Ok(self.guard.orders.get(&id).cloned())
    }

    async fn insert_order(&mut self, order: &BookOrder) -> Result<()> {
        self.guard.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_tickets(&mut self, tickets: &[Ticket]) -> Result<()> {
        self.guard.tickets.extend_from_slice(tickets);
        Ok(())
    }

    async fn record_sale(&mut self, source: &InventorySource, quantity: u32) -> Result<()> {
        self.guard.record_sale(source, quantity)
    }

    async fn clear_reservations(&mut self, source: &InventorySource, user: UserId) -> Result<u64> {
        let before = self.guard.reservations.len();
        self.guard
            .reservations
            .retain(|r| !(r.source == *source && r.user_id == user));
        Ok((before - self.guard.reservations.len()) as u64)
    }

    async fn set_payment_transaction(
        &mut self,
        order: OrderId,
        transaction_id: &str,
    ) -> Result<()> {
        let order = self
            .guard
            .orders
            .get_mut(&order)
            .ok_or_else(|| StoreError::RowNotFound {
                what: "order",
                id: order.to_string(),
            })?;
        order.payment_transaction_id = Some(transaction_id.to_string());
        Ok(())
    }

    async fn update_event_ticketing(
        &mut self,
        content: ContentId,
        ticketing: &EventTicketing,
    ) -> Result<()> {
        get_content_mut(&mut self.guard.contents, content)?.ticketing = *ticketing;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.committed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use crate::model::{ContentType, DeliveryType, TicketTier, TierConfig, TierSet};

    fn event(capacity: Option<u32>) -> Content {
        Content {
            id: ContentId::new(),
            church_id: ChurchId::new(),
            content_type: ContentType::Event,
            delivery_type: DeliveryType::Digital,
            title: "Conference".to_string(),
            slug: "conference".to_string(),
            description: String::new(),
            start_at: None,
            end_at: None,
            location: String::new(),
            is_paid: true,
            price: Some(Money::from_minor(1000)),
            currency: "XAF".to_string(),
            ticketing: EventTicketing {
                capacity,
                tickets_sold: 0,
                tiers: TierSet::default(),
            },
            published: true,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    async fn insert_church(store: &InMemoryStore, church: &Church) -> Result<()> {
        let mut tx = store.begin().await?;
        tx.insert_church(church).await?;
        tx.commit().await
    }

    #[tokio::test]
    async fn insert_and_get_church() {
        let store = InMemoryStore::new();
        let church = Church::new(ChurchCode::FIRST, "Grace", "Douala", "CM", None);
        insert_church(&store, &church).await.unwrap();

        let loaded = store.get_church(church.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Grace");

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.max_church_code().await.unwrap(), Some(ChurchCode::FIRST));
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let store = InMemoryStore::new();
        insert_church(&store, &Church::new(ChurchCode::FIRST, "A", "", "", None))
            .await
            .unwrap();
        let result = insert_church(&store, &Church::new(ChurchCode::FIRST, "B", "", "", None)).await;
        assert!(matches!(result, Err(StoreError::DuplicateCode(_))));
    }

    #[tokio::test]
    async fn duplicate_ticket_type_name_is_rejected() {
        let store = InMemoryStore::new();
        let content = event(Some(10));
        store.insert_content(&content).await.unwrap();

        let tt = TicketType::new(content.id, "Standard", Money::from_minor(500), Some(5));
        store.insert_ticket_type(&tt).await.unwrap();

        let dup = TicketType::new(content.id, "Standard", Money::from_minor(900), None);
        assert!(matches!(
            store.insert_ticket_type(&dup).await,
            Err(StoreError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();
        let content = event(Some(10));
        store.insert_content(&content).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.record_sale(&InventorySource::Event(content.id), 3)
                .await
                .unwrap();
            // dropped without commit
        }

        let loaded = store.get_content(content.id).await.unwrap().unwrap();
        assert_eq!(loaded.ticketing.tickets_sold, 0);
    }

    #[tokio::test]
    async fn committed_transaction_persists() {
        let store = InMemoryStore::new();
        let content = event(Some(10));
        store.insert_content(&content).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.record_sale(&InventorySource::Event(content.id), 3)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let loaded = store.get_content(content.id).await.unwrap().unwrap();
        assert_eq!(loaded.ticketing.tickets_sold, 3);
    }

    #[tokio::test]
    async fn record_sale_over_capacity_fails() {
        let store = InMemoryStore::new();
        let content = event(Some(2));
        store.insert_content(&content).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let result = tx.record_sale(&InventorySource::Event(content.id), 3).await;
        assert!(matches!(result, Err(StoreError::Capacity(_))));
    }

    #[tokio::test]
    async fn tier_sale_bumps_both_counters() {
        let store = InMemoryStore::new();
        let mut content = event(Some(10));
        content.ticketing.tiers = TierSet {
            classic: Some(TierConfig::new(Money::from_minor(1000), Some(6))),
            vip: Some(TierConfig::new(Money::from_minor(2500), Some(4))),
            premium: None,
        };
        store.insert_content(&content).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.record_sale(&InventorySource::Tier(content.id, TicketTier::Vip), 2)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let loaded = store.get_content(content.id).await.unwrap().unwrap();
        assert_eq!(loaded.ticketing.tickets_sold, 2);
        assert_eq!(loaded.ticketing.tiers.vip.unwrap().sold, 2);
        assert_eq!(loaded.ticketing.tiers.classic.unwrap().sold, 0);
    }

    #[tokio::test]
    async fn reservation_sum_filters_by_source_and_expiry() {
        let store = InMemoryStore::new();
        let content_id = ContentId::new();
        let source = InventorySource::Event(content_id);
        let other = InventorySource::Tier(content_id, TicketTier::Vip);
        let now = Utc::now();

        let live = TicketReservation::new(source, UserId::new(), 3, now + chrono::Duration::minutes(10));
        let expired = TicketReservation::new(source, UserId::new(), 5, now - chrono::Duration::minutes(1));
        let elsewhere = TicketReservation::new(other, UserId::new(), 7, now + chrono::Duration::minutes(10));
        for r in [&live, &expired, &elsewhere] {
            store.insert_reservation(r).await.unwrap();
        }

        assert_eq!(store.reservation_sum(&source, now).await.unwrap(), 3);
        assert_eq!(store.reservation_sum(&other, now).await.unwrap(), 7);
        // Expired rows stay around, they just stop counting.
        assert_eq!(store.reservation_row_count().await, 3);
    }

    #[tokio::test]
    async fn injected_code_conflicts_are_consumed() {
        let store = InMemoryStore::new();
        store.inject_code_conflicts(1);

        let church = Church::new(ChurchCode::FIRST, "A", "", "", None);
        assert!(matches!(
            insert_church(&store, &church).await,
            Err(StoreError::DuplicateCode(_))
        ));
        insert_church(&store, &church).await.unwrap();
    }
}
