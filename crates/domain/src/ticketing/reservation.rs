//! Time-boxed inventory holds.

use chrono::{Duration, Utc};
use common::UserId;
use store::{InventorySource, Store, TicketReservation};

use crate::error::{DomainError, not_found};

use super::TicketingError;
use super::ledger;

/// Service creating and consulting reservations.
///
/// A reservation is a subtractive signal, not inventory: creating one does
/// not touch any counter, and letting it pass `expires_at` restores
/// availability without any explicit action. Expired rows are never swept.
pub struct ReservationManager<S> {
    store: S,
}

impl<S: Store> ReservationManager<S> {
    /// Creates a new manager over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places a hold of `quantity` units against `source` for `ttl`.
    ///
    /// Deliberately does not check availability: callers quote
    /// `available()` first, and the authoritative check happens again under
    /// the ledger lock at order creation and issue time.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(
        &self,
        source: InventorySource,
        user_id: UserId,
        quantity: u32,
        ttl: Duration,
    ) -> Result<TicketReservation, DomainError> {
        if quantity == 0 {
            return Err(TicketingError::InvalidQuantity { quantity }.into());
        }
        self.ensure_target_exists(&source).await?;
        let reservation = TicketReservation::new(source, user_id, quantity, Utc::now() + ttl);
        self.store.insert_reservation(&reservation).await?;
        metrics::counter!("reservations_created_total").increment(1);
        Ok(reservation)
    }

    /// Remaining units for a source, net of unexpired reservations; `None`
    /// when the target has no quantity cap.
    ///
    /// Non-locking read for quotes and serializations; stale the moment it
    /// returns. The same computation re-runs inside the issuing transaction.
    pub async fn available(&self, source: &InventorySource) -> Result<Option<u32>, DomainError> {
        let now = Utc::now();
        match source {
            InventorySource::TicketType(id) => {
                let ticket_type = self
                    .store
                    .get_ticket_type(*id)
                    .await?
                    .ok_or_else(|| not_found("ticket type", id))?;
                let reserved = self.store.reservation_sum(source, now).await?;
                Ok(ledger::ticket_type_view(&ticket_type, reserved).available)
            }
            InventorySource::Tier(content_id, tier) => {
                let content = self
                    .store
                    .get_content(*content_id)
                    .await?
                    .ok_or_else(|| not_found("content", content_id))?;
                let reserved_tier = self.store.reservation_sum(source, now).await?;
                let reserved_event = self
                    .store
                    .reservation_sum(&InventorySource::Event(*content_id), now)
                    .await?;
                Ok(ledger::tier_view(&content, *tier, reserved_tier, reserved_event)?.available)
            }
            InventorySource::Event(content_id) => {
                let content = self
                    .store
                    .get_content(*content_id)
                    .await?
                    .ok_or_else(|| not_found("content", content_id))?;
                let reserved = self.store.reservation_sum(source, now).await?;
                Ok(ledger::event_view(&content, reserved).available)
            }
        }
    }

    async fn ensure_target_exists(&self, source: &InventorySource) -> Result<(), DomainError> {
        match source {
            InventorySource::TicketType(id) => {
                self.store
                    .get_ticket_type(*id)
                    .await?
                    .ok_or_else(|| not_found("ticket type", id))?;
            }
            InventorySource::Tier(content_id, tier) => {
                let content = self
                    .store
                    .get_content(*content_id)
                    .await?
                    .ok_or_else(|| not_found("content", content_id))?;
                if content.ticketing.tiers.get(*tier).is_none() {
                    return Err(TicketingError::InvalidTier { tier: *tier }.into());
                }
            }
            InventorySource::Event(content_id) => {
                self.store
                    .get_content(*content_id)
                    .await?
                    .ok_or_else(|| not_found("content", content_id))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ContentId, Money};
    use store::{InMemoryStore, TicketType};

    async fn store_with_type(quantity: Option<u32>) -> (InMemoryStore, TicketType) {
        let store = InMemoryStore::new();
        let content = crate::content::test_support::event(&store, Some(100)).await;
        let ticket_type = TicketType::new(content.id, "Standard", Money::from_minor(1000), quantity);
        store.insert_ticket_type(&ticket_type).await.unwrap();
        (store, ticket_type)
    }

    #[tokio::test]
    async fn a_reservation_immediately_reduces_availability() {
        let (store, ticket_type) = store_with_type(Some(5)).await;
        let manager = ReservationManager::new(store);
        let source = InventorySource::TicketType(ticket_type.id);

        assert_eq!(manager.available(&source).await.unwrap(), Some(5));
        manager
            .reserve(source, UserId::new(), 3, Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(manager.available(&source).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn expiry_restores_availability_without_any_action() {
        let (store, ticket_type) = store_with_type(Some(5)).await;
        let manager = ReservationManager::new(store.clone());
        let source = InventorySource::TicketType(ticket_type.id);

        manager
            .reserve(source, UserId::new(), 3, Duration::zero())
            .await
            .unwrap();

        assert_eq!(manager.available(&source).await.unwrap(), Some(5));
        // The expired row is still there; it just stopped counting.
        assert_eq!(store.reservation_row_count().await, 1);
    }

    #[tokio::test]
    async fn uncapped_targets_report_unlimited() {
        let (store, ticket_type) = store_with_type(None).await;
        let manager = ReservationManager::new(store);
        let source = InventorySource::TicketType(ticket_type.id);

        manager
            .reserve(source, UserId::new(), 400, Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(manager.available(&source).await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let (store, ticket_type) = store_with_type(Some(5)).await;
        let manager = ReservationManager::new(store);

        let result = manager
            .reserve(
                InventorySource::TicketType(ticket_type.id),
                UserId::new(),
                0,
                Duration::minutes(10),
            )
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Ticketing(TicketingError::InvalidQuantity { .. }))
        ));
    }

    #[tokio::test]
    async fn reserving_a_missing_target_fails() {
        let store = InMemoryStore::new();
        let manager = ReservationManager::new(store);

        let result = manager
            .reserve(
                InventorySource::Event(ContentId::new()),
                UserId::new(),
                1,
                Duration::minutes(10),
            )
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
