//! Content catalog: creation, ticket types, and admin edits of the ledger.

use chrono::{DateTime, Utc};
use common::{ChurchId, ContentId, Money, UserId, slugify};
use store::{
    Content, ContentType, DeliveryType, EventTicketing, InventorySource, Store, TicketTier,
    TicketType, TierConfig, TierSet,
};

use crate::error::{DomainError, not_found};
use crate::ticketing::TicketingError;

/// Price and optional quantity for one tier, as supplied by an admin.
#[derive(Debug, Clone, Copy)]
pub struct TierPricing {
    pub price: Money,
    /// None = unlimited.
    pub quantity: Option<u32>,
}

impl TierPricing {
    fn into_config(self) -> TierConfig {
        TierConfig::new(self.price, self.quantity)
    }
}

/// A content creation request.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub church_id: ChurchId,
    pub content_type: ContentType,
    pub title: String,
    pub description: String,
    pub delivery_type: Option<DeliveryType>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: String,
    pub is_paid: bool,
    pub price: Option<Money>,
    pub currency: Option<String>,
    pub capacity: Option<u32>,
    pub classic: Option<TierPricing>,
    pub vip: Option<TierPricing>,
    pub premium: Option<TierPricing>,
    pub created_by: UserId,
}

/// An admin edit of an event's ledger configuration.
///
/// Replaces capacity and tier pricing wholesale; sold counters are carried
/// over from the locked row, and the result is re-validated against every
/// capacity invariant before the write.
#[derive(Debug, Clone, Default)]
pub struct TicketingUpdate {
    pub capacity: Option<u32>,
    pub classic: Option<TierPricing>,
    pub vip: Option<TierPricing>,
    pub premium: Option<TierPricing>,
}

impl TicketingUpdate {
    fn pricing_for(&self, tier: TicketTier) -> Option<TierPricing> {
        match tier {
            TicketTier::Classic => self.classic,
            TicketTier::Vip => self.vip,
            TicketTier::Premium => self.premium,
        }
    }
}

/// Service managing the content catalog for church admins.
pub struct ContentService<S> {
    store: S,
}

impl<S: Store> ContentService<S> {
    /// Creates a new content service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a content item. Event ticketing fields are validated against
    /// the capacity invariants before anything is written.
    #[tracing::instrument(skip(self, new), fields(church_id = %new.church_id, title = %new.title))]
    pub async fn create_content(&self, new: NewContent) -> Result<Content, DomainError> {
        self.store
            .get_church(new.church_id)
            .await?
            .ok_or_else(|| not_found("church", new.church_id))?;
        ensure_manager(&self.store, new.church_id, new.created_by).await?;

        let ticketing = EventTicketing {
            capacity: new.capacity,
            tickets_sold: 0,
            tiers: TierSet {
                classic: new.classic.map(TierPricing::into_config),
                vip: new.vip.map(TierPricing::into_config),
                premium: new.premium.map(TierPricing::into_config),
            },
        };
        ticketing.validate()?;

        let slug = slugify(&new.title);
        let content = Content {
            id: ContentId::new(),
            church_id: new.church_id,
            content_type: new.content_type,
            delivery_type: new.delivery_type.unwrap_or(DeliveryType::Digital),
            title: new.title,
            slug,
            description: new.description,
            start_at: new.start_at,
            end_at: new.end_at,
            location: new.location,
            is_paid: new.is_paid,
            price: new.price,
            currency: new.currency.unwrap_or_else(|| "XAF".to_string()),
            ticketing,
            published: true,
            created_by: Some(new.created_by),
            created_at: Utc::now(),
        };
        self.store.insert_content(&content).await?;
        Ok(content)
    }

    /// Loads a content item by id.
    pub async fn get(&self, id: ContentId) -> Result<Content, DomainError> {
        self.store
            .get_content(id)
            .await?
            .ok_or_else(|| not_found("content", id))
    }

    /// Creates a ticket type for an event. The name must be unique per
    /// event; a collision surfaces as a validation failure.
    #[tracing::instrument(skip(self))]
    pub async fn create_ticket_type(
        &self,
        content_id: ContentId,
        caller: UserId,
        name: String,
        price: Money,
        quantity: Option<u32>,
    ) -> Result<TicketType, DomainError> {
        let content = self.get(content_id).await?;
        if !content.is_event() {
            return Err(TicketingError::NotAnEvent.into());
        }
        ensure_manager(&self.store, content.church_id, caller).await?;

        let ticket_type = TicketType::new(content_id, name, price, quantity);
        self.store.insert_ticket_type(&ticket_type).await?;
        Ok(ticket_type)
    }

    /// Lists an event's ticket types with their current availability.
    pub async fn list_ticket_types(
        &self,
        content_id: ContentId,
    ) -> Result<Vec<(TicketType, Option<u32>)>, DomainError> {
        let now = Utc::now();
        let mut out = Vec::new();
        for ticket_type in self.store.list_ticket_types(content_id).await? {
            let reserved = self
                .store
                .reservation_sum(&InventorySource::TicketType(ticket_type.id), now)
                .await?;
            let available = ticket_type.available(reserved);
            out.push((ticket_type, available));
        }
        Ok(out)
    }

    /// Admin edit of an event's capacity and tiers.
    ///
    /// Runs under the same exclusive row lock the issuer takes, so the
    /// re-validation cannot race a concurrent sale.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_event_ticketing(
        &self,
        content_id: ContentId,
        caller: UserId,
        update: TicketingUpdate,
    ) -> Result<Content, DomainError> {
        let existing = self.get(content_id).await?;
        if !existing.is_event() {
            return Err(TicketingError::NotAnEvent.into());
        }
        ensure_manager(&self.store, existing.church_id, caller).await?;

        let mut tx = self.store.begin().await?;
        let mut content = tx
            .lock_content(content_id)
            .await?
            .ok_or_else(|| not_found("content", content_id))?;

        let mut ticketing = content.ticketing;
        ticketing.capacity = update.capacity;
        for tier in [TicketTier::Classic, TicketTier::Vip, TicketTier::Premium] {
            let current = ticketing.tiers.get(tier).copied();
            let slot = ticketing.tiers.slot_mut(tier);
            match (current, update.pricing_for(tier)) {
                (current, Some(pricing)) => {
                    let sold = current.map_or(0, |c| c.sold);
                    *slot = Some(TierConfig {
                        price: pricing.price,
                        quantity: pricing.quantity,
                        sold,
                    });
                }
                (Some(cur), None) if cur.sold > 0 => {
                    return Err(store::CapacityError::TierHasIssuedTickets {
                        tier,
                        sold: cur.sold,
                    }
                    .into());
                }
                (_, None) => *slot = None,
            }
        }
        ticketing.validate()?;

        tx.update_event_ticketing(content_id, &ticketing).await?;
        tx.commit().await?;

        content.ticketing = ticketing;
        Ok(content)
    }
}

/// Checks that the caller may mutate this church's catalog: SADMIN
/// anywhere, OWNER/ADMIN within their church.
pub(crate) async fn ensure_manager<S: Store>(
    store: &S,
    church: ChurchId,
    caller: UserId,
) -> Result<(), DomainError> {
    let user = store
        .get_user(caller)
        .await?
        .ok_or_else(|| not_found("user", caller))?;
    if user.is_sadmin() {
        return Ok(());
    }
    match store.church_role(church, caller).await? {
        Some(role) if role.can_manage() => Ok(()),
        _ => Err(DomainError::Forbidden {
            reason: "caller is not an administrator of this church",
        }),
    }
}
