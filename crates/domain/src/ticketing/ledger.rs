//! The capacity ledger: one polymorphic lock-and-check per inventory source.
//!
//! Every target is a `(cap, sold)` counter pair: the flat
//! `capacity/tickets_sold` pair on an event, a tier's `quantity/sold`, or a
//! ticket type's `quantity/sold`. Availability is `cap - sold - reserved`,
//! and sales only ever move `sold` through relative updates while the row
//! lock is held.

use chrono::{DateTime, Utc};
use common::Money;
use store::{Content, InventorySource, StoreTx, TicketTier, TicketType};

use crate::error::{DomainError, not_found};

use super::TicketingError;

/// A locked view of the ledger row governing one availability decision.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LedgerView {
    /// Remaining units net of unexpired reservations; `None` = unlimited.
    pub available: Option<u32>,
    /// Unit price resolved for the source (type price, tier price, or the
    /// event's flat price, in that order; zero when nothing is set).
    pub unit_price: Money,
}

fn net(cap: Option<u32>, sold: u32, reserved: u32) -> Option<u32> {
    cap.map(|c| c.saturating_sub(sold + reserved))
}

fn tighter(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}

pub(crate) fn ticket_type_view(ticket_type: &TicketType, reserved: u32) -> LedgerView {
    LedgerView {
        available: net(ticket_type.quantity, ticket_type.sold, reserved),
        unit_price: ticket_type.price,
    }
}

/// A tier is bounded by its own quantity and by the event's overall
/// capacity (which tracks sales across all tiers).
pub(crate) fn tier_view(
    content: &Content,
    tier: TicketTier,
    reserved_tier: u32,
    reserved_event: u32,
) -> Result<LedgerView, TicketingError> {
    let cfg = content
        .ticketing
        .tiers
        .get(tier)
        .ok_or(TicketingError::InvalidTier { tier })?;
    let within_tier = net(cfg.quantity, cfg.sold, reserved_tier);
    let within_event = net(
        content.ticketing.capacity,
        content.ticketing.tickets_sold,
        reserved_event,
    );
    Ok(LedgerView {
        available: tighter(within_tier, within_event),
        unit_price: cfg.price,
    })
}

pub(crate) fn event_view(content: &Content, reserved: u32) -> LedgerView {
    LedgerView {
        available: net(
            content.ticketing.capacity,
            content.ticketing.tickets_sold,
            reserved,
        ),
        unit_price: content.price.unwrap_or_default(),
    }
}

/// Takes the exclusive lock on the row governing `source` and returns the
/// availability/pricing view computed inside the same transaction.
///
/// Everything the caller decides from the view stays valid until the
/// transaction ends, because no other writer can pass this lock.
pub(crate) async fn lock_and_check(
    tx: &mut dyn StoreTx,
    source: &InventorySource,
    now: DateTime<Utc>,
) -> Result<LedgerView, DomainError> {
    match source {
        InventorySource::TicketType(id) => {
            let ticket_type = tx
                .lock_ticket_type(*id)
                .await?
                .ok_or_else(|| not_found("ticket type", id))?;
            let reserved = tx.reservation_sum(source, now).await?;
            Ok(ticket_type_view(&ticket_type, reserved))
        }
        InventorySource::Tier(content_id, tier) => {
            let content = tx
                .lock_content(*content_id)
                .await?
                .ok_or_else(|| not_found("content", content_id))?;
            let reserved_tier = tx.reservation_sum(source, now).await?;
            let reserved_event = tx
                .reservation_sum(&InventorySource::Event(*content_id), now)
                .await?;
            Ok(tier_view(&content, *tier, reserved_tier, reserved_event)?)
        }
        InventorySource::Event(content_id) => {
            let content = tx
                .lock_content(*content_id)
                .await?
                .ok_or_else(|| not_found("content", content_id))?;
            let reserved = tx.reservation_sum(source, now).await?;
            Ok(event_view(&content, reserved))
        }
    }
}

/// Rejects the request when it asks for more than the view has left.
pub(crate) fn ensure_available(view: &LedgerView, requested: u32) -> Result<(), TicketingError> {
    if let Some(available) = view.available
        && requested > available
    {
        return Err(TicketingError::InsufficientInventory {
            requested,
            available,
        });
    }
    Ok(())
}
