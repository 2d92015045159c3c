use chrono::{DateTime, Utc};
use common::{ChurchId, ContentId, Money, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::str_enum;
use super::ticket::TicketTier;

str_enum!(
    /// Kind of a content item.
    ContentType {
        Article => "ARTICLE",
        Audio => "AUDIO",
        Event => "EVENT",
        Video => "VIDEO",
        Post => "POST",
        Book => "BOOK",
    }
);

str_enum!(
    /// How a purchased item is delivered.
    DeliveryType {
        Digital => "DIGITAL",
        Physical => "PHYSICAL",
    }
);

/// A capacity invariant would be violated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapacityError {
    #[error("tier quantities sum to {tiers_total}, exceeding the event capacity of {capacity}")]
    TierSumExceedsCapacity { tiers_total: u32, capacity: u32 },

    #[error("{sold} tickets sold exceeds the event capacity of {capacity}")]
    SoldExceedsCapacity { sold: u32, capacity: u32 },

    #[error("{sold} tickets sold exceeds the available quantity of {quantity}")]
    SoldExceedsQuantity { sold: u32, quantity: u32 },

    #[error("tier {tier} has sold {sold} tickets, exceeding its quantity of {quantity}")]
    TierSoldExceedsQuantity {
        tier: TicketTier,
        sold: u32,
        quantity: u32,
    },

    #[error("tier {tier} cannot be removed: {sold} tickets already issued")]
    TierHasIssuedTickets { tier: TicketTier, sold: u32 },
}

/// Price and inventory of one named tier on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    pub price: Money,
    /// None = unlimited.
    pub quantity: Option<u32>,
    /// Units issued against this tier so far.
    pub sold: u32,
}

impl TierConfig {
    pub fn new(price: Money, quantity: Option<u32>) -> Self {
        Self {
            price,
            quantity,
            sold: 0,
        }
    }
}

/// The up-to-three named tiers an event may sell directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSet {
    pub classic: Option<TierConfig>,
    pub vip: Option<TierConfig>,
    pub premium: Option<TierConfig>,
}

impl TierSet {
    /// Returns the configuration for a tier, if it is set up on this event.
    pub fn get(&self, tier: TicketTier) -> Option<&TierConfig> {
        match tier {
            TicketTier::Classic => self.classic.as_ref(),
            TicketTier::Vip => self.vip.as_ref(),
            TicketTier::Premium => self.premium.as_ref(),
        }
    }

    /// Mutable access to one tier's slot.
    pub fn slot_mut(&mut self, tier: TicketTier) -> &mut Option<TierConfig> {
        match tier {
            TicketTier::Classic => &mut self.classic,
            TicketTier::Vip => &mut self.vip,
            TicketTier::Premium => &mut self.premium,
        }
    }

    /// True when no tier is configured (the event sells flat capacity).
    pub fn is_empty(&self) -> bool {
        self.classic.is_none() && self.vip.is_none() && self.premium.is_none()
    }

    /// Iterates over the configured tiers.
    pub fn iter(&self) -> impl Iterator<Item = (TicketTier, &TierConfig)> {
        [
            (TicketTier::Classic, self.classic.as_ref()),
            (TicketTier::Vip, self.vip.as_ref()),
            (TicketTier::Premium, self.premium.as_ref()),
        ]
        .into_iter()
        .filter_map(|(tier, cfg)| cfg.map(|c| (tier, c)))
    }

    /// Total units issued across all tiers.
    pub fn total_sold(&self) -> u32 {
        self.iter().map(|(_, cfg)| cfg.sold).sum()
    }
}

/// Capacity ledger state carried directly on an event.
///
/// The flat pair (`capacity`, `tickets_sold`) and the tier set are two
/// representations of the same ledger; when tiers are present,
/// `tickets_sold` tracks the total across tiers and `capacity` bounds it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTicketing {
    /// None = unlimited.
    pub capacity: Option<u32>,
    pub tickets_sold: u32,
    pub tiers: TierSet,
}

impl EventTicketing {
    /// Checks every capacity invariant; called before any write that touches
    /// the ledger fields.
    pub fn validate(&self) -> Result<(), CapacityError> {
        if let Some(capacity) = self.capacity {
            if self.tickets_sold > capacity {
                return Err(CapacityError::SoldExceedsCapacity {
                    sold: self.tickets_sold,
                    capacity,
                });
            }
            let quantities: Vec<u32> = self
                .tiers
                .iter()
                .filter_map(|(_, cfg)| cfg.quantity)
                .collect();
            // The sum constraint only binds when every configured tier is capped.
            if !self.tiers.is_empty() && quantities.len() == self.tiers.iter().count() {
                let tiers_total: u32 = quantities.iter().sum();
                if tiers_total > capacity {
                    return Err(CapacityError::TierSumExceedsCapacity {
                        tiers_total,
                        capacity,
                    });
                }
            }
        }
        for (tier, cfg) in self.tiers.iter() {
            if let Some(quantity) = cfg.quantity
                && cfg.sold > quantity
            {
                return Err(CapacityError::TierSoldExceedsQuantity {
                    tier,
                    sold: cfg.sold,
                    quantity,
                });
            }
        }
        Ok(())
    }
}

/// A content item: article, media, book, or event.
///
/// Only events carry meaningful [`EventTicketing`] state; for other kinds
/// the ledger stays at its default (uncapped, nothing sold).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    pub church_id: ChurchId,
    pub content_type: ContentType,
    pub delivery_type: DeliveryType,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: String,
    pub is_paid: bool,
    /// Flat unit price; the last pricing fallback for tickets.
    pub price: Option<Money>,
    pub currency: String,
    pub ticketing: EventTicketing,
    pub published: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Content {
    pub fn is_event(&self) -> bool {
        self.content_type == ContentType::Event
    }

    /// True when ticket orders must name one of the configured tiers.
    pub fn uses_tiers(&self) -> bool {
        !self.ticketing.tiers.is_empty()
    }
}
