//! Order creation and the ticket issuer.

use chrono::Utc;
use common::{ContentId, OrderId, TicketTypeId, UserId};
use store::{
    BookOrder, DeliveryType, InventorySource, PaymentGateway, Store, Ticket, TicketTier,
};

use crate::error::{DomainError, not_found};

use super::TicketingError;
use super::ledger;

/// A checkout request.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub content_id: ContentId,
    pub quantity: u32,
    pub delivery_type: Option<DeliveryType>,
    pub is_ticket: bool,
    pub ticket_type_id: Option<TicketTypeId>,
    pub ticket_tier: Option<TicketTier>,
    pub payment_gateway: Option<PaymentGateway>,
}

/// Service creating orders and issuing tickets once payment is confirmed.
pub struct OrderService<S> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an order, freezing its total price.
    ///
    /// For ticket orders the governing ledger row is locked, availability is
    /// checked net of unexpired reservations, and the order row is written
    /// in the same transaction. No inventory counter moves yet: the
    /// order sits in a pending-payment state until [`complete_order`].
    ///
    /// [`complete_order`]: OrderService::complete_order
    #[tracing::instrument(skip(self, req), fields(content_id = %req.content_id, quantity = req.quantity))]
    pub async fn create_order(&self, req: NewOrder) -> Result<BookOrder, DomainError> {
        if req.quantity == 0 {
            return Err(TicketingError::InvalidQuantity {
                quantity: req.quantity,
            }
            .into());
        }
        let content = self
            .store
            .get_content(req.content_id)
            .await?
            .ok_or_else(|| not_found("content", req.content_id))?;
        self.store
            .get_user(req.user_id)
            .await?
            .ok_or_else(|| not_found("user", req.user_id))?;

        // Events always sell tickets, whatever the request says.
        let is_ticket = req.is_ticket || content.is_event();
        if !is_ticket {
            let unit_price = content.price.unwrap_or_default();
            let order = build_order(&req, unit_price.multiply(req.quantity), false, None);
            let mut tx = self.store.begin().await?;
            tx.insert_order(&order).await?;
            tx.commit().await?;
            metrics::counter!("orders_created_total").increment(1);
            return Ok(order);
        }

        let source = match req.ticket_type_id {
            Some(ticket_type_id) => {
                let ticket_type = self
                    .store
                    .get_ticket_type(ticket_type_id)
                    .await?
                    .ok_or_else(|| not_found("ticket type", ticket_type_id))?;
                if ticket_type.content_id != content.id {
                    return Err(TicketingError::ForeignTicketType { ticket_type: ticket_type_id }.into());
                }
                InventorySource::TicketType(ticket_type_id)
            }
            None if content.uses_tiers() => {
                let tier = req.ticket_tier.ok_or(TicketingError::TierRequired)?;
                InventorySource::Tier(content.id, tier)
            }
            None => {
                if let Some(tier) = req.ticket_tier {
                    return Err(TicketingError::InvalidTier { tier }.into());
                }
                InventorySource::Event(content.id)
            }
        };

        let mut tx = self.store.begin().await?;
        let view = ledger::lock_and_check(&mut *tx, &source, Utc::now()).await?;
        ledger::ensure_available(&view, req.quantity)?;

        let tier = match source {
            InventorySource::Tier(_, tier) => Some(tier),
            _ => None,
        };
        let order = build_order(&req, view.unit_price.multiply(req.quantity), true, tier);
        tx.insert_order(&order).await?;
        tx.commit().await?;

        metrics::counter!("orders_created_total").increment(1);
        Ok(order)
    }

    /// Issues tickets for a paid order; the one state-changing operation.
    ///
    /// Inside a single transaction: locks the order row, rejects orders
    /// that already carry a payment transaction, re-acquires the ledger
    /// lock, clears the buyer's matching reservations, re-validates
    /// availability, creates one ticket per unit at the price re-derived
    /// from the catalog, bumps the sold counter with a relative update, and
    /// stamps the payment transaction id. Any failure rolls the whole
    /// operation back: no partial tickets, no partial decrement.
    #[tracing::instrument(skip(self, payment_transaction_id))]
    pub async fn complete_order(
        &self,
        order_id: OrderId,
        payment_transaction_id: &str,
    ) -> Result<(BookOrder, Vec<Ticket>), DomainError> {
        let started = std::time::Instant::now();

        let mut tx = self.store.begin().await?;
        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| not_found("order", order_id))?;
        if order.is_completed() {
            return Err(TicketingError::AlreadyCompleted.into());
        }

        let Some(source) = order.inventory_source() else {
            // Plain book order: just record the payment.
            tx.set_payment_transaction(order_id, payment_transaction_id)
                .await?;
            tx.commit().await?;
            return Ok((stamped(order, payment_transaction_id), Vec::new()));
        };

        // The buyer's own hold must not count against their purchase.
        tx.clear_reservations(&source, order.user_id).await?;
        let view = ledger::lock_and_check(&mut *tx, &source, Utc::now()).await?;
        ledger::ensure_available(&view, order.quantity)?;

        let tickets: Vec<Ticket> = (0..order.quantity)
            .map(|_| {
                Ticket::issue(
                    order.id,
                    order.content_id,
                    order.ticket_type_id,
                    order.ticket_tier,
                    order.user_id,
                    view.unit_price,
                )
            })
            .collect();
        tx.insert_tickets(&tickets).await?;
        tx.record_sale(&source, order.quantity).await?;
        tx.set_payment_transaction(order_id, payment_transaction_id)
            .await?;
        tx.commit().await?;

        metrics::counter!("tickets_issued_total").increment(u64::from(order.quantity));
        metrics::histogram!("ticket_issue_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(%order_id, quantity = order.quantity, "tickets issued");

        Ok((stamped(order, payment_transaction_id), tickets))
    }

    /// Loads an order with its issued tickets.
    pub async fn get_order(
        &self,
        order_id: OrderId,
    ) -> Result<(BookOrder, Vec<Ticket>), DomainError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| not_found("order", order_id))?;
        let tickets = self.store.tickets_for_order(order_id).await?;
        Ok((order, tickets))
    }
}

fn build_order(
    req: &NewOrder,
    total_price: common::Money,
    is_ticket: bool,
    tier: Option<TicketTier>,
) -> BookOrder {
    BookOrder {
        id: OrderId::new(),
        user_id: req.user_id,
        content_id: req.content_id,
        delivery_type: req.delivery_type.unwrap_or(DeliveryType::Digital),
        quantity: req.quantity,
        total_price,
        is_ticket,
        ticket_type_id: if is_ticket { req.ticket_type_id } else { None },
        ticket_tier: tier,
        payment_gateway: req.payment_gateway.unwrap_or(PaymentGateway::Cash),
        payment_transaction_id: None,
        shipped: false,
        delivered_at: None,
        created_at: Utc::now(),
    }
}

fn stamped(order: BookOrder, payment_transaction_id: &str) -> BookOrder {
    BookOrder {
        payment_transaction_id: Some(payment_transaction_id.to_string()),
        ..order
    }
}
