//! Content catalog, ticket types, reservations, and order creation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use common::Money;
use domain::{NewContent, NewOrder, TicketingUpdate, TierPricing};
use serde::{Deserialize, Serialize};
use store::{Content, InventorySource, Store, TicketTier, TicketType};

use crate::AppState;
use crate::error::ApiError;

use super::parse_id;

/// Default payment window for a reservation.
const DEFAULT_RESERVATION_TTL_SECS: i64 = 900;

// -- Request types --

#[derive(Deserialize)]
pub struct TierRequest {
    pub price: i64,
    pub quantity: Option<u32>,
}

impl TierRequest {
    fn pricing(&self) -> TierPricing {
        TierPricing {
            price: Money::from_minor(self.price),
            quantity: self.quantity,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateContentRequest {
    pub church_id: String,
    pub user_id: String,
    pub content_type: String,
    pub title: String,
    pub description: Option<String>,
    pub delivery_type: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub is_paid: Option<bool>,
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub capacity: Option<u32>,
    pub classic: Option<TierRequest>,
    pub vip: Option<TierRequest>,
    pub premium: Option<TierRequest>,
}

#[derive(Deserialize)]
pub struct UpdateTicketingRequest {
    pub user_id: String,
    pub capacity: Option<u32>,
    pub classic: Option<TierRequest>,
    pub vip: Option<TierRequest>,
    pub premium: Option<TierRequest>,
}

#[derive(Deserialize)]
pub struct CreateTicketTypeRequest {
    pub user_id: String,
    pub name: String,
    pub price: i64,
    pub quantity: Option<u32>,
}

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub user_id: String,
    pub quantity: u32,
    pub ticket_type_id: Option<String>,
    pub ticket_tier: Option<String>,
    pub ttl_seconds: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub quantity: u32,
    pub delivery_type: Option<String>,
    #[serde(default)]
    pub is_ticket: bool,
    pub ticket_type_id: Option<String>,
    pub ticket_tier: Option<String>,
    pub payment_gateway: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct TierResponse {
    pub tier: String,
    pub price: i64,
    pub quantity: Option<u32>,
    pub sold: u32,
    pub available: Option<u32>,
}

#[derive(Serialize)]
pub struct ContentResponse {
    pub id: String,
    pub church_id: String,
    pub content_type: String,
    pub delivery_type: String,
    pub title: String,
    pub slug: String,
    pub is_paid: bool,
    pub price: Option<i64>,
    pub currency: String,
    pub capacity: Option<u32>,
    pub tickets_sold: u32,
    /// Flat availability net of unexpired reservations; null = unlimited.
    pub available_tickets: Option<u32>,
    pub tiers: Vec<TierResponse>,
    pub published: bool,
}

#[derive(Serialize)]
pub struct TicketTypeResponse {
    pub id: String,
    pub content_id: String,
    pub name: String,
    pub price: i64,
    pub quantity: Option<u32>,
    pub sold: u32,
    pub available: Option<u32>,
}

impl TicketTypeResponse {
    fn new(ticket_type: &TicketType, available: Option<u32>) -> Self {
        Self {
            id: ticket_type.id.to_string(),
            content_id: ticket_type.content_id.to_string(),
            name: ticket_type.name.clone(),
            price: ticket_type.price.minor(),
            quantity: ticket_type.quantity,
            sold: ticket_type.sold,
            available,
        }
    }
}

#[derive(Serialize)]
pub struct ReservationResponse {
    pub id: String,
    pub quantity: u32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub content_id: String,
    pub delivery_type: String,
    pub quantity: u32,
    pub total_price: i64,
    pub is_ticket: bool,
    pub ticket_type_id: Option<String>,
    pub ticket_tier: Option<String>,
    pub payment_gateway: String,
    pub payment_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&store::BookOrder> for OrderResponse {
    fn from(order: &store::BookOrder) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            content_id: order.content_id.to_string(),
            delivery_type: order.delivery_type.to_string(),
            quantity: order.quantity,
            total_price: order.total_price.minor(),
            is_ticket: order.is_ticket,
            ticket_type_id: order.ticket_type_id.map(|id| id.to_string()),
            ticket_tier: order.ticket_tier.map(|t| t.to_string()),
            payment_gateway: order.payment_gateway.to_string(),
            payment_transaction_id: order.payment_transaction_id.clone(),
            created_at: order.created_at,
        }
    }
}

// -- Handlers --

/// POST /contents — create a content item (event ticketing fields included).
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateContentRequest>,
) -> Result<(StatusCode, Json<ContentResponse>), ApiError> {
    let content = state
        .contents
        .create_content(NewContent {
            church_id: parse_id(&req.church_id, "church_id")?,
            content_type: parse_id(&req.content_type, "content_type")?,
            title: req.title,
            description: req.description.unwrap_or_default(),
            delivery_type: req
                .delivery_type
                .as_deref()
                .map(|d| parse_id(d, "delivery_type"))
                .transpose()?,
            start_at: req.start_at,
            end_at: req.end_at,
            location: req.location.unwrap_or_default(),
            is_paid: req.is_paid.unwrap_or(false),
            price: req.price.map(Money::from_minor),
            currency: req.currency,
            capacity: req.capacity,
            classic: req.classic.as_ref().map(TierRequest::pricing),
            vip: req.vip.as_ref().map(TierRequest::pricing),
            premium: req.premium.as_ref().map(TierRequest::pricing),
            created_by: parse_id(&req.user_id, "user_id")?,
        })
        .await?;

    let response = content_response(&state, &content).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /contents/{id} — content detail with availability.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ContentResponse>, ApiError> {
    let content = state.contents.get(parse_id(&id, "content id")?).await?;
    Ok(Json(content_response(&state, &content).await?))
}

/// PATCH /contents/{id}/ticketing — admin edit of capacity and tiers.
#[tracing::instrument(skip(state, req))]
pub async fn update_ticketing<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTicketingRequest>,
) -> Result<Json<ContentResponse>, ApiError> {
    let content = state
        .contents
        .update_event_ticketing(
            parse_id(&id, "content id")?,
            parse_id(&req.user_id, "user_id")?,
            TicketingUpdate {
                capacity: req.capacity,
                classic: req.classic.as_ref().map(TierRequest::pricing),
                vip: req.vip.as_ref().map(TierRequest::pricing),
                premium: req.premium.as_ref().map(TierRequest::pricing),
            },
        )
        .await?;
    Ok(Json(content_response(&state, &content).await?))
}

/// POST /contents/{id}/ticket-types — create a ticket type.
#[tracing::instrument(skip(state, req))]
pub async fn create_ticket_type<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CreateTicketTypeRequest>,
) -> Result<(StatusCode, Json<TicketTypeResponse>), ApiError> {
    let ticket_type = state
        .contents
        .create_ticket_type(
            parse_id(&id, "content id")?,
            parse_id(&req.user_id, "user_id")?,
            req.name,
            Money::from_minor(req.price),
            req.quantity,
        )
        .await?;

    let available = ticket_type.available(0);
    Ok((
        StatusCode::CREATED,
        Json(TicketTypeResponse::new(&ticket_type, available)),
    ))
}

/// GET /contents/{id}/ticket-types — list ticket types with availability.
#[tracing::instrument(skip(state))]
pub async fn list_ticket_types<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TicketTypeResponse>>, ApiError> {
    let types = state
        .contents
        .list_ticket_types(parse_id(&id, "content id")?)
        .await?;
    Ok(Json(
        types
            .iter()
            .map(|(ticket_type, available)| TicketTypeResponse::new(ticket_type, *available))
            .collect(),
    ))
}

/// POST /contents/{id}/reservations — hold inventory during checkout.
#[tracing::instrument(skip(state, req))]
pub async fn create_reservation<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let content_id = parse_id(&id, "content id")?;
    let source = resolve_source(content_id, &req.ticket_type_id, &req.ticket_tier)?;
    let ttl = Duration::seconds(req.ttl_seconds.unwrap_or(DEFAULT_RESERVATION_TTL_SECS));

    let reservation = state
        .reservations
        .reserve(source, parse_id(&req.user_id, "user_id")?, req.quantity, ttl)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse {
            id: reservation.id.to_string(),
            quantity: reservation.quantity,
            expires_at: reservation.expires_at,
        }),
    ))
}

/// POST /contents/{id}/orders — create an order for a book or tickets.
#[tracing::instrument(skip(state, req))]
pub async fn create_order<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state
        .orders
        .create_order(NewOrder {
            user_id: parse_id(&req.user_id, "user_id")?,
            content_id: parse_id(&id, "content id")?,
            quantity: req.quantity,
            delivery_type: req
                .delivery_type
                .as_deref()
                .map(|d| parse_id(d, "delivery_type"))
                .transpose()?,
            is_ticket: req.is_ticket,
            ticket_type_id: req
                .ticket_type_id
                .as_deref()
                .map(|t| parse_id(t, "ticket_type_id"))
                .transpose()?,
            ticket_tier: req
                .ticket_tier
                .as_deref()
                .map(|t| parse_id(t, "ticket_tier"))
                .transpose()?,
            payment_gateway: req
                .payment_gateway
                .as_deref()
                .map(|g| parse_id(g, "payment_gateway"))
                .transpose()?,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

fn resolve_source(
    content_id: common::ContentId,
    ticket_type_id: &Option<String>,
    ticket_tier: &Option<String>,
) -> Result<InventorySource, ApiError> {
    if let Some(ticket_type_id) = ticket_type_id.as_deref() {
        return Ok(InventorySource::TicketType(parse_id(
            ticket_type_id,
            "ticket_type_id",
        )?));
    }
    if let Some(tier) = ticket_tier.as_deref() {
        let tier: TicketTier = parse_id(tier, "ticket_tier")?;
        return Ok(InventorySource::Tier(content_id, tier));
    }
    Ok(InventorySource::Event(content_id))
}

async fn content_response<S: Store + Clone + 'static>(
    state: &AppState<S>,
    content: &Content,
) -> Result<ContentResponse, ApiError> {
    let (available_tickets, tiers) = if content.is_event() {
        let available = state
            .reservations
            .available(&InventorySource::Event(content.id))
            .await?;
        let mut tiers = Vec::new();
        for (tier, cfg) in content.ticketing.tiers.iter() {
            let tier_available = state
                .reservations
                .available(&InventorySource::Tier(content.id, tier))
                .await?;
            tiers.push(TierResponse {
                tier: tier.to_string(),
                price: cfg.price.minor(),
                quantity: cfg.quantity,
                sold: cfg.sold,
                available: tier_available,
            });
        }
        (available, tiers)
    } else {
        (None, Vec::new())
    };

    Ok(ContentResponse {
        id: content.id.to_string(),
        church_id: content.church_id.to_string(),
        content_type: content.content_type.to_string(),
        delivery_type: content.delivery_type.to_string(),
        title: content.title.clone(),
        slug: content.slug.clone(),
        is_paid: content.is_paid,
        price: content.price.map(|p| p.minor()),
        currency: content.currency.clone(),
        capacity: content.ticketing.capacity,
        tickets_sold: content.ticketing.tickets_sold,
        available_tickets,
        tiers,
        published: content.published,
    })
}
