//! Order retrieval and the payment-completion trigger for the issuer.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::{Store, Ticket};

use crate::AppState;
use crate::error::ApiError;

use super::contents::OrderResponse;
use super::parse_id;

// -- Request types --

#[derive(Deserialize)]
pub struct CompleteOrderRequest {
    pub payment_transaction_id: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub price: i64,
    pub status: String,
    pub tier: Option<String>,
    pub seat: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Ticket> for TicketResponse {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id.to_string(),
            price: ticket.price.minor(),
            status: ticket.status.to_string(),
            tier: ticket.tier.map(|t| t.to_string()),
            seat: ticket.seat.clone(),
            created_at: ticket.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct OrderWithTicketsResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub tickets: Vec<TicketResponse>,
}

// -- Handlers --

/// GET /orders/{id} — load an order with its issued tickets.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderWithTicketsResponse>, ApiError> {
    let (order, tickets) = state.orders.get_order(parse_id(&id, "order id")?).await?;
    Ok(Json(OrderWithTicketsResponse {
        order: OrderResponse::from(&order),
        tickets: tickets.iter().map(TicketResponse::from).collect(),
    }))
}

/// POST /orders/{id}/complete — confirm payment and issue tickets.
#[tracing::instrument(skip(state, req))]
pub async fn complete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CompleteOrderRequest>,
) -> Result<Json<OrderWithTicketsResponse>, ApiError> {
    let (order, tickets) = state
        .orders
        .complete_order(parse_id(&id, "order id")?, &req.payment_transaction_id)
        .await?;
    Ok(Json(OrderWithTicketsResponse {
        order: OrderResponse::from(&order),
        tickets: tickets.iter().map(TicketResponse::from).collect(),
    }))
}
