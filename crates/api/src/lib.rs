//! HTTP API server with observability for the ticketing platform.
//!
//! Provides REST endpoints for tenant registration, the content catalog,
//! reservations, orders, and ticket issuance, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use domain::{ChurchRegistry, ContentService, OrderService, ReservationManager};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub registry: ChurchRegistry<S>,
    pub contents: ContentService<S>,
    pub orders: OrderService<S>,
    pub reservations: ReservationManager<S>,
    pub store: S,
}

/// Creates the application state with all domain services over one store.
pub fn create_state<S: Store + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        registry: ChurchRegistry::new(store.clone()),
        contents: ContentService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        reservations: ReservationManager::new(store.clone()),
        store,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/churches", post(routes::churches::register::<S>))
        .route("/churches/{id}", get(routes::churches::get::<S>))
        .route("/users", post(routes::churches::create_user::<S>))
        .route("/contents", post(routes::contents::create::<S>))
        .route("/contents/{id}", get(routes::contents::get::<S>))
        .route(
            "/contents/{id}/ticketing",
            patch(routes::contents::update_ticketing::<S>),
        )
        .route(
            "/contents/{id}/ticket-types",
            post(routes::contents::create_ticket_type::<S>),
        )
        .route(
            "/contents/{id}/ticket-types",
            get(routes::contents::list_ticket_types::<S>),
        )
        .route(
            "/contents/{id}/reservations",
            post(routes::contents::create_reservation::<S>),
        )
        .route(
            "/contents/{id}/orders",
            post(routes::contents::create_order::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/complete", post(routes::orders::complete::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// GET /metrics — Prometheus text exposition.
async fn render_metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
