//! Church registration and minimal user records.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::NewChurch;
use serde::{Deserialize, Serialize};
use store::{Church, Store, User};

use crate::AppState;
use crate::error::ApiError;

use super::parse_id;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterChurchRequest {
    pub title: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub owner_id: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub phone_number: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct ChurchResponse {
    pub id: String,
    pub code: i64,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub city: String,
    pub country: String,
}

impl From<&Church> for ChurchResponse {
    fn from(church: &Church) -> Self {
        Self {
            id: church.id.to_string(),
            code: church.code.value(),
            title: church.title.clone(),
            slug: church.slug.clone(),
            status: church.status.to_string(),
            city: church.city.clone(),
            country: church.country.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub role: String,
}

// -- Handlers --

/// POST /churches — register a church, allocating its code.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterChurchRequest>,
) -> Result<(StatusCode, Json<ChurchResponse>), ApiError> {
    let owner_id = req
        .owner_id
        .as_deref()
        .map(|id| parse_id(id, "owner_id"))
        .transpose()?;

    let church = state
        .registry
        .register(NewChurch {
            title: req.title,
            city: req.city.unwrap_or_default(),
            country: req.country.unwrap_or_default(),
            owner_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ChurchResponse::from(&church))))
}

/// GET /churches/{id} — load a church by id.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ChurchResponse>, ApiError> {
    let church = state.registry.get(parse_id(&id, "church id")?).await?;
    Ok(Json(ChurchResponse::from(&church)))
}

/// POST /users — create a minimal buyer record.
#[tracing::instrument(skip(state, req))]
pub async fn create_user<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = User::new(req.name.unwrap_or_default(), req.phone_number);
    state.store.insert_user(&user).await.map_err(|e| ApiError::Domain(e.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id.to_string(),
            name: user.name,
            phone_number: user.phone_number,
            role: user.role.to_string(),
        }),
    ))
}
