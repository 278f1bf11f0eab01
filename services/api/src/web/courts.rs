//! services/api/src/web/courts.rs
//!
//! Read-only endpoints over the court catalog.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use crate::web::rest::error_response;
use crate::web::state::AppState;

/// List all active courts, ordered by category then name.
#[utoipa::path(
    get,
    path = "/api/courts",
    responses((status = 200, description = "Active courts"))
)]
pub async fn list_courts_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let courts = state.booking.list_courts().await.map_err(error_response)?;
    Ok(Json(courts))
}

/// List active courts of one category, ordered by name.
#[utoipa::path(
    get,
    path = "/api/courts/category/{category}",
    params(("category" = String, Path, description = "Court category")),
    responses((status = 200, description = "Active courts of the category"))
)]
pub async fn courts_by_category_handler(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let courts = state
        .booking
        .list_courts_by_category(&category)
        .await
        .map_err(error_response)?;
    Ok(Json(courts))
}

/// Fetch one active court.
#[utoipa::path(
    get,
    path = "/api/courts/{id}",
    params(("id" = i64, Path, description = "Court id")),
    responses(
        (status = 200, description = "The court"),
        (status = 404, description = "Court not found")
    )
)]
pub async fn court_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let court = state.booking.get_court(id).await.map_err(error_response)?;
    Ok(Json(court))
}
