//! services/api/src/web/rest.rs
//!
//! Axum handlers for the reservation endpoints and the master definition
//! of the OpenAPI specification.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::NaiveDate;
use court_booking_core::{
    BookingError, CreateManualReservation, CreateRecurring, CreateReservation, PaymentState,
    RecurrencePattern, Reservation, ReservationFilter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        availability_handler,
        create_reservation_handler,
        list_reservations_handler,
        create_manual_handler,
        create_recurring_handler,
        list_recurring_handler,
        delete_recurring_handler,
        update_payment_handler,
        cancel_reservation_handler,
        crate::web::courts::list_courts_handler,
        crate::web::courts::courts_by_category_handler,
        crate::web::courts::court_detail_handler,
        crate::web::auth::login_handler,
        crate::web::auth::verify_handler,
    ),
    components(schemas(
        CreateReservationPayload,
        CreateManualPayload,
        CreateRecurringPayload,
        UpdatePaymentPayload,
        CreatedReservationResponse,
        RecurringCreatedResponse,
        MessageResponse,
        HealthResponse,
        crate::web::auth::LoginRequest,
        crate::web::auth::LoginResponse,
        crate::web::auth::AdminUser,
        crate::web::auth::VerifyResponse,
    )),
    tags(
        (name = "Court Booking API", description = "Slot availability, reservations, and recurring booking patterns.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateReservationPayload {
    pub court_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub client_name: Option<String>,
    pub client_contact: Option<String>,
    pub payment_state: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateManualPayload {
    pub court_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub client_name: Option<String>,
    pub client_contact: Option<String>,
    pub admin_notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateRecurringPayload {
    pub court_id: Option<i64>,
    pub client_name: Option<String>,
    pub client_contact: Option<String>,
    pub weekday: Option<u8>,
    pub start_time: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub admin_notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePaymentPayload {
    pub payment_state: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityParams {
    pub court_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListReservationsParams {
    pub date: Option<NaiveDate>,
    pub court_id: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// The response payload sent after successfully creating a reservation.
#[derive(Serialize, ToSchema)]
pub struct CreatedReservationResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub reservation: Reservation,
}

/// The response payload for a recurring pattern, reporting partial
/// generation: some weeks may legitimately already be booked.
#[derive(Serialize, ToSchema)]
pub struct RecurringCreatedResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub pattern: RecurrencePattern,
    pub generated: usize,
    pub failed: usize,
    pub generated_dates: Vec<NaiveDate>,
    pub failed_dates: Vec<NaiveDate>,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Turns a core error into an HTTP rejection. Store detail is logged
/// here and never forwarded to the client.
pub(crate) fn error_response(err: BookingError) -> (StatusCode, String) {
    match &err {
        BookingError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        BookingError::Conflict => (StatusCode::CONFLICT, err.to_string()),
        BookingError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        BookingError::Store(detail) => {
            error!("store failure: {detail}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal storage error".to_string(),
            )
        }
    }
}

fn parse_payment_state(
    value: Option<String>,
) -> Result<Option<PaymentState>, (StatusCode, String)> {
    match value {
        None => Ok(None),
        Some(raw) => PaymentState::parse(&raw).map(Some).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("invalid payment state '{raw}'"),
            )
        }),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Server is running", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

/// The availability grid for one court on one date.
#[utoipa::path(
    get,
    path = "/api/reservations/availability",
    params(AvailabilityParams),
    responses(
        (status = 200, description = "Ordered slot list for the fixed daily window"),
        (status = 400, description = "court_id and date are required")
    )
)]
pub async fn availability_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AvailabilityParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (Some(court_id), Some(date)) = (params.court_id, params.date) else {
        return Err((
            StatusCode::BAD_REQUEST,
            "court_id and date are required".to_string(),
        ));
    };
    let slots = state
        .booking
        .check_availability(court_id, date)
        .await
        .map_err(error_response)?;
    Ok(Json(slots))
}

/// Create a customer reservation.
#[utoipa::path(
    post,
    path = "/api/reservations",
    request_body = CreateReservationPayload,
    responses(
        (status = 201, description = "Reservation created", body = CreatedReservationResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 404, description = "Court not found"),
        (status = 409, description = "Slot already booked")
    )
)]
pub async fn create_reservation_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateReservationPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let payment_state = parse_payment_state(payload.payment_state)?;
    let reservation = state
        .booking
        .create_reservation(CreateReservation {
            court_id: payload.court_id,
            date: payload.date,
            start_time: payload.start_time,
            client_name: payload.client_name,
            client_contact: payload.client_contact,
            payment_state,
        })
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedReservationResponse {
            message: "Reservation created".to_string(),
            reservation,
        }),
    ))
}

/// List reservations for the admin dashboard, optionally filtered by
/// date and/or court. Newest date first, then by start time.
#[utoipa::path(
    get,
    path = "/api/reservations",
    params(ListReservationsParams),
    responses(
        (status = 200, description = "Reservations joined with court display fields"),
        (status = 401, description = "Admin token required")
    )
)]
pub async fn list_reservations_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListReservationsParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let rows = state
        .booking
        .list_reservations(ReservationFilter {
            date: params.date,
            court_id: params.court_id,
        })
        .await
        .map_err(error_response)?;
    Ok(Json(rows))
}

/// Create a manual (admin) reservation: complimentary, nothing due.
#[utoipa::path(
    post,
    path = "/api/reservations/manual",
    request_body = CreateManualPayload,
    responses(
        (status = 201, description = "Reservation created"),
        (status = 400, description = "Missing required fields"),
        (status = 401, description = "Admin token required"),
        (status = 409, description = "Slot already booked")
    )
)]
pub async fn create_manual_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateManualPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let reservation = state
        .booking
        .create_manual_reservation(CreateManualReservation {
            court_id: payload.court_id,
            date: payload.date,
            start_time: payload.start_time,
            client_name: payload.client_name,
            client_contact: payload.client_contact,
            admin_notes: payload.admin_notes,
        })
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Create a weekly recurring pattern and generate its occurrences.
#[utoipa::path(
    post,
    path = "/api/reservations/recurring",
    request_body = CreateRecurringPayload,
    responses(
        (status = 201, description = "Pattern created; reports generated and collided weeks", body = RecurringCreatedResponse),
        (status = 400, description = "Missing required fields"),
        (status = 401, description = "Admin token required")
    )
)]
pub async fn create_recurring_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRecurringPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let outcome = state
        .booking
        .create_recurring(CreateRecurring {
            court_id: payload.court_id,
            client_name: payload.client_name,
            client_contact: payload.client_contact,
            weekday: payload.weekday,
            start_time: payload.start_time,
            start_date: payload.start_date,
            admin_notes: payload.admin_notes,
        })
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(RecurringCreatedResponse {
            message: "Recurring reservation created".to_string(),
            generated: outcome.generated.len(),
            failed: outcome.failed.len(),
            generated_dates: outcome.generated,
            failed_dates: outcome.failed,
            pattern: outcome.pattern,
        }),
    ))
}

/// List active recurring patterns, ordered by weekday then start time.
#[utoipa::path(
    get,
    path = "/api/reservations/recurring",
    responses(
        (status = 200, description = "Active patterns joined with the court name"),
        (status = 401, description = "Admin token required")
    )
)]
pub async fn list_recurring_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let patterns = state
        .booking
        .list_recurring_patterns()
        .await
        .map_err(error_response)?;
    Ok(Json(patterns))
}

/// Delete a pattern and release its future occurrences.
#[utoipa::path(
    delete,
    path = "/api/reservations/recurring/{id}",
    params(("id" = i64, Path, description = "Pattern id")),
    responses(
        (status = 200, description = "Pattern removed and future occurrences released", body = MessageResponse),
        (status = 401, description = "Admin token required"),
        (status = 404, description = "Pattern not found")
    )
)]
pub async fn delete_recurring_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .booking
        .delete_recurring(id)
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse {
        message: "Recurring reservation deleted and future slots released".to_string(),
    }))
}

/// Change a reservation's payment state; the paid amount is recomputed
/// from the reservation's stored total.
#[utoipa::path(
    patch,
    path = "/api/reservations/{id}/payment",
    params(("id" = i64, Path, description = "Reservation id")),
    request_body = UpdatePaymentPayload,
    responses(
        (status = 200, description = "Payment state updated", body = CreatedReservationResponse),
        (status = 400, description = "Invalid payment state"),
        (status = 401, description = "Admin token required"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn update_payment_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePaymentPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let payment_state = parse_payment_state(payload.payment_state)?;
    let reservation = state
        .booking
        .update_payment_state(id, payment_state)
        .await
        .map_err(error_response)?;
    Ok(Json(CreatedReservationResponse {
        message: "Payment state updated".to_string(),
        reservation,
    }))
}

/// Cancel a reservation.
#[utoipa::path(
    delete,
    path = "/api/reservations/{id}",
    params(("id" = i64, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Reservation cancelled", body = MessageResponse),
        (status = 401, description = "Admin token required"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn cancel_reservation_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .booking
        .cancel_reservation(id)
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse {
        message: "Reservation cancelled".to_string(),
    }))
}
