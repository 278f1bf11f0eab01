//! services/api/src/bin/api.rs

use api_lib::{
    adapters::PgStore,
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, verify_handler},
        courts::{court_detail_handler, courts_by_category_handler, list_courts_handler},
        middleware::require_admin,
        rest::{
            availability_handler, cancel_reservation_handler, create_manual_handler,
            create_recurring_handler, create_reservation_handler, delete_recurring_handler,
            health_handler, list_recurring_handler, list_reservations_handler,
            update_payment_handler, ApiDoc,
        },
        state::{AdminSessions, AppState},
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use court_booking_core::{BookingService, SystemClock};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(db_pool));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Booking Service & Shared AppState ---
    let booking = BookingService::new(store.clone(), store, Arc::new(SystemClock));
    let app_state = Arc::new(AppState {
        booking,
        config: config.clone(),
        sessions: AdminSessions::default(),
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("invalid CORS_ORIGIN '{}': {e}", config.cors_origin))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/verify", get(verify_handler))
        .route("/api/courts", get(list_courts_handler))
        .route(
            "/api/courts/category/{category}",
            get(courts_by_category_handler),
        )
        .route("/api/courts/{id}", get(court_detail_handler))
        .route("/api/reservations/availability", get(availability_handler))
        .route("/api/reservations", post(create_reservation_handler));

    // Admin routes (bearer token required)
    let admin_routes = Router::new()
        .route("/api/reservations", get(list_reservations_handler))
        .route("/api/reservations/manual", post(create_manual_handler))
        .route(
            "/api/reservations/recurring",
            post(create_recurring_handler).get(list_recurring_handler),
        )
        .route(
            "/api/reservations/recurring/{id}",
            delete(delete_recurring_handler),
        )
        .route("/api/reservations/{id}/payment", patch(update_payment_handler))
        .route("/api/reservations/{id}", delete(cancel_reservation_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_admin,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete
    // application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
