//! Route definitions for the immigration portal API.

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod applications;
pub mod auth;
pub mod health;
pub mod payments;
pub mod statistics;

/// Assemble the full application router. Shared between `main` and the
/// integration tests so both serve exactly the same surface.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/users", post(auth::create_user))
        .route("/auth/me", get(auth::me));

    let application_routes = Router::new()
        .route(
            "/applications",
            get(applications::list).post(applications::submit),
        )
        .route("/applications/{id}", get(applications::get_by_id))
        .route(
            "/applications/{id}/payment-proof",
            post(applications::upload_payment_proof),
        )
        .route("/applications/{id}/approve", post(applications::approve))
        .route("/applications/{id}/reject", post(applications::reject))
        .route(
            "/applications/{id}/status",
            patch(applications::update_status),
        )
        .route(
            "/applications/{id}/verify-payment",
            post(applications::verify_payment),
        )
        .route(
            "/applications/{id}/reject-payment",
            post(applications::reject_payment),
        );

    let payment_routes = Router::new()
        .route("/payments/initialize", post(payments::initialize))
        .route("/payments/verify", get(payments::verify))
        .route("/payments/public-key", get(payments::public_key));

    let statistics_routes = Router::new().route("/statistics", get(statistics::get));

    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest(
            "/api/v1",
            auth_routes
                .merge(application_routes)
                .merge(payment_routes)
                .merge(statistics_routes),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
