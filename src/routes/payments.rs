//! Payment routes: gateway initialization and verification.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::application::Application;
use crate::services::payment::{self, InitializedPayment};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    pub application_id: Uuid,
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub reference: String,
}

#[derive(Debug, Serialize)]
pub struct PublicKeyResponse {
    pub public_key: String,
}

/// POST /api/v1/payments/initialize — start a gateway transaction (owner only).
pub async fn initialize(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<InitializeRequest>,
) -> Result<Json<ApiResponse<InitializedPayment>>, AppError> {
    let result = payment::initialize(
        &state.db,
        &state.config,
        body.application_id,
        user.id,
        body.callback_url.as_deref(),
    )
    .await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/v1/payments/verify — confirm a gateway transaction by reference.
pub async fn verify(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<ApiResponse<Application>>, AppError> {
    let app = payment::verify(&state.db, &state.config, &query.reference).await?;
    Ok(ApiResponse::success(app))
}

/// GET /api/v1/payments/public-key — gateway public key for the frontend.
pub async fn public_key(State(state): State<AppState>) -> Json<ApiResponse<PublicKeyResponse>> {
    ApiResponse::success(PublicKeyResponse {
        public_key: state.config.paystack_public_key.clone(),
    })
}
