//! Application routes: submission, scoped reads, receipt upload, and review actions.
//!
//! Review transitions take a plain `CurrentUser` and defer to the declared
//! permission table in the review service — the one place (role, action)
//! authority lives.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::application::{Application, ApplicationStatus, ApplicationSummary, CreateApplication};
use crate::models::pagination::{PagedResult, Pagination};
use crate::services::application::{self as app_service, ApplicationFilters};
use crate::services::review::{self, ReviewActor};
use crate::AppState;

fn actor(user: &CurrentUser) -> ReviewActor {
    ReviewActor {
        id: user.id,
        username: user.username.clone(),
        role: user.role,
    }
}

#[derive(Debug, Deserialize)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: ApplicationStatus,
}

/// POST /api/v1/applications — submit a new application.
pub async fn submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateApplication>,
) -> Result<Json<ApiResponse<Application>>, AppError> {
    let app = app_service::submit(&state.db, &state.config, user.id, &body).await?;
    Ok(ApiResponse::success(app))
}

/// GET /api/v1/applications — list applications visible to the caller.
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<ApplicationFilters>,
) -> Result<Json<ApiResponse<PagedResult<ApplicationSummary>>>, AppError> {
    let result = app_service::list(&state.db, user.id, user.role, &filters, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/v1/applications/{id} — get one application, scoped to the caller.
pub async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Application>>, AppError> {
    let app = app_service::find_for_viewer(&state.db, id, user.id, user.role).await?;
    Ok(ApiResponse::success(app))
}

/// POST /api/v1/applications/{id}/payment-proof — upload a receipt (multipart).
pub async fn upload_payment_proof(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Application>>, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename = String::from("receipt");

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            if let Some(fname) = field.file_name() {
                filename = fname.to_string();
            }
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?
                    .to_vec(),
            );
        }
    }

    let data = file_data.ok_or_else(|| {
        AppError::Validation("Missing 'file' field in multipart request".to_string())
    })?;

    let app = app_service::attach_payment_proof(
        &state.db,
        &state.config,
        id,
        user.id,
        user.role,
        &filename,
        data,
    )
    .await?;
    Ok(ApiResponse::success(app))
}

/// POST /api/v1/applications/{id}/approve — approve (reviewer, payment completed).
pub async fn approve(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Application>>, AppError> {
    let app = review::approve(&state.db, &state.config, id, &actor(&user)).await?;
    Ok(ApiResponse::success(app))
}

/// POST /api/v1/applications/{id}/reject — reject with a reason (reviewer).
pub async fn reject(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<ApiResponse<Application>>, AppError> {
    let app = review::reject(&state.db, &state.config, id, &actor(&user), &body.reason).await?;
    Ok(ApiResponse::success(app))
}

/// PATCH /api/v1/applications/{id}/status — administrative status override (staff).
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<Json<ApiResponse<Application>>, AppError> {
    let app = review::update_status(&state.db, id, &actor(&user), body.status).await?;
    Ok(ApiResponse::success(app))
}

/// POST /api/v1/applications/{id}/verify-payment — mark payment completed (reviewer).
pub async fn verify_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Application>>, AppError> {
    let app = review::verify_payment(&state.db, &state.config, id, &actor(&user)).await?;
    Ok(ApiResponse::success(app))
}

/// POST /api/v1/applications/{id}/reject-payment — mark payment failed (reviewer).
pub async fn reject_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<ApiResponse<Application>>, AppError> {
    let app =
        review::reject_payment(&state.db, &state.config, id, &actor(&user), &body.reason).await?;
    Ok(ApiResponse::success(app))
}
