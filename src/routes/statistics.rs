//! Statistics route for the staff overview page.

use axum::{extract::State, Json};

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::RequireStaff;
use crate::services::statistics::{self, Statistics};
use crate::AppState;

/// GET /api/v1/statistics — aggregate application counts (staff only).
pub async fn get(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
) -> Result<Json<ApiResponse<Statistics>>, AppError> {
    let stats = statistics::get_stats(&state.db).await?;
    Ok(ApiResponse::success(stats))
}
