//! Role-based access control extractors for Axum handlers.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::models::user::UserRole;
use crate::AppState;

/// Extractor that requires the admin role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(AppError::Forbidden(
                "Admin access required".to_string(),
            ));
        }
        Ok(RequireAdmin(user))
    }
}

/// Extractor that requires a reviewer role (supervisor or admin).
#[derive(Debug, Clone)]
pub struct RequireReviewer(pub CurrentUser);

impl FromRequestParts<AppState> for RequireReviewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.role.is_reviewer() {
            return Err(AppError::Forbidden(
                "Supervisor or admin access required".to_string(),
            ));
        }
        Ok(RequireReviewer(user))
    }
}

/// Extractor that requires any staff role (officer, supervisor, or admin).
#[derive(Debug, Clone)]
pub struct RequireStaff(pub CurrentUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.role.is_staff() {
            return Err(AppError::Forbidden(
                "Staff access required".to_string(),
            ));
        }
        Ok(RequireStaff(user))
    }
}
