//! Application review state machine with role-gated transitions.
//!
//! Permissions are a declared table over (role, action) evaluated once per
//! request rather than ad-hoc checks inside each handler. Transition guards
//! run against the loaded row, the state change commits, and only then do the
//! best-effort side effects fire (approval document, applicant notification) —
//! a side-effect failure never rolls back a committed transition.

use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::application::{Application, ApplicationStatus, PaymentStatus};
use crate::models::user::UserRole;
use crate::services::notify::{self, NotificationKind};
use crate::services::document;

/// Reviewer-triggered transitions over an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    VerifyPayment,
    RejectPayment,
    Approve,
    Reject,
    UpdateStatus,
}

/// Actor performing a review action.
#[derive(Debug, Clone)]
pub struct ReviewActor {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
}

/// Permission table mapping (role, action) to allowed.
///
/// Payment adjudication and approval/rejection belong to reviewers
/// (supervisor, admin). `UpdateStatus` is the administrative override open to
/// the wider staff set, and deliberately skips the payment-completion guard.
pub fn permits(role: UserRole, action: ReviewAction) -> bool {
    match action {
        ReviewAction::VerifyPayment
        | ReviewAction::RejectPayment
        | ReviewAction::Approve
        | ReviewAction::Reject => role.is_reviewer(),
        ReviewAction::UpdateStatus => role.is_staff(),
    }
}

/// Enforce the permission table, surfacing a distinct permission failure.
pub fn require(role: UserRole, action: ReviewAction) -> Result<(), AppError> {
    if permits(role, action) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "Role {role:?} is not permitted to perform {action:?}"
    )))
}

/// Approval requires the payment sub-state to be completed.
pub fn ensure_payment_completed(app: &Application) -> Result<(), AppError> {
    if app.payment_status == PaymentStatus::Completed {
        return Ok(());
    }
    Err(AppError::Validation(
        "Payment not completed. Please verify payment first.".to_string(),
    ))
}

/// Payment verification requires a submitted proof.
pub fn ensure_proof_submitted(app: &Application) -> Result<(), AppError> {
    if app.payment_proof_path.is_some() {
        return Ok(());
    }
    Err(AppError::Validation(
        "No payment proof submitted".to_string(),
    ))
}

async fn load(pool: &PgPool, id: Uuid) -> Result<Application, AppError> {
    sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))
}

/// Mark the payment sub-state completed. Application status is unchanged.
pub async fn verify_payment(
    pool: &PgPool,
    config: &AppConfig,
    id: Uuid,
    actor: &ReviewActor,
) -> Result<Application, AppError> {
    require(actor.role, ReviewAction::VerifyPayment)?;

    let app = load(pool, id).await?;
    ensure_proof_submitted(&app)?;

    let app = sqlx::query_as::<_, Application>(
        "UPDATE applications
         SET payment_status = 'completed', payment_verified_by = $1,
             payment_verified_at = NOW(), payment_date = NOW(), updated_at = NOW()
         WHERE id = $2
         RETURNING *",
    )
    .bind(actor.id)
    .bind(id)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        confirmation_number = %app.confirmation_number,
        verified_by = %actor.username,
        "Payment verified"
    );
    notify::dispatch_best_effort(config, NotificationKind::PaymentVerified, &app).await;
    Ok(app)
}

/// Mark the payment sub-state failed with a reason. Application status is unchanged.
pub async fn reject_payment(
    pool: &PgPool,
    config: &AppConfig,
    id: Uuid,
    actor: &ReviewActor,
    reason: &str,
) -> Result<Application, AppError> {
    require(actor.role, ReviewAction::RejectPayment)?;

    load(pool, id).await?;

    let app = sqlx::query_as::<_, Application>(
        "UPDATE applications
         SET payment_status = 'failed', payment_rejection_reason = $1,
             payment_verified_by = $2, payment_verified_at = NOW(), updated_at = NOW()
         WHERE id = $3
         RETURNING *",
    )
    .bind(reason)
    .bind(actor.id)
    .bind(id)
    .fetch_one(pool)
    .await?;

    notify::dispatch_best_effort(config, NotificationKind::PaymentRejected, &app).await;
    Ok(app)
}

/// Approve an application whose payment is completed.
///
/// The approval itself is the durable fact: document generation and
/// notification run after commit and their failure leaves the application
/// approved with `approval_document` unset.
pub async fn approve(
    pool: &PgPool,
    config: &AppConfig,
    id: Uuid,
    actor: &ReviewActor,
) -> Result<Application, AppError> {
    require(actor.role, ReviewAction::Approve)?;

    let current = load(pool, id).await?;
    ensure_payment_completed(&current)?;

    let mut app = sqlx::query_as::<_, Application>(
        "UPDATE applications
         SET status = 'approved', reviewed_by = $1, reviewed_at = NOW(), updated_at = NOW()
         WHERE id = $2
         RETURNING *",
    )
    .bind(actor.id)
    .bind(id)
    .fetch_one(pool)
    .await?;

    match document::generate(&config.media_root, &app).await {
        Ok(path) => {
            match sqlx::query_as::<_, Application>(
                "UPDATE applications SET approval_document = $1, updated_at = NOW()
                 WHERE id = $2 RETURNING *",
            )
            .bind(&path)
            .bind(id)
            .fetch_one(pool)
            .await
            {
                Ok(updated) => app = updated,
                Err(e) => tracing::warn!(
                    application_id = %id,
                    error = %e,
                    "Failed to record approval document reference"
                ),
            }
        }
        Err(e) => tracing::warn!(
            application_id = %id,
            error = %e,
            "Approval document generation failed; approval stands"
        ),
    }

    tracing::info!(
        confirmation_number = %app.confirmation_number,
        reviewed_by = %actor.username,
        "Application approved"
    );
    notify::dispatch_best_effort(config, NotificationKind::Approved, &app).await;
    Ok(app)
}

/// Reject an application from any state, with a stored reason.
pub async fn reject(
    pool: &PgPool,
    config: &AppConfig,
    id: Uuid,
    actor: &ReviewActor,
    reason: &str,
) -> Result<Application, AppError> {
    require(actor.role, ReviewAction::Reject)?;

    load(pool, id).await?;

    let app = sqlx::query_as::<_, Application>(
        "UPDATE applications
         SET status = 'rejected', rejection_reason = $1,
             reviewed_by = $2, reviewed_at = NOW(), updated_at = NOW()
         WHERE id = $3
         RETURNING *",
    )
    .bind(reason)
    .bind(actor.id)
    .bind(id)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        confirmation_number = %app.confirmation_number,
        reviewed_by = %actor.username,
        "Application rejected"
    );
    notify::dispatch_best_effort(config, NotificationKind::Rejected, &app).await;
    Ok(app)
}

/// Administrative status override: set any defined status without the
/// payment-completion guard.
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    actor: &ReviewActor,
    new_status: ApplicationStatus,
) -> Result<Application, AppError> {
    require(actor.role, ReviewAction::UpdateStatus)?;

    load(pool, id).await?;

    let app = sqlx::query_as::<_, Application>(
        "UPDATE applications
         SET status = $1, reviewed_by = $2, reviewed_at = NOW(), updated_at = NOW()
         WHERE id = $3
         RETURNING *",
    )
    .bind(new_status)
    .bind(actor.id)
    .bind(id)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        confirmation_number = %app.confirmation_number,
        status = ?new_status,
        updated_by = %actor.username,
        "Application status overridden"
    );
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::ApplicationType;
    use chrono::{NaiveDate, Utc};

    fn application_with_payment(payment_status: PaymentStatus) -> Application {
        Application {
            id: Uuid::nil(),
            applicant_id: Uuid::nil(),
            application_type: ApplicationType::PassportFirst,
            status: ApplicationStatus::Pending,
            confirmation_number: "SS-IMM-12345678-001".to_string(),
            first_name: "Nyandeng".to_string(),
            last_name: "Garang".to_string(),
            middle_name: None,
            date_of_birth: NaiveDate::from_ymd_opt(1992, 6, 30).unwrap(),
            nationality: "South Sudanese".to_string(),
            national_id_number: None,
            phone_number: "+211911000000".to_string(),
            email: "nyandeng@example.com".to_string(),
            passport_type: None,
            replacement_reason: None,
            payment_status,
            payment_method: None,
            payment_amount: None,
            payment_reference: None,
            payment_proof_path: Some("payment_proofs/receipt.png".to_string()),
            payment_proof_hash: None,
            payment_date: None,
            payment_verified_by: None,
            payment_verified_at: None,
            payment_rejection_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            approval_document: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // -- Permission table --

    #[test]
    fn reviewers_may_adjudicate() {
        for action in [
            ReviewAction::VerifyPayment,
            ReviewAction::RejectPayment,
            ReviewAction::Approve,
            ReviewAction::Reject,
        ] {
            assert!(permits(UserRole::Admin, action));
            assert!(permits(UserRole::Supervisor, action));
            assert!(!permits(UserRole::Officer, action), "{action:?}");
            assert!(!permits(UserRole::Applicant, action), "{action:?}");
        }
    }

    #[test]
    fn staff_may_override_status() {
        assert!(permits(UserRole::Admin, ReviewAction::UpdateStatus));
        assert!(permits(UserRole::Supervisor, ReviewAction::UpdateStatus));
        assert!(permits(UserRole::Officer, ReviewAction::UpdateStatus));
        assert!(!permits(UserRole::Applicant, ReviewAction::UpdateStatus));
    }

    #[test]
    fn require_surfaces_forbidden_not_validation() {
        let err = require(UserRole::Officer, ReviewAction::Approve).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    // -- Guards --

    #[test]
    fn approve_guard_rejects_pending_payment() {
        let app = application_with_payment(PaymentStatus::Pending);
        let err = ensure_payment_completed(&app).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("Payment not completed"));
    }

    #[test]
    fn approve_guard_rejects_failed_payment() {
        let app = application_with_payment(PaymentStatus::Failed);
        assert!(ensure_payment_completed(&app).is_err());
    }

    #[test]
    fn approve_guard_passes_completed_payment() {
        let app = application_with_payment(PaymentStatus::Completed);
        assert!(ensure_payment_completed(&app).is_ok());
    }

    #[test]
    fn verify_guard_requires_proof() {
        let mut app = application_with_payment(PaymentStatus::Pending);
        app.payment_proof_path = None;
        let err = ensure_proof_submitted(&app).unwrap_err();
        assert!(err.to_string().contains("No payment proof"));

        app.payment_proof_path = Some("payment_proofs/r.png".to_string());
        assert!(ensure_proof_submitted(&app).is_ok());
    }
}
