//! Application service: submission, scoped queries, and receipt attachment.
//!
//! Applicants only ever see their own rows; staff see everything. Scoping is
//! resolved here so routes stay thin.

use std::io::Cursor;
use std::path::Path;

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::application::{
    Application, ApplicationStatus, ApplicationSummary, ApplicationType, CreateApplication,
};
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::user::UserRole;
use crate::services::confirmation;
use crate::services::notify::{self, NotificationKind};
use crate::services::receipt;

/// Partial unique index guarding non-null fingerprints at commit time.
const PROOF_HASH_CONSTRAINT: &str = "ux_applications_payment_proof_hash";

/// Filters for listing applications.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApplicationFilters {
    pub status: Option<ApplicationStatus>,
    pub application_type: Option<ApplicationType>,
}

/// Field-level checks on a submission payload.
pub fn validate_submission(input: &CreateApplication) -> Result<(), AppError> {
    if input.first_name.trim().is_empty() {
        return Err(AppError::Validation("First name is required".to_string()));
    }
    if input.last_name.trim().is_empty() {
        return Err(AppError::Validation("Last name is required".to_string()));
    }
    if input.nationality.trim().is_empty() {
        return Err(AppError::Validation("Nationality is required".to_string()));
    }
    if input.phone_number.trim().is_empty() {
        return Err(AppError::Validation("Phone number is required".to_string()));
    }
    if !input.email.contains('@') {
        return Err(AppError::Validation(
            "A valid email address is required".to_string(),
        ));
    }

    let is_passport = matches!(
        input.application_type,
        ApplicationType::PassportFirst | ApplicationType::PassportReplacement
    );
    if is_passport && input.passport_type.is_none() {
        return Err(AppError::Validation(
            "Passport type is required for passport applications".to_string(),
        ));
    }

    let is_replacement = matches!(
        input.application_type,
        ApplicationType::PassportReplacement | ApplicationType::NationalIdReplacement
    );
    if is_replacement && input.replacement_reason.is_none() {
        return Err(AppError::Validation(
            "Replacement reason is required for replacement applications".to_string(),
        ));
    }

    Ok(())
}

/// Create a new application in `pending`/payment-`pending` with a freshly
/// assigned confirmation number, then notify the applicant best-effort.
pub async fn submit(
    pool: &PgPool,
    config: &AppConfig,
    applicant_id: Uuid,
    input: &CreateApplication,
) -> Result<Application, AppError> {
    validate_submission(input)?;

    let confirmation_number = confirmation::assign(pool).await?;

    let app = sqlx::query_as::<_, Application>(
        r#"
        INSERT INTO applications (applicant_id, application_type, confirmation_number,
            first_name, last_name, middle_name, date_of_birth, nationality,
            national_id_number, phone_number, email, passport_type, replacement_reason)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(applicant_id)
    .bind(input.application_type)
    .bind(&confirmation_number)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.middle_name)
    .bind(input.date_of_birth)
    .bind(&input.nationality)
    .bind(&input.national_id_number)
    .bind(&input.phone_number)
    .bind(&input.email)
    .bind(input.passport_type)
    .bind(input.replacement_reason)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        confirmation_number = %app.confirmation_number,
        application_type = ?app.application_type,
        "Application submitted"
    );
    notify::dispatch_best_effort(config, NotificationKind::Received, &app).await;
    Ok(app)
}

/// List applications visible to the viewer, filtered and paginated.
pub async fn list(
    pool: &PgPool,
    viewer_id: Uuid,
    role: UserRole,
    filters: &ApplicationFilters,
    pagination: &Pagination,
) -> Result<PagedResult<ApplicationSummary>, AppError> {
    let staff = role.is_staff();

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM applications
         WHERE ($1 OR applicant_id = $2)
           AND ($3::application_status IS NULL OR status = $3)
           AND ($4::application_type IS NULL OR application_type = $4)",
    )
    .bind(staff)
    .bind(viewer_id)
    .bind(filters.status)
    .bind(filters.application_type)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, ApplicationSummary>(
        "SELECT id, confirmation_number, application_type, status, payment_status,
                first_name, last_name, created_at
         FROM applications
         WHERE ($1 OR applicant_id = $2)
           AND ($3::application_status IS NULL OR status = $3)
           AND ($4::application_type IS NULL OR application_type = $4)
         ORDER BY created_at DESC
         LIMIT $5 OFFSET $6",
    )
    .bind(staff)
    .bind(viewer_id)
    .bind(filters.status)
    .bind(filters.application_type)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(PagedResult::new(items, total, pagination))
}

/// Fetch one application, scoped to the viewer.
///
/// Applicants get not-found (not forbidden) for rows they do not own, so the
/// API never confirms another applicant's id.
pub async fn find_for_viewer(
    pool: &PgPool,
    id: Uuid,
    viewer_id: Uuid,
    role: UserRole,
) -> Result<Application, AppError> {
    let app = sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

    if !role.is_staff() && app.applicant_id != viewer_id {
        return Err(AppError::NotFound("Application not found".to_string()));
    }

    Ok(app)
}

/// Replace characters that would escape the media directory.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "receipt".to_string()
    } else {
        cleaned
    }
}

/// Attach an uploaded payment receipt to an application.
///
/// Runs the dedup engine first (fingerprint, change detection, duplicate
/// lookup), persists the bytes under the media root, then records path and
/// fingerprint. A unique violation on the fingerprint index at commit — the
/// lookup-then-write race losing to a concurrent upload — is converted into
/// the same duplicate-receipt error the pre-check produces.
pub async fn attach_payment_proof(
    pool: &PgPool,
    config: &AppConfig,
    id: Uuid,
    viewer_id: Uuid,
    role: UserRole,
    filename: &str,
    data: Vec<u8>,
) -> Result<Application, AppError> {
    let app = find_for_viewer(pool, id, viewer_id, role).await?;

    let mut stream = Cursor::new(data);
    let hash = receipt::try_fingerprint(&mut stream, app.id);

    if let Some(ref h) = hash {
        receipt::ensure_unique(pool, app.id, app.payment_proof_hash.as_deref(), h).await?;
    }

    let rel_path = format!("payment_proofs/{}-{}", app.id, sanitize_filename(filename));
    let dest = Path::new(&config.media_root).join(&rel_path);
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create media directory: {e}")))?;
    }
    tokio::fs::write(&dest, stream.get_ref())
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store payment proof: {e}")))?;

    let result = sqlx::query_as::<_, Application>(
        "UPDATE applications
         SET payment_proof_path = $1,
             payment_proof_hash = COALESCE($2, payment_proof_hash),
             updated_at = NOW()
         WHERE id = $3
         RETURNING *",
    )
    .bind(&rel_path)
    .bind(&hash)
    .bind(app.id)
    .fetch_one(pool)
    .await;

    match result {
        Ok(updated) => Ok(updated),
        Err(sqlx::Error::Database(db_err))
            if db_err.is_unique_violation()
                && db_err.constraint() == Some(PROOF_HASH_CONSTRAINT) =>
        {
            // A concurrent upload committed the same fingerprint first.
            let winner = match &hash {
                Some(h) => receipt::find_conflict(pool, h, app.id).await?,
                None => None,
            };
            Err(AppError::DuplicateReceipt(
                winner.unwrap_or_else(|| "another application".to_string()),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn submission(application_type: ApplicationType) -> CreateApplication {
        CreateApplication {
            application_type,
            first_name: "Deng".to_string(),
            last_name: "Majok".to_string(),
            middle_name: None,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            nationality: "South Sudanese".to_string(),
            national_id_number: None,
            phone_number: "+211920000000".to_string(),
            email: "deng@example.com".to_string(),
            passport_type: Some(crate::models::application::PassportType::FiveYear),
            replacement_reason: Some(crate::models::application::ReplacementReason::Lost),
        }
    }

    #[test]
    fn valid_submission_passes() {
        assert!(validate_submission(&submission(ApplicationType::PassportFirst)).is_ok());
    }

    #[test]
    fn missing_names_rejected() {
        let mut input = submission(ApplicationType::PassportFirst);
        input.first_name = "  ".to_string();
        let err = validate_submission(&input).unwrap_err();
        assert!(err.to_string().contains("First name"));
    }

    #[test]
    fn invalid_email_rejected() {
        let mut input = submission(ApplicationType::PassportFirst);
        input.email = "not-an-email".to_string();
        assert!(validate_submission(&input).is_err());
    }

    #[test]
    fn passport_applications_require_passport_type() {
        let mut input = submission(ApplicationType::PassportFirst);
        input.passport_type = None;
        let err = validate_submission(&input).unwrap_err();
        assert!(err.to_string().contains("Passport type"));

        // National ID applications do not.
        let mut input = submission(ApplicationType::NationalIdFirst);
        input.passport_type = None;
        input.replacement_reason = None;
        assert!(validate_submission(&input).is_ok());
    }

    #[test]
    fn replacement_applications_require_reason() {
        let mut input = submission(ApplicationType::NationalIdReplacement);
        input.replacement_reason = None;
        let err = validate_submission(&input).unwrap_err();
        assert!(err.to_string().contains("Replacement reason"));
    }

    #[test]
    fn filename_sanitization() {
        assert_eq!(sanitize_filename("receipt.png"), "receipt.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("my receipt (1).jpg"), "my_receipt__1_.jpg");
        assert_eq!(sanitize_filename(""), "receipt");
    }
}
