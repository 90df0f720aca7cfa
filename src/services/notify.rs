//! Applicant notifications over SMTP.
//!
//! Every send is best-effort: a failed or unconfigured dispatch is logged and
//! never surfaced as the outcome of the transition that triggered it.

use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport, Message,
    Tokio1Executor,
};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::application::Application;

/// Template kinds for applicant notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Received,
    Approved,
    Rejected,
    PaymentVerified,
    PaymentRejected,
}

impl NotificationKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::PaymentVerified => "payment_verified",
            Self::PaymentRejected => "payment_rejected",
        }
    }
}

/// Render subject and plain-text body for a notification.
pub fn render(kind: NotificationKind, app: &Application) -> (String, String) {
    let name = format!("{} {}", app.first_name, app.last_name);
    let type_label = app.application_type.display();

    match kind {
        NotificationKind::Received => (
            "Application Received - South Sudan Immigration".to_string(),
            format!(
                "Dear {name},\n\n\
                 Thank you for submitting your application for {type_label}.\n\n\
                 Your application has been received and is now being processed.\n\n\
                 Confirmation Number: {}\n\
                 Status: Pending Review\n\n\
                 You can track your application status online using your confirmation number.\n\n\
                 South Sudan Immigration Services\n\
                 Directorate of Nationality, Passports and Immigration",
                app.confirmation_number
            ),
        ),
        NotificationKind::Approved => (
            "Application Approved - South Sudan Immigration".to_string(),
            format!(
                "Dear {name},\n\n\
                 Congratulations! Your application for {type_label} has been APPROVED.\n\n\
                 Confirmation Number: {}\n\n\
                 Please visit the Immigration Head Office in Juba to collect your document.\n\
                 Bring this approval notice and your original National ID.\n\
                 Collection hours: Monday-Friday, 8:00 AM - 4:00 PM.\n\n\
                 South Sudan Immigration Services\n\
                 Directorate of Nationality, Passports and Immigration",
                app.confirmation_number
            ),
        ),
        NotificationKind::Rejected => (
            "Application Status Update - South Sudan Immigration".to_string(),
            format!(
                "Dear {name},\n\n\
                 Your application for {type_label} has been reviewed and cannot be \
                 approved at this time.\n\n\
                 Confirmation Number: {}\n\
                 Reason: {}\n\n\
                 You may address the issues mentioned and submit a new application at \
                 any time through the online portal.\n\n\
                 South Sudan Immigration Services\n\
                 Directorate of Nationality, Passports and Immigration",
                app.confirmation_number,
                app.rejection_reason.as_deref().unwrap_or("Not specified")
            ),
        ),
        NotificationKind::PaymentVerified => (
            "Payment Verified - South Sudan Immigration".to_string(),
            format!(
                "Dear {name},\n\n\
                 The payment for your {type_label} application ({}) has been verified.\n\
                 Your application will now proceed to review.\n\n\
                 South Sudan Immigration Services",
                app.confirmation_number
            ),
        ),
        NotificationKind::PaymentRejected => (
            "Payment Rejected - South Sudan Immigration".to_string(),
            format!(
                "Dear {name},\n\n\
                 The payment submitted for your {type_label} application ({}) could \
                 not be verified.\n\
                 Reason: {}\n\n\
                 Please submit a valid payment receipt through the portal.\n\n\
                 South Sudan Immigration Services",
                app.confirmation_number,
                app.payment_rejection_reason
                    .as_deref()
                    .unwrap_or("Not specified")
            ),
        ),
    }
}

/// Send a notification to the applicant's email address.
///
/// Returns `Ok(())` without sending when SMTP is not configured.
pub async fn dispatch(
    config: &AppConfig,
    kind: NotificationKind,
    app: &Application,
) -> Result<(), AppError> {
    if config.smtp_host.is_empty() {
        tracing::info!(
            kind = kind.as_str(),
            confirmation_number = %app.confirmation_number,
            "SMTP not configured; notification logged only"
        );
        return Ok(());
    }

    let (subject, body) = render(kind, app);

    let message = Message::builder()
        .from(
            config
                .email_from
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid from address: {e}")))?,
        )
        .to(app
            .email
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid recipient address: {e}")))?)
        .subject(subject)
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build email: {e}")))?;

    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        .map_err(|e| AppError::Internal(format!("SMTP relay setup failed: {e}")))?;
    if !config.smtp_username.is_empty() {
        builder = builder.credentials(Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        ));
    }

    builder
        .build()
        .send(message)
        .await
        .map_err(|e| AppError::Internal(format!("Email send failed: {e}")))?;

    Ok(())
}

/// Dispatch a notification, logging any failure instead of propagating it.
pub async fn dispatch_best_effort(config: &AppConfig, kind: NotificationKind, app: &Application) {
    if let Err(e) = dispatch(config, kind, app).await {
        tracing::warn!(
            kind = kind.as_str(),
            confirmation_number = %app.confirmation_number,
            error = %e,
            "Notification dispatch failed; transition already committed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::{
        ApplicationStatus, ApplicationType, PaymentStatus,
    };
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn sample_application() -> Application {
        Application {
            id: Uuid::nil(),
            applicant_id: Uuid::nil(),
            application_type: ApplicationType::PassportFirst,
            status: ApplicationStatus::Pending,
            confirmation_number: "SS-IMM-12345678-042".to_string(),
            first_name: "Deng".to_string(),
            last_name: "Majok".to_string(),
            middle_name: None,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            nationality: "South Sudanese".to_string(),
            national_id_number: None,
            phone_number: "+211920000000".to_string(),
            email: "deng@example.com".to_string(),
            passport_type: None,
            replacement_reason: None,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            payment_amount: None,
            payment_reference: None,
            payment_proof_path: None,
            payment_proof_hash: None,
            payment_date: None,
            payment_verified_by: None,
            payment_verified_at: None,
            payment_rejection_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: Some("Photo does not meet requirements".to_string()),
            approval_document: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn received_names_applicant_and_confirmation() {
        let app = sample_application();
        let (subject, body) = render(NotificationKind::Received, &app);
        assert!(subject.contains("Received"));
        assert!(body.contains("Deng Majok"));
        assert!(body.contains("SS-IMM-12345678-042"));
        assert!(body.contains("e-Passport First-Time"));
    }

    #[test]
    fn approved_includes_collection_instructions() {
        let app = sample_application();
        let (subject, body) = render(NotificationKind::Approved, &app);
        assert!(subject.contains("Approved"));
        assert!(body.contains("APPROVED"));
        assert!(body.contains("Juba"));
    }

    #[test]
    fn rejected_includes_reason() {
        let app = sample_application();
        let (_, body) = render(NotificationKind::Rejected, &app);
        assert!(body.contains("Photo does not meet requirements"));
    }

    #[test]
    fn rejected_without_reason_falls_back() {
        let mut app = sample_application();
        app.rejection_reason = None;
        let (_, body) = render(NotificationKind::Rejected, &app);
        assert!(body.contains("Not specified"));
    }

    #[tokio::test]
    async fn dispatch_without_smtp_is_noop_ok() {
        let config = AppConfig {
            database_url: String::new(),
            database_max_connections: 1,
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "s".to_string(),
            jwt_access_token_expiry_secs: 900,
            jwt_refresh_token_expiry_secs: 604800,
            frontend_url: String::new(),
            media_root: String::new(),
            paystack_secret_key: String::new(),
            paystack_public_key: String::new(),
            smtp_host: String::new(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            email_from: "noreply@immigration.gov.ss".to_string(),
        };
        let app = sample_application();
        assert!(dispatch(&config, NotificationKind::Received, &app).await.is_ok());
    }
}
