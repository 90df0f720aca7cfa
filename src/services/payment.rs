//! Payment gateway integration (Paystack-shaped REST API).
//!
//! The core consumes only the provider's success flag and status string; all
//! other response detail passes through untouched. Transport failures map to
//! gateway errors, provider-reported declines map to validation errors.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::application::{Application, ApplicationType, PaymentStatus};

const PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

/// Fee schedule in minor currency units, by application type.
pub fn fee_for(application_type: ApplicationType) -> i64 {
    match application_type {
        ApplicationType::PassportFirst => 50000,
        ApplicationType::PassportReplacement => 30000,
        ApplicationType::NationalIdFirst => 20000,
        ApplicationType::NationalIdReplacement => 15000,
    }
}

/// Build the unique gateway reference for a transaction.
pub fn payment_reference(confirmation_number: &str, unix_secs: i64) -> String {
    format!("PAY-{confirmation_number}-{unix_secs}")
}

/// Provider response envelope: success flag, message, optional payload.
#[derive(Debug, Deserialize)]
struct GatewayEnvelope<T> {
    status: bool,
    message: Option<String>,
    data: Option<T>,
}

/// Payload returned when a transaction is initialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize)]
struct VerificationData {
    status: Option<String>,
}

/// Outcome of a verification call: the success flag and provider status.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub ok: bool,
    pub provider_status: Option<String>,
    pub message: Option<String>,
}

impl VerifyOutcome {
    /// The provider both acknowledged the call and settled the transaction.
    pub fn is_successful(&self) -> bool {
        self.ok && self.provider_status.as_deref() == Some("success")
    }
}

/// Thin REST client for the payment provider.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    http: Client,
    secret_key: String,
    base_url: String,
}

impl PaystackClient {
    pub fn new(secret_key: &str) -> Self {
        Self::with_base_url(secret_key, PAYSTACK_BASE_URL)
    }

    /// Test seam: point the client at a stub server.
    pub fn with_base_url(secret_key: &str, base_url: &str) -> Self {
        Self {
            http: Client::new(),
            secret_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Initialize a transaction for the given payee and amount (minor units).
    pub async fn initialize_transaction(
        &self,
        email: &str,
        amount_minor: i64,
        reference: &str,
        callback_url: Option<&str>,
    ) -> Result<InitializedTransaction, AppError> {
        let mut payload = serde_json::json!({
            "email": email,
            "amount": amount_minor,
            "reference": reference,
            "currency": "GHS",
        });
        if let Some(cb) = callback_url {
            payload["callback_url"] = serde_json::Value::String(cb.to_string());
        }

        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Payment initialization failed: {e}")))?;

        let envelope: GatewayEnvelope<InitializedTransaction> = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Malformed gateway response: {e}")))?;

        if !envelope.status {
            return Err(AppError::Validation(
                envelope
                    .message
                    .unwrap_or_else(|| "Payment initialization failed".to_string()),
            ));
        }

        envelope
            .data
            .ok_or_else(|| AppError::Gateway("Gateway returned no transaction data".to_string()))
    }

    /// Verify a transaction by reference.
    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifyOutcome, AppError> {
        let response = self
            .http
            .get(format!("{}/transaction/verify/{reference}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Payment verification failed: {e}")))?;

        let envelope: GatewayEnvelope<VerificationData> = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Malformed gateway response: {e}")))?;

        Ok(VerifyOutcome {
            ok: envelope.status,
            provider_status: envelope.data.and_then(|d| d.status),
            message: envelope.message,
        })
    }
}

/// Response returned to the frontend after initializing a payment.
#[derive(Debug, Serialize)]
pub struct InitializedPayment {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Initialize a gateway transaction for an application the viewer owns.
pub async fn initialize(
    pool: &PgPool,
    config: &AppConfig,
    application_id: Uuid,
    applicant_id: Uuid,
    callback_url: Option<&str>,
) -> Result<InitializedPayment, AppError> {
    let app = sqlx::query_as::<_, Application>(
        "SELECT * FROM applications WHERE id = $1 AND applicant_id = $2",
    )
    .bind(application_id)
    .bind(applicant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

    if app.payment_status == PaymentStatus::Completed {
        return Err(AppError::Validation(
            "Payment already completed for this application".to_string(),
        ));
    }

    let amount = fee_for(app.application_type);
    let reference = payment_reference(&app.confirmation_number, chrono::Utc::now().timestamp());

    let client = PaystackClient::new(&config.paystack_secret_key);
    let tx = client
        .initialize_transaction(&app.email, amount, &reference, callback_url)
        .await?;

    sqlx::query(
        "UPDATE applications
         SET payment_reference = $1, payment_amount = $2,
             payment_method = 'credit_card', updated_at = NOW()
         WHERE id = $3",
    )
    .bind(&reference)
    .bind(amount)
    .bind(app.id)
    .execute(pool)
    .await?;

    Ok(InitializedPayment {
        authorization_url: tx.authorization_url,
        access_code: tx.access_code,
        reference,
    })
}

/// Verify a gateway transaction and mark the application's payment completed.
pub async fn verify(
    pool: &PgPool,
    config: &AppConfig,
    reference: &str,
) -> Result<Application, AppError> {
    let client = PaystackClient::new(&config.paystack_secret_key);
    let outcome = client.verify_transaction(reference).await?;

    if !outcome.is_successful() {
        return Err(AppError::Validation(format!(
            "Payment verification failed: {}",
            outcome.message.unwrap_or_else(|| "Unknown error".to_string())
        )));
    }

    let app = sqlx::query_as::<_, Application>(
        "SELECT * FROM applications WHERE payment_reference = $1",
    )
    .bind(reference)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Application not found for this payment".to_string()))?;

    let app = sqlx::query_as::<_, Application>(
        "UPDATE applications
         SET payment_status = 'completed', payment_date = NOW(),
             payment_verified_at = NOW(), updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(app.id)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        confirmation_number = %app.confirmation_number,
        reference,
        "Gateway payment verified"
    );
    Ok(app)
}
