//! Application model: the central entity of the portal.
//!
//! An application carries three orthogonal pieces of state: the review status,
//! the payment sub-state, and the payment-proof fingerprint used for receipt
//! deduplication. The confirmation number is assigned once at creation and is
//! the only identity applicants ever see.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// -- Enums matching PostgreSQL --

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "application_type")]
pub enum ApplicationType {
    #[sqlx(rename = "passport-first")]
    #[serde(rename = "passport-first")]
    PassportFirst,
    #[sqlx(rename = "passport-replacement")]
    #[serde(rename = "passport-replacement")]
    PassportReplacement,
    #[sqlx(rename = "nationalid-first")]
    #[serde(rename = "nationalid-first")]
    NationalIdFirst,
    #[sqlx(rename = "nationalid-replacement")]
    #[serde(rename = "nationalid-replacement")]
    NationalIdReplacement,
}

impl ApplicationType {
    /// Human-readable label used in notifications and documents.
    pub fn display(&self) -> &'static str {
        match self {
            Self::PassportFirst => "e-Passport First-Time",
            Self::PassportReplacement => "e-Passport Replacement",
            Self::NationalIdFirst => "National ID First-Time",
            Self::NationalIdReplacement => "National ID Replacement",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "application_status")]
pub enum ApplicationStatus {
    #[sqlx(rename = "pending")]
    #[serde(rename = "pending")]
    Pending,
    #[sqlx(rename = "in-progress")]
    #[serde(rename = "in-progress")]
    InProgress,
    #[sqlx(rename = "approved")]
    #[serde(rename = "approved")]
    Approved,
    #[sqlx(rename = "rejected")]
    #[serde(rename = "rejected")]
    Rejected,
    #[sqlx(rename = "collected")]
    #[serde(rename = "collected")]
    Collected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Momo,
    CreditCard,
    Bank,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "passport_type")]
pub enum PassportType {
    #[sqlx(rename = "2-year")]
    #[serde(rename = "2-year")]
    TwoYear,
    #[sqlx(rename = "5-year")]
    #[serde(rename = "5-year")]
    FiveYear,
    #[sqlx(rename = "10-year")]
    #[serde(rename = "10-year")]
    TenYear,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "replacement_reason", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReplacementReason {
    Lost,
    Stolen,
    Damaged,
    Expired,
    Correction,
}

// -- Core Application --

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub application_type: ApplicationType,
    pub status: ApplicationStatus,
    /// Immutable once assigned; unique across all applications.
    pub confirmation_number: String,

    // Personal details
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub date_of_birth: NaiveDate,
    pub nationality: String,
    pub national_id_number: Option<String>,
    pub phone_number: String,
    pub email: String,
    pub passport_type: Option<PassportType>,
    pub replacement_reason: Option<ReplacementReason>,

    // Payment sub-state
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    /// Minor currency units (e.g. piasters), matching the gateway API.
    pub payment_amount: Option<i64>,
    pub payment_reference: Option<String>,
    pub payment_proof_path: Option<String>,
    /// SHA-256 hex digest of the uploaded receipt; unique when non-null.
    pub payment_proof_hash: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_verified_by: Option<Uuid>,
    pub payment_verified_at: Option<DateTime<Utc>>,
    pub payment_rejection_reason: Option<String>,

    // Review sub-state
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub approval_document: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submission payload. Status, payment state, and confirmation number are
/// always server-assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplication {
    pub application_type: ApplicationType,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub date_of_birth: NaiveDate,
    pub nationality: String,
    pub national_id_number: Option<String>,
    pub phone_number: String,
    pub email: String,
    pub passport_type: Option<PassportType>,
    pub replacement_reason: Option<ReplacementReason>,
}

/// Summary DTO for list views — omits payment and review detail.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub confirmation_number: String,
    pub application_type: ApplicationType,
    pub status: ApplicationStatus,
    pub payment_status: PaymentStatus,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_type_serialization() {
        let t = ApplicationType::PassportFirst;
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"passport-first\"");
    }

    #[test]
    fn application_status_round_trip() {
        let status: ApplicationStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(status, ApplicationStatus::InProgress);
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            "\"in-progress\""
        );
    }

    #[test]
    fn payment_status_serialization() {
        let json = serde_json::to_string(&PaymentStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn payment_method_snake_case() {
        let json = serde_json::to_string(&PaymentMethod::CreditCard).unwrap();
        assert_eq!(json, "\"credit_card\"");
    }

    #[test]
    fn type_display_labels() {
        assert_eq!(
            ApplicationType::NationalIdReplacement.display(),
            "National ID Replacement"
        );
        assert_eq!(ApplicationType::PassportFirst.display(), "e-Passport First-Time");
    }

    #[test]
    fn create_application_round_trip() {
        let ca = CreateApplication {
            application_type: ApplicationType::PassportFirst,
            first_name: "Deng".to_string(),
            last_name: "Majok".to_string(),
            middle_name: None,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            nationality: "South Sudanese".to_string(),
            national_id_number: Some("ID-0042".to_string()),
            phone_number: "+211920000000".to_string(),
            email: "deng@example.com".to_string(),
            passport_type: Some(PassportType::FiveYear),
            replacement_reason: None,
        };
        let json = serde_json::to_string(&ca).unwrap();
        let deserialized: CreateApplication = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.first_name, "Deng");
        assert_eq!(deserialized.passport_type, Some(PassportType::FiveYear));
    }

    #[test]
    fn replacement_reason_lowercase() {
        let r: ReplacementReason = serde_json::from_str("\"stolen\"").unwrap();
        assert_eq!(r, ReplacementReason::Stolen);
    }
}
