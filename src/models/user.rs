//! User model with role-based access control.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Applicant,
    Officer,
    Supervisor,
    Admin,
}

impl UserRole {
    /// Reviewer roles may adjudicate payments and approve/reject applications.
    pub fn is_reviewer(&self) -> bool {
        matches!(self, Self::Supervisor | Self::Admin)
    }

    /// Staff roles include officers, who handle day-to-day status updates.
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Officer | Self::Supervisor | Self::Admin)
    }
}

/// Full user row from database (includes password_hash — never serialize to API).
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: UserRole,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User response DTO — excludes password_hash and internal fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone_number: u.phone_number,
            role: u.role,
            is_active: u.is_active,
            last_login: u.last_login,
            created_at: u.created_at,
        }
    }
}

/// Staff user creation payload (admin only). Applicants register themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: UserRole,
}

/// Public self-registration payload. Role is always `applicant`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_role_serialization() {
        let role = UserRole::Supervisor;
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"supervisor\"");
    }

    #[test]
    fn reviewer_and_staff_sets() {
        assert!(UserRole::Admin.is_reviewer());
        assert!(UserRole::Supervisor.is_reviewer());
        assert!(!UserRole::Officer.is_reviewer());
        assert!(!UserRole::Applicant.is_reviewer());

        assert!(UserRole::Officer.is_staff());
        assert!(!UserRole::Applicant.is_staff());
    }

    #[test]
    fn user_response_excludes_password() {
        let json = serde_json::to_string(&UserResponse {
            id: Uuid::nil(),
            username: "officer1".to_string(),
            email: "officer1@immigration.gov.ss".to_string(),
            first_name: "Mary".to_string(),
            last_name: "Officer".to_string(),
            phone_number: "+211123456789".to_string(),
            role: UserRole::Officer,
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        })
        .unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
    }

    #[test]
    fn user_to_response_conversion() {
        let user = User {
            id: Uuid::nil(),
            username: "test".to_string(),
            email: "test@test.com".to_string(),
            password_hash: "secret_hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone_number: "+211900000000".to_string(),
            role: UserRole::Applicant,
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response: UserResponse = user.into();
        assert_eq!(response.username, "test");
        assert_eq!(response.role, UserRole::Applicant);
    }
}
