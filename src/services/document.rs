//! Approval document generation.
//!
//! Renders a collection slip for an approved application and stores it under
//! the media root. Generation failure never rolls back the approval; the
//! document can be regenerated later.

use std::path::Path;

use crate::errors::AppError;
use crate::models::application::Application;

/// Render the approval slip as plain text.
pub fn render(app: &Application) -> String {
    let full_name = match &app.middle_name {
        Some(middle) => format!("{} {} {}", app.first_name, middle, app.last_name),
        None => format!("{} {}", app.first_name, app.last_name),
    };

    format!(
        "REPUBLIC OF SOUTH SUDAN\n\
         DIRECTORATE OF NATIONALITY, PASSPORTS AND IMMIGRATION\n\
         APPROVED APPLICATION FORM\n\
         \n\
         Confirmation Number: {}\n\
         Application Type: {}\n\
         \n\
         APPLICANT DETAILS:\n\
         Name: {}\n\
         Date of Birth: {}\n\
         Nationality: {}\n\
         National ID: {}\n\
         \n\
         CONTACT DETAILS:\n\
         Phone: {}\n\
         Email: {}\n\
         \n\
         COLLECTION INSTRUCTIONS:\n\
         1. Bring this approval form (printed or digital)\n\
         2. Visit Immigration Head Office in Juba\n\
         3. Present your original National ID\n\
         4. Collection hours: Monday-Friday, 8:00 AM - 4:00 PM\n",
        app.confirmation_number,
        app.application_type.display(),
        full_name,
        app.date_of_birth,
        app.nationality,
        app.national_id_number.as_deref().unwrap_or("N/A"),
        app.phone_number,
        app.email,
    )
}

/// Generate the approval document and return its media-relative path.
pub async fn generate(media_root: &str, app: &Application) -> Result<String, AppError> {
    let dir = Path::new(media_root).join("approved");
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create document directory: {e}")))?;

    let filename = format!("application-{}.txt", app.confirmation_number);
    tokio::fs::write(dir.join(&filename), render(app))
        .await
        .map_err(|e| AppError::Internal(format!("Failed to write approval document: {e}")))?;

    Ok(format!("approved/{filename}"))
}
