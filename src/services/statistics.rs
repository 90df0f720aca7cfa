//! Application statistics aggregation queries.

use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::application::{ApplicationStatus, ApplicationType};

/// Aggregated counts for the staff overview page.
#[derive(Debug, Serialize)]
pub struct Statistics {
    pub total: i64,
    pub by_status: StatusCounts,
    pub by_type: TypeCounts,
}

/// Application counts grouped by review status.
#[derive(Debug, Default, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub approved: i64,
    pub rejected: i64,
    pub collected: i64,
}

/// Application counts grouped by application type.
#[derive(Debug, Default, Serialize)]
pub struct TypeCounts {
    pub passport_first: i64,
    pub passport_replacement: i64,
    pub nationalid_first: i64,
    pub nationalid_replacement: i64,
}

/// Fetch all statistics with parallel queries.
pub async fn get_stats(pool: &PgPool) -> Result<Statistics, AppError> {
    let (total, by_status, by_type) = tokio::try_join!(
        fetch_total(pool),
        fetch_status_counts(pool),
        fetch_type_counts(pool),
    )?;

    Ok(Statistics {
        total,
        by_status,
        by_type,
    })
}

async fn fetch_total(pool: &PgPool) -> Result<i64, AppError> {
    let total = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

async fn fetch_status_counts(pool: &PgPool) -> Result<StatusCounts, AppError> {
    let rows: Vec<(ApplicationStatus, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM applications GROUP BY status")
            .fetch_all(pool)
            .await?;

    let mut counts = StatusCounts::default();
    for (status, n) in rows {
        match status {
            ApplicationStatus::Pending => counts.pending = n,
            ApplicationStatus::InProgress => counts.in_progress = n,
            ApplicationStatus::Approved => counts.approved = n,
            ApplicationStatus::Rejected => counts.rejected = n,
            ApplicationStatus::Collected => counts.collected = n,
        }
    }
    Ok(counts)
}

async fn fetch_type_counts(pool: &PgPool) -> Result<TypeCounts, AppError> {
    let rows: Vec<(ApplicationType, i64)> = sqlx::query_as(
        "SELECT application_type, COUNT(*) FROM applications GROUP BY application_type",
    )
    .fetch_all(pool)
    .await?;

    let mut counts = TypeCounts::default();
    for (application_type, n) in rows {
        match application_type {
            ApplicationType::PassportFirst => counts.passport_first = n,
            ApplicationType::PassportReplacement => counts.passport_replacement = n,
            ApplicationType::NationalIdFirst => counts.nationalid_first = n,
            ApplicationType::NationalIdReplacement => counts.nationalid_replacement = n,
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_counts_default_to_zero() {
        let counts = StatusCounts::default();
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["pending"], 0);
        assert_eq!(json["collected"], 0);
    }

    #[test]
    fn statistics_serialization_shape() {
        let stats = Statistics {
            total: 3,
            by_status: StatusCounts {
                pending: 2,
                approved: 1,
                ..Default::default()
            },
            by_type: TypeCounts {
                passport_first: 3,
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["by_status"]["pending"], 2);
        assert_eq!(json["by_type"]["passport_first"], 3);
    }
}
