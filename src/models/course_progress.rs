use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Single source of truth for a user's displayed completion state in a course.
/// `score` is the target denominator (sum of passing scores across the
/// course's tests), not earned points. Only `ProgressService` mutates rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseProgress {
    pub id: i64,
    pub course_id: i64,
    pub user_id: i64,
    pub status: ProgressStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_percent: i32,
    pub score: i32,
}
