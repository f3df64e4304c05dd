use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailAction {
    Confirmation,
    CourseSubscription,
}

/// Wire format of a queued notification task. The `payload` column of
/// `email_tasks` holds exactly this object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTaskPayload {
    pub user_id: i64,
    pub course_id: Option<i64>,
    pub action: EmailAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailTask {
    pub id: i64,
    pub payload: JsonValue,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
