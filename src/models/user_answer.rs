use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One answered question inside an attempt. Unique per
/// (user, question, attempt_number); `points_earned` is written exactly once
/// during scoring and the row is immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAnswer {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub answer_data: Option<String>,
    pub answered_at: DateTime<Utc>,
    pub points_earned: Decimal,
    pub attempt_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SelectedAnswer {
    pub id: i64,
    pub user_answer_id: i64,
    pub answer_option_id: i64,
    pub is_selected: bool,
}
