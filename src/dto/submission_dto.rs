use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One answer entry of a submission, in the order the client answered.
/// `selected_options` applies to choice questions, `answer_data` to free-text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question: i64,
    #[serde(default)]
    pub selected_options: Vec<i64>,
    pub answer_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitTestRequest {
    pub user_id: i64,
    pub course_id: Option<i64>,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTestResponse {
    pub status: String,
    pub attempt_number: i32,
    pub total_score: f64,
    pub is_passed: bool,
}

/// Per-test summary of the user's latest attempt only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResultEntry {
    pub test: i64,
    pub title: String,
    pub score: f64,
    pub max_score: i32,
    pub is_passed: bool,
    pub attempt_number: i32,
    pub passed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResultsQuery {
    pub user_id: i64,
    pub course_id: i64,
}
