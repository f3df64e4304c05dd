use crate::models::course_progress::CourseProgress;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub course_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeResponse {
    pub created: bool,
    pub progress: CourseProgress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressQuery {
    pub user_id: i64,
    pub course_id: Option<i64>,
}
