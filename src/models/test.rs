use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A test inside a course. `max_score` is derived from the sum of its
/// questions' points and is never written directly outside of
/// `CatalogService::recompute_max_score`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Test {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub max_score: i32,
    pub passing_score: i32,
    pub time_limit: i32,
}
