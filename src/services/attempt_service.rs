use crate::dto::submission_dto::TestResultEntry;
use crate::error::Result;
use crate::models::test::Test;
use crate::models::user_answer::{SelectedAnswer, UserAnswer};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row};

/// Highest attempt number the user has recorded for the test, 0 when none.
pub async fn last_attempt_number(
    conn: &mut PgConnection,
    user_id: i64,
    test_id: i64,
) -> Result<i32> {
    let number: i32 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(MAX(ua.attempt_number), 0)
        FROM user_answers ua
        JOIN questions q ON q.id = ua.question_id
        WHERE ua.user_id = $1 AND q.test_id = $2
        "#,
    )
    .bind(user_id)
    .bind(test_id)
    .fetch_one(conn)
    .await?;
    Ok(number)
}

/// Sum of points earned within one attempt of a test.
pub async fn total_score(
    conn: &mut PgConnection,
    user_id: i64,
    test_id: i64,
    attempt_number: i32,
) -> Result<Decimal> {
    let total: Decimal = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(ua.points_earned), 0)
        FROM user_answers ua
        JOIN questions q ON q.id = ua.question_id
        WHERE ua.user_id = $1 AND q.test_id = $2 AND ua.attempt_number = $3
        "#,
    )
    .bind(user_id)
    .bind(test_id)
    .bind(attempt_number)
    .fetch_one(conn)
    .await?;
    Ok(total)
}

/// Sum of points earned over every answer of the user whose question belongs
/// to any test of the course. This is the numerator the aggregator compares
/// against `CourseProgress.score`.
pub async fn total_score_across_course(
    conn: &mut PgConnection,
    user_id: i64,
    course_id: i64,
) -> Result<Decimal> {
    let total: Decimal = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(ua.points_earned), 0)
        FROM user_answers ua
        JOIN questions q ON q.id = ua.question_id
        JOIN tests t ON t.id = q.test_id
        WHERE ua.user_id = $1 AND t.course_id = $2
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(conn)
    .await?;
    Ok(total)
}

/// A test counts as passed when the user's most recent attempt reached its
/// passing score. Earlier attempts do not count.
pub async fn test_passed(conn: &mut PgConnection, user_id: i64, test: &Test) -> Result<bool> {
    let last = last_attempt_number(&mut *conn, user_id, test.id).await?;
    if last == 0 {
        return Ok(false);
    }
    let total = total_score(&mut *conn, user_id, test.id, last).await?;
    Ok(total >= Decimal::from(test.passing_score))
}

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Per-test summary of the user's latest attempt in a course. Tests the
    /// user never attempted are omitted.
    pub async fn user_results(&self, user_id: i64, course_id: i64) -> Result<Vec<TestResultEntry>> {
        let tests: Vec<Test> = sqlx::query_as(
            r#"SELECT * FROM tests WHERE course_id = $1 ORDER BY id"#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        let mut results = Vec::new();

        for test in tests {
            let row = sqlx::query(
                r#"
                SELECT MAX(ua.attempt_number) AS last_attempt,
                       MAX(ua.answered_at) AS last_attempt_date
                FROM user_answers ua
                JOIN questions q ON q.id = ua.question_id
                WHERE ua.user_id = $1 AND q.test_id = $2
                "#,
            )
            .bind(user_id)
            .bind(test.id)
            .fetch_one(&mut *conn)
            .await?;

            let last_attempt: Option<i32> = row.try_get("last_attempt")?;
            let last_attempt_date: Option<DateTime<Utc>> = row.try_get("last_attempt_date")?;
            let (Some(attempt_number), Some(passed_at)) = (last_attempt, last_attempt_date) else {
                continue;
            };

            let score = total_score(&mut *conn, user_id, test.id, attempt_number).await?;
            results.push(TestResultEntry {
                test: test.id,
                title: test.title,
                score: score.to_f64().unwrap_or(0.0),
                max_score: test.max_score,
                is_passed: score >= Decimal::from(test.passing_score),
                attempt_number,
                passed_at,
            });
        }

        Ok(results)
    }

    pub async fn list_user_answers(
        &self,
        user_id: i64,
        question_id: Option<i64>,
    ) -> Result<Vec<UserAnswer>> {
        let answers: Vec<UserAnswer> = sqlx::query_as(
            r#"
            SELECT * FROM user_answers
            WHERE user_id = $1 AND ($2::BIGINT IS NULL OR question_id = $2)
            ORDER BY answered_at
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    pub async fn list_selected_answers(
        &self,
        user_answer_id: i64,
    ) -> Result<Vec<SelectedAnswer>> {
        let selections: Vec<SelectedAnswer> = sqlx::query_as(
            r#"SELECT * FROM selected_answers WHERE user_answer_id = $1 ORDER BY id"#,
        )
        .bind(user_answer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(selections)
    }
}
