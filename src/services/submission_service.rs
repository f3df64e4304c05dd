use crate::dto::submission_dto::{SubmitTestRequest, SubmitTestResponse};
use crate::error::{Error, Result};
use crate::models::question::{AnswerOption, Question, QuestionType};
use crate::models::test::Test;
use crate::services::scoring::{score_question, ChoiceTally};
use crate::services::{attempt_service, progress_service};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;

#[derive(Clone)]
pub struct SubmissionService {
    pool: sqlx::PgPool,
}

impl SubmissionService {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    /// Score a submitted attempt. Everything runs in one transaction: answer
    /// rows, selections, scoring and the progress recompute commit together or
    /// not at all. Question ids that do not belong to the test, and option ids
    /// that do not belong to their question, are skipped so a client holding a
    /// stale catalog can still submit the rest.
    pub async fn submit(
        &self,
        test_id: i64,
        payload: SubmitTestRequest,
    ) -> Result<SubmitTestResponse> {
        let course_id = payload
            .course_id
            .ok_or_else(|| Error::BadRequest("course_id is required".to_string()))?;

        let test: Test = sqlx::query_as(r#"SELECT * FROM tests WHERE id = $1"#)
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Test not found".to_string()))?;

        let user_id = payload.user_id;
        let mut tx = self.pool.begin().await?;

        let attempt_number =
            attempt_service::last_attempt_number(&mut *tx, user_id, test_id).await? + 1;

        let mut total_score = Decimal::ZERO;
        for answer in &payload.answers {
            let question: Option<Question> =
                sqlx::query_as(r#"SELECT * FROM questions WHERE id = $1 AND test_id = $2"#)
                    .bind(answer.question)
                    .bind(test_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let Some(question) = question else {
                continue;
            };

            let user_answer_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO user_answers (user_id, question_id, answer_data, attempt_number)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(user_id)
            .bind(question.id)
            .bind(answer.answer_data.as_deref())
            .bind(attempt_number)
            .fetch_one(&mut *tx)
            .await?;

            let points = if question.question_type == QuestionType::Text {
                // Free-text grading is not implemented; the answer is still
                // recorded so attempt history stays complete.
                Decimal::ZERO
            } else {
                let options: Vec<AnswerOption> =
                    sqlx::query_as(r#"SELECT * FROM answer_options WHERE question_id = $1"#)
                        .bind(question.id)
                        .fetch_all(&mut *tx)
                        .await?;

                let mut tally = ChoiceTally {
                    total_correct: options.iter().filter(|o| o.is_correct).count() as u32,
                    ..ChoiceTally::default()
                };

                let mut seen = HashSet::new();
                for option_id in answer
                    .selected_options
                    .iter()
                    .filter(|id| seen.insert(**id))
                {
                    let Some(option) = options.iter().find(|o| o.id == *option_id) else {
                        continue;
                    };
                    sqlx::query(
                        r#"INSERT INTO selected_answers (user_answer_id, answer_option_id) VALUES ($1, $2)"#,
                    )
                    .bind(user_answer_id)
                    .bind(option.id)
                    .execute(&mut *tx)
                    .await?;

                    if option.is_correct {
                        tally.selected_correct += 1;
                    } else {
                        tally.selected_wrong += 1;
                    }
                }

                score_question(question.question_type, question.points, &tally)
            };

            // points_earned is written exactly once, after selections land
            sqlx::query(r#"UPDATE user_answers SET points_earned = $1 WHERE id = $2"#)
                .bind(points)
                .bind(user_answer_id)
                .execute(&mut *tx)
                .await?;

            total_score += points;
        }

        progress_service::get_or_create_for_submission(&mut *tx, course_id, user_id).await?;
        progress_service::recompute(&mut *tx, course_id, user_id).await?;

        tx.commit().await?;

        let is_passed = total_score >= Decimal::from(test.passing_score);
        tracing::info!(
            user_id,
            test_id,
            attempt_number,
            total_score = %total_score,
            is_passed,
            "test submission scored"
        );

        Ok(SubmitTestResponse {
            status: "success".to_string(),
            attempt_number,
            total_score: total_score.to_f64().unwrap_or(0.0),
            is_passed,
        })
    }
}
