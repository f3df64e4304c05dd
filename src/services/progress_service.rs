use crate::dto::progress_dto::SubscribeResponse;
use crate::error::{Error, Result};
use crate::models::course_progress::{CourseProgress, ProgressStatus};
use crate::models::email_task::{EmailAction, EmailTaskPayload};
use crate::models::test::Test;
use crate::services::attempt_service;
use crate::services::queue_service::EmailQueueService;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

#[derive(Debug, PartialEq)]
pub(crate) struct ProgressUpdate {
    pub status: ProgressStatus,
    pub percent: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Course progress state machine, kept free of the database so the
/// transitions can be checked in isolation.
///
/// Completion wins over everything: percent pins to 100 and the completion
/// timestamp is stamped once and never overwritten while the row stays
/// completed. Falling out of completion reverts to in-progress and clears the
/// stamp. Otherwise the percentage is recomputed from earned points against
/// the target score, floored and clamped to [0, 100]; a zero target keeps the
/// previous percentage.
pub(crate) fn next_state(
    current: &CourseProgress,
    all_tests_passed: bool,
    earned: Decimal,
    target_score: i32,
    now: DateTime<Utc>,
) -> ProgressUpdate {
    if all_tests_passed {
        return ProgressUpdate {
            status: ProgressStatus::Completed,
            percent: 100,
            completed_at: current.completed_at.or(Some(now)),
        };
    }

    let status = if current.status == ProgressStatus::Completed {
        ProgressStatus::InProgress
    } else {
        current.status
    };

    let percent = if target_score > 0 {
        let ratio = earned * Decimal::from(100) / Decimal::from(target_score);
        ratio.floor().to_i32().unwrap_or(0).min(100)
    } else {
        current.progress_percent
    };

    ProgressUpdate {
        status,
        percent,
        completed_at: None,
    }
}

/// Recompute the (user, course) progress row from ledger data. Idempotent;
/// locks the row for the duration of the calling transaction. Returns `None`
/// when the user is not enrolled.
pub async fn recompute(
    conn: &mut PgConnection,
    course_id: i64,
    user_id: i64,
) -> Result<Option<CourseProgress>> {
    let current: Option<CourseProgress> = sqlx::query_as(
        r#"SELECT * FROM course_progress WHERE course_id = $1 AND user_id = $2 FOR UPDATE"#,
    )
    .bind(course_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(current) = current else {
        return Ok(None);
    };

    let target_score: i32 = sqlx::query_scalar(
        r#"SELECT COALESCE(SUM(passing_score), 0)::INT FROM tests WHERE course_id = $1"#,
    )
    .bind(course_id)
    .fetch_one(&mut *conn)
    .await?;

    let tests: Vec<Test> = sqlx::query_as(r#"SELECT * FROM tests WHERE course_id = $1"#)
        .bind(course_id)
        .fetch_all(&mut *conn)
        .await?;

    // A course without tests is never complete.
    let mut all_tests_passed = !tests.is_empty();
    for test in &tests {
        if !attempt_service::test_passed(&mut *conn, user_id, test).await? {
            all_tests_passed = false;
            break;
        }
    }

    let earned = attempt_service::total_score_across_course(&mut *conn, user_id, course_id).await?;
    let next = next_state(&current, all_tests_passed, earned, target_score, Utc::now());

    let updated: CourseProgress = sqlx::query_as(
        r#"
        UPDATE course_progress
        SET status = $1, progress_percent = $2, completed_at = $3, score = $4
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(next.status)
    .bind(next.percent)
    .bind(next.completed_at)
    .bind(target_score)
    .bind(current.id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Some(updated))
}

/// Locked get-or-create used on the submission path. A first submission also
/// promotes a freshly subscribed (not started) enrollment to in-progress.
pub async fn get_or_create_for_submission(
    conn: &mut PgConnection,
    course_id: i64,
    user_id: i64,
) -> Result<CourseProgress> {
    let existing: Option<CourseProgress> = sqlx::query_as(
        r#"SELECT * FROM course_progress WHERE course_id = $1 AND user_id = $2 FOR UPDATE"#,
    )
    .bind(course_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(progress) = existing {
        if progress.status == ProgressStatus::NotStarted {
            let promoted: CourseProgress = sqlx::query_as(
                r#"UPDATE course_progress SET status = 'in_progress' WHERE id = $1 RETURNING *"#,
            )
            .bind(progress.id)
            .fetch_one(&mut *conn)
            .await?;
            return Ok(promoted);
        }
        return Ok(progress);
    }

    let target_score: i32 = sqlx::query_scalar(
        r#"SELECT COALESCE(SUM(passing_score), 0)::INT FROM tests WHERE course_id = $1"#,
    )
    .bind(course_id)
    .fetch_one(&mut *conn)
    .await?;

    let inserted: Option<CourseProgress> = sqlx::query_as(
        r#"
        INSERT INTO course_progress (course_id, user_id, status, score)
        VALUES ($1, $2, 'in_progress', $3)
        ON CONFLICT (course_id, user_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(course_id)
    .bind(user_id)
    .bind(target_score)
    .fetch_optional(&mut *conn)
    .await?;

    match inserted {
        Some(progress) => Ok(progress),
        // Lost the insert race; the winner's row exists now.
        None => {
            let progress: CourseProgress = sqlx::query_as(
                r#"SELECT * FROM course_progress WHERE course_id = $1 AND user_id = $2 FOR UPDATE"#,
            )
            .bind(course_id)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;
            Ok(progress)
        }
    }
}

#[derive(Clone)]
pub struct ProgressService {
    pool: PgPool,
}

impl ProgressService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent enrollment. Concurrent calls for the same (course, user)
    /// serialize on the row lock and the unique index; exactly one row wins.
    /// A fresh enrollment queues the course-subscription notification.
    pub async fn subscribe(
        &self,
        course_id: i64,
        user_id: i64,
        queue: &EmailQueueService,
    ) -> Result<SubscribeResponse> {
        let course_exists: Option<i64> = sqlx::query_scalar(r#"SELECT id FROM courses WHERE id = $1"#)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        if course_exists.is_none() {
            return Err(Error::NotFound("course not found".to_string()));
        }
        let user_exists: Option<i64> = sqlx::query_scalar(r#"SELECT id FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        if user_exists.is_none() {
            return Err(Error::NotFound("user not found".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let existing: Option<CourseProgress> = sqlx::query_as(
            r#"SELECT * FROM course_progress WHERE course_id = $1 AND user_id = $2 FOR UPDATE"#,
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(progress) = existing {
            tx.commit().await?;
            return Ok(SubscribeResponse {
                created: false,
                progress,
            });
        }

        let target_score: i32 = sqlx::query_scalar(
            r#"SELECT COALESCE(SUM(passing_score), 0)::INT FROM tests WHERE course_id = $1"#,
        )
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await?;

        let inserted: Option<CourseProgress> = sqlx::query_as(
            r#"
            INSERT INTO course_progress (course_id, user_id, status, started_at, score)
            VALUES ($1, $2, 'not_started', NOW(), $3)
            ON CONFLICT (course_id, user_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .bind(target_score)
        .fetch_optional(&mut *tx)
        .await?;

        let (created, progress) = match inserted {
            Some(progress) => (true, progress),
            None => {
                let progress: CourseProgress = sqlx::query_as(
                    r#"SELECT * FROM course_progress WHERE course_id = $1 AND user_id = $2"#,
                )
                .bind(course_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
                (false, progress)
            }
        };
        tx.commit().await?;

        if created {
            queue
                .publish(&EmailTaskPayload {
                    user_id,
                    course_id: Some(course_id),
                    action: EmailAction::CourseSubscription,
                })
                .await?;
        }

        Ok(SubscribeResponse { created, progress })
    }

    pub async fn unsubscribe(&self, progress_id: i64) -> Result<()> {
        let deleted = sqlx::query(r#"DELETE FROM course_progress WHERE id = $1"#)
            .bind(progress_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound("progress not found".to_string()));
        }
        Ok(())
    }

    pub async fn list_progress(
        &self,
        user_id: i64,
        course_id: Option<i64>,
    ) -> Result<Vec<CourseProgress>> {
        let rows: Vec<CourseProgress> = sqlx::query_as(
            r#"
            SELECT * FROM course_progress
            WHERE user_id = $1 AND ($2::BIGINT IS NULL OR course_id = $2)
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Eager fan-out after a catalog mutation: every enrolled user's row is
    /// recomputed, one short transaction per user so a large course does not
    /// hold a single long-lived lock set.
    pub async fn cascade_recompute(&self, course_id: i64) -> Result<()> {
        let user_ids: Vec<i64> =
            sqlx::query_scalar(r#"SELECT user_id FROM course_progress WHERE course_id = $1"#)
                .bind(course_id)
                .fetch_all(&self.pool)
                .await?;

        for user_id in user_ids {
            let mut tx = self.pool.begin().await?;
            recompute(&mut *tx, course_id, user_id).await?;
            tx.commit().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(
        status: ProgressStatus,
        percent: i32,
        completed_at: Option<DateTime<Utc>>,
    ) -> CourseProgress {
        CourseProgress {
            id: 1,
            course_id: 5,
            user_id: 7,
            status,
            started_at: None,
            completed_at,
            progress_percent: percent,
            score: 0,
        }
    }

    #[test]
    fn completing_stamps_completed_at_once() {
        let now = Utc::now();
        let current = progress(ProgressStatus::InProgress, 40, None);
        let next = next_state(&current, true, Decimal::from(40), 100, now);
        assert_eq!(next.status, ProgressStatus::Completed);
        assert_eq!(next.percent, 100);
        assert_eq!(next.completed_at, Some(now));
    }

    #[test]
    fn recompute_keeps_existing_completion_stamp() {
        let stamped = Utc::now() - chrono::Duration::days(3);
        let current = progress(ProgressStatus::Completed, 100, Some(stamped));
        let next = next_state(&current, true, Decimal::from(200), 100, Utc::now());
        assert_eq!(next.completed_at, Some(stamped));
    }

    #[test]
    fn recompute_is_idempotent_without_ledger_changes() {
        let now = Utc::now();
        let current = progress(ProgressStatus::InProgress, 0, None);
        let first = next_state(&current, false, Decimal::from(30), 100, now);
        let after = progress(first.status, first.percent, first.completed_at);
        let second = next_state(&after, false, Decimal::from(30), 100, Utc::now());
        assert_eq!(first, second);
    }

    #[test]
    fn falling_out_of_completion_reverts_and_clears_stamp() {
        let current = progress(ProgressStatus::Completed, 100, Some(Utc::now()));
        let next = next_state(&current, false, Decimal::from(10), 100, Utc::now());
        assert_eq!(next.status, ProgressStatus::InProgress);
        assert_eq!(next.completed_at, None);
        assert_eq!(next.percent, 10);
    }

    #[test]
    fn percent_is_floored_and_clamped() {
        let current = progress(ProgressStatus::InProgress, 0, None);

        let next = next_state(&current, false, Decimal::new(999, 1), 100, Utc::now());
        assert_eq!(next.percent, 99); // 99.9 floors down

        let next = next_state(&current, false, Decimal::from(250), 100, Utc::now());
        assert_eq!(next.percent, 100); // earned above target clamps
    }

    #[test]
    fn zero_target_score_keeps_previous_percent() {
        let current = progress(ProgressStatus::InProgress, 42, None);
        let next = next_state(&current, false, Decimal::from(10), 0, Utc::now());
        assert_eq!(next.percent, 42);
    }

    #[test]
    fn not_started_stays_not_started_on_catalog_recompute() {
        let current = progress(ProgressStatus::NotStarted, 0, None);
        let next = next_state(&current, false, Decimal::ZERO, 50, Utc::now());
        assert_eq!(next.status, ProgressStatus::NotStarted);
        assert_eq!(next.percent, 0);
    }
}
