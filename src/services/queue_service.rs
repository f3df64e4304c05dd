use crate::error::Result;
use crate::models::email_task::{EmailTask, EmailTaskPayload};
use sqlx::PgPool;

/// Durable notification queue backed by the `email_tasks` table. A committed
/// row is the delivery guarantee: producers enqueue and return, the worker
/// claims one task at a time and acknowledges only after the message went out.
#[derive(Clone)]
pub struct EmailQueueService {
    pool: PgPool,
    max_attempts: i32,
}

impl EmailQueueService {
    pub fn new(pool: PgPool, max_attempts: i32) -> Self {
        Self { pool, max_attempts }
    }

    pub async fn publish(&self, payload: &EmailTaskPayload) -> Result<i64> {
        let body = serde_json::to_value(payload)?;
        let task_id: i64 =
            sqlx::query_scalar(r#"INSERT INTO email_tasks (payload) VALUES ($1) RETURNING id"#)
                .bind(body)
                .fetch_one(&self.pool)
                .await?;
        tracing::info!(task_id, user_id = payload.user_id, action = ?payload.action, "email task queued");
        Ok(task_id)
    }

    /// Claim at most one due task. `SKIP LOCKED` keeps concurrent workers off
    /// each other's claims; a claimed task stays invisible until it is acked
    /// or nacked.
    pub async fn claim_next(&self) -> Result<Option<EmailTask>> {
        let task: Option<EmailTask> = sqlx::query_as(
            r#"
            UPDATE email_tasks
            SET status = 'processing', attempts = attempts + 1, updated_at = NOW()
            WHERE id = (
                SELECT id FROM email_tasks
                WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= NOW())
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    pub async fn ack(&self, task_id: i64) -> Result<()> {
        sqlx::query(r#"UPDATE email_tasks SET status = 'sent', updated_at = NOW() WHERE id = $1"#)
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Return a failed task to the queue with exponential backoff. After
    /// `max_attempts` deliveries it parks as `failed` for operator attention.
    pub async fn nack(&self, task_id: i64, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE email_tasks
            SET status = CASE WHEN attempts >= $2 THEN 'failed' ELSE 'pending' END,
                last_error = $3,
                next_retry_at = NOW() + make_interval(secs => LEAST(3600, 30 * power(2::float, GREATEST(0, attempts - 1))::int)),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .bind(self.max_attempts)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::email_task::{EmailAction, EmailTaskPayload};

    #[test]
    fn payload_wire_format_matches_the_queue_contract() {
        let payload = EmailTaskPayload {
            user_id: 7,
            course_id: None,
            action: EmailAction::Confirmation,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"user_id": 7, "course_id": null, "action": "confirmation"})
        );

        let parsed: EmailTaskPayload = serde_json::from_value(
            serde_json::json!({"user_id": 3, "course_id": 5, "action": "course_subscription"}),
        )
        .unwrap();
        assert_eq!(parsed.course_id, Some(5));
        assert_eq!(parsed.action, EmailAction::CourseSubscription);
    }
}
