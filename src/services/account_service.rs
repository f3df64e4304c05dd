use crate::dto::account_dto::{RegisterRequest, RegisteredUser};
use crate::error::{Error, Result};
use crate::models::email_task::{EmailAction, EmailTaskPayload};
use crate::models::user::User;
use crate::services::queue_service::EmailQueueService;
use crate::utils::{crypto, token};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an unconfirmed user and queue the confirmation email. The
    /// producer only enqueues; actual delivery is the worker's problem.
    pub async fn register(
        &self,
        payload: RegisterRequest,
        queue: &EmailQueueService,
    ) -> Result<RegisteredUser> {
        let existing: Option<i64> =
            sqlx::query_scalar(r#"SELECT id FROM users WHERE username = $1 OR email = $2"#)
                .bind(&payload.username)
                .bind(&payload.email)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Err(Error::BadRequest(
                "Username or email is already registered".to_string(),
            ));
        }

        let password_hash = crypto::hash_password(&payload.password)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?;
        let confirmation_token = token::generate_token(32);

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, email_confirmation_token)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&payload.username)
        .bind(&payload.email)
        .bind(password_hash)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(confirmation_token)
        .fetch_one(&self.pool)
        .await?;

        queue
            .publish(&EmailTaskPayload {
                user_id: user.id,
                course_id: None,
                action: EmailAction::Confirmation,
            })
            .await?;

        Ok(RegisteredUser {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        })
    }

    pub async fn confirm_email(&self, confirmation_token: &str) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET email_confirmed = TRUE, email_confirmation_token = NULL
            WHERE email_confirmation_token = $1
            "#,
        )
        .bind(confirmation_token)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::NotFound("Invalid confirmation token".to_string()));
        }
        Ok(())
    }

    pub async fn resend_confirmation(
        &self,
        email: &str,
        queue: &EmailQueueService,
    ) -> Result<()> {
        let user: User = sqlx::query_as(r#"SELECT * FROM users WHERE email = $1"#)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User with this email not found".to_string()))?;

        if user.email_confirmed {
            return Err(Error::BadRequest("Email already confirmed".to_string()));
        }

        let confirmation_token = token::generate_token(32);
        sqlx::query(r#"UPDATE users SET email_confirmation_token = $1 WHERE id = $2"#)
            .bind(&confirmation_token)
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        queue
            .publish(&EmailTaskPayload {
                user_id: user.id,
                course_id: None,
                action: EmailAction::Confirmation,
            })
            .await?;
        Ok(())
    }
}
