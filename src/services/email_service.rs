use crate::error::{Error, Result};
use crate::models::course::Course;
use crate::models::email_task::{EmailAction, EmailTask, EmailTaskPayload};
use crate::models::user::User;
use crate::services::queue_service::EmailQueueService;
use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Sends mail by posting to an HTTP mail gateway.
pub struct MailGateway {
    client: reqwest::Client,
    gateway_url: String,
    from_email: String,
}

impl MailGateway {
    pub fn new(client: reqwest::Client, gateway_url: String, from_email: String) -> Self {
        Self {
            client,
            gateway_url,
            from_email,
        }
    }
}

#[async_trait]
impl Mailer for MailGateway {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.gateway_url)
            .json(&json!({
                "from": self.from_email,
                "to": to,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "Mail gateway returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

pub fn render_confirmation(user: &User, token: &str, frontend_url: &str) -> Message {
    let confirmation_link = format!("{}/confirm-email/{}/", frontend_url, token);
    Message {
        subject: "Confirm your email address".to_string(),
        body: format!(
            "Hello {},\n\nPlease confirm your email address by following the link below:\n{}\n",
            user.first_name, confirmation_link
        ),
    }
}

pub fn render_course_subscription(user: &User, course: &Course) -> Message {
    Message {
        subject: format!("You have been enrolled in a new course: {}", course.title),
        body: format!(
            "Hello {},\n\nThe course \"{}\" is now available in your account.\n",
            user.first_name, course.title
        ),
    }
}

/// Consumes queued notification tasks one at a time: resolve the referenced
/// entities, render the message, send, then acknowledge. Any failure leaves
/// the task unacknowledged so it is redelivered (duplicate sends are the
/// accepted tradeoff).
#[derive(Clone)]
pub struct EmailService {
    pool: PgPool,
    queue: EmailQueueService,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl EmailService {
    pub fn new(
        pool: PgPool,
        queue: EmailQueueService,
        mailer: Arc<dyn Mailer>,
        frontend_url: String,
    ) -> Self {
        Self {
            pool,
            queue,
            mailer,
            frontend_url,
        }
    }

    /// Process at most one task. Returns false when the queue was empty.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(task) = self.queue.claim_next().await? else {
            return Ok(false);
        };

        match self.process(&task).await {
            Ok(()) => self.queue.ack(task.id).await?,
            Err(e) => {
                tracing::error!(
                    task_id = task.id,
                    error = %e,
                    "email task failed, leaving it for redelivery"
                );
                self.queue.nack(task.id, &e.to_string()).await?;
            }
        }
        Ok(true)
    }

    async fn process(&self, task: &EmailTask) -> Result<()> {
        let payload: EmailTaskPayload = serde_json::from_value(task.payload.clone())?;

        let user: User = sqlx::query_as(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(payload.user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", payload.user_id)))?;

        // A dangling course reference aborts the whole task; there is no
        // fallback to a courseless message.
        let course = match payload.course_id {
            Some(course_id) => Some(
                sqlx::query_as::<_, Course>(r#"SELECT * FROM courses WHERE id = $1"#)
                    .bind(course_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("Course {} not found", course_id)))?,
            ),
            None => None,
        };

        let message = match payload.action {
            EmailAction::Confirmation => {
                if user.email.is_empty() {
                    tracing::warn!(user_id = user.id, "user has no email, skipping confirmation");
                    return Ok(());
                }
                let token = self.ensure_confirmation_token(&user).await?;
                render_confirmation(&user, &token, &self.frontend_url)
            }
            EmailAction::CourseSubscription => {
                let course = course.ok_or_else(|| {
                    Error::BadRequest("course_id is required for course_subscription".to_string())
                })?;
                render_course_subscription(&user, &course)
            }
        };

        self.mailer
            .send(&user.email, &message.subject, &message.body)
            .await?;
        tracing::info!(user_id = user.id, action = ?payload.action, "email sent");
        Ok(())
    }

    async fn ensure_confirmation_token(&self, user: &User) -> Result<String> {
        if let Some(token) = &user.email_confirmation_token {
            return Ok(token.clone());
        }
        let token = crate::utils::token::generate_token(32);
        sqlx::query(r#"UPDATE users SET email_confirmation_token = $1 WHERE id = $2"#)
            .bind(&token)
            .bind(user.id)
            .execute(&self.pool)
            .await?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: 7,
            username: "ivan".to_string(),
            email: "ivan@example.com".to_string(),
            password_hash: "x".to_string(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            email_confirmed: false,
            email_confirmation_token: None,
            created_at: Utc::now(),
        }
    }

    fn sample_course() -> Course {
        Course {
            id: 5,
            title: "Password Security".to_string(),
            description: "Basics".to_string(),
            difficulty: "beginner".to_string(),
            category: "password_sec".to_string(),
            author: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn confirmation_message_links_to_the_frontend() {
        let message = render_confirmation(&sample_user(), "tok123", "https://edu.example.com");
        assert_eq!(message.subject, "Confirm your email address");
        assert!(message
            .body
            .contains("https://edu.example.com/confirm-email/tok123/"));
    }

    #[test]
    fn subscription_message_names_the_course() {
        let message = render_course_subscription(&sample_user(), &sample_course());
        assert_eq!(
            message.subject,
            "You have been enrolled in a new course: Password Security"
        );
        assert!(message.body.contains("Password Security"));
    }

    #[tokio::test]
    async fn mailer_receives_the_rendered_message() {
        let mut mock = MockMailer::new();
        mock.expect_send()
            .withf(|to, subject, body| {
                to == "ivan@example.com"
                    && subject == "Confirm your email address"
                    && body.contains("/confirm-email/tok123/")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let user = sample_user();
        let message = render_confirmation(&user, "tok123", "https://edu.example.com");
        let mailer: Arc<dyn Mailer> = Arc::new(mock);
        mailer
            .send(&user.email, &message.subject, &message.body)
            .await
            .unwrap();
    }
}
