pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    account_service::AccountService,
    attempt_service::AttemptService,
    catalog_service::CatalogService,
    email_service::{EmailService, MailGateway, Mailer},
    progress_service::ProgressService,
    queue_service::EmailQueueService,
    submission_service::SubmissionService,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub catalog_service: CatalogService,
    pub submission_service: SubmissionService,
    pub attempt_service: AttemptService,
    pub progress_service: ProgressService,
    pub account_service: AccountService,
    pub queue_service: EmailQueueService,
    pub email_service: EmailService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap();

        let catalog_service = CatalogService::new(pool.clone());
        let submission_service = SubmissionService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone());
        let progress_service = ProgressService::new(pool.clone());
        let account_service = AccountService::new(pool.clone());
        let queue_service = EmailQueueService::new(pool.clone(), config.email_max_attempts);
        let mailer: Arc<dyn Mailer> = Arc::new(MailGateway::new(
            http_client,
            config.mail_gateway_url.clone(),
            config.from_email.clone(),
        ));
        let email_service = EmailService::new(
            pool.clone(),
            queue_service.clone(),
            mailer,
            config.frontend_url.clone(),
        );

        Self {
            pool,
            catalog_service,
            submission_service,
            attempt_service,
            progress_service,
            account_service,
            queue_service,
            email_service,
        }
    }
}
