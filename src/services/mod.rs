pub mod account_service;
pub mod attempt_service;
pub mod catalog_service;
pub mod email_service;
pub mod progress_service;
pub mod queue_service;
pub mod scoring;
pub mod submission_service;
