pub mod course;
pub mod course_progress;
pub mod email_task;
pub mod question;
pub mod test;
pub mod user;
pub mod user_answer;
