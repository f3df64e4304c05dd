use crate::dto::catalog_dto::{
    CourseFilter, CreateAnswerOptionPayload, CreateCoursePayload, CreateQuestionPayload,
    CreateTestPayload, UpdateAnswerOptionPayload, UpdateCoursePayload, UpdateQuestionPayload,
    UpdateTestPayload,
};
use crate::error::{Error, Result};
use crate::models::course::Course;
use crate::models::question::{AnswerOption, Question};
use crate::models::test::Test;
use crate::services::progress_service::ProgressService;
use sqlx::PgPool;

/// Course/test/question/option CRUD. Every mutation that can change scoring
/// weights calls `recompute_max_score` and then cascades a progress recompute
/// for the owning course, so the fan-out is an explicit call graph instead of
/// hidden store hooks.
#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // --- courses ---

    pub async fn create_course(&self, payload: CreateCoursePayload) -> Result<Course> {
        let course: Course = sqlx::query_as(
            r#"
            INSERT INTO courses (title, description, difficulty, category, author)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(payload.title)
        .bind(payload.description)
        .bind(payload.difficulty)
        .bind(payload.category)
        .bind(payload.author)
        .fetch_one(&self.pool)
        .await?;
        Ok(course)
    }

    pub async fn list_courses(&self, filter: CourseFilter) -> Result<Vec<Course>> {
        let courses: Vec<Course> = sqlx::query_as(
            r#"
            SELECT * FROM courses
            WHERE is_active = TRUE
              AND ($1::TEXT IS NULL OR category = $1)
              AND ($2::TEXT IS NULL OR difficulty = $2)
            ORDER BY id
            "#,
        )
        .bind(filter.category)
        .bind(filter.difficulty)
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    pub async fn get_course(&self, course_id: i64) -> Result<Course> {
        let course: Course = sqlx::query_as(r#"SELECT * FROM courses WHERE id = $1"#)
            .bind(course_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(course)
    }

    pub async fn update_course(
        &self,
        course_id: i64,
        payload: UpdateCoursePayload,
    ) -> Result<Course> {
        let course: Course = sqlx::query_as(
            r#"
            UPDATE courses
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                difficulty = COALESCE($3, difficulty),
                category = COALESCE($4, category),
                author = COALESCE($5, author),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(payload.title)
        .bind(payload.description)
        .bind(payload.difficulty)
        .bind(payload.category)
        .bind(payload.author)
        .bind(payload.is_active)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(course)
    }

    pub async fn delete_course(&self, course_id: i64) -> Result<()> {
        let deleted = sqlx::query(r#"DELETE FROM courses WHERE id = $1"#)
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound("Course not found".to_string()));
        }
        Ok(())
    }

    // --- tests ---

    pub async fn create_test(
        &self,
        payload: CreateTestPayload,
        progress: &ProgressService,
    ) -> Result<Test> {
        self.get_course(payload.course_id).await?;

        let test: Test = sqlx::query_as(
            r#"
            INSERT INTO tests (course_id, title, passing_score, time_limit)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(payload.course_id)
        .bind(payload.title)
        .bind(payload.passing_score)
        .bind(payload.time_limit)
        .fetch_one(&self.pool)
        .await?;

        progress.cascade_recompute(test.course_id).await?;
        Ok(test)
    }

    pub async fn list_tests(&self, course_id: Option<i64>) -> Result<Vec<Test>> {
        let tests: Vec<Test> = sqlx::query_as(
            r#"
            SELECT * FROM tests
            WHERE ($1::BIGINT IS NULL OR course_id = $1)
            ORDER BY id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tests)
    }

    /// When `course_id` is supplied the test must belong to it; a mismatch is
    /// reported as not-found rather than leaking the test's existence.
    pub async fn get_test(&self, test_id: i64, course_id: Option<i64>) -> Result<Test> {
        let test: Test = sqlx::query_as(r#"SELECT * FROM tests WHERE id = $1"#)
            .bind(test_id)
            .fetch_one(&self.pool)
            .await?;
        if let Some(course_id) = course_id {
            if test.course_id != course_id {
                return Err(Error::NotFound(
                    "Test does not belong to the requested course".to_string(),
                ));
            }
        }
        Ok(test)
    }

    pub async fn update_test(
        &self,
        test_id: i64,
        payload: UpdateTestPayload,
        progress: &ProgressService,
    ) -> Result<Test> {
        let test: Test = sqlx::query_as(
            r#"
            UPDATE tests
            SET title = COALESCE($1, title),
                passing_score = COALESCE($2, passing_score),
                time_limit = COALESCE($3, time_limit)
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(payload.title)
        .bind(payload.passing_score)
        .bind(payload.time_limit)
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;

        progress.cascade_recompute(test.course_id).await?;
        Ok(test)
    }

    pub async fn delete_test(&self, test_id: i64, progress: &ProgressService) -> Result<()> {
        let test = self.get_test(test_id, None).await?;
        sqlx::query(r#"DELETE FROM tests WHERE id = $1"#)
            .bind(test_id)
            .execute(&self.pool)
            .await?;

        progress.cascade_recompute(test.course_id).await?;
        Ok(())
    }

    // --- questions ---

    pub async fn create_question(
        &self,
        payload: CreateQuestionPayload,
        progress: &ProgressService,
    ) -> Result<Question> {
        let test = self.get_test(payload.test_id, None).await?;

        let question: Question = sqlx::query_as(
            r#"
            INSERT INTO questions (test_id, text, question_type, points)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(payload.test_id)
        .bind(payload.text)
        .bind(payload.question_type)
        .bind(payload.points)
        .fetch_one(&self.pool)
        .await?;

        self.recompute_max_score(test.id).await?;
        progress.cascade_recompute(test.course_id).await?;
        Ok(question)
    }

    pub async fn list_questions(&self, test_id: Option<i64>) -> Result<Vec<Question>> {
        let questions: Vec<Question> = sqlx::query_as(
            r#"
            SELECT * FROM questions
            WHERE ($1::BIGINT IS NULL OR test_id = $1)
            ORDER BY id
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn get_question(&self, question_id: i64) -> Result<Question> {
        let question: Question = sqlx::query_as(r#"SELECT * FROM questions WHERE id = $1"#)
            .bind(question_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(question)
    }

    pub async fn update_question(
        &self,
        question_id: i64,
        payload: UpdateQuestionPayload,
        progress: &ProgressService,
    ) -> Result<Question> {
        let question: Question = sqlx::query_as(
            r#"
            UPDATE questions
            SET text = COALESCE($1, text),
                question_type = COALESCE($2, question_type),
                points = COALESCE($3, points)
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(payload.text)
        .bind(payload.question_type)
        .bind(payload.points)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;

        let test = self.get_test(question.test_id, None).await?;
        self.recompute_max_score(test.id).await?;
        progress.cascade_recompute(test.course_id).await?;
        Ok(question)
    }

    pub async fn delete_question(
        &self,
        question_id: i64,
        progress: &ProgressService,
    ) -> Result<()> {
        let question = self.get_question(question_id).await?;
        let test = self.get_test(question.test_id, None).await?;

        sqlx::query(r#"DELETE FROM questions WHERE id = $1"#)
            .bind(question_id)
            .execute(&self.pool)
            .await?;

        self.recompute_max_score(test.id).await?;
        progress.cascade_recompute(test.course_id).await?;
        Ok(())
    }

    /// `max_score` is always derived from the question set, never edited.
    pub async fn recompute_max_score(&self, test_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tests
            SET max_score = (SELECT COALESCE(SUM(points), 0) FROM questions WHERE test_id = $1)
            WHERE id = $1
            "#,
        )
        .bind(test_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // --- answer options ---

    pub async fn create_answer_option(
        &self,
        payload: CreateAnswerOptionPayload,
    ) -> Result<AnswerOption> {
        self.get_question(payload.question_id).await?;

        let option: AnswerOption = sqlx::query_as(
            r#"
            INSERT INTO answer_options (question_id, text, is_correct)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(payload.question_id)
        .bind(payload.text)
        .bind(payload.is_correct)
        .fetch_one(&self.pool)
        .await?;
        Ok(option)
    }

    pub async fn list_answer_options(&self, question_id: Option<i64>) -> Result<Vec<AnswerOption>> {
        let options: Vec<AnswerOption> = sqlx::query_as(
            r#"
            SELECT * FROM answer_options
            WHERE ($1::BIGINT IS NULL OR question_id = $1)
            ORDER BY id
            "#,
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }

    pub async fn update_answer_option(
        &self,
        option_id: i64,
        payload: UpdateAnswerOptionPayload,
    ) -> Result<AnswerOption> {
        let option: AnswerOption = sqlx::query_as(
            r#"
            UPDATE answer_options
            SET text = COALESCE($1, text),
                is_correct = COALESCE($2, is_correct)
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(payload.text)
        .bind(payload.is_correct)
        .bind(option_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(option)
    }

    pub async fn delete_answer_option(&self, option_id: i64) -> Result<()> {
        let deleted = sqlx::query(r#"DELETE FROM answer_options WHERE id = $1"#)
            .bind(option_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound("Answer option not found".to_string()));
        }
        Ok(())
    }
}
