use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::dto::catalog_dto::{
    CourseFilter, CreateAnswerOptionPayload, CreateCoursePayload, CreateQuestionPayload,
    CreateTestPayload, UpdateAnswerOptionPayload, UpdateCoursePayload, UpdateQuestionPayload,
    UpdateTestPayload,
};
use crate::models::course::Course;
use crate::models::question::{AnswerOption, Question};
use crate::models::test::Test;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CourseScopedQuery {
    pub course_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TestScopedQuery {
    pub test_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionScopedQuery {
    pub question_id: Option<i64>,
}

// --- courses ---

pub async fn create_course(
    State(state): State<AppState>,
    Json(payload): Json<CreateCoursePayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let course = state.catalog_service.create_course(payload).await?;
    Ok((StatusCode::CREATED, Json(course)).into_response())
}

pub async fn list_courses(
    State(state): State<AppState>,
    Query(filter): Query<CourseFilter>,
) -> crate::error::Result<Json<Vec<Course>>> {
    Ok(Json(state.catalog_service.list_courses(filter).await?))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> crate::error::Result<Json<Course>> {
    Ok(Json(state.catalog_service.get_course(course_id).await?))
}

pub async fn update_course(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Json(payload): Json<UpdateCoursePayload>,
) -> crate::error::Result<Json<Course>> {
    payload.validate()?;
    Ok(Json(
        state
            .catalog_service
            .update_course(course_id, payload)
            .await?,
    ))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> crate::error::Result<Json<serde_json::Value>> {
    state.catalog_service.delete_course(course_id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

// --- tests ---

pub async fn create_test(
    State(state): State<AppState>,
    Json(payload): Json<CreateTestPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let test = state
        .catalog_service
        .create_test(payload, &state.progress_service)
        .await?;
    Ok((StatusCode::CREATED, Json(test)).into_response())
}

pub async fn list_tests(
    State(state): State<AppState>,
    Query(query): Query<CourseScopedQuery>,
) -> crate::error::Result<Json<Vec<Test>>> {
    Ok(Json(
        state.catalog_service.list_tests(query.course_id).await?,
    ))
}

pub async fn get_test(
    State(state): State<AppState>,
    Path(test_id): Path<i64>,
    Query(query): Query<CourseScopedQuery>,
) -> crate::error::Result<Json<Test>> {
    Ok(Json(
        state
            .catalog_service
            .get_test(test_id, query.course_id)
            .await?,
    ))
}

pub async fn update_test(
    State(state): State<AppState>,
    Path(test_id): Path<i64>,
    Json(payload): Json<UpdateTestPayload>,
) -> crate::error::Result<Json<Test>> {
    payload.validate()?;
    Ok(Json(
        state
            .catalog_service
            .update_test(test_id, payload, &state.progress_service)
            .await?,
    ))
}

pub async fn delete_test(
    State(state): State<AppState>,
    Path(test_id): Path<i64>,
) -> crate::error::Result<Json<serde_json::Value>> {
    state
        .catalog_service
        .delete_test(test_id, &state.progress_service)
        .await?;
    Ok(Json(json!({ "status": "deleted" })))
}

// --- questions ---

pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let question = state
        .catalog_service
        .create_question(payload, &state.progress_service)
        .await?;
    Ok((StatusCode::CREATED, Json(question)).into_response())
}

pub async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<TestScopedQuery>,
) -> crate::error::Result<Json<Vec<Question>>> {
    Ok(Json(
        state.catalog_service.list_questions(query.test_id).await?,
    ))
}

pub async fn get_question(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> crate::error::Result<Json<Question>> {
    Ok(Json(state.catalog_service.get_question(question_id).await?))
}

pub async fn update_question(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> crate::error::Result<Json<Question>> {
    payload.validate()?;
    Ok(Json(
        state
            .catalog_service
            .update_question(question_id, payload, &state.progress_service)
            .await?,
    ))
}

pub async fn delete_question(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> crate::error::Result<Json<serde_json::Value>> {
    state
        .catalog_service
        .delete_question(question_id, &state.progress_service)
        .await?;
    Ok(Json(json!({ "status": "deleted" })))
}

// --- answer options ---

pub async fn create_answer_option(
    State(state): State<AppState>,
    Json(payload): Json<CreateAnswerOptionPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let option = state.catalog_service.create_answer_option(payload).await?;
    Ok((StatusCode::CREATED, Json(option)).into_response())
}

pub async fn list_answer_options(
    State(state): State<AppState>,
    Query(query): Query<QuestionScopedQuery>,
) -> crate::error::Result<Json<Vec<AnswerOption>>> {
    Ok(Json(
        state
            .catalog_service
            .list_answer_options(query.question_id)
            .await?,
    ))
}

pub async fn update_answer_option(
    State(state): State<AppState>,
    Path(option_id): Path<i64>,
    Json(payload): Json<UpdateAnswerOptionPayload>,
) -> crate::error::Result<Json<AnswerOption>> {
    payload.validate()?;
    Ok(Json(
        state
            .catalog_service
            .update_answer_option(option_id, payload)
            .await?,
    ))
}

pub async fn delete_answer_option(
    State(state): State<AppState>,
    Path(option_id): Path<i64>,
) -> crate::error::Result<Json<serde_json::Value>> {
    state.catalog_service.delete_answer_option(option_id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}
