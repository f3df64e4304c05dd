use axum::{
    extract::{Path, Query, State},
    response::Json,
};

use crate::dto::submission_dto::{
    SubmitTestRequest, SubmitTestResponse, TestResultEntry, UserResultsQuery,
};
use crate::models::user_answer::{SelectedAnswer, UserAnswer};
use crate::AppState;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct UserAnswersQuery {
    pub user_id: i64,
    pub question_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SelectedAnswersQuery {
    pub user_answer_id: i64,
}

#[axum::debug_handler]
pub async fn submit_test(
    State(state): State<AppState>,
    Path(test_id): Path<i64>,
    Json(payload): Json<SubmitTestRequest>,
) -> crate::error::Result<Json<SubmitTestResponse>> {
    let response = state.submission_service.submit(test_id, payload).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn user_results(
    State(state): State<AppState>,
    Query(query): Query<UserResultsQuery>,
) -> crate::error::Result<Json<Vec<TestResultEntry>>> {
    let results = state
        .attempt_service
        .user_results(query.user_id, query.course_id)
        .await?;
    Ok(Json(results))
}

pub async fn list_user_answers(
    State(state): State<AppState>,
    Query(query): Query<UserAnswersQuery>,
) -> crate::error::Result<Json<Vec<UserAnswer>>> {
    let answers = state
        .attempt_service
        .list_user_answers(query.user_id, query.question_id)
        .await?;
    Ok(Json(answers))
}

pub async fn list_selected_answers(
    State(state): State<AppState>,
    Query(query): Query<SelectedAnswersQuery>,
) -> crate::error::Result<Json<Vec<SelectedAnswer>>> {
    let selections = state
        .attempt_service
        .list_selected_answers(query.user_answer_id)
        .await?;
    Ok(Json(selections))
}
