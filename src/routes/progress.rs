use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::dto::progress_dto::{ProgressQuery, SubscribeRequest};
use crate::models::course_progress::CourseProgress;
use crate::AppState;

#[axum::debug_handler]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<SubscribeRequest>,
) -> crate::error::Result<Response> {
    let response = state
        .progress_service
        .subscribe(payload.course_id, payload.user_id, &state.queue_service)
        .await?;

    let status = if response.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)).into_response())
}

#[axum::debug_handler]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(progress_id): Path<i64>,
) -> crate::error::Result<Json<serde_json::Value>> {
    state.progress_service.unsubscribe(progress_id).await?;
    Ok(Json(json!({ "status": "unsubscribed" })))
}

#[axum::debug_handler]
pub async fn list_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> crate::error::Result<Json<Vec<CourseProgress>>> {
    let rows = state
        .progress_service
        .list_progress(query.user_id, query.course_id)
        .await?;
    Ok(Json(rows))
}
