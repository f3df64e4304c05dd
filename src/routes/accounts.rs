use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use validator::Validate;

use crate::dto::account_dto::{RegisterRequest, ResendConfirmationRequest};
use crate::AppState;

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let user = state
        .account_service
        .register(payload, &state.queue_service)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "user": user }))).into_response())
}

#[axum::debug_handler]
pub async fn confirm_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Json<serde_json::Value>> {
    state.account_service.confirm_email(&token).await?;
    Ok(Json(json!({ "info": "Email address confirmed" })))
}

#[axum::debug_handler]
pub async fn resend_confirmation(
    State(state): State<AppState>,
    Json(payload): Json<ResendConfirmationRequest>,
) -> crate::error::Result<Json<serde_json::Value>> {
    payload.validate()?;
    state
        .account_service
        .resend_confirmation(&payload.email, &state.queue_service)
        .await?;
    Ok(Json(json!({ "status": "Confirmation email resent" })))
}
