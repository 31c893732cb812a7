use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tokio::sync::oneshot;

use crate::models::users::NewUser;
use crate::services::users::UserRequest;
use crate::services::ServiceError;

pub async fn create_user(
    State(state): State<super::AppState>,
    Json(req): Json<NewUser>,
) -> impl IntoResponse {
    let (user_tx, user_rx) = oneshot::channel();

    let send_result = state
        .user_channel
        .send(UserRequest::CreateUser {
            display_name: req.display_name,
            referral_code: req.referral_code,
            response: user_tx,
        })
        .await;
    if let Err(e) = send_result {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to process request: {}", e)})),
        );
    }

    match user_rx.await {
        Ok(Ok(user)) => (StatusCode::CREATED, Json(json!(user))),
        Ok(Err(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": "Internal server error."})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to receive response: {}", e)})),
        ),
    }
}

pub async fn get_user(
    State(state): State<super::AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (user_tx, user_rx) = oneshot::channel();

    let send_result = state
        .user_channel
        .send(UserRequest::GetUser {
            id: user_id,
            response: user_tx,
        })
        .await;
    if let Err(e) = send_result {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to process request: {}", e)})),
        );
    }

    match user_rx.await {
        Ok(Ok(Some(user))) => (StatusCode::OK, Json(json!(user))),
        Ok(Ok(None)) => (
            StatusCode::NOT_FOUND,
            Json(json!({"description": "User not found."})),
        ),
        Ok(Err(service_error)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": service_error.to_string()})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to receive response: {}", e)})),
        ),
    }
}

pub async fn get_referral_code(
    State(state): State<super::AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (code_tx, code_rx) = oneshot::channel();

    let send_result = state
        .user_channel
        .send(UserRequest::GetReferralCode {
            id: user_id.clone(),
            response: code_tx,
        })
        .await;
    if let Err(e) = send_result {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to process request: {}", e)})),
        );
    }

    match code_rx.await {
        Ok(Ok(code)) => (
            StatusCode::OK,
            Json(json!({"user_id": user_id, "referral_code": code})),
        ),
        Ok(Err(ServiceError::CodeExhausted(_))) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"description": "Could not allocate a referral code, retry later."})),
        ),
        Ok(Err(service_error)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": service_error.to_string()})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to receive response: {}", e)})),
        ),
    }
}
