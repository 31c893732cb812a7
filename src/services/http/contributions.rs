use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use crate::models::contributions::NewContribution;
use crate::services::contributions::ContributionRequest;
use crate::services::ServiceError;

pub async fn record_contribution(
    State(state): State<super::AppState>,
    Json(req): Json<NewContribution>,
) -> impl IntoResponse {
    let (contribution_tx, contribution_rx) = oneshot::channel();

    let send_result = state
        .contribution_channel
        .send(ContributionRequest::RecordContribution {
            new: req,
            response: contribution_tx,
        })
        .await;
    if let Err(e) = send_result {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to process request: {}", e)})),
        );
    }

    match contribution_rx.await {
        Ok(Ok(contribution)) => (StatusCode::CREATED, Json(json!(contribution))),
        Ok(Err(ServiceError::InvalidRequest(reason))) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"description": reason})),
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

pub async fn list_projects(State(state): State<super::AppState>) -> impl IntoResponse {
    let (projects_tx, projects_rx) = oneshot::channel();

    let send_result = state
        .contribution_channel
        .send(ContributionRequest::ListProjects {
            response: projects_tx,
        })
        .await;
    if let Err(e) = send_result {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to process request: {}", e)})),
        );
    }

    match projects_rx.await {
        Ok(Ok(projects)) => (StatusCode::OK, Json(json!(projects))),
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

#[derive(Deserialize)]
pub struct CreateProjectBody {
    pub name: String,
}

pub async fn create_project(
    State(state): State<super::AppState>,
    Json(req): Json<CreateProjectBody>,
) -> impl IntoResponse {
    let (project_tx, project_rx) = oneshot::channel();

    let send_result = state
        .contribution_channel
        .send(ContributionRequest::CreateProject {
            name: req.name,
            response: project_tx,
        })
        .await;
    if let Err(e) = send_result {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to process request: {}", e)})),
        );
    }

    match project_rx.await {
        Ok(Ok(project)) => (StatusCode::CREATED, Json(json!(project))),
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
