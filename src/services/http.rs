use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use super::contributions::ContributionRequest;
use super::reports::ReportServiceRequest;
use super::users::UserRequest;

mod contributions;
mod reports;
mod users;

#[derive(Clone)]
struct AppState {
    user_channel: mpsc::Sender<UserRequest>,
    contribution_channel: mpsc::Sender<ContributionRequest>,
    report_channel: mpsc::Sender<ReportServiceRequest>,
}

pub async fn start_http_server(
    bind_addr: &str,
    user_channel: mpsc::Sender<UserRequest>,
    contribution_channel: mpsc::Sender<ContributionRequest>,
    report_channel: mpsc::Sender<ReportServiceRequest>,
) -> Result<(), anyhow::Error> {
    let app_state = AppState {
        user_channel,
        contribution_channel,
        report_channel,
    };

    let app = Router::new()
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/referral-code", get(users::get_referral_code))
        .route("/users/{id}/report", get(reports::get_report))
        .route("/contributions", post(contributions::record_contribution))
        .route(
            "/projects",
            get(contributions::list_projects).post(contributions::create_project),
        )
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
