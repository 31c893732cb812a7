use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tokio::sync::oneshot;

use crate::models::reports::{format_cents, ReportParams};
use crate::services::reports::ReportServiceRequest;

/// Filter parameters parse fail-open inside the engine, so this handler never
/// rejects a report request for a bad `period`, `member`, or `project` value.
pub async fn get_report(
    State(state): State<super::AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ReportParams>,
) -> impl IntoResponse {
    let (report_tx, report_rx) = oneshot::channel();

    let send_result = state
        .report_channel
        .send(ReportServiceRequest::BuildReport {
            root_user_id: user_id,
            params,
            response: report_tx,
        })
        .await;
    if let Err(e) = send_result {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"description": format!("Failed to process request: {}", e)})),
        );
    }

    match report_rx.await {
        Ok(Ok(report)) => {
            // display rounding happens here; everything upstream is exact cents
            let mut body = json!(report);
            body["summary"]["downline_total"] =
                json!(format_cents(report.summary.downline_total_cents));
            body["summary"]["personal_total"] =
                json!(format_cents(report.summary.personal_total_cents));
            body["summary"]["combined_total"] =
                json!(format_cents(report.summary.combined_total_cents));
            (StatusCode::OK, Json(body))
        }
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
