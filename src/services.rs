use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::settings::Settings;

mod contributions;
mod http;
mod reports;
mod users;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Referral code generation exhausted for {0}")]
    CodeExhausted(String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(pool: PgPool, settings: Settings) -> Result<(), anyhow::Error> {
    let (user_tx, mut user_rx) = mpsc::channel(512);
    let (contribution_tx, mut contribution_rx) = mpsc::channel(512);
    let (report_tx, mut report_rx) = mpsc::channel(512);

    let mut user_service = users::UserService::new();
    let mut contribution_service = contributions::ContributionService::new();
    let mut report_service = reports::ReportService::new();

    log::info!("Starting user service.");
    let user_pool_clone = pool.clone();
    tokio::spawn(async move {
        user_service
            .run(
                users::UserRequestHandler::new(user_pool_clone),
                &mut user_rx,
            )
            .await;
    });

    log::info!("Starting contribution service.");
    let contribution_pool_clone = pool.clone();
    tokio::spawn(async move {
        contribution_service
            .run(
                contributions::ContributionRequestHandler::new(contribution_pool_clone),
                &mut contribution_rx,
            )
            .await;
    });

    log::info!("Starting report service.");
    let report_pool_clone = pool.clone();
    let report_settings = settings.report.clone();
    tokio::spawn(async move {
        report_service
            .run(
                reports::ReportRequestHandler::new(report_pool_clone, report_settings),
                &mut report_rx,
            )
            .await;
    });

    log::info!("Starting HTTP server.");
    http::start_http_server(
        &settings.server.bind_addr,
        user_tx,
        contribution_tx,
        report_tx,
    )
    .await?;

    Ok(())
}
