use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::{contributions, projects};
use crate::repositories::{
    contributions::ContributionRepository, projects::ProjectRepository, users::UserRepository,
};

pub enum ContributionRequest {
    RecordContribution {
        new: contributions::NewContribution,
        response: oneshot::Sender<Result<contributions::Contribution, ServiceError>>,
    },
    ListProjects {
        response: oneshot::Sender<Result<Vec<projects::Project>, ServiceError>>,
    },
    CreateProject {
        name: String,
        response: oneshot::Sender<Result<projects::Project, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct ContributionRequestHandler {
    contributions: ContributionRepository,
    users: UserRepository,
    projects: ProjectRepository,
}

impl ContributionRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        ContributionRequestHandler {
            contributions: ContributionRepository::new(sql_conn.clone()),
            users: UserRepository::new(sql_conn.clone()),
            projects: ProjectRepository::new(sql_conn),
        }
    }

    /// Record one contribution. A request without a user id is a guest
    /// contribution: a user is provisioned first, with the parent pointer
    /// resolved from the referral code the guest arrived with (if any).
    async fn record_contribution(
        &self,
        new: contributions::NewContribution,
    ) -> Result<contributions::Contribution, ServiceError> {
        if new.amount_in_cents < 0 {
            return Err(ServiceError::InvalidRequest(
                "contribution amount must be non-negative".to_string(),
            ));
        }

        let user_id = match new.user_id {
            Some(id) => id,
            None => {
                let display_name = new.display_name.as_deref().unwrap_or("Guest");
                let user = self
                    .users
                    .insert_user(display_name, new.referral_code.as_deref())
                    .await
                    .map_err(|e| ServiceError::Database(e.to_string()))?;
                user.id
            }
        };

        self.contributions
            .insert_contribution(&user_id, &new.project_id, new.amount_in_cents)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn list_projects(&self) -> Result<Vec<projects::Project>, ServiceError> {
        self.projects
            .list_projects()
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn create_project(&self, name: &str) -> Result<projects::Project, ServiceError> {
        self.projects
            .insert_project(name)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<ContributionRequest> for ContributionRequestHandler {
    async fn handle_request(&self, request: ContributionRequest) {
        match request {
            ContributionRequest::RecordContribution { new, response } => {
                let contribution = self.record_contribution(new).await;
                let _ = response.send(contribution);
            }
            ContributionRequest::ListProjects { response } => {
                let projects = self.list_projects().await;
                let _ = response.send(projects);
            }
            ContributionRequest::CreateProject { name, response } => {
                let project = self.create_project(&name).await;
                let _ = response.send(project);
            }
        }
    }
}

pub struct ContributionService;

impl ContributionService {
    pub fn new() -> Self {
        ContributionService {}
    }
}

#[async_trait]
impl Service<ContributionRequest, ContributionRequestHandler> for ContributionService {}
