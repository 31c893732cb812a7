use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::downline::{aggregate, filter, paginate, tree};
use crate::models::reports::{Report, ReportParams};
use crate::repositories::{
    contributions::ContributionRepository, projects::ProjectRepository, users::UserRepository,
};
use crate::settings;

pub enum ReportServiceRequest {
    BuildReport {
        /// Authenticated caller; scoping starts and ends at their own subtree.
        root_user_id: String,
        params: ReportParams,
        response: oneshot::Sender<Result<Report, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct ReportRequestHandler {
    users: UserRepository,
    contributions: ContributionRepository,
    projects: ProjectRepository,
    limits: tree::TraversalLimits,
    page_size: u32,
}

impl ReportRequestHandler {
    pub fn new(sql_conn: PgPool, report_settings: settings::Report) -> Self {
        ReportRequestHandler {
            users: UserRepository::new(sql_conn.clone()),
            contributions: ContributionRepository::new(sql_conn.clone()),
            projects: ProjectRepository::new(sql_conn),
            limits: tree::TraversalLimits {
                max_depth: report_settings.max_depth,
                max_nodes: report_settings.max_nodes,
            },
            page_size: report_settings.page_size,
        }
    }

    /// The full reporting pipeline: resolve the caller's tree, apply the focus
    /// fail-safe, compile one predicate, fetch once, then hand the same
    /// predicate to every aggregate and to the pagination pass.
    async fn build_report(
        &self,
        root_user_id: &str,
        params: ReportParams,
    ) -> Result<Report, ServiceError> {
        let caller = self
            .users
            .get_user_by_id(root_user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::Database("User not found".to_string()))?;

        let caller_tree = tree::resolve(caller, &self.users, &self.limits)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        // Focus re-roots the view, but only inside the caller's own downline;
        // anything else silently falls back to the caller.
        let effective_root = caller_tree.focus_or_root(params.focus.as_deref()).to_string();
        let tree = if effective_root != caller_tree.root_id() {
            let focus_user = self
                .users
                .get_user_by_id(&effective_root)
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?
                .ok_or_else(|| ServiceError::Database("User not found".to_string()))?;
            tree::resolve(focus_user, &self.users, &self.limits)
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?
        } else {
            caller_tree
        };

        let mut spec =
            filter::FilterSpec::from_params(&params.period, &params.member, &params.project);
        // project half of the fail-open policy: an id the store cannot resolve
        // reports as "all projects", never as an empty report
        if let Some(project_id) = spec.project.clone() {
            let exists = self
                .projects
                .get_project(&project_id)
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?
                .is_some();
            spec.normalize_project(exists);
        }
        let today = Utc::now().date_naive();
        let predicate = filter::compile(&spec, &tree, today);

        let rows = self
            .contributions
            .get_for_users(&tree.all_ids(), spec.period.cutoff(today))
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        Ok(Report {
            root_user_id: effective_root,
            summary: aggregate::summary(&rows, &predicate),
            levels: aggregate::level_breakdown(&rows, &predicate),
            top_contributors: aggregate::top_contributors(&rows, &predicate),
            daily: aggregate::daily_series(&rows, &predicate, spec.period, today),
            projects: aggregate::project_distribution(&rows, &predicate),
            page: paginate::page(&rows, &predicate, params.page, self.page_size),
        })
    }
}

#[async_trait]
impl RequestHandler<ReportServiceRequest> for ReportRequestHandler {
    async fn handle_request(&self, request: ReportServiceRequest) {
        match request {
            ReportServiceRequest::BuildReport {
                root_user_id,
                params,
                response,
            } => {
                let report = self.build_report(&root_user_id, params).await;
                let _ = response.send(report);
            }
        }
    }
}

pub struct ReportService;

impl ReportService {
    pub fn new() -> Self {
        ReportService {}
    }
}

#[async_trait]
impl Service<ReportServiceRequest, ReportRequestHandler> for ReportService {}
