use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::{models::users, repositories::users::UserRepository};

pub enum UserRequest {
    CreateUser {
        display_name: String,
        referral_code: Option<String>,
        response: oneshot::Sender<Result<users::User, ServiceError>>,
    },
    GetUser {
        id: String,
        response: oneshot::Sender<Result<Option<users::User>, ServiceError>>,
    },
    GetReferralCode {
        id: String,
        response: oneshot::Sender<Result<String, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    repository: UserRepository,
}

impl UserRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        let repository = UserRepository::new(sql_conn);

        UserRequestHandler { repository }
    }

    async fn create_user(
        &self,
        display_name: &str,
        referral_code: Option<&str>,
    ) -> Result<users::User, ServiceError> {
        self.repository
            .insert_user(display_name, referral_code)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn get_user(&self, id: &str) -> Result<Option<users::User>, ServiceError> {
        self.repository
            .get_user_by_id(id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn get_referral_code(&self, id: &str) -> Result<String, ServiceError> {
        self.repository
            .ensure_referral_code(id)
            .await
            .map_err(|e| {
                if e.to_string() == "ReferralCodeExhausted" {
                    ServiceError::CodeExhausted(id.to_string())
                } else {
                    ServiceError::Database(e.to_string())
                }
            })
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::CreateUser {
                display_name,
                referral_code,
                response,
            } => {
                let user = self
                    .create_user(&display_name, referral_code.as_deref())
                    .await;
                let _ = response.send(user);
            }
            UserRequest::GetUser { id, response } => {
                let user = self.get_user(&id).await;
                let _ = response.send(user);
            }
            UserRequest::GetReferralCode { id, response } => {
                let code = self.get_referral_code(&id).await;
                let _ = response.send(code);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}
