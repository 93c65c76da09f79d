use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::auth::SessionUser;
use shared_models::error::AppError;
use sync_cell::CalendarFilter;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: Option<SessionUser>,
    pub filter: CalendarFilter,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("Could not read accounts: {0}")]
    Store(String),

    #[error("Could not persist session: {0}")]
    SessionStore(String),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Auth(e.to_string()),
            AuthError::Store(_) => AppError::RemoteWrite(e.to_string()),
            AuthError::SessionStore(_) => AppError::Internal(e.to_string()),
        }
    }
}
