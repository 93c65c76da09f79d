use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::auth::{DoctorAccount, Role, ADMIN_LOGIN};
use shared_models::error::AppError;
use shared_models::Stored;

#[derive(Debug, Clone, Deserialize)]
pub struct AddDoctorRequest {
    pub name: String,
    pub login: String,
    pub password: String,
}

/// Roster entry as shown to administrators; never carries the password.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DoctorSummary {
    pub login: String,
    pub name: String,
    pub role: Role,
    pub color: String,
    pub removable: bool,
}

impl From<&Stored<DoctorAccount>> for DoctorSummary {
    fn from(account: &Stored<DoctorAccount>) -> Self {
        Self {
            login: account.id.clone(),
            name: account.name.clone(),
            role: account.role,
            color: account.color.clone(),
            removable: account.id != ADMIN_LOGIN,
        }
    }
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Administrator rights required")]
    NotAdmin,

    #[error("Fill in all fields")]
    MissingFields,

    #[error("Login {0} is already taken")]
    LoginTaken(String),

    #[error("The built-in administrator cannot be removed")]
    BuiltInAdmin,

    #[error("Doctor {0} not found")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotAdmin | DoctorError::BuiltInAdmin => AppError::Permission(e.to_string()),
            DoctorError::MissingFields | DoctorError::LoginTaken(_) => AppError::Validation(e.to_string()),
            DoctorError::NotFound(_) => AppError::NotFound(e.to_string()),
            DoctorError::Store(_) => AppError::RemoteWrite(e.to_string()),
        }
    }
}
