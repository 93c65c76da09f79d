use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
}

/// A row of the `doctors` collection, keyed by login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorAccount {
    pub password: String,
    pub role: Role,
    pub name: String,
    pub color: String,
}

/// The identity persisted for the logged-in desk user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub username: String,
    pub name: String,
    pub role: Role,
    pub color: String,
}

impl SessionUser {
    pub fn from_account(username: &str, account: &DoctorAccount) -> Self {
        Self {
            username: username.to_string(),
            name: account.name.clone(),
            role: account.role,
            color: account.color.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub const ADMIN_LOGIN: &str = "admin";

/// Roster written to an empty `doctors` collection on first run.
pub fn default_roster() -> Vec<(String, DoctorAccount)> {
    let entry = |login: &str, role: Role, name: &str, color: &str| {
        (
            login.to_string(),
            DoctorAccount {
                password: login.to_string(),
                role,
                name: name.to_string(),
                color: color.to_string(),
            },
        )
    };

    vec![
        entry(ADMIN_LOGIN, Role::Admin, "Администратор", "#1e3a8a"),
        entry("doctor1", Role::Doctor, "Врач 1", "#2563eb"),
        entry("doctor2", Role::Doctor, "Врач 2", "#10b981"),
        entry("doctor3", Role::Doctor, "Врач 3", "#f59e0b"),
        entry("doctor4", Role::Doctor, "Врач 4", "#8b5cf6"),
        entry("doctor5", Role::Doctor, "Врач 5", "#ec4899"),
    ]
}
