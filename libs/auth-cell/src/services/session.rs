use std::sync::Arc;

use tracing::{debug, info, warn};

use shared_database::collections;
use shared_models::auth::{default_roster, DoctorAccount, SessionUser};
use sync_cell::{CalendarFilter, ClinicContext};

use crate::models::AuthError;

/// Local storage key holding the logged-in user.
pub const SESSION_KEY: &str = "clinic.currentUser";

pub struct SessionService {
    ctx: Arc<ClinicContext>,
}

impl SessionService {
    pub fn new(ctx: Arc<ClinicContext>) -> Self {
        Self { ctx }
    }

    /// Checks the credentials against the doctors collection and opens a session.
    /// Passwords are compared as stored; this is a shared-desk login, not a security boundary.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionUser, AuthError> {
        debug!("Login attempt for {}", username);

        let snapshot = self
            .ctx
            .store
            .read_once(collections::DOCTORS)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let account = if snapshot.is_empty() {
            default_roster()
                .into_iter()
                .find(|(login, _)| login == username)
                .map(|(_, account)| account)
        } else {
            snapshot
                .into_iter()
                .find(|(login, _)| login == username)
                .and_then(|(login, value)| match serde_json::from_value::<DoctorAccount>(value) {
                    Ok(account) => Some(account),
                    Err(e) => {
                        warn!("Account {} is malformed: {}", login, e);
                        None
                    }
                })
        };

        let account = match account {
            Some(account) if account.password == password => account,
            _ => {
                warn!("Rejected login for {}", username);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let user = SessionUser::from_account(username, &account);
        self.persist(&user)?;
        self.ctx.session.set_user(Some(user.clone()));

        info!("{} logged in", user.username);
        Ok(user)
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.ctx
            .local
            .remove(SESSION_KEY)
            .map_err(|e| AuthError::SessionStore(e.to_string()))?;

        if let Some(user) = self.ctx.current_user() {
            info!("{} logged out", user.username);
        }
        self.ctx.session.set_user(None);
        self.ctx.session.set_filter(CalendarFilter::default());
        Ok(())
    }

    /// Reopens the session saved by a previous run, if any.
    pub fn restore(&self) -> Option<SessionUser> {
        let saved = match self.ctx.local.get(SESSION_KEY) {
            Ok(saved) => saved?,
            Err(e) => {
                warn!("Could not read saved session: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<SessionUser>(&saved) {
            Ok(user) => {
                info!("Restored session for {}", user.username);
                self.ctx.session.set_user(Some(user.clone()));
                Some(user)
            }
            Err(e) => {
                warn!("Discarding unreadable saved session: {}", e);
                if let Err(e) = self.ctx.local.remove(SESSION_KEY) {
                    warn!("Could not clear saved session: {}", e);
                }
                None
            }
        }
    }

    pub fn current(&self) -> Option<SessionUser> {
        self.ctx.current_user()
    }

    fn persist(&self, user: &SessionUser) -> Result<(), AuthError> {
        let encoded = serde_json::to_string(user).map_err(|e| AuthError::SessionStore(e.to_string()))?;
        self.ctx
            .local
            .set(SESSION_KEY, &encoded)
            .map_err(|e| AuthError::SessionStore(e.to_string()))
    }
}
