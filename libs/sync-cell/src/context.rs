// libs/sync-cell/src/context.rs
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, MutexGuard};

use shared_config::AppConfig;
use shared_database::{collections, KeyValueStore, RemoteStore};
use shared_models::auth::{DoctorAccount, SessionUser};
use shared_models::{Appointment, Patient, Room};

use crate::mirror::{Mirror, MirrorEvent};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterScope {
    #[default]
    All,
    #[serde(alias = "my")]
    Mine,
}

/// What the calendar currently shows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarFilter {
    #[serde(default)]
    pub scope: FilterScope,
    #[serde(default)]
    pub room: Option<Room>,
}

/// Logged-in user and view filter of this desk.
#[derive(Default)]
pub struct SessionContext {
    user: RwLock<Option<SessionUser>>,
    filter: RwLock<CalendarFilter>,
}

impl SessionContext {
    pub fn current_user(&self) -> Option<SessionUser> {
        self.user.read().clone()
    }

    pub fn set_user(&self, user: Option<SessionUser>) {
        *self.user.write() = user;
    }

    pub fn filter(&self) -> CalendarFilter {
        *self.filter.read()
    }

    pub fn set_filter(&self, filter: CalendarFilter) {
        *self.filter.write() = filter;
    }
}

/// Everything an operation needs: the store, the local mirrors and the session.
pub struct ClinicContext {
    pub config: AppConfig,
    pub store: Arc<dyn RemoteStore>,
    pub local: Arc<dyn KeyValueStore>,
    pub appointments: Arc<Mirror<Appointment>>,
    pub patients: Arc<Mirror<Patient>>,
    pub doctors: Arc<Mirror<DoctorAccount>>,
    pub session: SessionContext,
    events: broadcast::Sender<MirrorEvent>,
    write_gate: Mutex<()>,
}

impl ClinicContext {
    pub fn new(config: AppConfig, store: Arc<dyn RemoteStore>, local: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(256);

        Self {
            config,
            store,
            local,
            appointments: Arc::new(Mirror::new(collections::APPOINTMENTS, events.clone())),
            patients: Arc::new(Mirror::new(collections::PATIENTS, events.clone())),
            doctors: Arc::new(Mirror::new(collections::DOCTORS, events.clone())),
            session: SessionContext::default(),
            events,
            write_gate: Mutex::new(()),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<MirrorEvent> {
        self.events.subscribe()
    }

    /// Serializes check-then-write sequences issued from this process.
    /// Writers keep the guard until their write is visible in the mirror.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.session.current_user()
    }

    /// How long a writer waits for the store to echo its write back into a mirror.
    pub fn echo_timeout(&self) -> Duration {
        Duration::from_secs(self.config.store_timeout_secs)
    }
}
