use std::sync::Arc;

use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::{MemoryKvStore, MemoryStore, Subscription};
use shared_models::auth::{Role, SessionUser};
use sync_cell::{ClinicContext, SyncService};

pub struct TestConfig {
    pub store_url: String,
    pub session_dir: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            session_dir: String::new(),
        }
    }
}

impl TestConfig {
    pub fn with_store_url(url: &str) -> Self {
        Self {
            store_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_url: self.store_url.clone(),
            store_auth_token: String::new(),
            store_timeout_secs: 5,
            store_reconnect_secs: 1,
            session_dir: self.session_dir.clone(),
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }
}

pub struct TestUser {
    pub username: String,
    pub name: String,
    pub role: Role,
    pub color: String,
}

impl TestUser {
    pub fn admin() -> Self {
        Self {
            username: "admin".to_string(),
            name: "Администратор".to_string(),
            role: Role::Admin,
            color: "#1e3a8a".to_string(),
        }
    }

    /// `doctor1`..`doctor5` from the default roster.
    pub fn doctor(number: u8) -> Self {
        Self {
            username: format!("doctor{}", number),
            name: format!("Врач {}", number),
            role: Role::Doctor,
            color: "#2563eb".to_string(),
        }
    }

    pub fn to_session_user(&self) -> SessionUser {
        SessionUser {
            username: self.username.clone(),
            name: self.name.clone(),
            role: self.role,
            color: self.color.clone(),
        }
    }
}

/// A desk wired to an in-memory store with the default roster seeded and
/// every mirror subscribed.
pub struct TestClinic {
    pub ctx: Arc<ClinicContext>,
    pub store: MemoryStore,
    _subscriptions: Vec<Subscription>,
}

impl TestClinic {
    pub async fn new() -> Self {
        Self::with_store(MemoryStore::new()).await
    }

    pub async fn with_store(store: MemoryStore) -> Self {
        let ctx = Arc::new(ClinicContext::new(
            TestConfig::default().to_app_config(),
            Arc::new(store.clone()),
            Arc::new(MemoryKvStore::new()),
        ));

        let sync = SyncService::new(ctx.clone());
        sync.seed_doctors().await.expect("seeding an in-memory store cannot fail");
        let subscriptions = sync.start().await.expect("subscribing to an in-memory store cannot fail");

        Self {
            ctx,
            store,
            _subscriptions: subscriptions,
        }
    }

    pub fn login_as(&self, user: &TestUser) -> SessionUser {
        let session_user = user.to_session_user();
        self.ctx.session.set_user(Some(session_user.clone()));
        session_user
    }

    pub fn logout(&self) {
        self.ctx.session.set_user(None);
    }
}

pub struct Fixtures;

impl Fixtures {
    pub fn appointment(phone: &str, date_time: &str, room: &str, created_by: &str) -> Value {
        json!({
            "lastName": "Иванов",
            "firstName": "Иван",
            "middleName": "Иванович",
            "phone": phone,
            "dateTime": date_time,
            "room": room,
            "comment": "",
            "files": [],
            "createdBy": created_by,
            "doctorName": "Врач",
            "doctorColor": "#2563eb",
            "createdAt": "2024-05-30T08:00:00.000Z"
        })
    }

    pub fn patient(last_name: &str, first_name: &str, phone: &str, first_visit: &str, last_visit: &str) -> Value {
        json!({
            "lastName": last_name,
            "firstName": first_name,
            "middleName": "",
            "phone": phone,
            "firstVisit": first_visit,
            "lastVisit": last_visit
        })
    }
}
