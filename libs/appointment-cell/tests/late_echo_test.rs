use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use assert_matches::assert_matches;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use appointment_cell::{AppointmentBookingService, AppointmentDraft, AppointmentError};
use shared_database::{collections, MemoryKvStore, MemoryStore, RemoteStore, Snapshot, SnapshotCallback, Subscription};
use shared_models::Room;
use shared_utils::test_utils::{TestConfig, TestUser};
use sync_cell::{ClinicContext, SyncService};

const PHONE: &str = "+7 (900) 123-45-67";

/// Acknowledges writes at once but hands every snapshot to subscribers
/// `delay` later, in order, the way the event stream does.
struct LateEchoStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl RemoteStore for LateEchoStore {
    async fn read_once(&self, collection: &str) -> Result<Snapshot> {
        self.inner.read_once(collection).await
    }

    async fn subscribe(&self, collection: &str, on_change: SnapshotCallback) -> Result<Subscription> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Snapshot>();
        let delay = self.delay;
        tokio::spawn(async move {
            while let Some(snapshot) = receiver.recv().await {
                tokio::time::sleep(delay).await;
                on_change(snapshot);
            }
        });

        self.inner
            .subscribe(collection, Arc::new(move |snapshot: Snapshot| {
                let _ = sender.send(snapshot);
            }))
            .await
    }

    async fn create(&self, collection: &str, record: Value) -> Result<String> {
        self.inner.create(collection, record).await
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<()> {
        self.inner.update(collection, id, partial).await
    }

    async fn set(&self, collection: &str, id: &str, record: Value) -> Result<()> {
        self.inner.set(collection, id, record).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.inner.delete(collection, id).await
    }
}

async fn late_desk(store: &MemoryStore, delay: Duration, timeout_secs: u64) -> (Arc<ClinicContext>, Vec<Subscription>) {
    let mut config = TestConfig::default().to_app_config();
    config.store_timeout_secs = timeout_secs;

    let ctx = Arc::new(ClinicContext::new(
        config,
        Arc::new(LateEchoStore { inner: store.clone(), delay }),
        Arc::new(MemoryKvStore::new()),
    ));
    let subscriptions = SyncService::new(ctx.clone()).start().await.unwrap();
    (ctx, subscriptions)
}

fn draft(date_time: &str) -> AppointmentDraft {
    AppointmentDraft {
        last_name: "Иванов".to_string(),
        first_name: "Иван".to_string(),
        phone: PHONE.to_string(),
        date_time: date_time.to_string(),
        room: Some(Room::Two),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_back_to_back_saves_see_previous_write() {
    let store = MemoryStore::new();
    let (ctx, _subscriptions) = late_desk(&store, Duration::from_millis(50), 5).await;
    let booking = AppointmentBookingService::new(ctx.clone());
    let admin = TestUser::admin().to_session_user();

    booking.save(&admin, draft("2024-06-01T10:00")).await.unwrap();
    let second = booking.save(&admin, draft("2024-06-01T10:15")).await;

    assert_matches!(second, Err(AppointmentError::Conflict { room: Room::Two, .. }));
    assert_eq!(store.len(collections::APPOINTMENTS), 1);
    assert_eq!(store.len(collections::PATIENTS), 1);
}

#[tokio::test]
async fn test_repeat_phone_updates_patient_despite_late_echo() {
    let store = MemoryStore::new();
    let (ctx, _subscriptions) = late_desk(&store, Duration::from_millis(50), 5).await;
    let booking = AppointmentBookingService::new(ctx.clone());
    let admin = TestUser::admin().to_session_user();

    booking.save(&admin, draft("2024-06-01T10:00")).await.unwrap();
    let adjacent = booking.save(&admin, draft("2024-06-01T10:30")).await.unwrap();

    assert!(adjacent.patient_synced);
    assert_eq!(store.len(collections::APPOINTMENTS), 2);
    assert_eq!(store.len(collections::PATIENTS), 1);
    assert_eq!(
        ctx.patients.all()[0].last_visit,
        adjacent.appointment.date_time
    );
}

#[tokio::test]
async fn test_freed_slot_can_be_rebooked_right_away() {
    let store = MemoryStore::new();
    let (ctx, _subscriptions) = late_desk(&store, Duration::from_millis(50), 5).await;
    let booking = AppointmentBookingService::new(ctx.clone());
    let admin = TestUser::admin().to_session_user();

    let first = booking.save(&admin, draft("2024-06-01T10:00")).await.unwrap();
    booking.delete(&admin, &first.appointment.id).await.unwrap();

    booking.save(&admin, draft("2024-06-01T10:00")).await.unwrap();
    assert_eq!(store.len(collections::APPOINTMENTS), 1);
}

#[tokio::test]
async fn test_missing_echo_falls_back_to_local_apply() {
    let store = MemoryStore::new();
    let (ctx, _subscriptions) = late_desk(&store, Duration::from_secs(30), 1).await;
    let booking = AppointmentBookingService::new(ctx.clone());
    let admin = TestUser::admin().to_session_user();

    let first = booking.save(&admin, draft("2024-06-01T10:00")).await.unwrap();
    assert!(ctx.appointments.get(&first.appointment.id).is_some());

    let second = booking.save(&admin, draft("2024-06-01T10:15")).await;
    assert_matches!(second, Err(AppointmentError::Conflict { .. }));
    assert_eq!(store.len(collections::APPOINTMENTS), 1);
    assert_eq!(ctx.patients.len(), 1);
}
