use assert_matches::assert_matches;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::{appointment_routes, AppointmentBookingService, AppointmentDraft, AppointmentError};
use shared_database::{collections, RemoteStore};
use shared_models::Room;
use shared_utils::test_utils::{Fixtures, TestClinic, TestUser};
use sync_cell::{CalendarFilter, FilterScope};

const PHONE: &str = "+7 (900) 123-45-67";

fn draft(date_time: &str, room: Room) -> AppointmentDraft {
    AppointmentDraft {
        last_name: "Иванов".to_string(),
        first_name: "Иван".to_string(),
        middle_name: "Иванович".to_string(),
        phone: PHONE.to_string(),
        date_time: date_time.to_string(),
        room: Some(room),
        ..Default::default()
    }
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap()
}

#[tokio::test]
async fn test_booking_scenario_across_two_users() {
    let clinic = TestClinic::new().await;
    let booking = AppointmentBookingService::new(clinic.ctx.clone());

    let admin = clinic.login_as(&TestUser::admin());
    let first = booking.save(&admin, draft("2024-06-01T10:00", Room::Two)).await.unwrap();
    assert!(first.created);
    assert!(first.patient_synced);

    assert_eq!(clinic.ctx.appointments.len(), 1);
    let patients = clinic.ctx.patients.all();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0].first_visit, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
    assert_eq!(patients[0].first_visit, patients[0].last_visit);

    let doctor = clinic.login_as(&TestUser::doctor(2));
    let clash = booking.save(&doctor, draft("2024-06-01T10:15", Room::Two)).await;
    assert_matches!(clash, Err(AppointmentError::Conflict { room: Room::Two, .. }));
    assert_eq!(clinic.ctx.appointments.len(), 1);

    let adjacent = booking.save(&doctor, draft("2024-06-01T10:30", Room::Two)).await.unwrap();
    assert_eq!(adjacent.appointment.created_by, "doctor2");
    assert_eq!(clinic.ctx.appointments.len(), 2);

    let patients = clinic.ctx.patients.all();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0].first_visit, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
    assert_eq!(patients[0].last_visit, Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap());
}

#[tokio::test]
async fn test_same_time_in_another_room_is_accepted() {
    let clinic = TestClinic::new().await;
    let booking = AppointmentBookingService::new(clinic.ctx.clone());
    let admin = clinic.login_as(&TestUser::admin());

    booking.save(&admin, draft("2024-06-01T09:00", Room::One)).await.unwrap();
    booking.save(&admin, draft("2024-06-01T09:00", Room::Three)).await.unwrap();

    assert_eq!(clinic.ctx.appointments.len(), 2);
}

#[tokio::test]
async fn test_missing_fields_are_rejected_before_any_write() {
    let clinic = TestClinic::new().await;
    let admin = clinic.login_as(&TestUser::admin());
    let mut incomplete = draft("2024-06-01T09:00", Room::One);
    incomplete.first_name = "  ".to_string();

    let result = AppointmentBookingService::new(clinic.ctx.clone()).save(&admin, incomplete).await;

    assert_matches!(result, Err(AppointmentError::Validation(_)));
    assert!(clinic.store.is_empty(collections::APPOINTMENTS));
    assert!(clinic.store.is_empty(collections::PATIENTS));
}

#[tokio::test]
async fn test_moving_an_appointment_ignores_its_own_slot() {
    let clinic = TestClinic::new().await;
    let booking = AppointmentBookingService::new(clinic.ctx.clone());
    let doctor = clinic.login_as(&TestUser::doctor(1));

    let saved = booking.save(&doctor, draft("2024-06-01T09:00", Room::One)).await.unwrap();
    let mut moved = draft("2024-06-01T09:15", Room::One);
    moved.id = Some(saved.appointment.id.clone());
    moved.comment = "  перенос ".to_string();

    let outcome = booking.save(&doctor, moved).await.unwrap();

    assert!(!outcome.created);
    let stored = clinic.ctx.appointments.get(&saved.appointment.id).unwrap();
    assert_eq!(stored.date_time, Utc.with_ymd_and_hms(2024, 6, 1, 9, 15, 0).unwrap());
    assert_eq!(stored.comment, "перенос");
    assert_eq!(clinic.ctx.appointments.len(), 1);
}

#[tokio::test]
async fn test_admin_edit_keeps_original_author() {
    let clinic = TestClinic::new().await;
    let booking = AppointmentBookingService::new(clinic.ctx.clone());

    let doctor = clinic.login_as(&TestUser::doctor(3));
    let saved = booking.save(&doctor, draft("2024-06-01T12:00", Room::Two)).await.unwrap();
    let created_at = clinic.ctx.appointments.get(&saved.appointment.id).unwrap().created_at;
    assert!(created_at.is_some());

    let admin = clinic.login_as(&TestUser::admin());
    let mut edit = draft("2024-06-01T12:00", Room::Two);
    edit.id = Some(saved.appointment.id.clone());
    booking.save(&admin, edit).await.unwrap();

    let stored = clinic.ctx.appointments.get(&saved.appointment.id).unwrap();
    assert_eq!(stored.created_by, "doctor3");
    assert_eq!(stored.doctor_name, "Врач 3");
    assert_eq!(stored.created_at, created_at);
}

#[tokio::test]
async fn test_non_creator_cannot_open_edit_or_delete() {
    let clinic = TestClinic::new().await;
    let id = clinic
        .store
        .create(collections::APPOINTMENTS, Fixtures::appointment(PHONE, "2024-06-01T10:00:00Z", "1", "doctor1"))
        .await
        .unwrap();
    let booking = AppointmentBookingService::new(clinic.ctx.clone());
    let other = clinic.login_as(&TestUser::doctor(2));

    assert_matches!(booking.open_for_edit(&other, &id), Err(AppointmentError::PermissionDenied));

    let mut edit = draft("2024-06-01T11:00", Room::One);
    edit.id = Some(id.clone());
    assert_matches!(booking.save(&other, edit).await, Err(AppointmentError::PermissionDenied));
    assert_matches!(booking.delete(&other, &id).await, Err(AppointmentError::PermissionDenied));

    let stored = clinic.ctx.appointments.get(&id).unwrap();
    assert_eq!(stored.date_time, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
    assert!(clinic.store.is_empty(collections::PATIENTS));

    let owner = clinic.login_as(&TestUser::doctor(1));
    assert_eq!(booking.open_for_edit(&owner, &id).unwrap().id, id);
    booking.delete(&owner, &id).await.unwrap();
    assert!(clinic.ctx.appointments.is_empty());
}

#[tokio::test]
async fn test_failed_appointment_write_skips_patient_upsert() {
    let clinic = TestClinic::new().await;
    let admin = clinic.login_as(&TestUser::admin());
    clinic.store.fail_writes_to(collections::APPOINTMENTS, true);

    let result = AppointmentBookingService::new(clinic.ctx.clone())
        .save(&admin, draft("2024-06-01T10:00", Room::One))
        .await;

    assert_matches!(result, Err(AppointmentError::Store(_)));
    assert!(clinic.store.is_empty(collections::PATIENTS));
}

#[tokio::test]
async fn test_failed_patient_write_keeps_appointment() {
    let clinic = TestClinic::new().await;
    let admin = clinic.login_as(&TestUser::admin());
    clinic.store.fail_writes_to(collections::PATIENTS, true);

    let outcome = AppointmentBookingService::new(clinic.ctx.clone())
        .save(&admin, draft("2024-06-01T10:00", Room::One))
        .await
        .unwrap();

    assert!(!outcome.patient_synced);
    assert_eq!(clinic.ctx.appointments.len(), 1);
    assert!(clinic.ctx.patients.is_empty());
}

#[tokio::test]
async fn test_concurrent_saves_for_one_slot_admit_only_one() {
    let clinic = TestClinic::new().await;
    let admin = clinic.login_as(&TestUser::admin());

    let first = AppointmentBookingService::new(clinic.ctx.clone());
    let second = AppointmentBookingService::new(clinic.ctx.clone());
    let (a, b) = tokio::join!(
        first.save(&admin, draft("2024-06-01T14:00", Room::Three)),
        second.save(&admin, draft("2024-06-01T14:10", Room::Three)),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(clinic.ctx.appointments.len(), 1);
}

#[tokio::test]
async fn test_calendar_route_applies_session_filter() {
    let clinic = TestClinic::new().await;
    for (date_time, room, creator) in [
        ("2024-06-01T09:00:00Z", "1", "doctor1"),
        ("2024-06-01T09:00:00Z", "2", "doctor2"),
        ("2024-06-03T09:00:00Z", "1", "doctor1"),
    ] {
        clinic
            .store
            .create(collections::APPOINTMENTS, Fixtures::appointment(PHONE, date_time, room, creator))
            .await
            .unwrap();
    }
    let router = appointment_routes(clinic.ctx.clone());

    clinic.login_as(&TestUser::doctor(1));
    clinic.ctx.session.set_filter(CalendarFilter { scope: FilterScope::Mine, room: None });
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/calendar?from=2024-06-01T00:00&to=2024-06-02T00:00")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["events"][0]["backgroundColor"], "#2563eb");
    assert_eq!(body["events"][0]["end"], "2024-06-01T09:30:00Z");
    assert_eq!(body["events"][0]["extendedProps"]["createdBy"], "doctor1");

    clinic.login_as(&TestUser::admin());
    let response = router
        .oneshot(Request::builder().uri("/calendar").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await["total"], 3);
}

#[tokio::test]
async fn test_save_routes_report_conflict_and_permission() {
    let clinic = TestClinic::new().await;
    let router = appointment_routes(clinic.ctx.clone());
    let form = json!({
        "lastName": "Иванов",
        "firstName": "Иван",
        "phone": PHONE,
        "dateTime": "2024-06-01T10:00",
        "room": "2"
    });

    let response = router.clone().oneshot(json_request(Method::POST, "/", form.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    clinic.login_as(&TestUser::doctor(1));
    let response = router.clone().oneshot(json_request(Method::POST, "/", form.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["patientSynced"], true);
    let id = body["appointment"]["id"].as_str().unwrap().to_string();

    let response = router.clone().oneshot(json_request(Method::POST, "/", form.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["kind"], "conflict");

    clinic.login_as(&TestUser::doctor(4));
    let response = router
        .clone()
        .oneshot(json_request(Method::PUT, &format!("/{}", id), form))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(Request::builder().method(Method::DELETE).uri("/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attachment_upload_and_settings_routes() {
    let clinic = TestClinic::new().await;
    let router = appointment_routes(clinic.ctx.clone());

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/calendar/settings").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await["slotMinTime"], "08:00");

    clinic.login_as(&TestUser::doctor(1));
    let response = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/attachments?name=scan.png")
                .header(header::CONTENT_TYPE, "image/png")
                .body(Body::from(vec![1u8, 2, 3]))
                .unwrap(),
        )
        .await
        .unwrap();
    let file = body_json(response).await;
    assert_eq!(file["type"], "image/png");
    assert_eq!(file["data"], "data:image/png;base64,AQID");
}
