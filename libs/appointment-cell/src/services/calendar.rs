use chrono::{DateTime, Utc};

use shared_models::auth::SessionUser;
use shared_models::time::SLOT_MINUTES;
use shared_models::{Appointment, Room, Stored};
use sync_cell::{CalendarFilter, FilterScope};

use crate::models::{CalendarEvent, CalendarSettings, RoomLegend};

pub fn room_color(room: Room) -> &'static str {
    match room {
        Room::One => "#2563eb",
        Room::Two => "#10b981",
        Room::Three => "#f59e0b",
    }
}

/// Optional `[from, to)` range; events are kept if any part of their slot falls inside.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalendarWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl CalendarWindow {
    fn contains(&self, appointment: &Appointment) -> bool {
        self.from.map_or(true, |from| appointment.end() > from)
            && self.to.map_or(true, |to| appointment.start() < to)
    }
}

/// Events visible to `user` under `filter`. Admins always see every creator.
pub fn project(
    appointments: &[Stored<Appointment>],
    user: &SessionUser,
    filter: CalendarFilter,
    window: CalendarWindow,
) -> Vec<CalendarEvent> {
    let only_own = filter.scope == FilterScope::Mine && !user.is_admin();

    appointments
        .iter()
        .filter(|appointment| !only_own || appointment.created_by == user.username)
        .filter(|appointment| filter.room.map_or(true, |room| appointment.room == room))
        .filter(|appointment| window.contains(appointment))
        .map(|appointment| {
            let color = room_color(appointment.room).to_string();
            CalendarEvent {
                id: appointment.id.clone(),
                title: appointment.title(),
                start: appointment.start(),
                end: appointment.end(),
                background_color: color.clone(),
                border_color: color,
                extended_props: appointment.clone(),
            }
        })
        .collect()
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            initial_view: "timeGridWeek",
            slot_minutes: SLOT_MINUTES,
            slot_min_time: "08:00",
            slot_max_time: "20:00",
            business_days: (0..7).collect(),
            rooms: Room::ALL
                .into_iter()
                .map(|room| RoomLegend { room, color: room_color(room) })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use shared_models::auth::Role;

    fn user(username: &str, role: Role) -> SessionUser {
        SessionUser {
            username: username.to_string(),
            name: username.to_string(),
            role,
            color: "#2563eb".to_string(),
        }
    }

    fn booked(id: &str, room: &str, hour: u32, created_by: &str) -> Stored<Appointment> {
        let appointment: Appointment = serde_json::from_value(json!({
            "lastName": "Петров",
            "firstName": "Пётр",
            "phone": "+7 (900) 000-00-00",
            "dateTime": format!("2024-06-01T{:02}:00:00Z", hour),
            "room": room,
            "createdBy": created_by
        }))
        .unwrap();
        Stored::new(id, appointment)
    }

    fn sample() -> Vec<Stored<Appointment>> {
        vec![
            booked("a", "1", 9, "doctor1"),
            booked("b", "2", 10, "doctor2"),
            booked("c", "2", 11, "doctor1"),
        ]
    }

    #[test]
    fn test_mine_keeps_only_own_appointments() {
        let filter = CalendarFilter { scope: FilterScope::Mine, room: None };
        let events = project(&sample(), &user("doctor1", Role::Doctor), filter, CalendarWindow::default());

        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_mine_is_ignored_for_admin() {
        let filter = CalendarFilter { scope: FilterScope::Mine, room: None };
        let events = project(&sample(), &user("admin", Role::Admin), filter, CalendarWindow::default());
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_room_filter_and_colors() {
        let filter = CalendarFilter { scope: FilterScope::All, room: Some(Room::Two) };
        let events = project(&sample(), &user("doctor1", Role::Doctor), filter, CalendarWindow::default());

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.background_color == "#10b981" && e.border_color == "#10b981"));
        assert_eq!(events[0].title, "Петров Пётр");
        assert_eq!(events[0].end, Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_window_keeps_overlapping_slots() {
        let window = CalendarWindow {
            from: Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 15, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap()),
        };
        let events = project(&sample(), &user("admin", Role::Admin), CalendarFilter::default(), window);

        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_default_settings() {
        let settings = CalendarSettings::default();
        assert_eq!(settings.slot_minutes, 30);
        assert_eq!(settings.business_days, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(settings.rooms[2].color, "#f59e0b");
    }
}
