use chrono::{DateTime, Utc};
use tracing::warn;

use shared_models::time::slot_end;
use shared_models::{Appointment, Room, Stored};

/// Two slots starting at `a` and `b` overlap. Back-to-back slots do not.
pub fn slots_overlap(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a < slot_end(b) && slot_end(a) > b
}

/// First appointment in `room` whose slot overlaps one starting at `start`,
/// ignoring `exclude_id` (the appointment being edited).
pub fn find_conflict<'a>(
    appointments: &'a [Stored<Appointment>],
    start: DateTime<Utc>,
    room: Room,
    exclude_id: Option<&str>,
) -> Option<&'a Stored<Appointment>> {
    appointments.iter().find(|appointment| {
        Some(appointment.id.as_str()) != exclude_id
            && appointment.room == room
            && slots_overlap(start, appointment.start())
    })
}

pub fn has_overlap(
    appointments: &[Stored<Appointment>],
    start: DateTime<Utc>,
    room: Room,
    exclude_id: Option<&str>,
) -> bool {
    match find_conflict(appointments, start, room, exclude_id) {
        Some(existing) => {
            warn!(
                "Room {} at {} collides with appointment {} at {}",
                room, start, existing.id, existing.start()
            );
            true
        }
        None => false,
    }
}
