pub mod auth;
pub mod error;
pub mod records;
pub mod time;

pub use records::{Appointment, AttachedFile, Patient, Room, Stored};
