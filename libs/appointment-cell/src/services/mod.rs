pub mod attachments;
pub mod booking;
pub mod calendar;
pub mod conflict;
