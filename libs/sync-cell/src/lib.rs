pub mod context;
pub mod handlers;
pub mod mirror;
pub mod router;
pub mod services;

pub use context::{CalendarFilter, ClinicContext, FilterScope, SessionContext};
pub use mirror::{Mirror, MirrorEvent};
pub use router::sync_routes;
pub use services::sync::{SyncService, SyncStatus};
