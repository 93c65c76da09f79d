pub mod directory;
pub mod upsert;

pub use directory::PatientDirectoryService;
pub use upsert::PatientUpsertService;
