mod audit;
mod encounters;
mod types;

pub use audit::{AuditEvent, AuditLog};
pub use encounters::EncounterStore;
pub use types::{
    candidate_codes, ArrivalWindow, Encounter, EncounterStatus, IntakeData, Pid, Priority,
    Registration, VitalsReading, VitalsSnapshot,
};

/// Errors that can occur in store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Patient not found: {0}")]
    NotFound(String),

    #[error("Already checked in: {0}")]
    AlreadyCheckedIn(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: EncounterStatus,
        to: EncounterStatus,
    },

    #[error("Validation failed: {0}")]
    Validation(String),
}
