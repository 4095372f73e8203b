mod engine;
mod symptoms;

pub use engine::{triage, TriageOutcome, RED_FLAG_PHRASES};
pub use symptoms::{summarize_symptoms, Complexity, SymptomSummary};
