use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StoreError;
use crate::triage::SymptomSummary;

/// Patient id: 8 uppercase hex characters, unique per registration
pub type Pid = String;

/// Visit lifecycle. Forward-only; every other transition is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStatus {
    Waiting,
    Called,
    InRoom,
    Done,
}

impl EncounterStatus {
    /// The only status this one may advance to, if any
    pub fn next(self) -> Option<EncounterStatus> {
        match self {
            EncounterStatus::Waiting => Some(EncounterStatus::Called),
            EncounterStatus::Called => Some(EncounterStatus::InRoom),
            EncounterStatus::InRoom => Some(EncounterStatus::Done),
            EncounterStatus::Done => None,
        }
    }

    /// Whether `to` is the single legal forward step from here
    pub fn can_advance_to(self, to: EncounterStatus) -> bool {
        self.next() == Some(to)
    }

    /// Human label shown on displays
    pub fn label(self) -> &'static str {
        match self {
            EncounterStatus::Waiting => "Waiting",
            EncounterStatus::Called => "Called",
            EncounterStatus::InRoom => "In Room",
            EncounterStatus::Done => "Complete",
        }
    }
}

impl std::fmt::Display for EncounterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EncounterStatus::Waiting => "waiting",
            EncounterStatus::Called => "called",
            EncounterStatus::InRoom => "in_room",
            EncounterStatus::Done => "done",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for EncounterStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(EncounterStatus::Waiting),
            "called" => Ok(EncounterStatus::Called),
            "in_room" => Ok(EncounterStatus::InRoom),
            "done" => Ok(EncounterStatus::Done),
            other => Err(StoreError::Validation(format!(
                "unknown status: {other}"
            ))),
        }
    }
}

/// Triage priority lane. Declaration order gives `High > Medium > Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// A vitals reading as submitted by a device or staff member.
/// All measurements optional; absent means "not captured", never zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitalsReading {
    pub spo2: Option<f64>,
    pub hr: Option<f64>,
    pub temp_c: Option<f64>,
    pub bp_sys: Option<f64>,
    pub bp_dia: Option<f64>,
}

impl VitalsReading {
    /// Reject values outside plausible instrument ranges. Out-of-range
    /// readings are sensor faults, not clinical signals.
    pub fn validate(&self) -> Result<(), StoreError> {
        check_range("spo2", self.spo2, 0.0, 100.0)?;
        check_range("hr", self.hr, 0.0, 300.0)?;
        check_range("temp_c", self.temp_c, 25.0, 45.0)?;
        check_range("bp_sys", self.bp_sys, 30.0, 300.0)?;
        check_range("bp_dia", self.bp_dia, 30.0, 300.0)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.spo2.is_none()
            && self.hr.is_none()
            && self.temp_c.is_none()
            && self.bp_sys.is_none()
            && self.bp_dia.is_none()
    }
}

fn check_range(name: &str, value: Option<f64>, min: f64, max: f64) -> Result<(), StoreError> {
    if let Some(v) = value {
        if !v.is_finite() || v < min || v > max {
            return Err(StoreError::Validation(format!(
                "{name} out of range: {v} (expected {min}..={max})"
            )));
        }
    }
    Ok(())
}

/// Most recent vitals snapshot attached to an encounter.
/// Overwritten whole on each ingestion, never merged field by field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsSnapshot {
    #[serde(flatten)]
    pub reading: VitalsReading,
    pub device_id: String,
    pub recorded_at: DateTime<Utc>,
}

/// Intake form contents, validated at the API boundary
#[derive(Debug, Clone)]
pub struct IntakeData {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub dob: String,
    pub symptom_text: String,
    pub duration_text: String,
    pub arrival_window: ArrivalWindow,
}

/// Self-reported arrival window from the intake form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrivalWindow {
    Now,
    Soon,
    Later,
}

impl ArrivalWindow {
    pub fn parse(s: &str) -> Self {
        match s {
            "soon" => ArrivalWindow::Soon,
            "later" => ArrivalWindow::Later,
            _ => ArrivalWindow::Now,
        }
    }
}

/// One intake submission, created before check-in
#[derive(Debug, Clone)]
pub struct Registration {
    pub pid: Pid,
    pub token: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub dob: String,
    pub symptom_text: String,
    pub duration_text: String,
    pub arrival_window: ArrivalWindow,
    pub summary: SymptomSummary,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim().to_string();
        if name.is_empty() {
            "Unknown Patient".to_string()
        } else {
            name
        }
    }
}

/// One checked-in visit, created by check-in, retired on `done`
#[derive(Debug, Clone)]
pub struct Encounter {
    pub id: Uuid,
    pub pid: Pid,
    pub token: String,
    pub status: EncounterStatus,
    pub priority: Priority,
    /// Matched emergency kind (e.g. `low_oxygen`) for staff display
    pub emergency: Option<String>,
    pub arrival_time: DateTime<Utc>,
    pub vitals_latest: Option<VitalsSnapshot>,
    pub red_flags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Normalize a scanned or typed code: uppercase, and take the first
/// segment of composite `PID|TOKEN|...` payloads.
pub fn candidate_codes(raw: &str) -> Vec<String> {
    let raw = raw.trim().to_uppercase();
    if raw.is_empty() {
        return Vec::new();
    }
    if raw.contains('|') {
        let mut parts: Vec<String> = raw
            .split('|')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        parts.push(raw);
        parts
    } else {
        vec![raw]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_forward_only() {
        assert!(EncounterStatus::Waiting.can_advance_to(EncounterStatus::Called));
        assert!(EncounterStatus::Called.can_advance_to(EncounterStatus::InRoom));
        assert!(EncounterStatus::InRoom.can_advance_to(EncounterStatus::Done));

        // No skips, no back-transitions, no self-loops
        assert!(!EncounterStatus::Waiting.can_advance_to(EncounterStatus::InRoom));
        assert!(!EncounterStatus::Waiting.can_advance_to(EncounterStatus::Done));
        assert!(!EncounterStatus::Done.can_advance_to(EncounterStatus::Waiting));
        assert!(!EncounterStatus::Called.can_advance_to(EncounterStatus::Waiting));
        assert!(!EncounterStatus::InRoom.can_advance_to(EncounterStatus::InRoom));
        assert_eq!(EncounterStatus::Done.next(), None);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_vitals_validation() {
        let ok = VitalsReading {
            spo2: Some(97.0),
            hr: Some(72.0),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad_hr = VitalsReading {
            hr: Some(999.0),
            ..Default::default()
        };
        assert!(bad_hr.validate().is_err());

        let bad_temp = VitalsReading {
            temp_c: Some(20.0),
            ..Default::default()
        };
        assert!(bad_temp.validate().is_err());

        // Absent fields never fail validation
        assert!(VitalsReading::default().validate().is_ok());
    }

    #[test]
    fn test_candidate_codes() {
        assert_eq!(candidate_codes("uc-1234"), vec!["UC-1234".to_string()]);
        assert_eq!(
            candidate_codes("ABCD1234|UC-5678"),
            vec![
                "ABCD1234".to_string(),
                "UC-5678".to_string(),
                "ABCD1234|UC-5678".to_string()
            ]
        );
        assert!(candidate_codes("   ").is_empty());
    }
}
