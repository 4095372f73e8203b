//! Priority classification from vitals and symptom text.
//!
//! Pure and deterministic: no clock, no I/O, no external calls. Sits in the
//! hot path of every vitals submission, so it must stay that way. Output is
//! an operational priority label, never a diagnosis.

use crate::store::{Priority, VitalsReading};

/// Phrases that flag a possible emergency when present in symptom text.
/// Matched case-insensitively as substrings.
pub const RED_FLAG_PHRASES: &[&str] = &[
    "chest pain",
    "difficulty breathing",
    "can't breathe",
    "trouble breathing",
    "having trouble breathing",
    "shortness of breath",
    "unconscious",
    "seizure",
    "bleeding heavily",
    "stroke",
    "heart attack",
    "anaphylaxis",
    "overdose",
];

/// Result of a triage pass
#[derive(Debug, Clone, PartialEq)]
pub struct TriageOutcome {
    pub priority: Priority,
    /// Machine-readable emergency kind, e.g. `low_oxygen`
    pub emergency: Option<String>,
    /// Red-flag phrases matched in the symptom text
    pub red_flags: Vec<String>,
    /// Short operator-facing status line
    pub message: String,
    /// Script read to the patient at the kiosk
    pub script: String,
}

/// Classify priority from the latest vitals and intake symptoms.
///
/// Missing vitals are "unknown, not escalating": absence of sensor data
/// never raises the lane on its own. Each critical vitals bound and each
/// matched red-flag phrase independently escalates to the highest lane.
pub fn triage(vitals: Option<&VitalsReading>, symptom_text: &str) -> TriageOutcome {
    let red_flags = scan_red_flags(symptom_text);

    let mut priority = Priority::Low;
    let mut emergency: Option<String> = None;

    if let Some(first) = red_flags.first() {
        priority = Priority::High;
        emergency = Some(emergency_kind(first));
    }

    if let Some(v) = vitals {
        if let Some(kind) = critical_vitals(v) {
            priority = Priority::High;
            emergency.get_or_insert_with(|| kind.to_string());
        } else if priority < Priority::Medium && elevated_vitals(v) {
            priority = Priority::Medium;
        }
    }

    let (message, script) = scripts(priority, emergency.as_deref());

    TriageOutcome {
        priority,
        emergency,
        red_flags,
        message,
        script,
    }
}

/// Find every red-flag phrase present in the symptom text
pub fn scan_red_flags(symptom_text: &str) -> Vec<String> {
    let text = symptom_text.to_lowercase();
    RED_FLAG_PHRASES
        .iter()
        .filter(|phrase| text.contains(*phrase))
        .map(|phrase| phrase.to_string())
        .collect()
}

/// Any single bound outside these limits is an emergency on its own
fn critical_vitals(v: &VitalsReading) -> Option<&'static str> {
    if v.spo2.is_some_and(|x| x < 92.0) {
        return Some("low_oxygen");
    }
    if v.hr.is_some_and(|x| x > 130.0 || x < 45.0) {
        return Some("critical_heart_rate");
    }
    if v.bp_sys.is_some_and(|x| x > 180.0 || x < 85.0) {
        return Some("critical_bp");
    }
    if v.temp_c.is_some_and(|x| x > 39.5 || x < 35.0) {
        return Some("critical_temp");
    }
    None
}

/// Moderate-concern bands: worth a closer look, not an emergency
fn elevated_vitals(v: &VitalsReading) -> bool {
    v.spo2.is_some_and(|x| x < 95.0)
        || v.hr.is_some_and(|x| x > 110.0 || x < 50.0)
        || v.bp_sys.is_some_and(|x| x > 160.0 || x < 95.0)
}

fn emergency_kind(phrase: &str) -> String {
    phrase.replace(' ', "_").replace('\'', "")
}

fn emergency_label(kind: &str) -> &'static str {
    match kind {
        "low_oxygen" => "low oxygen emergency",
        "critical_heart_rate" => "critical heart rhythm",
        "critical_bp" => "critical blood pressure",
        "critical_temp" => "critical temperature",
        "heart_attack" => "heart attack",
        "chest_pain" => "potential cardiac emergency",
        "stroke" => "stroke",
        _ => "medical emergency",
    }
}

fn scripts(priority: Priority, emergency: Option<&str>) -> (String, String) {
    match priority {
        Priority::High => {
            let label = emergency.map(emergency_label).unwrap_or("medical emergency");
            let line = format!(
                "You are having the conditions of a {label} and need to be rushed \
                 immediately. A doctor is being notified."
            );
            (line.clone(), line)
        }
        Priority::Medium | Priority::Low => {
            let level = if priority == Priority::Medium {
                "Medium"
            } else {
                "Low"
            };
            let line = format!(
                "Your priority is {level}. Please proceed to the waiting room and \
                 have a seat. You will be called when it is your turn."
            );
            (line.clone(), line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(spo2: Option<f64>, hr: Option<f64>) -> VitalsReading {
        VitalsReading {
            spo2,
            hr,
            ..Default::default()
        }
    }

    #[test]
    fn test_out_of_band_heart_rate_escalates_regardless_of_symptoms() {
        let v = vitals(Some(100.0), Some(999.0));
        let out = triage(Some(&v), "mild cough");
        assert_eq!(out.priority, Priority::High);
        assert_eq!(out.emergency.as_deref(), Some("critical_heart_rate"));
    }

    #[test]
    fn test_low_spo2_is_an_emergency_on_its_own() {
        let v = vitals(Some(90.0), Some(80.0));
        let out = triage(Some(&v), "");
        assert_eq!(out.priority, Priority::High);
        assert_eq!(out.emergency.as_deref(), Some("low_oxygen"));
    }

    #[test]
    fn test_red_flag_phrase_without_vitals() {
        let out = triage(None, "I have chest pain since this morning");
        assert!(out.priority >= Priority::Medium);
        assert_eq!(out.red_flags, vec!["chest pain".to_string()]);
        assert_eq!(out.emergency.as_deref(), Some("chest_pain"));
        assert!(out.script.contains("rushed immediately"));
    }

    #[test]
    fn test_red_flag_matching_is_case_insensitive() {
        let out = triage(None, "Having Trouble Breathing all night");
        assert!(!out.red_flags.is_empty());
        assert_eq!(out.priority, Priority::High);
    }

    #[test]
    fn test_missing_vitals_do_not_escalate() {
        let out = triage(None, "sore throat");
        assert_eq!(out.priority, Priority::Low);
        assert!(out.red_flags.is_empty());
        assert!(out.emergency.is_none());
        assert!(out.script.contains("priority is Low"));
    }

    #[test]
    fn test_partial_vitals_only_use_present_fields() {
        // Only hr present and normal: nothing to escalate on
        let v = vitals(None, Some(72.0));
        let out = triage(Some(&v), "headache");
        assert_eq!(out.priority, Priority::Low);
    }

    #[test]
    fn test_moderate_band_yields_medium() {
        let v = vitals(Some(94.0), Some(80.0));
        let out = triage(Some(&v), "feeling dizzy");
        assert_eq!(out.priority, Priority::Medium);
        assert!(out.emergency.is_none());
        assert!(out.message.contains("Medium"));
    }

    #[test]
    fn test_deterministic() {
        let v = vitals(Some(93.0), Some(120.0));
        let a = triage(Some(&v), "cough and shortness of breath");
        let b = triage(Some(&v), "cough and shortness of breath");
        assert_eq!(a, b);
    }
}
