//! Deterministic intake symptom summarizer.
//!
//! Produces the operational summary attached to a registration: chief
//! complaint, keyword cluster, complexity grade, and a templated operator
//! summary line. Keyword matching only; no model calls.

use serde::{Deserialize, Serialize};

use super::engine::scan_red_flags;

const CLUSTER_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Respiratory",
        &[
            "cough",
            "sore throat",
            "congestion",
            "runny nose",
            "sinus",
            "wheezing",
            "chest",
        ],
    ),
    (
        "GI",
        &[
            "nausea",
            "vomit",
            "diarrhea",
            "stomach",
            "abdominal",
            "cramp",
            "constipation",
        ],
    ),
    (
        "Musculoskeletal",
        &[
            "pain", "joint", "muscle", "sprain", "strain", "back", "neck", "ankle", "knee",
        ],
    ),
    (
        "Dermatology",
        &["rash", "itch", "skin", "hives", "burn", "wound", "bite"],
    ),
];

/// Operational complexity grade for a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    Low,
    Moderate,
    High,
}

impl Complexity {
    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Low => "Low",
            Complexity::Moderate => "Moderate",
            Complexity::High => "High",
        }
    }
}

/// Structured summary of an intake symptom description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomSummary {
    pub chief_complaint: String,
    pub symptom_list: Vec<String>,
    pub cluster: String,
    pub red_flags: Vec<String>,
    pub complexity: Complexity,
    pub estimated_visit_min: u32,
    pub duration_days: u32,
    pub suggested_resources: Vec<String>,
    pub summary_text: String,
}

/// Summarize free-text symptoms and a duration description
pub fn summarize_symptoms(symptom_text: &str, duration_text: &str) -> SymptomSummary {
    let text = symptom_text.trim().to_lowercase();

    let mut symptom_list: Vec<String> = symptom_text
        .split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(6)
        .map(capitalize)
        .collect();
    if symptom_list.is_empty() && !text.is_empty() {
        symptom_list.push(capitalize(&text.chars().take(60).collect::<String>()));
    }

    let cluster = cluster_for(&text);
    let red_flags = scan_red_flags(symptom_text);
    let duration_days = extract_duration_days(duration_text);
    let word_count = text
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| w.len() >= 3)
        .count();

    let (complexity, estimated_visit_min) = if !red_flags.is_empty() || word_count > 35 || duration_days > 10
    {
        (Complexity::High, 35)
    } else if word_count > 20 || duration_days > 4 {
        (Complexity::Moderate, 25)
    } else {
        (Complexity::Low, 15)
    };

    let chief_complaint = symptom_list
        .first()
        .cloned()
        .unwrap_or_else(|| "General symptom concern".to_string());

    let mut suggested_resources = vec![
        "Vitals check".to_string(),
        "Nurse triage review".to_string(),
    ];
    if cluster.contains("Respiratory") {
        suggested_resources.push("Rapid respiratory panel (if indicated)".to_string());
    }
    if cluster.contains("GI") {
        suggested_resources.push("Hydration assessment".to_string());
    }

    let flags_text = if red_flags.is_empty() {
        "none detected".to_string()
    } else {
        red_flags.join(", ")
    };
    let summary_text = format!(
        "Chief complaint: {chief_complaint}. Cluster: {cluster}. Duration: {duration_days} day(s). \
         Red flags: {flags_text}. Operational complexity: {complexity}. Estimated visit duration: \
         {lo}-{hi} min. Non-diagnostic operational summary for triage workflow only.",
        complexity = complexity.as_str(),
        lo = estimated_visit_min,
        hi = estimated_visit_min + 10,
    );

    SymptomSummary {
        chief_complaint,
        symptom_list,
        cluster,
        red_flags,
        complexity,
        estimated_visit_min,
        duration_days,
        suggested_resources,
        summary_text,
    }
}

/// Rank keyword clusters by hit count; join the top two when both score
fn cluster_for(text: &str) -> String {
    let mut scores: Vec<(&str, usize)> = CLUSTER_KEYWORDS
        .iter()
        .map(|(name, words)| (*name, words.iter().filter(|w| text.contains(*w)).count()))
        .collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    match scores.as_slice() {
        [(first, n), (second, m), ..] if *n > 0 && *m > 0 => format!("{first}+{second}"),
        [(first, n), ..] if *n > 0 => first.to_string(),
        _ => "General".to_string(),
    }
}

/// Parse "3 days" / "2 weeks" / "1 month" into days; defaults to 1
fn extract_duration_days(duration_text: &str) -> u32 {
    let text = duration_text.to_lowercase();
    let n: u32 = text
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    if text.contains("week") {
        n * 7
    } else if text.contains("month") {
        n * 30
    } else {
        n
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_parsing() {
        assert_eq!(extract_duration_days("3 days"), 3);
        assert_eq!(extract_duration_days("2 weeks"), 14);
        assert_eq!(extract_duration_days("1 month"), 30);
        assert_eq!(extract_duration_days("since yesterday"), 1);
    }

    #[test]
    fn test_cluster_ranking() {
        assert_eq!(cluster_for("bad cough and congestion"), "Respiratory");
        assert_eq!(
            cluster_for("cough with stomach cramps"),
            "Respiratory+GI"
        );
        assert_eq!(cluster_for("just feeling off"), "General");
    }

    #[test]
    fn test_red_flags_force_high_complexity() {
        let s = summarize_symptoms("chest pain", "1 day");
        assert_eq!(s.complexity, Complexity::High);
        assert_eq!(s.estimated_visit_min, 35);
        assert_eq!(s.red_flags, vec!["chest pain".to_string()]);
    }

    #[test]
    fn test_long_duration_raises_complexity() {
        let s = summarize_symptoms("mild rash", "3 weeks");
        assert_eq!(s.complexity, Complexity::High);
        let s = summarize_symptoms("mild rash", "5 days");
        assert_eq!(s.complexity, Complexity::Moderate);
        let s = summarize_symptoms("mild rash", "1 day");
        assert_eq!(s.complexity, Complexity::Low);
    }

    #[test]
    fn test_symptom_list_split_and_cap() {
        let s = summarize_symptoms("cough, fever, chills, aches, nausea, rash, more, extra", "1 day");
        assert_eq!(s.symptom_list.len(), 6);
        assert_eq!(s.chief_complaint, "Cough");
    }

    #[test]
    fn test_deterministic_summary() {
        let a = summarize_symptoms("cough and fever", "2 days");
        let b = summarize_symptoms("cough and fever", "2 days");
        assert_eq!(a.summary_text, b.summary_text);
        assert!(a.summary_text.contains("Non-diagnostic"));
    }

    #[test]
    fn test_empty_symptoms() {
        let s = summarize_symptoms("", "1 day");
        assert_eq!(s.chief_complaint, "General symptom concern");
        assert_eq!(s.cluster, "General");
    }
}
