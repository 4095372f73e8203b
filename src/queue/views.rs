//! Projections of the scheduled queue for each audience.
//!
//! The public view is the privacy boundary: it is built from a struct that
//! simply has no clinical fields, so nothing a caller does can leak
//! symptoms, vitals, or red flags through it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::store::{EncounterStatus, Pid, Priority, Registration, VitalsSnapshot};

use super::scheduler::ScheduledEncounter;

/// One row of the waiting-room display
#[derive(Debug, Clone, Serialize)]
pub struct PublicQueueItem {
    pub token: String,
    pub status: EncounterStatus,
    pub status_label: &'static str,
    pub priority: Priority,
    pub position_in_line: usize,
    pub estimated_wait_min: u32,
    pub updated_at: DateTime<Utc>,
}

/// Full snapshot pushed to subscribed viewers and served at /api/queue
#[derive(Debug, Clone, Serialize)]
pub struct QueuePayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub provider_count: u32,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<PublicQueueItem>,
}

/// One row of the staff console, clinical fields included
#[derive(Debug, Clone, Serialize)]
pub struct StaffQueueItem {
    pub pid: Pid,
    pub token: String,
    pub full_name: String,
    pub display_name: String,
    pub status: EncounterStatus,
    pub status_label: &'static str,
    pub priority: Priority,
    pub emergency: Option<String>,
    pub checked_in_at: DateTime<Utc>,
    pub position_in_line: usize,
    pub estimated_wait_min: u32,
    pub symptoms: String,
    pub duration_text: String,
    pub cluster: String,
    pub complexity: &'static str,
    pub visit_duration_min: u32,
    pub summary: String,
    pub chief_complaint: String,
    pub symptom_list: Vec<String>,
    pub suggested_resources: Vec<String>,
    pub resource_tags: Vec<String>,
    pub red_flags: Vec<String>,
    pub vitals_latest: Option<VitalsSnapshot>,
}

/// Staff console response with queue aggregates
#[derive(Debug, Clone, Serialize)]
pub struct StaffQueueResponse {
    pub provider_count: u32,
    pub avg_wait_min: u32,
    pub lane_counts: LaneCounts,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<StaffQueueItem>,
}

/// Active encounters per priority lane
#[derive(Debug, Clone, Default, Serialize)]
pub struct LaneCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Coarse lobby pressure indicator
#[derive(Debug, Clone, Serialize)]
pub struct LobbyLoad {
    pub level: &'static str,
    pub queue_size: usize,
    pub updated_at: DateTime<Utc>,
}

/// Build the public snapshot payload
pub fn public_payload(scheduled: &[ScheduledEncounter], provider_count: u32) -> QueuePayload {
    let updated_at = Utc::now();
    let items = scheduled
        .iter()
        .map(|s| PublicQueueItem {
            token: s.encounter.token.clone(),
            status: s.encounter.status,
            status_label: s.encounter.status.label(),
            priority: s.encounter.priority,
            position_in_line: s.position_in_line,
            estimated_wait_min: s.estimated_wait_min,
            updated_at,
        })
        .collect();
    QueuePayload {
        kind: "queue_update",
        provider_count,
        updated_at,
        items,
    }
}

/// Build the staff view. Encounters whose registration has been evicted
/// are skipped rather than rendered with blank clinical context.
pub fn staff_view(
    scheduled: &[ScheduledEncounter],
    registrations: &HashMap<Pid, Registration>,
    provider_count: u32,
) -> StaffQueueResponse {
    let items: Vec<StaffQueueItem> = scheduled
        .iter()
        .filter_map(|s| {
            let registration = registrations.get(&s.encounter.pid)?;
            Some(staff_item(s, registration))
        })
        .collect();

    let mut lane_counts = LaneCounts::default();
    for item in &items {
        match item.priority {
            Priority::High => lane_counts.high += 1,
            Priority::Medium => lane_counts.medium += 1,
            Priority::Low => lane_counts.low += 1,
        }
    }

    let waiting: Vec<u32> = items
        .iter()
        .filter(|i| matches!(i.status, EncounterStatus::Waiting | EncounterStatus::Called))
        .map(|i| i.estimated_wait_min)
        .collect();
    let avg_wait_min = if waiting.is_empty() {
        0
    } else {
        waiting.iter().sum::<u32>() / waiting.len() as u32
    };

    StaffQueueResponse {
        provider_count,
        avg_wait_min,
        lane_counts,
        updated_at: Utc::now(),
        items,
    }
}

fn staff_item(s: &ScheduledEncounter, registration: &Registration) -> StaffQueueItem {
    let summary = &registration.summary;

    let mut resource_tags = vec!["Nurse triage".to_string()];
    if summary.cluster.contains("Respiratory") {
        resource_tags.push("mask station".to_string());
        resource_tags.push("rapid test kit".to_string());
    }
    if summary.cluster.contains("GI") {
        resource_tags.push("hydration supplies".to_string());
    }
    if !s.encounter.red_flags.is_empty() {
        resource_tags.push("priority clinician review".to_string());
    }

    StaffQueueItem {
        pid: s.encounter.pid.clone(),
        token: s.encounter.token.clone(),
        full_name: registration.full_name(),
        display_name: registration.first_name.clone(),
        status: s.encounter.status,
        status_label: s.encounter.status.label(),
        priority: s.encounter.priority,
        emergency: s.encounter.emergency.clone(),
        checked_in_at: s.encounter.arrival_time,
        position_in_line: s.position_in_line,
        estimated_wait_min: s.estimated_wait_min,
        symptoms: registration.symptom_text.clone(),
        duration_text: registration.duration_text.clone(),
        cluster: summary.cluster.clone(),
        complexity: summary.complexity.as_str(),
        visit_duration_min: summary.estimated_visit_min,
        summary: summary.summary_text.clone(),
        chief_complaint: summary.chief_complaint.clone(),
        symptom_list: summary.symptom_list.clone(),
        suggested_resources: summary.suggested_resources.clone(),
        resource_tags,
        red_flags: s.encounter.red_flags.clone(),
        vitals_latest: s.encounter.vitals_latest.clone(),
    }
}

/// Grade lobby pressure from public queue length
pub fn lobby_load(queue_size: usize) -> LobbyLoad {
    let level = if queue_size >= 8 {
        "High"
    } else if queue_size >= 4 {
        "Medium"
    } else {
        "Low"
    };
    LobbyLoad {
        level,
        queue_size,
        updated_at: Utc::now(),
    }
}
