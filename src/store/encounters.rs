//! Authoritative in-memory table of registrations and active encounters.
//!
//! All mutations run under one exclusive critical section. Nothing inside
//! the lock performs I/O: triage is a pure function and everything else is
//! a plain data edit, so hold times stay bounded and predictable. Restart
//! loses this state by design; there is no durable backing store.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::triage::{summarize_symptoms, triage};

use super::types::{
    candidate_codes, Encounter, EncounterStatus, IntakeData, Pid, Priority, Registration,
    VitalsReading, VitalsSnapshot,
};
use super::StoreError;

/// How many random token candidates to try before falling back to a
/// uuid-derived suffix
const TOKEN_ATTEMPTS: usize = 500;

struct StoreInner {
    registrations: HashMap<Pid, Registration>,
    /// Uppercased token -> pid
    token_index: HashMap<String, Pid>,
    encounters: HashMap<Uuid, Encounter>,
    /// Uppercased token -> live (non-done) encounter
    active_by_token: HashMap<String, Uuid>,
    /// Every token ever handed out, live or not
    issued_tokens: HashSet<String>,
    providers: u32,
}

/// In-memory encounter store shared by all request handlers
pub struct EncounterStore {
    inner: Mutex<StoreInner>,
}

impl EncounterStore {
    pub fn new(initial_providers: u32) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                registrations: HashMap::new(),
                token_index: HashMap::new(),
                encounters: HashMap::new(),
                active_by_token: HashMap::new(),
                issued_tokens: HashSet::new(),
                providers: initial_providers,
            }),
        }
    }

    /// Register a new intake submission and issue its token
    pub fn register(&self, intake: IntakeData) -> Registration {
        let summary = summarize_symptoms(&intake.symptom_text, &intake.duration_text);
        let mut inner = self.inner.lock();

        let pid = next_pid();
        let token = next_token(&inner.issued_tokens);
        inner.issued_tokens.insert(token.clone());

        let registration = Registration {
            pid: pid.clone(),
            token: token.clone(),
            first_name: intake.first_name,
            last_name: intake.last_name,
            phone: intake.phone,
            dob: intake.dob,
            symptom_text: intake.symptom_text,
            duration_text: intake.duration_text,
            arrival_window: intake.arrival_window,
            summary,
            created_at: Utc::now(),
        };
        inner.token_index.insert(token, pid.clone());
        inner.registrations.insert(pid, registration.clone());
        registration
    }

    /// Check a patient in: create the encounter in `waiting`.
    ///
    /// Rejects with `AlreadyCheckedIn` when a live encounter already exists
    /// for the token, so a duplicate scan can never double-enqueue.
    pub fn check_in(&self, code: &str) -> Result<(Encounter, Registration), StoreError> {
        let mut inner = self.inner.lock();
        let pid = resolve_pid(&inner, code)?;
        let registration = inner
            .registrations
            .get(&pid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;

        // Any encounter still held for this token blocks a new one: live
        // encounters reject the duplicate scan, completed-but-unevicted
        // ones keep the token out of circulation until purge.
        let token_key = registration.token.to_uppercase();
        let token_taken = inner.active_by_token.contains_key(&token_key)
            || inner
                .encounters
                .values()
                .any(|e| e.token.eq_ignore_ascii_case(&registration.token));
        if token_taken {
            return Err(StoreError::AlreadyCheckedIn(registration.token.clone()));
        }

        // Seed priority from the intake summary so a red-flag registration
        // is urgent before any vitals arrive.
        let outcome = triage(None, &registration.symptom_text);

        let now = Utc::now();
        let encounter = Encounter {
            id: Uuid::new_v4(),
            pid: pid.clone(),
            token: registration.token.clone(),
            status: EncounterStatus::Waiting,
            priority: outcome.priority,
            emergency: outcome.emergency,
            arrival_time: now,
            vitals_latest: None,
            red_flags: outcome.red_flags,
            updated_at: now,
        };
        inner.active_by_token.insert(token_key, encounter.id);
        inner.encounters.insert(encounter.id, encounter.clone());
        Ok((encounter, registration))
    }

    /// Look up the live encounter for a pid, token, or composite scan code
    pub fn get_active(&self, code: &str) -> Result<(Encounter, Registration), StoreError> {
        let inner = self.inner.lock();
        let pid = resolve_pid(&inner, code)?;
        let registration = inner
            .registrations
            .get(&pid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        let id = inner
            .active_by_token
            .get(&registration.token.to_uppercase())
            .copied()
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        let encounter = inner.encounters[&id].clone();
        Ok((encounter, registration))
    }

    /// Look up a registration regardless of check-in state
    pub fn get_registration(&self, code: &str) -> Result<Registration, StoreError> {
        let inner = self.inner.lock();
        let pid = resolve_pid(&inner, code)?;
        inner
            .registrations
            .get(&pid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(code.to_string()))
    }

    /// Attach a new vitals snapshot and re-run triage.
    ///
    /// The snapshot replaces the previous one whole; triage output
    /// (priority, emergency, red flags) is refreshed from the new reading
    /// plus the registered symptom text.
    pub fn update_vitals(
        &self,
        code: &str,
        reading: VitalsReading,
        device_id: &str,
    ) -> Result<(Encounter, DateTime<Utc>), StoreError> {
        reading.validate()?;
        let mut inner = self.inner.lock();
        let pid = resolve_pid(&inner, code)?;
        let symptom_text = inner
            .registrations
            .get(&pid)
            .map(|r| r.symptom_text.clone())
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        let token_key = inner.registrations[&pid].token.to_uppercase();
        let id = inner
            .active_by_token
            .get(&token_key)
            .copied()
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;

        let outcome = triage(Some(&reading), &symptom_text);
        let now = Utc::now();

        let encounter = inner
            .encounters
            .get_mut(&id)
            .expect("active index points at a live encounter");
        encounter.vitals_latest = Some(VitalsSnapshot {
            reading,
            device_id: device_id.to_string(),
            recorded_at: now,
        });
        encounter.priority = outcome.priority;
        encounter.emergency = outcome.emergency;
        encounter.red_flags = outcome.red_flags;
        encounter.updated_at = now;
        Ok((encounter.clone(), now))
    }

    /// Advance an encounter's status. Fails closed: only the single legal
    /// forward step is accepted, anything else is rejected unchanged.
    pub fn transition(
        &self,
        code: &str,
        new_status: EncounterStatus,
    ) -> Result<Encounter, StoreError> {
        let mut inner = self.inner.lock();
        let pid = resolve_pid(&inner, code)?;
        let token_key = inner
            .registrations
            .get(&pid)
            .map(|r| r.token.to_uppercase())
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        let id = inner
            .active_by_token
            .get(&token_key)
            .copied()
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;

        let encounter = inner
            .encounters
            .get_mut(&id)
            .expect("active index points at a live encounter");
        if !encounter.status.can_advance_to(new_status) {
            return Err(StoreError::InvalidTransition {
                from: encounter.status,
                to: new_status,
            });
        }
        encounter.status = new_status;
        encounter.updated_at = Utc::now();
        let snapshot = encounter.clone();

        // Done encounters leave the live index immediately; the record
        // itself lingers until eviction.
        if new_status == EncounterStatus::Done {
            inner.active_by_token.remove(&token_key);
        }
        Ok(snapshot)
    }

    /// All non-done encounters, ordering irrelevant
    pub fn list_active(&self) -> Vec<Encounter> {
        let inner = self.inner.lock();
        inner
            .encounters
            .values()
            .filter(|e| e.status != EncounterStatus::Done)
            .cloned()
            .collect()
    }

    /// Registration lookup for a batch of encounters (names for staff view)
    pub fn registrations_for(&self, encounters: &[Encounter]) -> HashMap<Pid, Registration> {
        let inner = self.inner.lock();
        encounters
            .iter()
            .filter_map(|e| {
                inner
                    .registrations
                    .get(&e.pid)
                    .map(|r| (e.pid.clone(), r.clone()))
            })
            .collect()
    }

    pub fn providers(&self) -> u32 {
        self.inner.lock().providers
    }

    pub fn set_providers(&self, count: u32) -> u32 {
        let mut inner = self.inner.lock();
        inner.providers = count;
        inner.providers
    }

    /// Number of live encounters
    pub fn active_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.active_by_token.len()
    }

    /// Evict done encounters older than `retention` seconds, releasing
    /// their tokens for reuse. Returns how many were removed.
    pub fn evict_done(&self, retention: std::time::Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::zero());
        let mut inner = self.inner.lock();
        let expired: Vec<Uuid> = inner
            .encounters
            .values()
            .filter(|e| e.status == EncounterStatus::Done && e.updated_at < cutoff)
            .map(|e| e.id)
            .collect();
        for id in &expired {
            if let Some(encounter) = inner.encounters.remove(id) {
                let token_key = encounter.token.to_uppercase();
                inner.issued_tokens.remove(&token_key);
                inner.token_index.remove(&token_key);
                inner.registrations.remove(&encounter.pid);
            }
        }
        expired.len()
    }
}

/// Resolve a pid, token, or composite `PID|TOKEN` payload to a pid
fn resolve_pid(inner: &StoreInner, code: &str) -> Result<Pid, StoreError> {
    for candidate in candidate_codes(code) {
        if inner.registrations.contains_key(&candidate) {
            return Ok(candidate);
        }
        if let Some(pid) = inner.token_index.get(&candidate) {
            return Ok(pid.clone());
        }
    }
    Err(StoreError::NotFound(code.trim().to_string()))
}

fn next_pid() -> Pid {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Issue a short presentable token unique among every token still issued
fn next_token(issued: &HashSet<String>) -> String {
    let mut rng = rand::thread_rng();
    for _ in 0..TOKEN_ATTEMPTS {
        let candidate = format!("UC-{}", rng.gen_range(1000..10000));
        if !issued.contains(&candidate) {
            return candidate;
        }
    }
    format!(
        "UC-{}",
        &Uuid::new_v4().simple().to_string()[..4].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intake(symptoms: &str) -> IntakeData {
        IntakeData {
            first_name: "Dana".to_string(),
            last_name: "Riley".to_string(),
            phone: String::new(),
            dob: String::new(),
            symptom_text: symptoms.to_string(),
            duration_text: "1 day".to_string(),
            arrival_window: crate::store::ArrivalWindow::Now,
        }
    }

    #[test]
    fn test_register_issues_unique_tokens() {
        let store = EncounterStore::new(1);
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let r = store.register(intake("cough"));
            assert!(r.token.starts_with("UC-"));
            assert!(seen.insert(r.token));
        }
    }

    #[test]
    fn test_check_in_then_duplicate_rejected() {
        let store = EncounterStore::new(1);
        let r = store.register(intake("cough"));

        let (encounter, _) = store.check_in(&r.token).unwrap();
        assert_eq!(encounter.status, EncounterStatus::Waiting);
        assert_eq!(store.active_count(), 1);

        let err = store.check_in(&r.token).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyCheckedIn(_)));
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_check_in_unknown_code() {
        let store = EncounterStore::new(1);
        assert!(matches!(
            store.check_in("UC-0000").unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn test_resolve_by_pid_token_and_composite() {
        let store = EncounterStore::new(1);
        let r = store.register(intake("cough"));
        store.check_in(&r.pid).unwrap();

        assert!(store.get_active(&r.pid).is_ok());
        assert!(store.get_active(&r.token.to_lowercase()).is_ok());
        let composite = format!("{}|{}", r.pid, r.token);
        assert!(store.get_active(&composite).is_ok());
    }

    #[test]
    fn test_transitions_forward_only() {
        let store = EncounterStore::new(1);
        let r = store.register(intake("cough"));
        store.check_in(&r.token).unwrap();

        // Skipping a state is rejected and leaves status unchanged
        let err = store
            .transition(&r.token, EncounterStatus::InRoom)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(
            store.get_active(&r.token).unwrap().0.status,
            EncounterStatus::Waiting
        );

        store.transition(&r.token, EncounterStatus::Called).unwrap();
        store.transition(&r.token, EncounterStatus::InRoom).unwrap();
        let done = store.transition(&r.token, EncounterStatus::Done).unwrap();
        assert_eq!(done.status, EncounterStatus::Done);

        // Done encounters are no longer addressable as active
        assert!(store.get_active(&r.token).is_err());
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn test_no_reenqueue_after_done_before_eviction() {
        let store = EncounterStore::new(1);
        let r = store.register(intake("cough"));
        store.check_in(&r.token).unwrap();
        store.transition(&r.token, EncounterStatus::Called).unwrap();
        store.transition(&r.token, EncounterStatus::InRoom).unwrap();
        store.transition(&r.token, EncounterStatus::Done).unwrap();

        // The completed encounter is retained until eviction; its token
        // must not re-enter the queue
        let err = store.check_in(&r.token).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyCheckedIn(_)));
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn test_token_reusable_after_done_and_eviction() {
        let store = EncounterStore::new(1);
        let r = store.register(intake("cough"));
        store.check_in(&r.token).unwrap();
        store.transition(&r.token, EncounterStatus::Called).unwrap();
        store.transition(&r.token, EncounterStatus::InRoom).unwrap();
        store.transition(&r.token, EncounterStatus::Done).unwrap();

        let evicted = store.evict_done(std::time::Duration::ZERO);
        assert_eq!(evicted, 1);
        assert!(store.get_registration(&r.token).is_err());
    }

    #[test]
    fn test_update_vitals_reruns_triage() {
        let store = EncounterStore::new(1);
        let r = store.register(intake("mild cough"));
        store.check_in(&r.token).unwrap();
        assert_eq!(
            store.get_active(&r.token).unwrap().0.priority,
            Priority::Low
        );

        let reading = VitalsReading {
            spo2: Some(90.0),
            ..Default::default()
        };
        let (encounter, _) = store.update_vitals(&r.token, reading, "sensors").unwrap();
        assert_eq!(encounter.priority, Priority::High);
        assert_eq!(encounter.emergency.as_deref(), Some("low_oxygen"));
        assert!(encounter.vitals_latest.is_some());
    }

    #[test]
    fn test_update_vitals_replaces_snapshot_whole() {
        let store = EncounterStore::new(1);
        let r = store.register(intake("cough"));
        store.check_in(&r.token).unwrap();

        let first = VitalsReading {
            spo2: Some(97.0),
            hr: Some(70.0),
            ..Default::default()
        };
        store.update_vitals(&r.token, first, "a").unwrap();

        let second = VitalsReading {
            hr: Some(75.0),
            ..Default::default()
        };
        let (encounter, _) = store.update_vitals(&r.token, second, "b").unwrap();
        let snapshot = encounter.vitals_latest.unwrap();
        // No partial merge: spo2 from the first reading is gone
        assert_eq!(snapshot.reading.spo2, None);
        assert_eq!(snapshot.reading.hr, Some(75.0));
        assert_eq!(snapshot.device_id, "b");
    }

    #[test]
    fn test_update_vitals_rejects_out_of_range() {
        let store = EncounterStore::new(1);
        let r = store.register(intake("cough"));
        store.check_in(&r.token).unwrap();

        let reading = VitalsReading {
            hr: Some(999.0),
            ..Default::default()
        };
        let err = store
            .update_vitals(&r.token, reading, "sensors")
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        // Nothing was attached
        assert!(store.get_active(&r.token).unwrap().0.vitals_latest.is_none());
    }

    #[test]
    fn test_red_flag_intake_is_urgent_before_vitals() {
        let store = EncounterStore::new(1);
        let r = store.register(intake("severe chest pain"));
        let (encounter, _) = store.check_in(&r.token).unwrap();
        assert_eq!(encounter.priority, Priority::High);
        assert!(!encounter.red_flags.is_empty());
    }

    #[test]
    fn test_provider_count() {
        let store = EncounterStore::new(1);
        assert_eq!(store.providers(), 1);
        assert_eq!(store.set_providers(0), 0);
        assert_eq!(store.providers(), 0);
        assert_eq!(store.set_providers(3), 3);
    }
}
