//! Queue ordering and wait estimation.
//!
//! Recomputation is total: every call rebuilds the full ordering and all
//! derived fields from the current snapshot of active encounters. There is
//! no incremental patching, so derived state can never drift from the
//! authoritative table.

use std::cmp::Reverse;

use crate::config::LaneDurations;
use crate::store::{Encounter, Priority};

/// An encounter with its scheduler-derived fields
#[derive(Debug, Clone)]
pub struct ScheduledEncounter {
    pub encounter: Encounter,
    /// 0-indexed position in the sorted queue
    pub position_in_line: usize,
    pub estimated_wait_min: u32,
}

/// Rebuild the full queue ordering and per-encounter wait estimates.
///
/// Ordering: priority lane descending, then arrival time ascending (strict
/// FIFO within a lane), then encounter id as a final total-order tie break
/// so an unchanged snapshot always reproduces the identical ordering.
pub fn recompute(
    mut active: Vec<Encounter>,
    providers: u32,
    durations: &LaneDurations,
) -> Vec<ScheduledEncounter> {
    active.sort_by_key(|e| (Reverse(e.priority), e.arrival_time, e.id));

    // providers = 0 still yields a (large) finite wait instead of a
    // division by zero
    let providers = providers.max(1);

    active
        .into_iter()
        .enumerate()
        .map(|(position, encounter)| {
            // Everything ahead in the sorted order has equal-or-higher
            // priority, so the count ahead is the position itself.
            let ahead = position as u32;
            let avg_visit = avg_visit_for(encounter.priority, durations);
            let estimated_wait_min = div_ceil(ahead * avg_visit, providers);
            ScheduledEncounter {
                encounter,
                position_in_line: position,
                estimated_wait_min,
            }
        })
        .collect()
}

fn avg_visit_for(priority: Priority, durations: &LaneDurations) -> u32 {
    match priority {
        Priority::High => durations.high,
        Priority::Medium => durations.medium,
        Priority::Low => durations.low,
    }
}

fn div_ceil(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EncounterStatus, Priority};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn encounter(priority: Priority, arrival_offset_min: i64) -> Encounter {
        let arrival = Utc::now() + Duration::minutes(arrival_offset_min);
        Encounter {
            id: Uuid::new_v4(),
            pid: "P".to_string(),
            token: format!("UC-{arrival_offset_min:04}"),
            status: EncounterStatus::Waiting,
            priority,
            emergency: None,
            arrival_time: arrival,
            vitals_latest: None,
            red_flags: Vec::new(),
            updated_at: arrival,
        }
    }

    fn durations() -> LaneDurations {
        LaneDurations {
            high: 20,
            medium: 25,
            low: 15,
        }
    }

    #[test]
    fn test_three_high_two_providers() {
        // providers=2, lane high avg 20 min, arrivals t0 < t1 < t2:
        // the t2 encounter sits at position 2 with wait ceil((2/2)*20) = 20
        let active = vec![
            encounter(Priority::High, 2),
            encounter(Priority::High, 0),
            encounter(Priority::High, 1),
        ];
        let scheduled = recompute(active, 2, &durations());

        assert_eq!(scheduled.len(), 3);
        assert_eq!(scheduled[0].position_in_line, 0);
        assert_eq!(scheduled[0].estimated_wait_min, 0);
        assert_eq!(scheduled[1].estimated_wait_min, 10);

        let last = &scheduled[2];
        assert_eq!(last.encounter.token, "UC-0002");
        assert_eq!(last.position_in_line, 2);
        assert_eq!(last.estimated_wait_min, 20);
    }

    #[test]
    fn test_priority_before_arrival() {
        let early_low = encounter(Priority::Low, 0);
        let late_high = encounter(Priority::High, 5);
        let scheduled = recompute(vec![early_low.clone(), late_high.clone()], 1, &durations());

        assert_eq!(scheduled[0].encounter.id, late_high.id);
        assert_eq!(scheduled[1].encounter.id, early_low.id);
    }

    #[test]
    fn test_fifo_within_lane() {
        let a = encounter(Priority::Medium, 0);
        let b = encounter(Priority::Medium, 1);
        let c = encounter(Priority::Medium, 2);
        let scheduled = recompute(vec![c.clone(), a.clone(), b.clone()], 1, &durations());
        let order: Vec<_> = scheduled.iter().map(|s| s.encounter.id).collect();
        assert_eq!(order, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let active = vec![
            encounter(Priority::High, 3),
            encounter(Priority::Low, 0),
            encounter(Priority::Medium, 1),
            encounter(Priority::Medium, 2),
        ];
        let first = recompute(active.clone(), 2, &durations());
        let second = recompute(active, 2, &durations());

        let a: Vec<_> = first
            .iter()
            .map(|s| (s.encounter.id, s.position_in_line, s.estimated_wait_min))
            .collect();
        let b: Vec<_> = second
            .iter()
            .map(|s| (s.encounter.id, s.position_in_line, s.estimated_wait_min))
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_providers_clamped_not_divided() {
        let active = vec![encounter(Priority::Low, 0), encounter(Priority::Low, 1)];
        let scheduled = recompute(active, 0, &durations());
        // Clamped to one provider: degraded but finite
        assert_eq!(scheduled[1].estimated_wait_min, 15);
    }

    #[test]
    fn test_wait_uses_lane_duration() {
        let active = vec![encounter(Priority::Low, 0), encounter(Priority::Low, 1)];
        let scheduled = recompute(active, 1, &durations());
        assert_eq!(scheduled[1].estimated_wait_min, 15);

        let active = vec![
            encounter(Priority::Medium, 0),
            encounter(Priority::Medium, 1),
        ];
        let scheduled = recompute(active, 1, &durations());
        assert_eq!(scheduled[1].estimated_wait_min, 25);
    }

    #[test]
    fn test_ceiling_rounds_up() {
        // position 1, avg 25, providers 2 -> ceil(12.5) = 13
        let active = vec![
            encounter(Priority::Medium, 0),
            encounter(Priority::Medium, 1),
        ];
        let scheduled = recompute(active, 2, &durations());
        assert_eq!(scheduled[1].estimated_wait_min, 13);
    }

    #[test]
    fn test_empty_queue() {
        assert!(recompute(Vec::new(), 2, &durations()).is_empty());
    }
}
