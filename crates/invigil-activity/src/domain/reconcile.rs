//! Dual-stream reconciliation.
//!
//! The history stream is authoritative. A timeline entry is dropped when the
//! history stream already holds the same logical event: same ticket, same
//! canonical action, same old and new values, timestamps within the dedup
//! tolerance. Survivors are merged, ordered newest first (stable), and folded
//! into bulk groups. Everything here is pure: identical input gives identical
//! output.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use invigil_core::repository::StoredEvent;
use uuid::Uuid;

use super::entries::{ActivityEntry, BulkActivityGroup};
use super::policy::ReconcilePolicy;

/// Maps legacy action spellings onto the canonical vocabulary.
#[must_use]
pub fn canonical_action(action: &str) -> &str {
    match action {
        "status_change" => "status_changed",
        "assignment" => "assigned",
        other => other,
    }
}

fn normalized(mut event: StoredEvent) -> StoredEvent {
    let canonical = canonical_action(&event.action);
    if canonical != event.action {
        event.action = canonical.to_owned();
    }
    event
}

type DedupKey = (Uuid, String, Option<String>, Option<String>);

fn dedup_key(event: &StoredEvent) -> DedupKey {
    (
        event.ticket_id,
        event.action.clone(),
        event.old_value.clone(),
        event.new_value.clone(),
    )
}

/// History entries followed by the timeline entries that do not duplicate
/// one of them. Actions come back in canonical spelling.
#[must_use]
pub fn deduplicate(
    history: Vec<StoredEvent>,
    timeline: Vec<StoredEvent>,
    tolerance: Duration,
) -> Vec<StoredEvent> {
    let mut merged: Vec<StoredEvent> = history.into_iter().map(normalized).collect();

    let mut seen: HashMap<DedupKey, Vec<DateTime<Utc>>> = HashMap::new();
    for event in &merged {
        seen.entry(dedup_key(event))
            .or_default()
            .push(event.performed_at);
    }

    for event in timeline.into_iter().map(normalized) {
        let duplicate = seen.get(&dedup_key(&event)).is_some_and(|times| {
            times
                .iter()
                .any(|at| (*at - event.performed_at).abs() <= tolerance)
        });
        if !duplicate {
            merged.push(event);
        }
    }
    merged
}

/// Stable sort, newest first.
pub fn sort_newest_first(events: &mut [StoredEvent]) {
    events.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
}

fn same_bulk_key(anchor: &StoredEvent, other: &StoredEvent) -> bool {
    anchor.action == other.action
        && anchor.performed_by == other.performed_by
        && anchor.performed_by_role == other.performed_by_role
        && anchor.old_value == other.old_value
        && anchor.new_value == other.new_value
}

/// Greedy anchor-based grouping over events already ordered newest first.
///
/// Each unprocessed event becomes an anchor and collects every later
/// unprocessed event with the same bulk key whose timestamp is within
/// `window` of the anchor. Membership is not chained: distance is always
/// measured from the anchor. Every event lands in exactly one entry.
#[must_use]
pub fn group_bulk(events: Vec<StoredEvent>, window: Duration) -> Vec<ActivityEntry> {
    let mut slots: Vec<Option<StoredEvent>> = events.into_iter().map(Some).collect();
    let mut entries = Vec::new();

    for i in 0..slots.len() {
        let Some(anchor) = slots[i].take() else {
            continue;
        };

        let mut members = Vec::new();
        for slot in slots.iter_mut().skip(i + 1) {
            let Some(candidate) = slot.as_ref() else {
                continue;
            };
            if anchor.performed_at - candidate.performed_at > window {
                break;
            }
            if same_bulk_key(&anchor, candidate) {
                if let Some(member) = slot.take() {
                    members.push(member);
                }
            }
        }

        if members.is_empty() {
            entries.push(ActivityEntry::Single(anchor));
        } else {
            members.insert(0, anchor.clone());
            entries.push(ActivityEntry::Bulk(BulkActivityGroup { anchor, members }));
        }
    }

    entries.sort_by(|a, b| b.performed_at().cmp(&a.performed_at()));
    entries
}

/// Full pipeline: dedup, order, group.
#[must_use]
pub fn reconcile(
    history: Vec<StoredEvent>,
    timeline: Vec<StoredEvent>,
    policy: &ReconcilePolicy,
) -> Vec<ActivityEntry> {
    let mut merged = deduplicate(history, timeline, policy.dedup_tolerance);
    sort_newest_first(&mut merged);
    group_bulk(merged, policy.bulk_window)
}
