//! Traffic-weight computation for a rollout.
//!
//! Every rollout adds the new revision at zero weight and never takes
//! weight from a live revision. Entries that already carry no traffic are
//! dropped, so repeated rollouts do not grow the list.
//!
//! Entries that follow the latest revision are pinned to the revision that
//! is latest now before anything else happens; otherwise the new revision
//! would inherit their weight as soon as it becomes latest.

use aca_core::{NewRevision, TrafficEntry};
use tracing::debug;

use crate::error::{RolloutError, RolloutResult};

/// Replace every live `latestRevision` entry with one naming `latest_revision`.
///
/// Zero-weight entries are left alone. A live entry with no known latest
/// revision cannot be pinned and fails with `IncompleteRemoteState`.
pub fn pin_latest(
    current: &[TrafficEntry],
    latest_revision: Option<&str>,
) -> RolloutResult<Vec<TrafficEntry>> {
    current
        .iter()
        .map(|entry| {
            if !entry.follows_latest() || entry.weight == 0 {
                return Ok(entry.clone());
            }
            let name = latest_revision.ok_or(RolloutError::IncompleteRemoteState {
                field: "latestRevisionName",
            })?;
            debug!(revision = name, weight = entry.weight, "pinning latest-revision traffic");
            Ok(TrafficEntry {
                revision_name: Some(name.to_string()),
                weight: entry.weight,
                latest_revision: false,
                label: entry.label.clone(),
            })
        })
        .collect()
}

/// Compute the traffic list for the envelope that introduces `new_revision`.
///
/// Live entries keep their order and weight; the first of them usually
/// carries the production label. The new entry is always appended last.
pub fn next_traffic(current: &[TrafficEntry], new_revision: &NewRevision) -> Vec<TrafficEntry> {
    let mut next: Vec<TrafficEntry> = current.iter().filter(|e| e.weight > 0).cloned().collect();

    let dropped = current.len() - next.len();
    if dropped > 0 {
        debug!(dropped, "dropping zero-weight traffic entries");
    }

    next.push(staged_entry(new_revision));
    next
}

/// Zero-weight entry for the revision being rolled out.
fn staged_entry(new_revision: &NewRevision) -> TrafficEntry {
    match new_revision {
        NewRevision::Named(name) => TrafficEntry::named(name, 0),
        NewRevision::Latest => TrafficEntry {
            revision_name: None,
            weight: 0,
            latest_revision: true,
            label: None,
        },
    }
}
