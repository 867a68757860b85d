//! Reconciliation tolerances.

use chrono::Duration;

/// Default tolerance for treating two stream entries as one logical event.
pub const DEFAULT_DEDUP_TOLERANCE_SECS: i64 = 2;
/// Default window, measured from the anchor, for bulk grouping.
pub const DEFAULT_BULK_WINDOW_SECS: i64 = 300;

/// Time windows the reconciler works with. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Maximum timestamp distance between a timeline entry and the history
    /// entry it duplicates.
    pub dedup_tolerance: Duration,
    /// Maximum distance from the anchor event for a bulk group member.
    pub bulk_window: Duration,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            dedup_tolerance: Duration::seconds(DEFAULT_DEDUP_TOLERANCE_SECS),
            bulk_window: Duration::seconds(DEFAULT_BULK_WINDOW_SECS),
        }
    }
}
