//! Sweep eligibility.

use chrono::{DateTime, NaiveDate, Utc};
use invigil_core::ticket::{TicketRecord, TicketStatus};
use serde::{Deserialize, Serialize};

/// Instant the dependency duration is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyBasis {
    /// Ticket submission.
    #[default]
    SubmittedAt,
    /// Most recent entry into a user-dependency state.
    DependencySince,
}

/// Auto-resolution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPolicy {
    /// Whole days in dependency after which a ticket is force-resolved.
    pub threshold_days: i64,
    pub basis: DependencyBasis,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            threshold_days: 7,
            basis: DependencyBasis::SubmittedAt,
        }
    }
}

impl SweepPolicy {
    /// Whole days elapsed since the basis instant, floored. Never negative.
    #[must_use]
    pub fn days_in_dependency(&self, ticket: &TicketRecord, now: DateTime<Utc>) -> i64 {
        let since = match self.basis {
            DependencyBasis::SubmittedAt => ticket.submitted_at,
            DependencyBasis::DependencySince => {
                ticket.dependency_since.unwrap_or(ticket.submitted_at)
            }
        };
        (now - since).num_days().max(0)
    }

    /// A live `user_dependency` ticket past the threshold.
    #[must_use]
    pub fn is_stale(&self, ticket: &TicketRecord, now: DateTime<Utc>) -> bool {
        awaits_reporter(ticket) && self.days_in_dependency(ticket, now) >= self.threshold_days
    }
}

fn awaits_reporter(ticket: &TicketRecord) -> bool {
    ticket.status == TicketStatus::UserDependency && !ticket.is_deleted
}

/// A live `user_dependency` ticket whose exam date is before `today`.
#[must_use]
pub fn exam_has_passed(ticket: &TicketRecord, today: NaiveDate) -> bool {
    awaits_reporter(ticket) && ticket.exam_date.is_some_and(|date| date < today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use invigil_core::ticket::Severity;
    use invigil_test_support::ticket_record;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
    }

    fn waiting_since(submitted_at: DateTime<Utc>) -> TicketRecord {
        ticket_record("TKT-000001", TicketStatus::UserDependency, Severity::Sev3, submitted_at)
    }

    #[test]
    fn test_six_days_is_not_stale() {
        let ticket = waiting_since(now() - Duration::days(6));

        assert_eq!(SweepPolicy::default().days_in_dependency(&ticket, now()), 6);
        assert!(!SweepPolicy::default().is_stale(&ticket, now()));
    }

    #[test]
    fn test_seven_days_one_hour_is_stale() {
        let ticket = waiting_since(now() - Duration::days(7) - Duration::hours(1));

        assert_eq!(SweepPolicy::default().days_in_dependency(&ticket, now()), 7);
        assert!(SweepPolicy::default().is_stale(&ticket, now()));
    }

    #[test]
    fn test_six_days_twenty_three_hours_floors_to_six() {
        let ticket = waiting_since(now() - Duration::days(7) + Duration::hours(1));

        assert!(!SweepPolicy::default().is_stale(&ticket, now()));
    }

    #[test]
    fn test_dependency_since_basis_measures_from_last_entry() {
        let mut ticket = waiting_since(now() - Duration::days(30));
        ticket.dependency_since = Some(now() - Duration::days(2));
        let policy = SweepPolicy {
            basis: DependencyBasis::DependencySince,
            ..SweepPolicy::default()
        };

        assert_eq!(policy.days_in_dependency(&ticket, now()), 2);
        assert!(!policy.is_stale(&ticket, now()));
        assert!(SweepPolicy::default().is_stale(&ticket, now()));
    }

    #[test]
    fn test_other_statuses_and_deleted_tickets_are_never_stale() {
        let old = now() - Duration::days(40);
        let in_progress =
            ticket_record("TKT-000002", TicketStatus::InProgress, Severity::Sev3, old);
        let compound =
            ticket_record("TKT-000003", TicketStatus::OpsUserDependency, Severity::Sev3, old);
        let mut deleted = waiting_since(old);
        deleted.is_deleted = true;

        let policy = SweepPolicy::default();
        assert!(!policy.is_stale(&in_progress, now()));
        assert!(!policy.is_stale(&compound, now()));
        assert!(!policy.is_stale(&deleted, now()));
    }

    #[test]
    fn test_exam_has_passed_only_strictly_before_today() {
        let today = now().date_naive();
        let mut ticket = waiting_since(now());

        ticket.exam_date = Some(today);
        assert!(!exam_has_passed(&ticket, today));

        ticket.exam_date = Some(today - Duration::days(1));
        assert!(exam_has_passed(&ticket, today));

        ticket.exam_date = None;
        assert!(!exam_has_passed(&ticket, today));
    }
}
