//! SLA policy: targets, breach detection and compliance.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use invigil_core::clock::hours_between;
use invigil_core::ticket::{Severity, TicketRecord, TicketStatus};
use serde::Serialize;

/// SLA target in hours for a severity. Unknown severities get the most
/// lenient target.
#[must_use]
pub const fn target_hours(severity: Severity) -> i32 {
    match severity {
        Severity::Sev1 => 4,
        Severity::Sev2 => 8,
        Severity::Sev3 | Severity::Unknown => 24,
    }
}

/// Instant at which a ticket submitted at `submitted_at` breaches.
#[must_use]
pub fn due_at(submitted_at: DateTime<Utc>, target_hours: i32) -> DateTime<Utc> {
    submitted_at + Duration::hours(i64::from(target_hours))
}

/// Elapsed hours between submission and resolution, rounded to one decimal.
#[must_use]
pub fn resolution_time_hours(submitted_at: DateTime<Utc>, resolved_at: DateTime<Utc>) -> f64 {
    (hours_between(submitted_at, resolved_at) * 10.0).round() / 10.0
}

/// Breach status of a ticket as of `now`.
///
/// An unresolved ticket is breached once more than `target_hours` have
/// elapsed since submission; a resolved ticket is breached if it took
/// longer than that to resolve.
#[must_use]
pub fn is_breached(
    status: TicketStatus,
    submitted_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    target_hours: i32,
    now: DateTime<Utc>,
) -> bool {
    let end = match (status, resolved_at) {
        (TicketStatus::Resolved, Some(resolved_at)) => resolved_at,
        _ => now,
    };
    end > due_at(submitted_at, target_hours)
}

/// [`is_breached`] applied to a stored ticket.
#[must_use]
pub fn record_is_breached(ticket: &TicketRecord, now: DateTime<Utc>) -> bool {
    is_breached(
        ticket.status,
        ticket.submitted_at,
        ticket.resolved_at,
        ticket.sla_target_hours,
        now,
    )
}

/// Compliance figures for one group of tickets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceStats {
    pub total: usize,
    pub resolved: usize,
    pub breached_resolved: usize,
    /// Currently unresolved and already past target.
    pub breached_open: usize,
    /// `(resolved − breached_resolved) / resolved × 100`; 100 when nothing
    /// has been resolved.
    pub compliance_percent: f64,
    pub average_resolution_hours: Option<f64>,
}

/// Compliance across a ticket set, overall and per severity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    pub overall: ComplianceStats,
    pub by_severity: BTreeMap<String, ComplianceStats>,
}

/// SLA compliance percentage. Vacuously 100 over zero resolved tickets.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compliance_percent(resolved: usize, breached_resolved: usize) -> f64 {
    if resolved == 0 {
        return 100.0;
    }
    let compliant = resolved.saturating_sub(breached_resolved);
    compliant as f64 / resolved as f64 * 100.0
}

#[allow(clippy::cast_precision_loss)]
fn stats_for<'a>(
    tickets: impl Iterator<Item = &'a TicketRecord>,
    now: DateTime<Utc>,
) -> ComplianceStats {
    let mut total = 0;
    let mut resolved = 0;
    let mut breached_resolved = 0;
    let mut breached_open = 0;
    let mut resolution_hours = Vec::new();

    for ticket in tickets {
        total += 1;
        let breached = record_is_breached(ticket, now);
        if ticket.status == TicketStatus::Resolved {
            resolved += 1;
            if breached {
                breached_resolved += 1;
            }
            if let Some(resolved_at) = ticket.resolved_at {
                resolution_hours.push(resolution_time_hours(ticket.submitted_at, resolved_at));
            }
        } else if breached {
            breached_open += 1;
        }
    }

    let average_resolution_hours = (!resolution_hours.is_empty()).then(|| {
        let mean = resolution_hours.iter().sum::<f64>() / resolution_hours.len() as f64;
        (mean * 10.0).round() / 10.0
    });

    ComplianceStats {
        total,
        resolved,
        breached_resolved,
        breached_open,
        compliance_percent: compliance_percent(resolved, breached_resolved),
        average_resolution_hours,
    }
}

/// Builds a compliance report. Breach is recomputed as of `now` rather than
/// read from the stored flag, so stale rows cannot skew the figures.
#[must_use]
pub fn compliance_report(tickets: &[TicketRecord], now: DateTime<Utc>) -> ComplianceReport {
    let mut by_severity = BTreeMap::new();
    for severity in [Severity::Sev1, Severity::Sev2, Severity::Sev3, Severity::Unknown] {
        let mut group = tickets.iter().filter(|t| t.severity == severity).peekable();
        if group.peek().is_some() {
            by_severity.insert(severity.as_str().to_owned(), stats_for(group, now));
        }
    }
    ComplianceReport {
        overall: stats_for(tickets.iter(), now),
        by_severity,
    }
}
