//! Ticket record types shared between the domain and the stores.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    OpsInputRequired,
    UserDependency,
    OpsUserDependency,
    SendForApproval,
    Approved,
    Resolved,
}

impl TicketStatus {
    /// Every status, in workflow order.
    pub const ALL: [Self; 8] = [
        Self::Open,
        Self::InProgress,
        Self::OpsInputRequired,
        Self::UserDependency,
        Self::OpsUserDependency,
        Self::SendForApproval,
        Self::Approved,
        Self::Resolved,
    ];

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::OpsInputRequired => "ops_input_required",
            Self::UserDependency => "user_dependency",
            Self::OpsUserDependency => "ops_user_dependency",
            Self::SendForApproval => "send_for_approval",
            Self::Approved => "approved",
            Self::Resolved => "resolved",
        }
    }

    /// `resolved` admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// States in which the ticket waits on the reporting user.
    #[must_use]
    pub const fn awaits_user(self) -> bool {
        matches!(self, Self::UserDependency | Self::OpsUserDependency)
    }

    /// States in which the ticket waits on operations staff.
    #[must_use]
    pub const fn awaits_ops(self) -> bool {
        matches!(self, Self::OpsInputRequired | Self::OpsUserDependency)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown ticket status '{}'", s.trim()))
    }
}

/// Urgency tier driving the SLA target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Sev1,
    Sev2,
    Sev3,
    /// Any severity text outside the known tiers.
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// Wire name of the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sev1 => "sev1",
            Self::Sev2 => "sev2",
            Self::Sev3 => "sev3",
            Self::Unknown => "unknown",
        }
    }

    /// Lenient parse: unrecognised text maps to [`Severity::Unknown`].
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "sev1" => Self::Sev1,
            "sev2" => Self::Sev2,
            "sev3" => Self::Sev3,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted ticket row. The ticket is the aggregation root; assignees and
/// activity events reference it by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: Uuid,
    /// Human-readable number, e.g. `TKT-000042`.
    pub ticket_number: String,
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub city: String,
    pub centre_code: String,
    /// Invigilation resource (staff member or room) the ticket concerns.
    pub resource_id: Option<String>,
    /// Exam date the ticket relates to, if any.
    pub exam_date: Option<NaiveDate>,
    /// Submitting user; `None` together with `is_anonymous` for anonymous reports.
    pub submitted_by: Option<String>,
    pub is_anonymous: bool,
    pub status: TicketStatus,
    pub submitted_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Set if and only if `status` is `resolved`.
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the ticket last entered a user-dependency state.
    pub dependency_since: Option<DateTime<Utc>>,
    pub reopen_count: i32,
    pub resolution_note: Option<String>,
    pub sla_target_hours: i32,
    pub is_sla_breached: bool,
    pub resolution_time_hours: Option<f64>,
    pub is_deleted: bool,
}

/// Filter applied to ticket listings. Empty collections mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketFilter {
    pub statuses: Vec<TicketStatus>,
    pub severities: Vec<Severity>,
    pub categories: Vec<String>,
    pub cities: Vec<String>,
    pub resolver_ids: Vec<String>,
    pub approver_ids: Vec<String>,
    pub resource_ids: Vec<String>,
    /// Comma-separated search terms, OR-matched.
    pub search: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub include_deleted: bool,
}

impl TicketFilter {
    /// Filter selecting live tickets in one status.
    #[must_use]
    pub fn with_status(status: TicketStatus) -> Self {
        Self {
            statuses: vec![status],
            ..Self::default()
        }
    }

    /// Search terms: split on commas, trimmed, lowercased, blanks dropped.
    #[must_use]
    pub fn search_terms(&self) -> Vec<String> {
        self.search
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(|term| term.trim().to_lowercase())
                    .filter(|term| !term.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TicketRecord {
    /// True when any term is a case-insensitive substring of the ticket
    /// number, description or category. No terms matches everything.
    #[must_use]
    pub fn matches_search(&self, terms: &[String]) -> bool {
        if terms.is_empty() {
            return true;
        }
        let number = self.ticket_number.to_lowercase();
        let description = self.description.to_lowercase();
        let category = self.category.to_lowercase();
        terms.iter().any(|term| {
            number.contains(term.as_str())
                || description.contains(term.as_str())
                || category.contains(term.as_str())
        })
    }
}

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Maximum rows a single page may return.
    pub const MAX_PAGE_SIZE: u32 = 200;

    /// Rows to skip before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 25,
        }
    }
}

/// A page of results plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}
