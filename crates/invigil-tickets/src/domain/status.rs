//! Status transition rules.
//!
//! The workflow runs `open → in_progress → {ops_input_required,
//! user_dependency, ops_user_dependency} → send_for_approval → approved →
//! resolved`. `resolved` is terminal. Any other non-`open` status may be
//! reopened back to `open`.

use invigil_core::actor::ActorRole;
use invigil_core::error::DomainError;
use invigil_core::ticket::TicketStatus;
use serde::{Deserialize, Serialize};

use TicketStatus::{
    Approved, InProgress, Open, OpsInputRequired, OpsUserDependency, Resolved, SendForApproval,
    UserDependency,
};

/// One side of the compound `ops_user_dependency` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    Ops,
    User,
}

/// Forward successors of a status, ignoring role gates and reopen.
#[must_use]
pub const fn successors(from: TicketStatus) -> &'static [TicketStatus] {
    match from {
        Open => &[InProgress],
        InProgress => &[
            OpsInputRequired,
            UserDependency,
            OpsUserDependency,
            SendForApproval,
        ],
        OpsInputRequired => &[InProgress, UserDependency, OpsUserDependency, SendForApproval],
        UserDependency => &[InProgress, OpsUserDependency, SendForApproval, Resolved],
        OpsUserDependency => &[InProgress, OpsInputRequired, UserDependency, SendForApproval],
        SendForApproval => &[Approved, InProgress],
        Approved => &[Resolved],
        Resolved => &[],
    }
}

/// True when moving `from → to` is a reopen.
#[must_use]
pub fn is_reopen(from: TicketStatus, to: TicketStatus) -> bool {
    to == Open && from != Open && !from.is_terminal()
}

fn role_may_enter(from: TicketStatus, to: TicketStatus, role: ActorRole) -> bool {
    match (from, to, role) {
        // The engine only ever force-closes stale user-dependency tickets.
        (UserDependency, Resolved, ActorRole::System) => true,
        (_, _, ActorRole::System) => false,
        (_, Approved, role) => role == ActorRole::Approver,
        (Approved, Resolved, role) => matches!(role, ActorRole::Resolver | ActorRole::Approver),
        (_, Resolved, _) => false,
        _ => true,
    }
}

/// Validates a transition for an actor role.
///
/// # Errors
///
/// Returns `DomainError::InvalidTransition` when `to` is neither a
/// successor of `from` nor a reopen, or when `role` may not perform it.
pub fn check_transition(
    from: TicketStatus,
    to: TicketStatus,
    role: ActorRole,
) -> Result<(), DomainError> {
    let structurally_allowed = successors(from).contains(&to) || is_reopen(from, to);
    if structurally_allowed && role_may_enter(from, to, role) {
        Ok(())
    } else {
        Err(DomainError::InvalidTransition { from, to, role })
    }
}

/// Which dependency conditions a transition clears.
///
/// Leaving `ops_user_dependency` for `ops_input_required` clears only the
/// user side; for `user_dependency` only the ops side; anything else clears
/// both. Single-dependency states clear their one side when left for a state
/// that no longer awaits it.
#[must_use]
pub fn cleared_dependencies(from: TicketStatus, to: TicketStatus) -> Vec<Dependency> {
    let mut cleared = Vec::new();
    if from.awaits_ops() && !to.awaits_ops() {
        cleared.push(Dependency::Ops);
    }
    if from.awaits_user() && !to.awaits_user() {
        cleared.push(Dependency::User);
    }
    cleared
}
