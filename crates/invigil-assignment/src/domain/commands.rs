//! Commands for ticket assignment.

use invigil_core::actor::{Actor, AssigneeRole};
use invigil_core::command::Command;
use uuid::Uuid;

/// Command to assign one user in one role across one or more tickets.
#[derive(Debug, Clone)]
pub struct AssignRole {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub actor: Actor,
    pub ticket_ids: Vec<Uuid>,
    pub user_id: String,
    pub role: AssigneeRole,
}

impl Command for AssignRole {
    fn command_type(&self) -> &'static str {
        "assignment.assign_role"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &Actor {
        &self.actor
    }
}

/// Command to remove one live binding.
#[derive(Debug, Clone)]
pub struct UnassignRole {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub actor: Actor,
    pub ticket_id: Uuid,
    pub user_id: String,
    pub role: AssigneeRole,
}

impl Command for UnassignRole {
    fn command_type(&self) -> &'static str {
        "assignment.unassign_role"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &Actor {
        &self.actor
    }
}

/// Command to assign a resolver and an approver across tickets in one call.
///
/// Either half may be omitted; the halves run independently.
#[derive(Debug, Clone)]
pub struct AssignTeam {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub actor: Actor,
    pub ticket_ids: Vec<Uuid>,
    pub resolver_id: Option<String>,
    pub approver_id: Option<String>,
}

impl AssignTeam {
    /// The single-role command for one half of the team.
    #[must_use]
    pub fn half(&self, user_id: &str, role: AssigneeRole) -> AssignRole {
        AssignRole {
            correlation_id: self.correlation_id,
            actor: self.actor.clone(),
            ticket_ids: self.ticket_ids.clone(),
            user_id: user_id.to_owned(),
            role,
        }
    }
}

impl Command for AssignTeam {
    fn command_type(&self) -> &'static str {
        "assignment.assign_team"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &Actor {
        &self.actor
    }
}
