//! Actors and the roles they act under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier recorded as `performed_by` for engine-initiated mutations.
pub const SYSTEM_ACTOR_ID: &str = "system";

/// The role an actor holds when performing a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Works the ticket towards a resolution.
    Resolver,
    /// Signs off on resolutions.
    Approver,
    /// Operations administrator.
    Admin,
    /// The engine itself (sweeps, scheduled jobs).
    System,
}

impl ActorRole {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolver => "resolver",
            Self::Approver => "approver",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resolver" => Ok(Self::Resolver),
            "approver" => Ok(Self::Approver),
            "admin" => Ok(Self::Admin),
            "system" => Ok(Self::System),
            other => Err(format!("unknown actor role '{other}'")),
        }
    }
}

/// Who performed a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id, or [`SYSTEM_ACTOR_ID`].
    pub id: String,
    /// Role the actor is acting under.
    pub role: ActorRole,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// The engine's own identity.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SYSTEM_ACTOR_ID, ActorRole::System)
    }
}

/// The role a user is assigned to a ticket under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeRole {
    /// Responsible for resolving.
    Resolver,
    /// Responsible for approving.
    Approver,
}

impl AssigneeRole {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolver => "resolver",
            Self::Approver => "approver",
        }
    }
}

impl fmt::Display for AssigneeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssigneeRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resolver" => Ok(Self::Resolver),
            "approver" => Ok(Self::Approver),
            other => Err(format!("unknown assignee role '{other}'")),
        }
    }
}
