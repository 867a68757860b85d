//! Route modules organized by bounded context.

pub mod activity;
pub mod assignments;
pub mod health;
pub mod sla;
pub mod sweeps;
pub mod tickets;

use axum::Router;
use invigil_core::actor::{Actor, ActorRole};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Who is calling. Flattened into every mutating request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorBody {
    pub actor_id: String,
    pub actor_role: ActorRole,
}

impl ActorBody {
    /// The acting user. `system` is reserved for the engine's own sweeps.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank id or the `system` role.
    pub fn actor(&self) -> Result<Actor, ApiError> {
        if self.actor_id.trim().is_empty() {
            return Err(ApiError::validation("actor_id must not be blank"));
        }
        if self.actor_role == ActorRole::System {
            return Err(ApiError::validation("the system role cannot act over HTTP"));
        }
        Ok(Actor::new(self.actor_id.trim(), self.actor_role))
    }
}

/// Splits a comma-separated query value into trimmed, non-blank items.
pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

/// Every route of the service, with the context routers nested under
/// `/api/v1`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/tickets", tickets::router())
        .nest("/api/v1/assignments", assignments::router())
        .nest("/api/v1/activity", activity::router())
        .nest("/api/v1/sla", sla::router())
        .nest("/api/v1/sweeps", sweeps::router())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_drops_blanks_and_trims() {
        assert_eq!(
            split_list(Some(" open, ,in_progress ,")),
            vec!["open".to_owned(), "in_progress".to_owned()]
        );
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn test_system_role_cannot_act_over_http() {
        let body = ActorBody {
            actor_id: "ops-1".into(),
            actor_role: ActorRole::System,
        };

        assert!(body.actor().is_err());
    }
}
