//! Routes for assigning resolvers and approvers to tickets.
//!
//! Multi-ticket calls answer 200 when every ticket succeeded and 207 with
//! the per-ticket report otherwise.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use invigil_assignment::application::command_handlers::{
    AssignmentReport, TeamAssignmentReport, handle_assign_role, handle_assign_team,
    handle_unassign_role,
};
use invigil_assignment::domain::commands::{AssignRole, AssignTeam, UnassignRole};
use invigil_core::actor::AssigneeRole;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::ActorBody;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(flatten)]
    pub actor: ActorBody,
    pub ticket_ids: Vec<Uuid>,
    pub user_id: String,
    pub role: AssigneeRole,
}

/// Request body for POST /bulk.
#[derive(Debug, Deserialize)]
pub struct AssignTeamRequest {
    #[serde(flatten)]
    pub actor: ActorBody,
    pub ticket_ids: Vec<Uuid>,
    pub resolver_id: Option<String>,
    pub approver_id: Option<String>,
}

/// Request body for DELETE /.
#[derive(Debug, Deserialize)]
pub struct UnassignRequest {
    #[serde(flatten)]
    pub actor: ActorBody,
    pub ticket_id: Uuid,
    pub user_id: String,
    pub role: AssigneeRole,
}

/// Response body for DELETE /.
#[derive(Debug, Serialize)]
pub struct UnassignResponse {
    pub event_id: Uuid,
}

fn batch_status(all_succeeded: bool) -> StatusCode {
    if all_succeeded {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    }
}

/// POST /
#[instrument(skip(state, request), fields(user_id = %request.user_id, role = %request.role))]
async fn assign(
    State(state): State<AppState>,
    Json(request): Json<AssignRequest>,
) -> Result<(StatusCode, Json<AssignmentReport>), ApiError> {
    let command = AssignRole {
        correlation_id: Uuid::new_v4(),
        actor: request.actor.actor()?,
        ticket_ids: request.ticket_ids,
        user_id: request.user_id,
        role: request.role,
    };

    info!(correlation_id = %command.correlation_id, "handling assign_role command");

    let report =
        handle_assign_role(&command, state.clock.as_ref(), state.assignment_stores()).await?;
    Ok((batch_status(report.failed_count() == 0), Json(report)))
}

/// POST /bulk
#[instrument(skip(state, request))]
async fn assign_team(
    State(state): State<AppState>,
    Json(request): Json<AssignTeamRequest>,
) -> Result<(StatusCode, Json<TeamAssignmentReport>), ApiError> {
    let command = AssignTeam {
        correlation_id: Uuid::new_v4(),
        actor: request.actor.actor()?,
        ticket_ids: request.ticket_ids,
        resolver_id: request.resolver_id,
        approver_id: request.approver_id,
    };

    info!(correlation_id = %command.correlation_id, "handling assign_team command");

    let report =
        handle_assign_team(&command, state.clock.as_ref(), state.assignment_stores()).await?;
    let clean = [&report.resolver, &report.approver]
        .into_iter()
        .flatten()
        .all(|half| half.failed_count() == 0);
    Ok((batch_status(clean), Json(report)))
}

/// DELETE /
#[instrument(
    skip(state, request),
    fields(ticket_id = %request.ticket_id, user_id = %request.user_id)
)]
async fn unassign(
    State(state): State<AppState>,
    Json(request): Json<UnassignRequest>,
) -> Result<Json<UnassignResponse>, ApiError> {
    let command = UnassignRole {
        correlation_id: Uuid::new_v4(),
        actor: request.actor.actor()?,
        ticket_id: request.ticket_id,
        user_id: request.user_id,
        role: request.role,
    };

    let stored =
        handle_unassign_role(&command, state.clock.as_ref(), state.assignment_stores()).await?;
    Ok(Json(UnassignResponse {
        event_id: stored.event_id,
    }))
}

/// Returns the router for the assignment context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(assign).delete(unassign))
        .route("/bulk", post(assign_team))
}
