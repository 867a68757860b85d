//! Routes for triggering the sweeps by hand.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use invigil_resolution::application::command_handlers::{
    SweepReport, run_auto_resolve, run_cleanup, run_sla_refresh,
};
use invigil_resolution::domain::commands::{RunSweep, TriggeredBy};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for every sweep trigger.
#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    /// Operator who asked for the run; recorded in event details.
    pub operator_id: String,
}

impl TriggerRequest {
    fn command(&self) -> Result<RunSweep, ApiError> {
        let operator = self.operator_id.trim();
        if operator.is_empty() {
            return Err(ApiError::validation("operator_id must not be blank"));
        }
        Ok(RunSweep::new(TriggeredBy::Manual {
            operator: operator.to_owned(),
        }))
    }
}

/// Response body for the resolving sweeps. A sweep that ran reports
/// success even when some tickets failed; those are listed in `errors`.
#[derive(Debug, Serialize)]
pub struct ResolveSweepResponse {
    pub success: bool,
    pub resolved_count: usize,
    pub errors: Vec<String>,
}

impl From<SweepReport> for ResolveSweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            success: true,
            resolved_count: report.processed_count,
            errors: report.errors,
        }
    }
}

/// Response body for POST /sla-refresh.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    /// Tickets newly flagged as breached.
    pub refreshed_count: usize,
    pub errors: Vec<String>,
}

/// POST /auto-resolve
#[instrument(skip(state, request), fields(operator_id = %request.operator_id))]
async fn auto_resolve(
    State(state): State<AppState>,
    Json(request): Json<TriggerRequest>,
) -> Result<Json<ResolveSweepResponse>, ApiError> {
    let command = request.command()?;
    info!(correlation_id = %command.correlation_id, "manual auto-resolve sweep");

    let report = run_auto_resolve(
        &command,
        state.sweep_policy,
        state.clock.as_ref(),
        state.tickets.as_ref(),
        state.events.as_ref(),
        state.effects(),
    )
    .await?;
    Ok(Json(report.into()))
}

/// POST /cleanup
#[instrument(skip(state, request), fields(operator_id = %request.operator_id))]
async fn cleanup(
    State(state): State<AppState>,
    Json(request): Json<TriggerRequest>,
) -> Result<Json<ResolveSweepResponse>, ApiError> {
    let command = request.command()?;
    info!(correlation_id = %command.correlation_id, "manual cleanup sweep");

    let report = run_cleanup(
        &command,
        state.sweep_policy,
        state.clock.as_ref(),
        state.tickets.as_ref(),
        state.events.as_ref(),
        state.effects(),
    )
    .await?;
    Ok(Json(report.into()))
}

/// POST /sla-refresh
#[instrument(skip(state, request), fields(operator_id = %request.operator_id))]
async fn sla_refresh(
    State(state): State<AppState>,
    Json(request): Json<TriggerRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let command = request.command()?;
    info!(correlation_id = %command.correlation_id, "manual sla refresh");

    let report = run_sla_refresh(
        &command,
        state.clock.as_ref(),
        state.tickets.as_ref(),
        state.events.as_ref(),
        state.effects(),
    )
    .await?;
    Ok(Json(RefreshResponse {
        success: true,
        refreshed_count: report.processed_count,
        errors: report.errors,
    }))
}

/// Returns the router for the sweep triggers.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auto-resolve", post(auto_resolve))
        .route("/cleanup", post(cleanup))
        .route("/sla-refresh", post(sla_refresh))
}
