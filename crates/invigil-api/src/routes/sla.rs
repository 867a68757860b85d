//! Route for SLA compliance reporting.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use invigil_core::ticket::{Severity, TicketFilter};
use invigil_resolution::application::query_handlers::get_compliance_report;
use invigil_tickets::domain::sla::ComplianceReport;
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::routes::split_list;
use crate::state::AppState;

/// Query string for GET /compliance. List values are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ComplianceParams {
    pub severity: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl ComplianceParams {
    fn filter(&self) -> Result<TicketFilter, ApiError> {
        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from > to {
                return Err(ApiError::validation(
                    "created_from must not be after created_to",
                ));
            }
        }
        Ok(TicketFilter {
            severities: split_list(self.severity.as_deref())
                .iter()
                .map(|raw| Severity::parse_lenient(raw))
                .collect(),
            categories: split_list(self.category.as_deref()),
            cities: split_list(self.city.as_deref()),
            created_from: self.created_from,
            created_to: self.created_to,
            ..TicketFilter::default()
        })
    }
}

/// GET /compliance
#[instrument(skip(state, params))]
async fn compliance(
    State(state): State<AppState>,
    Query(params): Query<ComplianceParams>,
) -> Result<Json<ComplianceReport>, ApiError> {
    let filter = params.filter()?;
    let report =
        get_compliance_report(&filter, state.clock.as_ref(), state.tickets.as_ref()).await?;
    Ok(Json(report))
}

/// Returns the router for SLA reporting.
pub fn router() -> Router<AppState> {
    Router::new().route("/compliance", get(compliance))
}
