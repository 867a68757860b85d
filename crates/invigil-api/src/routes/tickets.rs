//! Routes for the ticket lifecycle: submission, listing, status changes,
//! reopen, soft delete, and the per-ticket activity and assignment log.

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use invigil_activity::application::query_handlers::{ActivityView, get_ticket_activity};
use invigil_assignment::application::query_handlers::get_assignment_log;
use invigil_core::error::DomainError;
use invigil_core::repository::AssignmentLogEntry;
use invigil_core::ticket::{
    Page, PageRequest, Severity, TicketFilter, TicketRecord, TicketStatus,
};
use invigil_tickets::application::{command_handlers, query_handlers};
use invigil_tickets::domain::commands::{
    CreateTicket, NewTicket, ReopenTicket, SoftDeleteTicket, TransitionStatus,
};
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::activity::live_feed;
use crate::routes::{ActorBody, split_list};
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    #[serde(flatten)]
    pub actor: ActorBody,
    pub category: String,
    /// `sev1`..`sev3`; anything else is stored as `unknown`.
    pub severity: String,
    pub description: String,
    pub city: String,
    pub centre_code: String,
    pub resource_id: Option<String>,
    pub exam_date: Option<NaiveDate>,
    /// Omit for an anonymous report.
    pub submitted_by: Option<String>,
}

/// Request body for POST /{id}/status.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    #[serde(flatten)]
    pub actor: ActorBody,
    pub status: TicketStatus,
}

/// Query string for GET /. List values are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    #[serde(alias = "resolver_id")]
    pub resolver_ids: Option<String>,
    #[serde(alias = "approver_id")]
    pub approver_ids: Option<String>,
    #[serde(alias = "resource_id")]
    pub resource_ids: Option<String>,
    pub search: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListTicketsQuery {
    fn filter(&self) -> Result<TicketFilter, ApiError> {
        let statuses = split_list(self.status.as_deref())
            .iter()
            .map(|raw| raw.parse::<TicketStatus>().map_err(ApiError::validation))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TicketFilter {
            statuses,
            severities: split_list(self.severity.as_deref())
                .iter()
                .map(|raw| Severity::parse_lenient(raw))
                .collect(),
            categories: split_list(self.category.as_deref()),
            cities: split_list(self.city.as_deref()),
            resolver_ids: split_list(self.resolver_ids.as_deref()),
            approver_ids: split_list(self.approver_ids.as_deref()),
            resource_ids: split_list(self.resource_ids.as_deref()),
            search: self.search.clone(),
            created_from: self.created_from,
            created_to: self.created_to,
            include_deleted: self.include_deleted,
        })
    }

    fn page(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(default.page),
            page_size: self.page_size.unwrap_or(default.page_size),
        }
    }
}

/// Response body for DELETE /{id}.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// IDs of the activity events recorded.
    pub event_ids: Vec<Uuid>,
}

/// POST /
#[instrument(skip(state, request), fields(actor_id = %request.actor.actor_id))]
async fn create_ticket(
    State(state): State<AppState>,
    Json(request): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketRecord>), ApiError> {
    let command = CreateTicket {
        correlation_id: Uuid::new_v4(),
        actor: request.actor.actor()?,
        ticket: NewTicket {
            category: request.category,
            severity: Severity::parse_lenient(&request.severity),
            description: request.description,
            city: request.city,
            centre_code: request.centre_code,
            resource_id: request.resource_id,
            exam_date: request.exam_date,
            submitted_by: request.submitted_by,
        },
    };

    info!(correlation_id = %command.correlation_id, "handling create_ticket command");

    let ticket = command_handlers::handle_create_ticket(
        &command,
        state.clock.as_ref(),
        state.tickets.as_ref(),
        state.events.as_ref(),
        state.effects(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /
#[instrument(skip(state, query))]
async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<ListTicketsQuery>,
) -> Result<Json<Page<TicketRecord>>, ApiError> {
    let filter = query.filter()?;
    let page = query_handlers::list_tickets(&filter, query.page(), state.tickets.as_ref()).await?;
    Ok(Json(page))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<query_handlers::TicketView>, ApiError> {
    let view = query_handlers::get_ticket_by_id(
        ticket_id,
        state.tickets.as_ref(),
        state.assignees.as_ref(),
    )
    .await?;
    Ok(Json(view))
}

/// POST /{id}/status
#[instrument(skip(state, request), fields(to = %request.status))]
async fn transition_status(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<TicketRecord>, ApiError> {
    let command = TransitionStatus {
        correlation_id: Uuid::new_v4(),
        actor: request.actor.actor()?,
        ticket_id,
        to: request.status,
    };

    info!(correlation_id = %command.correlation_id, "handling transition_status command");

    let ticket = command_handlers::handle_transition_status(
        &command,
        state.clock.as_ref(),
        state.tickets.as_ref(),
        state.events.as_ref(),
        state.effects(),
    )
    .await?;

    Ok(Json(ticket))
}

/// POST /{id}/reopen
#[instrument(skip(state, request))]
async fn reopen_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<ActorBody>,
) -> Result<Json<TicketRecord>, ApiError> {
    let command = ReopenTicket {
        correlation_id: Uuid::new_v4(),
        actor: request.actor()?,
        ticket_id,
    };

    let ticket = command_handlers::handle_reopen_ticket(
        &command,
        state.clock.as_ref(),
        state.tickets.as_ref(),
        state.events.as_ref(),
        state.effects(),
    )
    .await?;

    Ok(Json(ticket))
}

/// DELETE /{id}
#[instrument(skip(state, request))]
async fn delete_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<ActorBody>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let command = SoftDeleteTicket {
        correlation_id: Uuid::new_v4(),
        actor: request.actor()?,
        ticket_id,
    };

    let stored = command_handlers::handle_soft_delete_ticket(
        &command,
        state.clock.as_ref(),
        state.tickets.as_ref(),
        state.events.as_ref(),
        &state.bus,
    )
    .await?;

    Ok(Json(DeleteResponse {
        event_ids: stored.iter().map(|e| e.event_id).collect(),
    }))
}

/// GET /{id}/activity
#[instrument(skip(state))]
async fn ticket_activity(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Vec<ActivityView>>, ApiError> {
    let entries = get_ticket_activity(
        ticket_id,
        &state.reconcile_policy,
        state.tickets.as_ref(),
        state.events.as_ref(),
    )
    .await?;
    Ok(Json(entries))
}

/// GET /{id}/activity/stream
#[instrument(skip(state))]
async fn stream_ticket_activity(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    match state.tickets.get(ticket_id).await? {
        Some(ticket) if !ticket.is_deleted => {
            Ok(live_feed(state.bus.subscribe_ticket(ticket_id)))
        }
        _ => Err(DomainError::no_such_ticket(ticket_id).into()),
    }
}

/// GET /{id}/assignment-log
#[instrument(skip(state))]
async fn assignment_log(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Vec<AssignmentLogEntry>>, ApiError> {
    let log =
        get_assignment_log(ticket_id, state.tickets.as_ref(), state.assignees.as_ref()).await?;
    Ok(Json(log))
}

/// Returns the router for the ticket context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_ticket).get(list_tickets))
        .route("/{id}", get(get_ticket).delete(delete_ticket))
        .route("/{id}/status", post(transition_status))
        .route("/{id}/reopen", post(reopen_ticket))
        .route("/{id}/activity", get(ticket_activity))
        .route("/{id}/activity/stream", get(stream_ticket_activity))
        .route("/{id}/assignment-log", get(assignment_log))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use invigil_core::repository::EventStream;
    use invigil_test_support::{
        FailingStore, FixedClock, InMemoryStore, RecordingNotifier, stored_event, ticket_record,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn clock() -> FixedClock {
        FixedClock::at(2026, 3, 10, 8, 0)
    }

    fn app_state_with(store: Arc<InMemoryStore>) -> AppState {
        AppState::with_store(store, Arc::new(clock()), Arc::new(RecordingNotifier::default()))
    }

    fn failing_app_state() -> AppState {
        AppState::with_store(
            Arc::new(FailingStore),
            Arc::new(clock()),
            Arc::new(RecordingNotifier::default()),
        )
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn seeded(store: &InMemoryStore, status: TicketStatus) -> Uuid {
        let ticket = ticket_record("TKT-000001", status, Severity::Sev2, clock().0);
        let id = ticket.id;
        store.put_ticket(ticket);
        id
    }

    #[tokio::test]
    async fn test_create_ticket_returns_201_with_open_ticket() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let app = router().with_state(app_state_with(Arc::clone(&store)));
        let body = serde_json::json!({
            "actor_id": "ops-1",
            "actor_role": "admin",
            "category": "Venue",
            "severity": "SEV2",
            "description": "Biometric scanner offline",
            "city": "Pune",
            "centre_code": "PN-014",
        });

        // Act
        let response = app.oneshot(json_request("POST", "/", &body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["status"], "open");
        assert_eq!(json["severity"], "sev2");
        assert_eq!(json["is_anonymous"], true);
        assert_eq!(store.history().len(), 1);
    }

    #[tokio::test]
    async fn test_create_ticket_returns_400_for_blank_description() {
        // Arrange
        let app = router().with_state(app_state_with(Arc::new(InMemoryStore::new())));
        let body = serde_json::json!({
            "actor_id": "ops-1",
            "actor_role": "admin",
            "category": "Venue",
            "severity": "sev1",
            "description": "   ",
            "city": "Pune",
            "centre_code": "PN-014",
        });

        // Act
        let response = app.oneshot(json_request("POST", "/", &body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_create_ticket_returns_422_for_missing_fields() {
        // Arrange
        let app = router().with_state(app_state_with(Arc::new(InMemoryStore::new())));

        // Act
        let response = app
            .oneshot(json_request("POST", "/", &serde_json::json!({})))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_transition_returns_200_with_new_status() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let id = seeded(&store, TicketStatus::Open);
        let app = router().with_state(app_state_with(Arc::clone(&store)));
        let body = serde_json::json!({
            "actor_id": "res-1",
            "actor_role": "resolver",
            "status": "in_progress",
        });

        // Act
        let response = app
            .oneshot(json_request("POST", &format!("/{id}/status"), &body))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "in_progress");
        assert_eq!(store.ticket(id).unwrap().status, TicketStatus::InProgress);
    }

    #[tokio::test]
    async fn test_resolver_cannot_approve_returns_409() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let id = seeded(&store, TicketStatus::SendForApproval);
        let app = router().with_state(app_state_with(Arc::clone(&store)));
        let body = serde_json::json!({
            "actor_id": "res-1",
            "actor_role": "resolver",
            "status": "approved",
        });

        // Act
        let response = app
            .oneshot(json_request("POST", &format!("/{id}/status"), &body))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"], "invalid_transition");
        assert!(store.history().is_empty());
    }

    #[tokio::test]
    async fn test_transition_on_unknown_ticket_returns_404() {
        // Arrange
        let app = router().with_state(app_state_with(Arc::new(InMemoryStore::new())));
        let body = serde_json::json!({
            "actor_id": "res-1",
            "actor_role": "resolver",
            "status": "in_progress",
        });

        // Act
        let response = app
            .oneshot(json_request("POST", &format!("/{}/status", Uuid::new_v4()), &body))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_store_outage_returns_503() {
        // Arrange
        let app = router().with_state(failing_app_state());
        let body = serde_json::json!({
            "actor_id": "res-1",
            "actor_role": "resolver",
            "status": "in_progress",
        });

        // Act
        let response = app
            .oneshot(json_request("POST", &format!("/{}/status", Uuid::new_v4()), &body))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["error"], "dependency_unavailable");
    }

    #[tokio::test]
    async fn test_reopen_returns_open_ticket_with_bumped_count() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let id = seeded(&store, TicketStatus::InProgress);
        let app = router().with_state(app_state_with(Arc::clone(&store)));
        let body = serde_json::json!({ "actor_id": "appr-1", "actor_role": "approver" });

        // Act
        let response = app
            .oneshot(json_request("POST", &format!("/{id}/reopen"), &body))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "open");
        assert_eq!(json["reopen_count"], 1);
    }

    #[tokio::test]
    async fn test_delete_hides_ticket_from_get() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let id = seeded(&store, TicketStatus::Open);
        let state = app_state_with(Arc::clone(&store));
        let body = serde_json::json!({ "actor_id": "ops-1", "actor_role": "admin" });

        // Act
        let deleted = router()
            .with_state(state.clone())
            .oneshot(json_request("DELETE", &format!("/{id}"), &body))
            .await
            .unwrap();
        let fetched = router()
            .with_state(state)
            .oneshot(get_request(&format!("/{id}")))
            .await
            .unwrap();

        // Assert
        assert_eq!(deleted.status(), StatusCode::OK);
        assert_eq!(body_json(deleted).await["event_ids"].as_array().unwrap().len(), 1);
        assert_eq!(fetched.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_filters_by_status_list() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        for (number, status) in [
            ("TKT-000001", TicketStatus::Open),
            ("TKT-000002", TicketStatus::InProgress),
            ("TKT-000003", TicketStatus::Approved),
        ] {
            store.put_ticket(ticket_record(number, status, Severity::Sev3, clock().0));
        }
        let app = router().with_state(app_state_with(store));

        // Act
        let response = app
            .oneshot(get_request("/?status=open,in_progress&page_size=10"))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["total"], 2);
        assert_eq!(json["page_size"], 10);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_status() {
        // Arrange
        let app = router().with_state(app_state_with(Arc::new(InMemoryStore::new())));

        // Act
        let response = app.oneshot(get_request("/?status=closed")).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_rejects_oversized_page() {
        // Arrange
        let app = router().with_state(app_state_with(Arc::new(InMemoryStore::new())));

        // Act
        let response = app.oneshot(get_request("/?page_size=500")).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ticket_activity_collapses_duplicate_stream_entries() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let id = seeded(&store, TicketStatus::InProgress);
        let at = clock().0;
        store.put_event(
            EventStream::History,
            stored_event(id, "status_changed", Some("open"), Some("in_progress"), "res-1", at),
        );
        store.put_event(
            EventStream::Timeline,
            stored_event(
                id,
                "status_change",
                Some("open"),
                Some("in_progress"),
                "res-1",
                at + chrono::Duration::seconds(1),
            ),
        );
        let app = router().with_state(app_state_with(store));

        // Act
        let response = app
            .oneshot(get_request(&format!("/{id}/activity")))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["action"], "status_changed");
        assert_eq!(entries[0]["is_bulk"], false);
    }

    #[tokio::test]
    async fn test_assignment_log_for_unknown_ticket_returns_404() {
        // Arrange
        let app = router().with_state(app_state_with(Arc::new(InMemoryStore::new())));

        // Act
        let response = app
            .oneshot(get_request(&format!("/{}/assignment-log", Uuid::new_v4())))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ticket_stream_only_pushes_that_tickets_events() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let ticket = ticket_record("TKT-000001", TicketStatus::Open, Severity::Sev2, clock().0);
        let id = ticket.id;
        store.put_ticket(ticket);
        let state = app_state_with(store);
        let response = router()
            .with_state(state.clone())
            .oneshot(get_request(&format!("/{id}/activity/stream")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Act
        state.bus.publish(stored_event(
            Uuid::new_v4(),
            "created",
            None,
            Some("open"),
            "desk-2",
            clock().0,
        ));
        state.bus.publish(stored_event(
            id,
            "status_changed",
            Some("open"),
            Some("in_progress"),
            "res-1",
            clock().0,
        ));
        let frame = response.into_body().frame().await.unwrap().unwrap();

        // Assert
        let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(text.contains(&id.to_string()));
        assert!(text.contains("res-1 changed the status from open to in progress"));
    }

    #[tokio::test]
    async fn test_ticket_stream_for_unknown_ticket_returns_404() {
        let app = router().with_state(app_state_with(Arc::new(InMemoryStore::new())));

        let response = app
            .oneshot(get_request(&format!("/{}/activity/stream", Uuid::new_v4())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
