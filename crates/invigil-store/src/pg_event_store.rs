//! `PostgreSQL` implementation of the `EventStore` trait.
//!
//! Appends always go to the history stream. The timeline stream is legacy
//! and only ever read.

use async_trait::async_trait;
use invigil_core::error::DomainError;
use invigil_core::repository::{EventQuery, EventStore, EventStream, StoredEvent};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::unavailable;
use crate::rows::EventRow;
use crate::schema::{EVENT_COLUMNS, HISTORY_SCHEMA_VERSION, stream_table};

/// PostgreSQL-backed activity event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn select_events(stream: EventStream, query: &EventQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {EVENT_COLUMNS} FROM {} WHERE TRUE",
        stream_table(stream)
    ));
    if let Some(ticket_id) = query.ticket_id {
        builder.push(" AND ticket_id = ").push_bind(ticket_id);
    }
    if let Some(since) = query.since {
        builder.push(" AND performed_at >= ").push_bind(since);
    }
    builder.push(" ORDER BY performed_at DESC, recorded_seq DESC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ").push_bind(i64::from(limit));
    }
    builder
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: &StoredEvent) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO ticket_history (
                event_id, ticket_id, action, old_value, new_value, performed_by,
                performed_by_role, performed_at, details, correlation_id, schema_version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(event.event_id)
        .bind(event.ticket_id)
        .bind(&event.action)
        .bind(&event.old_value)
        .bind(&event.new_value)
        .bind(&event.performed_by)
        .bind(&event.performed_by_role)
        .bind(event.performed_at)
        .bind(&event.details)
        .bind(event.correlation_id)
        .bind(HISTORY_SCHEMA_VERSION)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn load(
        &self,
        stream: EventStream,
        query: &EventQuery,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = select_events(stream, query)
            .build_query_as::<EventRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }
}
