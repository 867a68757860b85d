//! `PostgreSQL` implementation of the `TicketRepository` trait.

use async_trait::async_trait;
use invigil_core::error::DomainError;
use invigil_core::repository::{TicketRepository, WriteGuard};
use invigil_core::ticket::{Page, PageRequest, TicketFilter, TicketRecord};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::error::unavailable;
use crate::rows::TicketRow;
use crate::schema::{TICKET_COLUMNS, TICKET_NUMBER_SEQUENCE, TICKETS_TABLE};

/// PostgreSQL-backed ticket repository.
#[derive(Debug, Clone)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    /// Creates a new `PgTicketRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(
        &self,
        mut query: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<TicketRecord>, DomainError> {
        query
            .build_query_as::<TicketRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(TicketRecord::try_from)
            .collect()
    }
}

fn select_tickets() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!("SELECT {TICKET_COLUMNS} FROM {TICKETS_TABLE} t"))
}

/// Escapes `LIKE` metacharacters and wraps the term for substring match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn lowercased(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

fn push_assigned_as(query: &mut QueryBuilder<'_, Postgres>, role: &str, user_ids: &[String]) {
    if user_ids.is_empty() {
        return;
    }
    query
        .push(" AND EXISTS (SELECT 1 FROM ticket_assignees a")
        .push(" WHERE a.ticket_id = t.id AND a.role = ")
        .push_bind(role.to_owned())
        .push(" AND a.user_id = ANY(")
        .push_bind(user_ids.to_vec())
        .push("))");
}

/// Appends the `WHERE` clause for `filter`. Empty sets do not constrain.
fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &TicketFilter) {
    query.push(" WHERE TRUE");
    if !filter.include_deleted {
        query.push(" AND NOT t.is_deleted");
    }
    if !filter.statuses.is_empty() {
        let statuses: Vec<String> = filter.statuses.iter().map(|s| s.as_str().to_owned()).collect();
        query.push(" AND t.status = ANY(").push_bind(statuses).push(")");
    }
    if !filter.severities.is_empty() {
        let severities: Vec<String> = filter
            .severities
            .iter()
            .map(|s| s.as_str().to_owned())
            .collect();
        query
            .push(" AND lower(t.severity) = ANY(")
            .push_bind(severities)
            .push(")");
    }
    if !filter.categories.is_empty() {
        query
            .push(" AND lower(t.category) = ANY(")
            .push_bind(lowercased(&filter.categories))
            .push(")");
    }
    if !filter.cities.is_empty() {
        query
            .push(" AND lower(t.city) = ANY(")
            .push_bind(lowercased(&filter.cities))
            .push(")");
    }
    if !filter.resource_ids.is_empty() {
        query
            .push(" AND t.resource_id = ANY(")
            .push_bind(filter.resource_ids.clone())
            .push(")");
    }
    if let Some(from) = filter.created_from {
        query.push(" AND t.submitted_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        query.push(" AND t.submitted_at <= ").push_bind(to);
    }

    let terms = filter.search_terms();
    if !terms.is_empty() {
        query.push(" AND (");
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                query.push(" OR ");
            }
            let pattern = like_pattern(term);
            query
                .push("t.ticket_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.category ILIKE ")
                .push_bind(pattern);
        }
        query.push(")");
    }

    push_assigned_as(query, "resolver", &filter.resolver_ids);
    push_assigned_as(query, "approver", &filter.approver_ids);
}

/// Builds the single-row update. A row already soft-deleted never matches,
/// so a write computed from a stale snapshot cannot bring it back.
fn update_ticket(ticket: &TicketRecord, guard: WriteGuard) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new(format!("UPDATE {TICKETS_TABLE} SET status = "));
    query
        .push_bind(ticket.status.as_str().to_owned())
        .push(", last_activity_at = ")
        .push_bind(ticket.last_activity_at)
        .push(", resolved_at = ")
        .push_bind(ticket.resolved_at)
        .push(", dependency_since = ")
        .push_bind(ticket.dependency_since)
        .push(", reopen_count = ")
        .push_bind(ticket.reopen_count)
        .push(", resolution_note = ")
        .push_bind(ticket.resolution_note.clone())
        .push(", sla_target_hours = ")
        .push_bind(ticket.sla_target_hours)
        .push(", is_sla_breached = ")
        .push_bind(ticket.is_sla_breached)
        .push(", resolution_time_hours = ")
        .push_bind(ticket.resolution_time_hours)
        .push(", is_deleted = ")
        .push_bind(ticket.is_deleted)
        .push(" WHERE id = ")
        .push_bind(ticket.id)
        .push(" AND NOT is_deleted");
    if let WriteGuard::ExpectStatus(expected) = guard {
        query.push(" AND status = ").push_bind(expected.as_str().to_owned());
    }
    query
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn next_ticket_number(&self) -> Result<String, DomainError> {
        let next: i64 = sqlx::query_scalar(&format!("SELECT nextval('{TICKET_NUMBER_SEQUENCE}')"))
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(format!("TKT-{next:06}"))
    }

    async fn insert(&self, ticket: &TicketRecord) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO tickets (
                id, ticket_number, category, severity, description, city, centre_code,
                resource_id, exam_date, submitted_by, is_anonymous, status, submitted_at,
                last_activity_at, resolved_at, dependency_since, reopen_count,
                resolution_note, sla_target_hours, is_sla_breached, resolution_time_hours,
                is_deleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22)
            ",
        )
        .bind(ticket.id)
        .bind(&ticket.ticket_number)
        .bind(&ticket.category)
        .bind(ticket.severity.as_str())
        .bind(&ticket.description)
        .bind(&ticket.city)
        .bind(&ticket.centre_code)
        .bind(&ticket.resource_id)
        .bind(ticket.exam_date)
        .bind(&ticket.submitted_by)
        .bind(ticket.is_anonymous)
        .bind(ticket.status.as_str())
        .bind(ticket.submitted_at)
        .bind(ticket.last_activity_at)
        .bind(ticket.resolved_at)
        .bind(ticket.dependency_since)
        .bind(ticket.reopen_count)
        .bind(&ticket.resolution_note)
        .bind(ticket.sla_target_hours)
        .bind(ticket.is_sla_breached)
        .bind(ticket.resolution_time_hours)
        .bind(ticket.is_deleted)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TicketRecord>, DomainError> {
        let mut query = select_tickets();
        query.push(" WHERE t.id = ").push_bind(id);
        Ok(self.fetch(query).await?.into_iter().next())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<TicketRecord>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = select_tickets();
        query.push(" WHERE t.id = ANY(").push_bind(ids.to_vec()).push(")");
        self.fetch(query).await
    }

    async fn list(
        &self,
        filter: &TicketFilter,
        page: PageRequest,
    ) -> Result<Page<TicketRecord>, DomainError> {
        let mut count =
            QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {TICKETS_TABLE} t"));
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;

        let mut query = select_tickets();
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY t.submitted_at DESC, t.ticket_number DESC LIMIT ")
            .push_bind(i64::from(page.page_size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        let items = self.fetch(query).await?;
        debug!(total, returned = items.len(), "tickets listed");

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or_default(),
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn list_all(&self, filter: &TicketFilter) -> Result<Vec<TicketRecord>, DomainError> {
        let mut query = select_tickets();
        push_filter(&mut query, filter);
        query.push(" ORDER BY t.submitted_at DESC, t.ticket_number DESC");
        self.fetch(query).await
    }

    async fn update(&self, ticket: &TicketRecord, guard: WriteGuard) -> Result<bool, DomainError> {
        let mut query = update_ticket(ticket, guard);
        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(result.rows_affected() == 1)
    }
}
