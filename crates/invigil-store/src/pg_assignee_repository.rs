//! `PostgreSQL` implementation of the `AssigneeRepository` trait.
//!
//! Live bindings are a many-to-many table keyed on
//! `(ticket_id, user_id, role)`. Rows are inserted or deleted, never updated.

use async_trait::async_trait;
use invigil_core::actor::AssigneeRole;
use invigil_core::error::DomainError;
use invigil_core::repository::{Assignee, AssigneeRepository, AssignmentLogEntry};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::unavailable;
use crate::rows::{AssigneeRow, AssignmentLogRow};

/// PostgreSQL-backed assignee repository.
#[derive(Debug, Clone)]
pub struct PgAssigneeRepository {
    pool: PgPool,
}

impl PgAssigneeRepository {
    /// Creates a new `PgAssigneeRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssigneeRepository for PgAssigneeRepository {
    async fn add(&self, assignee: &Assignee) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r"
            INSERT INTO ticket_assignees (ticket_id, user_id, role, assigned_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (ticket_id, user_id, role) DO NOTHING
            ",
        )
        .bind(assignee.ticket_id)
        .bind(&assignee.user_id)
        .bind(assignee.role.as_str())
        .bind(assignee.assigned_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove(
        &self,
        ticket_id: Uuid,
        user_id: &str,
        role: AssigneeRole,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "DELETE FROM ticket_assignees WHERE ticket_id = $1 AND user_id = $2 AND role = $3",
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<Assignee>, DomainError> {
        sqlx::query_as::<_, AssigneeRow>(
            r"
            SELECT ticket_id, user_id, role, assigned_at
            FROM ticket_assignees
            WHERE ticket_id = $1
            ORDER BY assigned_at, user_id
            ",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?
        .into_iter()
        .map(Assignee::try_from)
        .collect()
    }

    async fn record(&self, entry: &AssignmentLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO ticket_assignment_log
                (id, ticket_id, user_id, role, change, performed_by, performed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(entry.id)
        .bind(entry.ticket_id)
        .bind(&entry.user_id)
        .bind(entry.role.as_str())
        .bind(entry.change.as_str())
        .bind(&entry.performed_by)
        .bind(entry.performed_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn history(&self, ticket_id: Uuid) -> Result<Vec<AssignmentLogEntry>, DomainError> {
        sqlx::query_as::<_, AssignmentLogRow>(
            r"
            SELECT id, ticket_id, user_id, role, change, performed_by, performed_at
            FROM ticket_assignment_log
            WHERE ticket_id = $1
            ORDER BY performed_at
            ",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?
        .into_iter()
        .map(AssignmentLogEntry::try_from)
        .collect()
    }
}
