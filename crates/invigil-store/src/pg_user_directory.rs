//! `PostgreSQL` implementation of the `UserDirectory` trait.

use async_trait::async_trait;
use invigil_core::error::DomainError;
use invigil_core::repository::{UserDirectory, UserRecord};
use sqlx::PgPool;

use crate::error::unavailable;
use crate::rows::UserRow;

/// Read-only user lookup over the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Creates a new `PgUserDirectory`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, DomainError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, display_name, city, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(row.map(UserRecord::from))
    }
}
