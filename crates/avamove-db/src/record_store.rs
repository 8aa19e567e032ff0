//! Avatar record repository: reads and path updates for the avatars table.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use avamove_core::{AvatarRecord, MigrateError};

/// Row type for the avatars table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
struct AvatarRow {
    id: i64,
    path: String,
}

impl AvatarRow {
    fn into_record(self) -> AvatarRecord {
        AvatarRecord {
            id: self.id,
            path: self.path,
        }
    }
}

/// Trait for avatar record operations
/// This abstracts the database implementation (PostgreSQL)
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch every avatar record.
    async fn fetch_all(&self) -> Result<Vec<AvatarRecord>, MigrateError>;

    /// Fetch records whose path starts with `prefix`, ordered by id.
    ///
    /// `limit` bounds the batch; `None` fetches everything.
    async fn fetch_prefixed(
        &self,
        prefix: &str,
        limit: Option<i64>,
    ) -> Result<Vec<AvatarRecord>, MigrateError>;

    /// Point a record at a new path.
    ///
    /// Returns `false` when the record no longer exists.
    async fn update_path(&self, id: i64, new_path: &str) -> Result<bool, MigrateError>;
}

/// Escape LIKE wildcards so a prefix is matched literally.
fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Repository for the avatars table.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[tracing::instrument(skip(self), fields(db.table = "avatars"))]
    async fn fetch_all(&self) -> Result<Vec<AvatarRecord>, MigrateError> {
        let rows: Vec<AvatarRow> =
            sqlx::query_as::<Postgres, AvatarRow>("SELECT id, path FROM avatars ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|r| r.into_record()).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "avatars", prefix = %prefix))]
    async fn fetch_prefixed(
        &self,
        prefix: &str,
        limit: Option<i64>,
    ) -> Result<Vec<AvatarRecord>, MigrateError> {
        let pattern = format!("{}%", escape_like(prefix));
        // LIMIT NULL applies no limit.
        let rows: Vec<AvatarRow> = sqlx::query_as::<Postgres, AvatarRow>(
            r#"SELECT id, path FROM avatars WHERE path LIKE $1 ESCAPE '\' ORDER BY id LIMIT $2"#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into_record()).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "avatars", db.record_id = %id))]
    async fn update_path(&self, id: i64, new_path: &str) -> Result<bool, MigrateError> {
        let result = sqlx::query("UPDATE avatars SET path = $2 WHERE id = $1")
            .bind(id)
            .bind(new_path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
