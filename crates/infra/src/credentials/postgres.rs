//! Postgres-backed refresh-token store.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE refresh_tokens (
//!     token       TEXT PRIMARY KEY,
//!     user_id     BIGINT NOT NULL,
//!     created_at  TIMESTAMPTZ NOT NULL,
//!     expires_at  TIMESTAMPTZ NOT NULL
//! );
//! CREATE INDEX refresh_tokens_user_id_idx ON refresh_tokens (user_id);
//! ```
//!
//! ## Rotation
//!
//! `replace` runs `DELETE ... RETURNING` and the `INSERT` in one transaction.
//! When two transactions delete the same token concurrently, the second one
//! blocks on the row lock, re-evaluates after the first commits, finds the
//! row gone and therefore does not see the token among its deleted rows. It
//! rolls back and reports `Rejected`. A request cancelled between the delete
//! and the insert drops the transaction, which rolls back as well.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | anything else | - | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use registrar_auth::{
    CredentialStore, RecordFilter, RefreshTokenRecord, RotationOutcome, StoreError,
};
use registrar_core::UserId;

type RecordRow = (String, i64, DateTime<Utc>, DateTime<Utc>);

fn to_record((token, user_id, created_at, expires_at): RecordRow) -> RefreshTokenRecord {
    RefreshTokenRecord {
        token,
        user_id: UserId::new(user_id),
        created_at,
        expires_at,
    }
}

#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: Arc<PgPool>,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    #[instrument(skip_all, err)]
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT token, user_id, created_at, expires_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_token", e))?;

        Ok(row.map(to_record))
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT token, user_id, created_at, expires_at
            FROM refresh_tokens
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_user", e))?;

        Ok(rows.into_iter().map(to_record).collect())
    }

    #[instrument(skip_all, fields(user_id = %record.user_id), err)]
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        insert_record(&mut conn, &record).await
    }

    #[instrument(skip_all, fields(user_id = %filter.user_id()), err)]
    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        let deleted = delete_matching(&mut conn, filter).await?;
        Ok(deleted.len() as u64)
    }

    #[instrument(skip_all, fields(user_id = %filter.user_id(), strict = require.is_some()), err)]
    async fn replace(
        &self,
        filter: &RecordFilter,
        require: Option<&str>,
        record: RefreshTokenRecord,
    ) -> Result<RotationOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let deleted = delete_matching(&mut tx, filter).await?;

        if let Some(required) = require {
            let now = match filter {
                RecordFilter::Stale { now, .. } => *now,
                _ => Utc::now(),
            };
            let consumed = deleted
                .iter()
                .any(|(token, expires_at)| token == required && *expires_at > now);
            if !consumed {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Ok(RotationOutcome::Rejected);
            }
        }

        insert_record(&mut tx, &record).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(RotationOutcome::Rotated {
            removed: deleted.len() as u64,
        })
    }
}

async fn insert_record(
    conn: &mut PgConnection,
    record: &RefreshTokenRecord,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (token, user_id, created_at, expires_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&record.token)
    .bind(record.user_id.get())
    .bind(record.created_at)
    .bind(record.expires_at)
    .execute(conn)
    .await
    .map_err(|e| map_sqlx_error("insert_refresh_token", e))?;

    Ok(())
}

/// Delete the rows selected by `filter`, returning `(token, expires_at)` of
/// each deleted row.
async fn delete_matching(
    conn: &mut PgConnection,
    filter: &RecordFilter,
) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
    let query = match filter {
        RecordFilter::Owned { user_id, token } => sqlx::query_as::<_, (String, DateTime<Utc>)>(
            r#"
            DELETE FROM refresh_tokens
            WHERE user_id = $1 AND token = $2
            RETURNING token, expires_at
            "#,
        )
        .bind(user_id.get())
        .bind(token.clone()),

        RecordFilter::User(user_id) => sqlx::query_as::<_, (String, DateTime<Utc>)>(
            r#"
            DELETE FROM refresh_tokens
            WHERE user_id = $1
            RETURNING token, expires_at
            "#,
        )
        .bind(user_id.get()),

        RecordFilter::Stale {
            user_id,
            consumed,
            now,
        } => sqlx::query_as::<_, (String, DateTime<Utc>)>(
            r#"
            DELETE FROM refresh_tokens
            WHERE user_id = $1 AND (token = $2 OR expires_at <= $3)
            RETURNING token, expires_at
            "#,
        )
        .bind(user_id.get())
        .bind(consumed.clone())
        .bind(*now),
    };

    query
        .fetch_all(conn)
        .await
        .map_err(|e| map_sqlx_error("delete_refresh_tokens", e))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}
