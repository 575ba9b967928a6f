//! PostgreSQL store backends.
//!
//! Documents live in a single `documents` table partitioned by collection
//! name, with the body stored as JSONB. Filters use JSONB containment.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use super::{Collection, Document, Filter, RevocationLedger, StoreError};

/// Map a unique-index violation to [`StoreError::Duplicate`].
fn map_insert_error<T: Document>(e: sqlx::Error, key: &str) -> StoreError {
    let is_unique_violation = e
        .as_database_error()
        .is_some_and(|d| d.is_unique_violation());
    if is_unique_violation {
        StoreError::Duplicate {
            collection: T::COLLECTION,
            key: key.to_string(),
        }
    } else {
        StoreError::Db(e)
    }
}

pub struct PgCollection<T> {
    pool: PgPool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> PgCollection<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Document> Collection<T> for PgCollection<T> {
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        let body = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(T::COLLECTION)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(body.map(serde_json::from_value).transpose()?)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let rows = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents \
             WHERE collection = $1 AND body @> $2 \
             ORDER BY id",
        )
        .bind(T::COLLECTION)
        .bind(filter.as_containment())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|body| serde_json::from_value(body).map_err(StoreError::from))
            .collect()
    }

    async fn insert(&self, doc: &T) -> Result<(), StoreError> {
        let body = serde_json::to_value(doc)?;
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(T::COLLECTION)
            .bind(doc.id())
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error::<T>(e, doc.id()))?;
        Ok(())
    }

    async fn replace(&self, doc: &T) -> Result<bool, StoreError> {
        let body = serde_json::to_value(doc)?;
        let result = sqlx::query(
            "UPDATE documents SET body = $3, updated_at = now() \
             WHERE collection = $1 AND id = $2",
        )
        .bind(T::COLLECTION)
        .bind(doc.id())
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error::<T>(e, doc.id()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(T::COLLECTION)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents WHERE collection = $1")
                .bind(T::COLLECTION)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }
}

/// Revocation ledger on the `revoked_tokens` table.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationLedger for PgLedger {
    async fn insert(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.purge_expired(Utc::now()).await?;
        sqlx::query(
            "INSERT INTO revoked_tokens (token, expires_at) VALUES ($1, $2) \
             ON CONFLICT (token) DO NOTHING",
        )
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_revoked(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let revoked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE token = $1 AND expires_at > $2)",
        )
        .bind(token)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(revoked)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
