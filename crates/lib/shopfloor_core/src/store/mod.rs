//! Document store abstraction.
//!
//! Every persisted root (users, job orders) is a whole JSON document read and
//! written in one round trip. Nothing below the document level is addressable
//! here; nested mutation happens on the loaded value and is written back with
//! [`Collection::replace`].

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::PgPool;
use thiserror::Error;

use crate::models::job::JobOrder;
use crate::models::user::User;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate {collection} document: {key}")]
    Duplicate { collection: &'static str, key: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// A persisted root document.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table partition) name.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Top-level fields whose values must be unique within the collection.
    fn unique_fields() -> &'static [&'static str] {
        &[]
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_fields() -> &'static [&'static str] {
        &["email"]
    }
}

impl Document for JobOrder {
    const COLLECTION: &'static str = "job_orders";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Conjunction of top-level field equalities.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Map<String, Value>,
}

impl Filter {
    /// Match everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.insert(field.to_string(), value.into());
        self
    }

    /// Evaluate against a serialized document.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    /// JSON object usable with a containment (`@>`) query.
    pub fn as_containment(&self) -> Value {
        Value::Object(self.clauses.clone())
    }
}

/// Whole-document CRUD over one collection.
#[async_trait]
pub trait Collection<T: Document>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, StoreError>;

    /// Matching documents ordered by id (UUIDv7 ids sort by creation time).
    async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError>;

    async fn insert(&self, doc: &T) -> Result<(), StoreError>;

    /// Replace the stored document with the same id. Returns `false` if absent.
    async fn replace(&self, doc: &T) -> Result<bool, StoreError>;

    /// Returns `false` if absent.
    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

/// Deny-list of revoked credentials keyed by the raw token value.
///
/// An entry whose `expires_at` has passed must never match, whether or not it
/// has been physically purged.
#[async_trait]
pub trait RevocationLedger: Send + Sync {
    /// Record a revoked token. Inserting an existing token is not an error.
    async fn insert(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn is_revoked(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Physically drop entries expired at `now`. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// The set of collections the service runs against.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn Collection<User>>,
    pub jobs: Arc<dyn Collection<JobOrder>>,
    pub ledger: Arc<dyn RevocationLedger>,
}

impl Stores {
    /// Process-local stores (tests, `--store memory`).
    pub fn memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryCollection::<User>::new()),
            jobs: Arc::new(memory::MemoryCollection::<JobOrder>::new()),
            ledger: Arc::new(memory::MemoryLedger::new()),
        }
    }

    /// PostgreSQL-backed stores. Migrations must already be applied.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(postgres::PgCollection::<User>::new(pool.clone())),
            jobs: Arc::new(postgres::PgCollection::<JobOrder>::new(pool.clone())),
            ledger: Arc::new(postgres::PgLedger::new(pool)),
        }
    }
}
