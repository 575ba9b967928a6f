//! In-memory store backends.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Collection, Document, Filter, RevocationLedger, StoreError};

/// Documents kept as serialized JSON, so reads and writes go through the same
/// encode/decode path as a real backend.
pub struct MemoryCollection<T> {
    docs: RwLock<BTreeMap<String, Value>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> MemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            _marker: PhantomData,
        }
    }

    /// Reject `doc` if another document already holds one of its unique values.
    fn check_unique(
        docs: &BTreeMap<String, Value>,
        id: &str,
        doc: &Value,
    ) -> Result<(), StoreError> {
        for field in T::unique_fields() {
            let Some(value) = doc.get(*field) else {
                continue;
            };
            let taken = docs
                .iter()
                .any(|(other_id, other)| other_id != id && other.get(*field) == Some(value));
            if taken {
                return Err(StoreError::Duplicate {
                    collection: T::COLLECTION,
                    key: format!("{field}={value}"),
                });
            }
        }
        Ok(())
    }
}

impl<T: Document> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Document> Collection<T> for MemoryCollection<T> {
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        let docs = self.docs.read().await;
        docs.get(id)
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let docs = self.docs.read().await;
        docs.values()
            .filter(|v| filter.matches(v))
            .map(|v| serde_json::from_value(v.clone()).map_err(StoreError::from))
            .collect()
    }

    async fn insert(&self, doc: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;
        let mut docs = self.docs.write().await;
        if docs.contains_key(doc.id()) {
            return Err(StoreError::Duplicate {
                collection: T::COLLECTION,
                key: format!("id={}", doc.id()),
            });
        }
        Self::check_unique(&docs, doc.id(), &value)?;
        docs.insert(doc.id().to_string(), value);
        Ok(())
    }

    async fn replace(&self, doc: &T) -> Result<bool, StoreError> {
        let value = serde_json::to_value(doc)?;
        let mut docs = self.docs.write().await;
        if !docs.contains_key(doc.id()) {
            return Ok(false);
        }
        Self::check_unique(&docs, doc.id(), &value)?;
        docs.insert(doc.id().to_string(), value);
        Ok(true)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.docs.write().await.remove(id).is_some())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.docs.read().await.len() as u64)
    }
}

/// Revocation ledger on a concurrent map. Expired entries are purged on insert.
pub struct MemoryLedger {
    entries: DashMap<String, DateTime<Utc>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of physically present entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevocationLedger for MemoryLedger {
    async fn insert(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.purge_expired(Utc::now()).await?;
        self.entries.entry(token.to_string()).or_insert(expires_at);
        Ok(())
    }

    async fn is_revoked(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .get(token)
            .is_some_and(|expires_at| now < *expires_at))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| now < *expires_at);
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }
}
