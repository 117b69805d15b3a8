use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use registrar_auth::{
    CredentialStore, RecordFilter, RefreshTokenRecord, RotationOutcome, StoreError,
};
use registrar_core::UserId;

/// In-memory refresh-token store.
///
/// Intended for tests/dev. Every mutation runs under a single write lock, so
/// `replace` is trivially atomic. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("lock poisoned".to_string())
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(token).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut found: Vec<_> = records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }

    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        if records.contains_key(&record.token) {
            return Err(StoreError::Duplicate("refresh token already exists".to_string()));
        }
        records.insert(record.token.clone(), record);
        Ok(())
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let before = records.len();
        records.retain(|_, r| !filter.matches(r));
        Ok((before - records.len()) as u64)
    }

    async fn replace(
        &self,
        filter: &RecordFilter,
        require: Option<&str>,
        record: RefreshTokenRecord,
    ) -> Result<RotationOutcome, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;

        if let Some(required) = require {
            let consumable = records.get(required).is_some_and(|r| {
                filter.matches(r)
                    && match filter {
                        RecordFilter::Stale { now, .. } => !r.is_expired(*now),
                        _ => true,
                    }
            });
            if !consumable {
                return Ok(RotationOutcome::Rejected);
            }
        }
        if records.contains_key(&record.token) {
            return Err(StoreError::Duplicate("refresh token already exists".to_string()));
        }

        let before = records.len();
        records.retain(|_, r| !filter.matches(r));
        let removed = (before - records.len()) as u64;
        records.insert(record.token.clone(), record);

        Ok(RotationOutcome::Rotated { removed })
    }
}
