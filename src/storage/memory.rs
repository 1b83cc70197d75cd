//! # In-Memory Remote Store
//!
//! Concrete [`RemoteStore`] backend holding all records in process memory.
//! Used as the test backend and for local runs without a remote account.
//!
//! State lives behind a single `Arc<Mutex<..>>`, so there is exactly one
//! logical writer at a time regardless of how many clones of the handle
//! exist. Failure scenarios (account gate, injected insert failures) are
//! configurable for exercising error paths.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::storage::record::{FieldMap, RecordId};
use crate::storage::remote::{AccountStatus, RemoteRecord, RemoteStore};

/// In-memory record store. Cloning shares the same underlying state.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

/// Single-owner mutable state.
#[derive(Debug)]
struct MemoryState {
    /// All records, keyed by id. Ids are globally unique across types.
    records: BTreeMap<RecordId, RemoteRecord>,
    account_status: AccountStatus,
    user_identity: String,
    /// When non-zero, the next N inserts fail with a backend error.
    fail_next_inserts: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                records: BTreeMap::new(),
                account_status: AccountStatus::Available,
                user_identity: "local-user".to_string(),
                fail_next_inserts: 0,
            })),
        }
    }

    pub fn with_account_status(self, status: AccountStatus) -> Self {
        self.lock().account_status = status;
        self
    }

    pub fn with_user_identity(self, identity: impl Into<String>) -> Self {
        self.lock().user_identity = identity.into();
        self
    }

    /// Make the next `n` inserts fail with a backend error, for testing
    /// partial-failure behavior of fan-out writes.
    pub fn fail_next_inserts(&self, n: usize) {
        self.lock().fail_next_inserts = n;
    }

    /// Switch the reported user identity, e.g. to simulate a second
    /// client sharing the same store.
    pub fn set_user_identity(&self, identity: impl Into<String>) {
        self.lock().user_identity = identity.into();
    }

    /// Number of records currently stored, across all types.
    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // Every mutation under the lock is a single map operation, so a
        // poisoned mutex still holds consistent state; keep going with it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn account_status(&self) -> AccountStatus {
        self.lock().account_status
    }

    async fn current_user_identity(&self) -> Result<String, StoreError> {
        Ok(self.lock().user_identity.clone())
    }

    async fn insert(&self, mut record: RemoteRecord) -> Result<RemoteRecord, StoreError> {
        let mut state = self.lock();
        if state.fail_next_inserts > 0 {
            state.fail_next_inserts -= 1;
            return Err(StoreError::Backend(anyhow!("injected insert failure")));
        }
        if state.records.contains_key(&record.id) {
            return Err(StoreError::RecordAlreadyExists);
        }
        record.creation_date = Some(Utc::now());
        state.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(
        &self,
        record_type: &str,
        id: &RecordId,
    ) -> Result<Option<RemoteRecord>, StoreError> {
        let state = self.lock();
        Ok(state
            .records
            .get(id)
            .filter(|r| r.record_type == record_type)
            .cloned())
    }

    async fn scan(&self, record_type: &str) -> Result<Vec<RemoteRecord>, StoreError> {
        let state = self.lock();
        Ok(state
            .records
            .values()
            .filter(|r| r.record_type == record_type)
            .cloned()
            .collect())
    }

    async fn update_fields(
        &self,
        record_type: &str,
        id: &RecordId,
        fields: FieldMap,
    ) -> Result<RemoteRecord, StoreError> {
        let mut state = self.lock();
        let record = state
            .records
            .get_mut(id)
            .filter(|r| r.record_type == record_type)
            .ok_or(StoreError::RecordDoesNotExist)?;
        for (key, value) in fields {
            record.fields.insert(key, value);
        }
        Ok(record.clone())
    }

    async fn query_children(
        &self,
        record_type: &str,
        parent_slots: &[Option<RecordId>],
    ) -> Result<Vec<RemoteRecord>, StoreError> {
        let state = self.lock();
        Ok(state
            .records
            .values()
            .filter(|r| r.record_type == record_type)
            .filter(|r| {
                parent_slots.iter().enumerate().all(|(i, slot)| match slot {
                    Some(id) => r.parent_refs.get(i) == Some(id),
                    None => true,
                })
            })
            .cloned()
            .collect())
    }

    async fn delete(&self, record_type: &str, id: &RecordId) -> Result<(), StoreError> {
        let mut state = self.lock();
        match state.records.get(id) {
            Some(r) if r.record_type == record_type => {
                state.records.remove(id);
                Ok(())
            }
            _ => Err(StoreError::RecordDoesNotExist),
        }
    }
}
