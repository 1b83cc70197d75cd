//! # Remote Store Capability Surface
//!
//! The minimal contract the core expects from the backing record store:
//! an account gate, a current-user identity, and schemaless record-level
//! primitives (create-if-absent, read-all-of-type, update-fields,
//! parent-scoped queries, delete). Everything typed lives above this in
//! the record store client; everything below is an implementation detail
//! of a concrete backend.
//!
//! The store is assumed to give strongly consistent single-record writes
//! but no multi-record transactions, so uniqueness and existence checks
//! here are optimistic: a losing concurrent writer observes
//! `RecordAlreadyExists` after the fact.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::storage::record::{FieldMap, RecordId};

/// Result of the account/capability gate checked once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Available,
    Unavailable,
    Restricted,
    Unknown,
}

/// A record as the schemaless store holds it.
///
/// `fields` carries exactly the scalar fields a record type declares;
/// `parent_refs` are store-level references and are never serialized as
/// field values. `creation_date` is assigned by the store on first insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: RecordId,
    pub record_type: String,
    pub fields: FieldMap,
    pub parent_refs: Vec<RecordId>,
    pub creation_date: Option<DateTime<Utc>>,
}

impl RemoteRecord {
    pub fn new(id: RecordId, record_type: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id,
            record_type: record_type.into(),
            fields,
            parent_refs: Vec::new(),
            creation_date: None,
        }
    }

    pub fn with_parent_refs(mut self, refs: Vec<RecordId>) -> Self {
        self.parent_refs = refs;
        self
    }
}

/// The abstract remote record store.
///
/// All operations are fallible network I/O from the caller's point of
/// view. This layer performs no retries; store-level failures propagate
/// unchanged.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Capability/authentication gate. Anything other than
    /// [`AccountStatus::Available`] must abort initialization before any
    /// record operation is attempted.
    async fn account_status(&self) -> AccountStatus;

    /// Opaque external identity of the current user.
    async fn current_user_identity(&self) -> Result<String, StoreError>;

    /// Create-if-absent write. Returns the stored record (with the
    /// store-assigned creation date). Fails with
    /// [`StoreError::RecordAlreadyExists`] when the id is already present.
    async fn insert(&self, record: RemoteRecord) -> Result<RemoteRecord, StoreError>;

    /// Read a single record by type and id.
    async fn get(
        &self,
        record_type: &str,
        id: &RecordId,
    ) -> Result<Option<RemoteRecord>, StoreError>;

    /// Read every record of one type. Unbounded scan; pagination is a
    /// backend concern outside this contract.
    async fn scan(&self, record_type: &str) -> Result<Vec<RemoteRecord>, StoreError>;

    /// Overwrite exactly the given field subset of an existing record and
    /// return the updated record as read back. Fails with
    /// [`StoreError::RecordDoesNotExist`] when the id is absent.
    async fn update_fields(
        &self,
        record_type: &str,
        id: &RecordId,
        fields: FieldMap,
    ) -> Result<RemoteRecord, StoreError>;

    /// All records of `record_type` whose parent reference list matches
    /// every populated slot in `parent_slots` (slot position is
    /// significant; `None` slots match anything).
    async fn query_children(
        &self,
        record_type: &str,
        parent_slots: &[Option<RecordId>],
    ) -> Result<Vec<RemoteRecord>, StoreError>;

    /// Hard-delete a record. Fails with
    /// [`StoreError::RecordDoesNotExist`] when the id is absent.
    async fn delete(&self, record_type: &str, id: &RecordId) -> Result<(), StoreError>;
}
