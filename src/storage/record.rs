//! # Record Model
//!
//! The typed-entity contract every persisted thing in the system obeys.
//!
//! Each concrete record type declares, once, the fixed set of scalar field
//! names it synchronizes with the remote store (`RECORD_KEYS`). That
//! declared table is the single source of truth for persistence: the store
//! client reads and writes exactly those fields plus `id` and
//! `creation_date`, and never inspects an object's in-memory state to
//! discover what to persist. Parent references are store-level references,
//! not scalar fields, and are carried separately.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::storage::remote::RemoteRecord;

/// Opaque, stable identity of a record.
///
/// Client-generated (UUIDv4) for new entities; round-tripped verbatim for
/// fetched ones. Ordering is the underlying string's, which gives the
/// ledger its deterministic tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a fresh id for a new record.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scalar value as the schemaless store represents it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(s) => s,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// The scalar fields of one record, keyed by declared field name.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A uniquely identified, typed, persisted entity with a fixed scalar
/// field set.
///
/// Implementations must keep `to_fields` and `from_remote` in lockstep
/// with `RECORD_KEYS`: `to_fields` emits exactly the declared keys, and
/// `from_remote` reads exactly those keys back.
pub trait Record: Sized + Send + Sync {
    /// Static type tag distinguishing this kind of record in the store.
    const RECORD_TYPE: &'static str;

    /// The declared scalar field names, in fixed order.
    const RECORD_KEYS: &'static [&'static str];

    fn id(&self) -> &RecordId;

    /// Set by the store on first save; `None` for never-saved records.
    fn creation_date(&self) -> Option<DateTime<Utc>>;

    fn set_creation_date(&mut self, date: Option<DateTime<Utc>>);

    /// Serialize the declared scalar fields.
    fn to_fields(&self) -> FieldMap;

    /// Rebuild a typed record from its remote representation.
    ///
    /// Fails with [`StoreError::InvalidRequest`] when the remote record's
    /// type tag does not match `RECORD_TYPE`.
    fn from_remote(remote: &RemoteRecord) -> Result<Self, StoreError>;

    /// Guard shared by every `from_remote` implementation.
    fn check_record_type(remote: &RemoteRecord) -> Result<(), StoreError> {
        if remote.record_type == Self::RECORD_TYPE {
            Ok(())
        } else {
            Err(StoreError::InvalidRequest(format!(
                "expected record type {}, got {}",
                Self::RECORD_TYPE,
                remote.record_type
            )))
        }
    }

    /// Read one declared text field out of a remote record.
    fn text_field(remote: &RemoteRecord, key: &str) -> Result<String, StoreError> {
        remote
            .fields
            .get(key)
            .map(|v| v.as_text().to_string())
            .ok_or_else(|| {
                StoreError::InvalidRequest(format!(
                    "record {} of type {} is missing field {key}",
                    remote.id, remote.record_type
                ))
            })
    }
}

/// A record holding a back-reference to exactly one parent record.
///
/// The parent's lifetime is independent; the child only carries its id.
/// Every declared slot must be populated before the record is saved.
pub trait OneParentRecord: Record {
    type Parent: Record;

    fn parent_id(&self) -> Option<&RecordId>;
}

/// A record holding back-references to exactly two parent records.
pub trait TwoParentRecord: Record {
    type Parent: Record;
    type SecondParent: Record;

    fn parent_id(&self) -> Option<&RecordId>;
    fn second_parent_id(&self) -> Option<&RecordId>;
}

/// A record holding back-references to exactly three parent records.
pub trait ThreeParentRecord: Record {
    type Parent: Record;
    type SecondParent: Record;
    type ThirdParent: Record;

    fn parent_id(&self) -> Option<&RecordId>;
    fn second_parent_id(&self) -> Option<&RecordId>;
    fn third_parent_id(&self) -> Option<&RecordId>;
}
