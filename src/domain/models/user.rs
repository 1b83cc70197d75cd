//! Domain model for a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::storage::record::{FieldMap, Record, RecordId};
use crate::storage::remote::RemoteRecord;

/// A person who can belong to coffeecules and buy or receive coffees.
///
/// `system_user_id` is the stable external identity reported by the
/// backing store's authentication layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub name: String,
    pub system_user_id: String,
    pub creation_date: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(name: impl Into<String>, system_user_id: impl Into<String>) -> Self {
        Self {
            id: RecordId::generate(),
            name: name.into(),
            system_user_id: system_user_id.into(),
            creation_date: None,
        }
    }
}

// Identity equality: two records are the same record iff their ids match,
// regardless of field contents.
impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl std::hash::Hash for User {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Record for User {
    const RECORD_TYPE: &'static str = "user";
    const RECORD_KEYS: &'static [&'static str] = &["name", "system_user_id"];

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.creation_date
    }

    fn set_creation_date(&mut self, date: Option<DateTime<Utc>>) {
        self.creation_date = date;
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::from([
            ("name".to_string(), self.name.as_str().into()),
            (
                "system_user_id".to_string(),
                self.system_user_id.as_str().into(),
            ),
        ])
    }

    fn from_remote(remote: &RemoteRecord) -> Result<Self, StoreError> {
        Self::check_record_type(remote)?;
        Ok(Self {
            id: remote.id.clone(),
            name: Self::text_field(remote, "name")?,
            system_user_id: Self::text_field(remote, "system_user_id")?,
            creation_date: remote.creation_date,
        })
    }
}
