//! Domain model for a membership relationship.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::cule::Coffeecule;
use crate::domain::models::user::User;
use crate::error::StoreError;
use crate::storage::record::{FieldMap, Record, RecordId, TwoParentRecord};
use crate::storage::remote::RemoteRecord;

/// Membership edge between a [`User`] and a [`Coffeecule`].
///
/// Its existence is the sole mechanism granting a user access to a cule's
/// data. Created on cule creation (for the creator) or on join; never
/// deleted in normal flow. Carries no scalar fields of its own — it is
/// purely its two parent references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RecordId,
    pub user_id: Option<RecordId>,
    pub cule_id: Option<RecordId>,
    pub creation_date: Option<DateTime<Utc>>,
}

impl Relationship {
    pub fn new(user: &User, cule: &Coffeecule) -> Self {
        Self {
            id: RecordId::generate(),
            user_id: Some(user.id.clone()),
            cule_id: Some(cule.id.clone()),
            creation_date: None,
        }
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Relationship {}

impl std::hash::Hash for Relationship {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Record for Relationship {
    const RECORD_TYPE: &'static str = "relationship";
    const RECORD_KEYS: &'static [&'static str] = &[];

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
        FieldMap::new()
    }

    fn from_remote(remote: &RemoteRecord) -> Result<Self, StoreError> {
        Self::check_record_type(remote)?;
        Ok(Self {
            id: remote.id.clone(),
            user_id: remote.parent_refs.first().cloned(),
            cule_id: remote.parent_refs.get(1).cloned(),
            creation_date: remote.creation_date,
        })
    }
}

impl TwoParentRecord for Relationship {
    type Parent = User;
    type SecondParent = Coffeecule;

    fn parent_id(&self) -> Option<&RecordId> {
        self.user_id.as_ref()
    }

    fn second_parent_id(&self) -> Option<&RecordId> {
        self.cule_id.as_ref()
    }
}
