//! Domain model for a coffee transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::cule::Coffeecule;
use crate::domain::models::user::User;
use crate::error::StoreError;
use crate::storage::record::{FieldMap, Record, RecordId, ThreeParentRecord};
use crate::storage::remote::RemoteRecord;

/// "Buyer bought receiver a coffee" within a cule.
///
/// Timestamped by the store at creation. The only record kind that is
/// ever hard-deleted (undo), which must trigger ledger recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: RecordId,
    pub cule_id: Option<RecordId>,
    pub buyer_id: Option<RecordId>,
    pub receiver_id: Option<RecordId>,
    pub creation_date: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(cule: &Coffeecule, buyer: &User, receiver: &User) -> Self {
        Self {
            id: RecordId::generate(),
            cule_id: Some(cule.id.clone()),
            buyer_id: Some(buyer.id.clone()),
            receiver_id: Some(receiver.id.clone()),
            creation_date: None,
        }
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transaction {}

impl std::hash::Hash for Transaction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Record for Transaction {
    const RECORD_TYPE: &'static str = "transaction";
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
            cule_id: remote.parent_refs.first().cloned(),
            buyer_id: remote.parent_refs.get(1).cloned(),
            receiver_id: remote.parent_refs.get(2).cloned(),
            creation_date: remote.creation_date,
        })
    }
}

impl ThreeParentRecord for Transaction {
    type Parent = Coffeecule;
    type SecondParent = User;
    type ThirdParent = User;

    fn parent_id(&self) -> Option<&RecordId> {
        self.cule_id.as_ref()
    }

    fn second_parent_id(&self) -> Option<&RecordId> {
        self.buyer_id.as_ref()
    }

    fn third_parent_id(&self) -> Option<&RecordId> {
        self.receiver_id.as_ref()
    }
}
