//! Domain model for a coffeecule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::storage::record::{FieldMap, Record, RecordId};
use crate::storage::remote::RemoteRecord;

/// Length of the shareable invite code.
pub const INVITE_CODE_LEN: usize = 6;

/// A named group whose members track coffee purchases among themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coffeecule {
    pub id: RecordId,
    pub name: String,
    /// Store-unique 6-character code members use to join.
    pub invite_code: String,
    pub creation_date: Option<DateTime<Utc>>,
}

impl Coffeecule {
    pub fn new(name: impl Into<String>, invite_code: impl Into<String>) -> Self {
        Self {
            id: RecordId::generate(),
            name: name.into(),
            invite_code: invite_code.into(),
            creation_date: None,
        }
    }

    /// Generate a random 6-character uppercase invite code. Uniqueness
    /// against the store is the caller's responsibility (the domain
    /// service regenerates on collision).
    pub fn generate_invite_code() -> String {
        Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(INVITE_CODE_LEN)
            .collect::<String>()
            .to_uppercase()
    }
}

impl PartialEq for Coffeecule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Coffeecule {}

impl std::hash::Hash for Coffeecule {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Record for Coffeecule {
    const RECORD_TYPE: &'static str = "coffeecule";
    const RECORD_KEYS: &'static [&'static str] = &["name", "invite_code"];

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
            ("invite_code".to_string(), self.invite_code.as_str().into()),
        ])
    }

    fn from_remote(remote: &RemoteRecord) -> Result<Self, StoreError> {
        Self::check_record_type(remote)?;
        Ok(Self {
            id: remote.id.clone(),
            name: Self::text_field(remote, "name")?,
            invite_code: Self::text_field(remote, "invite_code")?,
            creation_date: remote.creation_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_codes_are_six_uppercase_chars() {
        let code = Coffeecule::generate_invite_code();
        assert_eq!(code.len(), INVITE_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn equality_is_by_id_not_value() {
        let a = Coffeecule::new("morning crew", "ABC123");
        let mut b = a.clone();
        b.name = "renamed".to_string();
        assert_eq!(a, b);

        let c = Coffeecule::new("morning crew", "ABC123");
        assert_ne!(a, c);
    }
}
