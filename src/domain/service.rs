//! # Coffeecule Service
//!
//! The domain repository: composes record store client calls into
//! cule-level use cases and owns the "currently selected cule / members /
//! transactions / ledger" context.
//!
//! The in-memory selection state is single-writer: every mutating
//! operation takes `&mut self`, and the service is meant to be driven from
//! one coordinating context. The remote store is the only truly shared
//! resource, handled optimistically (conflicts surface as store errors and
//! the caller retries).

use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::ledger::{compute_ledger, Ledger};
use crate::domain::models::{Coffeecule, Relationship, Transaction, User};
use crate::error::{DomainError, StoreError};
use crate::storage::client::RecordClient;
use crate::storage::record::RecordId;
use crate::storage::remote::{AccountStatus, RemoteStore};

pub struct CoffeeculeService<S: RemoteStore> {
    client: RecordClient<S>,
    user: Option<User>,
    cules: Vec<Coffeecule>,
    selected_cule: Option<Coffeecule>,
    members: Vec<User>,
    transactions: Vec<Transaction>,
    /// Ids of the members currently present, i.e. the subset the ledger
    /// scores when picking the next buyer. Defaults to everyone.
    considered_ids: Vec<RecordId>,
    ledger: Ledger,
}

impl<S: RemoteStore> CoffeeculeService<S> {
    pub fn new(store: S) -> Self {
        Self {
            client: RecordClient::new(store),
            user: None,
            cules: Vec::new(),
            selected_cule: None,
            members: Vec::new(),
            transactions: Vec::new(),
            considered_ids: Vec::new(),
            ledger: Ledger::default(),
        }
    }

    /// Check the account gate and find-or-create the local user record.
    ///
    /// Must succeed before any other operation; until then everything else
    /// fails with [`DomainError::NoServiceAvailable`].
    pub async fn initialize(&mut self) -> Result<(), DomainError> {
        let status = self.client.store().account_status().await;
        if status != AccountStatus::Available {
            warn!(?status, "record store account unavailable");
            return Err(StoreError::AccountUnavailable(status).into());
        }

        let identity = self.client.store().current_user_identity().await?;
        let users: Vec<User> = self.client.fetch().await?;
        let user = match users.into_iter().find(|u| u.system_user_id == identity) {
            Some(existing) => {
                info!(user = %existing.id, "found existing user record");
                existing
            }
            None => {
                let created = self.client.save(&User::new("", identity)).await?;
                info!(user = %created.id, "created user record");
                created
            }
        };
        self.user = Some(user);
        Ok(())
    }

    /// Rename the current user. The only mutation users ever receive.
    pub async fn rename_user(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        let mut user = self.current_user()?.clone();
        user.name = name.into();
        let updated = self.client.update(&user, &["name"]).await?;
        if let Some(member) = self.members.iter_mut().find(|m| m.id == updated.id) {
            member.name = updated.name.clone();
        }
        self.user = Some(updated);
        Ok(())
    }

    /// Create a new cule and the creator's membership relationship.
    ///
    /// Two sequential saves, deliberately non-atomic: if the relationship
    /// save fails the cule is already persisted and orphaned, and cleanup
    /// or retry is the caller's responsibility.
    pub async fn create_cule(&mut self, name: impl Into<String>) -> Result<Coffeecule, DomainError> {
        let user = self.current_user()?.clone();
        let name = name.into();

        let invite_code = self.unique_invite_code().await?;
        let cule = self
            .client
            .save(&Coffeecule::new(name, invite_code))
            .await?;
        info!(cule = %cule.id, code = %cule.invite_code, "created coffeecule");

        self.client
            .save_with_two_parents(&Relationship::new(&user, &cule))
            .await?;

        self.cules.push(cule.clone());
        self.selected_cule = Some(cule.clone());
        self.members = vec![user];
        self.transactions.clear();
        self.consider_all_members();
        self.refresh_ledger()?;
        Ok(cule)
    }

    /// Join an existing cule by its invite code.
    pub async fn join_cule(&mut self, invite_code: &str) -> Result<Coffeecule, DomainError> {
        let user = self.current_user()?.clone();

        let cules: Vec<Coffeecule> = self.client.fetch().await?;
        let cule = cules
            .into_iter()
            .find(|c| c.invite_code.eq_ignore_ascii_case(invite_code))
            .ok_or(DomainError::NoCulesFound)?;

        self.client
            .save_with_two_parents(&Relationship::new(&user, &cule))
            .await?;
        info!(cule = %cule.id, user = %user.id, "joined coffeecule");

        if !self.cules.iter().any(|c| c.id == cule.id) {
            self.cules.push(cule.clone());
        }
        self.selected_cule = Some(cule.clone());
        self.fetch_members().await?;
        self.fetch_transactions().await?;
        Ok(cule)
    }

    /// Refresh the list of cules the current user belongs to.
    pub async fn fetch_cules(&mut self) -> Result<&[Coffeecule], DomainError> {
        let user = self.current_user()?.clone();

        let relationships: Vec<Relationship> = self
            .client
            .two_parent_children(Some(&user), None)
            .await?;
        let cule_ids: Vec<RecordId> = relationships
            .into_iter()
            .filter_map(|r| r.cule_id)
            .collect();

        let all_cules: Vec<Coffeecule> = self.client.fetch().await?;
        self.cules = all_cules
            .into_iter()
            .filter(|c| cule_ids.contains(&c.id))
            .collect();
        Ok(&self.cules)
    }

    /// Select one of the fetched cules as the working context.
    pub fn select_cule(&mut self, id: &RecordId) -> Result<(), DomainError> {
        let cule = self
            .cules
            .iter()
            .find(|c| c.id == *id)
            .cloned()
            .ok_or(DomainError::NoCulesFound)?;
        self.selected_cule = Some(cule);
        self.members.clear();
        self.transactions.clear();
        self.considered_ids.clear();
        self.ledger = Ledger::default();
        Ok(())
    }

    /// Fetch the members of the selected cule by resolving its membership
    /// relationships back to user records.
    pub async fn fetch_members(&mut self) -> Result<&[User], DomainError> {
        self.current_user()?;
        let cule = self.selected()?.clone();

        let relationships: Vec<Relationship> = self
            .client
            .two_parent_children(None, Some(&cule))
            .await?;
        let member_ids: Vec<RecordId> = relationships
            .into_iter()
            .filter_map(|r| r.user_id)
            .collect();

        let all_users: Vec<User> = self.client.fetch().await?;
        let members: Vec<User> = all_users
            .into_iter()
            .filter(|u| member_ids.contains(&u.id))
            .collect();
        if members.is_empty() {
            return Err(DomainError::NoUsersFound);
        }

        self.members = members;
        self.consider_all_members();
        self.refresh_ledger()?;
        Ok(&self.members)
    }

    /// Fetch the transaction history of the selected cule. A cule with no
    /// history yields an empty list.
    pub async fn fetch_transactions(&mut self) -> Result<&[Transaction], DomainError> {
        self.current_user()?;
        let cule = self.selected()?.clone();

        self.transactions = self
            .client
            .three_parent_children(Some(&cule), None, None)
            .await?;
        self.refresh_ledger()?;
        Ok(&self.transactions)
    }

    /// Record that the currently selected buyer bought each receiver a
    /// coffee: one transaction per receiver, saved concurrently.
    ///
    /// Saves that succeed are committed locally and remotely even when
    /// others fail; a partial failure is reported as
    /// [`DomainError::TransactionCountMismatch`] with no rollback.
    pub async fn add_transaction(&mut self, receivers: &[User]) -> Result<(), DomainError> {
        self.current_user()?;
        let cule = self.selected()?.clone();
        if receivers.is_empty() {
            return Err(DomainError::NoReceiversSelected);
        }
        let buyer = self
            .selected_buyer()
            .cloned()
            .ok_or(DomainError::NoBuyerSelected)?;

        let saves = receivers
            .iter()
            .map(|receiver| {
                let transaction = Transaction::new(&cule, &buyer, receiver);
                let client = &self.client;
                async move { client.save_with_three_parents(&transaction).await }
            })
            .collect::<Vec<_>>();
        let outcomes = join_all(saves).await;

        let requested = receivers.len();
        let mut saved = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(transaction) => saved.push(transaction),
                Err(e) => warn!(error = %e, "transaction save failed during fan-out"),
            }
        }
        let saved_count = saved.len();
        info!(buyer = %buyer.id, requested, saved = saved_count, "added transactions");

        self.transactions.extend(saved);
        self.refresh_ledger()?;

        if saved_count < requested {
            return Err(DomainError::TransactionCountMismatch {
                requested,
                saved: saved_count,
            });
        }
        Ok(())
    }

    /// Undo a transaction: delete it remotely, drop it locally, and
    /// recompute the ledger.
    pub async fn remove_transaction(&mut self, id: &RecordId) -> Result<(), DomainError> {
        self.current_user()?;
        let position = self
            .transactions
            .iter()
            .position(|t| t.id == *id)
            .ok_or(StoreError::RecordDoesNotExist)?;

        self.client.delete(&self.transactions[position]).await?;
        let removed = self.transactions.remove(position);
        info!(transaction = %removed.id, "removed transaction");
        self.refresh_ledger()?;
        Ok(())
    }

    /// Restrict buyer selection to the members currently present.
    pub fn set_considered_members(&mut self, ids: Vec<RecordId>) -> Result<(), DomainError> {
        self.considered_ids = ids;
        self.refresh_ledger()
    }

    /// Recompute the debt matrix and selected buyer from the current
    /// transactions, members, and considered subset.
    pub fn refresh_ledger(&mut self) -> Result<(), DomainError> {
        let considered: Vec<User> = self
            .members
            .iter()
            .filter(|m| self.considered_ids.contains(&m.id))
            .cloned()
            .collect();
        self.ledger = compute_ledger(&self.transactions, &self.members, &considered)?;
        Ok(())
    }

    // Read access for the presentation collaborator.

    pub fn current_user(&self) -> Result<&User, DomainError> {
        self.user.as_ref().ok_or(DomainError::NoServiceAvailable)
    }

    pub fn cules(&self) -> &[Coffeecule] {
        &self.cules
    }

    pub fn selected_cule(&self) -> Option<&Coffeecule> {
        self.selected_cule.as_ref()
    }

    pub fn members(&self) -> &[User] {
        &self.members
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The member next obligated to buy, per the current ledger.
    pub fn selected_buyer(&self) -> Option<&User> {
        let id = self.ledger.selected_buyer()?;
        self.members.iter().find(|m| m.id == *id)
    }

    fn selected(&self) -> Result<&Coffeecule, DomainError> {
        self.selected_cule
            .as_ref()
            .ok_or(DomainError::NoCuleSelected)
    }

    fn consider_all_members(&mut self) {
        self.considered_ids = self.members.iter().map(|m| m.id.clone()).collect();
    }

    /// Generate an invite code that no fetched cule currently uses.
    async fn unique_invite_code(&self) -> Result<String, DomainError> {
        let cules: Vec<Coffeecule> = self.client.fetch().await?;
        loop {
            let code = Coffeecule::generate_invite_code();
            if !cules.iter().any(|c| c.invite_code == code) {
                return Ok(code);
            }
        }
    }
}
