//! Error taxonomy for the coffeecule core.
//!
//! Three layers, matching the architecture: `StoreError` for the record
//! store client, `LedgerError` for the pure ledger fold, and `DomainError`
//! for precondition failures raised by the domain service. Errors propagate
//! to the caller unchanged; nothing here retries or swallows.

use thiserror::Error;

use crate::storage::remote::AccountStatus;

/// Errors raised by the record store client and the backing remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same id already exists. Saves are create-only;
    /// there is no implicit upsert.
    #[error("a record with this id already exists")]
    RecordAlreadyExists,

    /// The record addressed by id is not present in the store.
    #[error("record does not exist")]
    RecordDoesNotExist,

    /// The request was malformed from the store's point of view, e.g. a
    /// remote record of the wrong type for the requested entity.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A children query matched nothing. Callers of `children_of` assume
    /// at least one child exists, so empty is a failure, not a success.
    #[error("no child records found")]
    ChildRecordsNotFound,

    /// A multi-parent query was issued with every parent slot empty, or a
    /// parented save was attempted with an unpopulated slot.
    #[error("missing parent record")]
    MissingParentRecord,

    /// The account/capability gate reported anything other than available.
    /// Fatal to initialization; recoverable only by re-authentication.
    #[error("store account is not available: {0:?}")]
    AccountUnavailable(AccountStatus),

    /// Opaque network or backend failure, surfaced as-is.
    #[error("store backend failure")]
    Backend(#[from] anyhow::Error),
}

/// Errors raised by the pure ledger computation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// A transaction in the log is missing its buyer or receiver
    /// reference. Structural integrity failure: the whole computation
    /// aborts and no partial ledger is published.
    #[error("transaction {id} is missing its buyer or receiver reference")]
    InvalidTransactionFormat { id: String },
}

/// Errors raised by the domain service, beyond store and ledger errors.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The service has not been initialized against a remote store yet.
    #[error("no record service available; initialize first")]
    NoServiceAvailable,

    /// An operation needing a cule context ran with none selected.
    #[error("no coffeecule selected")]
    NoCuleSelected,

    /// `add_transaction` was called with an empty receiver set.
    #[error("no receivers selected")]
    NoReceiversSelected,

    /// `add_transaction` was called before the ledger selected a buyer.
    #[error("no buyer selected")]
    NoBuyerSelected,

    /// Member resolution for a cule produced no users.
    #[error("no users found")]
    NoUsersFound,

    /// No cule matched, e.g. a join with an unknown invite code.
    #[error("no coffeecules found")]
    NoCulesFound,

    /// The add-transaction fan-out persisted fewer transactions than were
    /// requested. The saved subset is kept; there is no rollback.
    #[error("saved {saved} of {requested} requested transactions")]
    TransactionCountMismatch { requested: usize, saved: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
