//! # coffeecule-core
//!
//! Core domain for a group of people ("a cule") tracking who has bought
//! coffee for whom, and who owes the most and should buy next.
//!
//! Two load-bearing pieces:
//!
//! - a schema-mapped persistence abstraction ([`storage`]): typed records
//!   with declared field tables and 1/2/3-parent relationships, over an
//!   abstract schemaless remote store with create-only save semantics;
//! - a pure ledger engine ([`domain::ledger`]): folds an unordered
//!   transaction log into an antisymmetric pairwise-debt matrix and
//!   deterministically selects the next buyer.
//!
//! [`domain::service::CoffeeculeService`] ties them together and is the
//! surface a presentation layer talks to. There is no UI, HTTP, or CLI in
//! this crate.

pub mod domain;
pub mod error;
pub mod storage;

pub use domain::ledger::{compute_ledger, Ledger};
pub use domain::models::{Coffeecule, Relationship, Transaction, User};
pub use domain::service::CoffeeculeService;
pub use error::{DomainError, LedgerError, StoreError};
pub use storage::{
    AccountStatus, MemoryStore, Record, RecordClient, RecordId, RemoteRecord, RemoteStore,
};
