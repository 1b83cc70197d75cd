//! # Storage Layer
//!
//! The persistence abstraction: a typed record model (`record`), the
//! abstract remote store contract (`remote`), the generic typed client
//! over it (`client`), and the in-memory backend (`memory`).

pub mod client;
pub mod memory;
pub mod record;
pub mod remote;

pub use client::RecordClient;
pub use memory::MemoryStore;
pub use record::{
    FieldMap, FieldValue, OneParentRecord, Record, RecordId, ThreeParentRecord, TwoParentRecord,
};
pub use remote::{AccountStatus, RemoteRecord, RemoteStore};
