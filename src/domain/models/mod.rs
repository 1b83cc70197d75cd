//! Domain models: the concrete record types the system persists.

pub mod cule;
pub mod relationship;
pub mod transaction;
pub mod user;

pub use cule::Coffeecule;
pub use relationship::Relationship;
pub use transaction::Transaction;
pub use user::User;
