//! Domain layer: models, the pure ledger engine, and the cule service.

pub mod ledger;
pub mod models;
pub mod service;

pub use ledger::{compute_ledger, Ledger};
pub use service::CoffeeculeService;
