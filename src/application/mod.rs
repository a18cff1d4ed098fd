// Application layer - use cases over the key-value store.
// The CLI and any embedding go through LedgerService.

pub mod config;
pub mod error;
pub mod service;

pub use config::*;
pub use error::*;
pub use service::*;
