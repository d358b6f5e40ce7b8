// Application layer - use cases and orchestration over a LedgerStore.

pub mod error;
mod service;

pub use error::*;
pub use service::*;
