//! Storefront with wallet-based settlement
//!
//! Owners list products, customers buy them with wallet balances, and the
//! platform wallet collects a 5% commission per sale.
//!
//! ## Components
//! - `domain` - entities and the commission split arithmetic
//! - `store` - ledger storage backends (Postgres, in-memory)
//! - `engine` - the transactional `settle` operation

pub mod domain;
pub mod engine;
pub mod error;
pub mod store;

pub use error::{LedgerError, Result};
