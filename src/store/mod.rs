//! Ledger storage
//!
//! The store owns atomicity: [`LedgerStore::apply_settlement`] takes the
//! engine's mutation plan and applies all of it or none of it. Reads are
//! plain lookups and carry no transactional contract beyond "latest
//! committed settlement".

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Account, Category, Product, Sale, SettlementPlan};
use crate::error::Result;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_account(&self, id: Uuid) -> Result<Account>;

    async fn get_product(&self, id: Uuid) -> Result<Product>;

    async fn get_category(&self, id: Uuid) -> Result<Category>;

    /// Current platform wallet balance; zero before the first commission
    /// creates the singleton row.
    async fn platform_balance(&self) -> Result<Decimal>;

    /// Apply one settlement as a single atomic unit: guarded customer debit,
    /// owner wallet + lifetime credits, product and category counter bumps,
    /// platform commission, receipt append. The debit is the commit/abort
    /// point - `InsufficientFunds` leaves every ledger untouched, and any
    /// later failure rolls the whole unit back.
    async fn apply_settlement(&self, plan: &SettlementPlan) -> Result<Sale>;
}

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;
