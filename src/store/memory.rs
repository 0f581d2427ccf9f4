//! In-memory ledger store
//!
//! Backend with no external dependencies, used by tests and local runs. A
//! settlement is applied to a scratch copy of the state under the lock and
//! committed by swapping it in, so a failure mid-settlement can never leave
//! partial effects behind. One lock over the whole state also serializes
//! the insufficient-funds check with the debit, matching the guarded-update
//! semantics of the Postgres backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Account, Category, PlatformWallet, Product, Sale, SettlementPlan};
use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;

/// Failure point injectable into the next settlement, for exercising
/// rollback behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail after the customer debit, before the owner wallet credit.
    OwnerCredit,
}

#[derive(Default, Clone)]
struct State {
    accounts: HashMap<Uuid, Account>,
    products: HashMap<Uuid, Product>,
    categories: HashMap<Uuid, Category>,
    platform: Option<PlatformWallet>,
    sales: Vec<Sale>,
}

impl State {
    fn debit(&mut self, account_id: Uuid, amount: Decimal) -> Result<()> {
        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        if account.wallet_balance < amount {
            return Err(LedgerError::InsufficientFunds);
        }
        account.wallet_balance -= amount;
        Ok(())
    }

    fn credit_wallet(&mut self, account_id: Uuid, amount: Decimal) -> Result<()> {
        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        account.wallet_balance += amount;
        Ok(())
    }

    fn credit_earnings(&mut self, account_id: Uuid, amount: Decimal) -> Result<()> {
        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        account.lifetime_earned += amount;
        Ok(())
    }

    fn add_commission(&mut self, amount: Decimal) {
        let wallet = self.platform.get_or_insert_with(|| PlatformWallet {
            id: true,
            balance: Decimal::ZERO,
        });
        wallet.balance += amount;
    }

    fn bump_product_counters(&mut self, product_id: Uuid, earned: Decimal) -> Result<()> {
        let product = self
            .products
            .get_mut(&product_id)
            .ok_or(LedgerError::ProductNotFound(product_id))?;
        product.sales_count += 1;
        product.total_earned += earned;
        Ok(())
    }

    fn bump_category_counters(&mut self, category_id: Uuid, earned: Decimal) -> Result<()> {
        let category = self
            .categories
            .get_mut(&category_id)
            .ok_or(LedgerError::CategoryNotFound(category_id))?;
        category.total_sales_count += 1;
        category.total_earned += earned;
        Ok(())
    }

    fn create_sale(&mut self, plan: &SettlementPlan) -> Sale {
        let sale = Sale {
            id: Uuid::now_v7(),
            product_id: plan.product_id,
            customer_id: plan.customer_id,
            amount: plan.split.amount,
            created_at: Utc::now(),
        };
        self.sales.push(sale.clone());
        sale
    }
}

#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Mutex<State>>,
    fault: Arc<std::sync::Mutex<Option<Fault>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_account(&self, account: Account) {
        self.inner.lock().await.accounts.insert(account.id, account);
    }

    pub async fn insert_product(&self, product: Product) {
        self.inner.lock().await.products.insert(product.id, product);
    }

    pub async fn insert_category(&self, category: Category) {
        self.inner.lock().await.categories.insert(category.id, category);
    }

    pub async fn sales(&self) -> Vec<Sale> {
        self.inner.lock().await.sales.clone()
    }

    /// Arm a one-shot failure inside the next settlement.
    pub fn inject_fault(&self, fault: Fault) {
        *self.fault.lock().expect("fault lock poisoned") = Some(fault);
    }

    fn take_fault(&self) -> Option<Fault> {
        self.fault.lock().expect("fault lock poisoned").take()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_account(&self, id: Uuid) -> Result<Account> {
        self.inner
            .lock()
            .await
            .accounts
            .get(&id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn get_product(&self, id: Uuid) -> Result<Product> {
        self.inner
            .lock()
            .await
            .products
            .get(&id)
            .cloned()
            .ok_or(LedgerError::ProductNotFound(id))
    }

    async fn get_category(&self, id: Uuid) -> Result<Category> {
        self.inner
            .lock()
            .await
            .categories
            .get(&id)
            .cloned()
            .ok_or(LedgerError::CategoryNotFound(id))
    }

    async fn platform_balance(&self) -> Result<Decimal> {
        Ok(self
            .inner
            .lock()
            .await
            .platform
            .as_ref()
            .map(|w| w.balance)
            .unwrap_or(Decimal::ZERO))
    }

    async fn apply_settlement(&self, plan: &SettlementPlan) -> Result<Sale> {
        let fault = self.take_fault();
        let mut state = self.inner.lock().await;
        let mut next = state.clone();

        next.debit(plan.customer_id, plan.split.amount)?;
        if fault == Some(Fault::OwnerCredit) {
            return Err(LedgerError::Storage("injected fault: owner credit".into()));
        }
        next.credit_wallet(plan.owner_id, plan.split.seller_earnings)?;
        next.credit_earnings(plan.owner_id, plan.split.seller_earnings)?;
        next.bump_product_counters(plan.product_id, plan.split.seller_earnings)?;
        next.bump_category_counters(plan.category_id, plan.split.seller_earnings)?;
        next.add_commission(plan.split.commission);
        let sale = next.create_sale(plan);

        *state = next;
        Ok(sale)
    }
}
