//! Postgres ledger store
//!
//! One settlement = one database transaction. The customer debit is a
//! guarded `UPDATE ... WHERE wallet_balance >= amount`, so the
//! insufficient-funds check and the balance change are a single atomic
//! statement and two concurrent settlements can never both pass the check
//! on one affordable purchase. The platform wallet singleton is created by
//! an `ON CONFLICT` upsert against its one-row primary key.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Account, Category, Product, Sale, SettlementPlan};
use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_account(&self, id: Uuid) -> Result<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn get_product(&self, id: Uuid) -> Result<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::ProductNotFound(id))
    }

    async fn get_category(&self, id: Uuid) -> Result<Category> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::CategoryNotFound(id))
    }

    async fn platform_balance(&self) -> Result<Decimal> {
        let row: Option<(Decimal,)> = sqlx::query_as("SELECT balance FROM platform_wallet")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(b,)| b).unwrap_or(Decimal::ZERO))
    }

    async fn apply_settlement(&self, plan: &SettlementPlan) -> Result<Sale> {
        let mut tx = self.pool.begin().await?;

        debit(&mut tx, plan.customer_id, plan.split.amount).await?;
        credit_wallet(&mut tx, plan.owner_id, plan.split.seller_earnings).await?;
        credit_earnings(&mut tx, plan.owner_id, plan.split.seller_earnings).await?;
        bump_product_counters(&mut tx, plan.product_id, plan.split.seller_earnings).await?;
        bump_category_counters(&mut tx, plan.category_id, plan.split.seller_earnings).await?;
        add_commission(&mut tx, plan.split.commission).await?;
        let sale = create_sale(&mut tx, plan).await?;

        tx.commit().await?;
        Ok(sale)
    }
}

/// Atomically checked-and-applied debit. Zero rows updated means either the
/// account is missing or the guard rejected the balance.
async fn debit(
    tx: &mut Transaction<'_, Postgres>,
    account_id: Uuid,
    amount: Decimal,
) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE accounts SET wallet_balance = wallet_balance - $2 \
         WHERE id = $1 AND wallet_balance >= $2",
    )
    .bind(account_id)
    .bind(amount)
    .execute(&mut **tx)
    .await?
    .rows_affected();
    if updated == 1 {
        return Ok(());
    }
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_optional(&mut **tx)
        .await?;
    match exists {
        Some(_) => Err(LedgerError::InsufficientFunds),
        None => Err(LedgerError::AccountNotFound(account_id)),
    }
}

async fn credit_wallet(
    tx: &mut Transaction<'_, Postgres>,
    account_id: Uuid,
    amount: Decimal,
) -> Result<()> {
    let updated =
        sqlx::query("UPDATE accounts SET wallet_balance = wallet_balance + $2 WHERE id = $1")
            .bind(account_id)
            .bind(amount)
            .execute(&mut **tx)
            .await?
            .rows_affected();
    if updated == 1 {
        Ok(())
    } else {
        Err(LedgerError::AccountNotFound(account_id))
    }
}

async fn credit_earnings(
    tx: &mut Transaction<'_, Postgres>,
    account_id: Uuid,
    amount: Decimal,
) -> Result<()> {
    let updated =
        sqlx::query("UPDATE accounts SET lifetime_earned = lifetime_earned + $2 WHERE id = $1")
            .bind(account_id)
            .bind(amount)
            .execute(&mut **tx)
            .await?
            .rows_affected();
    if updated == 1 {
        Ok(())
    } else {
        Err(LedgerError::AccountNotFound(account_id))
    }
}

async fn bump_product_counters(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    earned: Decimal,
) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE products SET sales_count = sales_count + 1, total_earned = total_earned + $2 \
         WHERE id = $1",
    )
    .bind(product_id)
    .bind(earned)
    .execute(&mut **tx)
    .await?
    .rows_affected();
    if updated == 1 {
        Ok(())
    } else {
        Err(LedgerError::ProductNotFound(product_id))
    }
}

async fn bump_category_counters(
    tx: &mut Transaction<'_, Postgres>,
    category_id: Uuid,
    earned: Decimal,
) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE categories SET total_sales_count = total_sales_count + 1, \
         total_earned = total_earned + $2 WHERE id = $1",
    )
    .bind(category_id)
    .bind(earned)
    .execute(&mut **tx)
    .await?
    .rows_affected();
    if updated == 1 {
        Ok(())
    } else {
        Err(LedgerError::CategoryNotFound(category_id))
    }
}

/// Get-or-create on the singleton row. The one-row primary key makes
/// concurrent first commissions converge on a single row.
async fn add_commission(tx: &mut Transaction<'_, Postgres>, amount: Decimal) -> Result<()> {
    sqlx::query(
        "INSERT INTO platform_wallet (id, balance) VALUES (TRUE, $1) \
         ON CONFLICT (id) DO UPDATE SET balance = platform_wallet.balance + EXCLUDED.balance",
    )
    .bind(amount)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn create_sale(tx: &mut Transaction<'_, Postgres>, plan: &SettlementPlan) -> Result<Sale> {
    let sale = sqlx::query_as::<_, Sale>(
        "INSERT INTO sales (id, product_id, customer_id, amount, created_at) \
         VALUES ($1, $2, $3, $4, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(plan.product_id)
    .bind(plan.customer_id)
    .bind(plan.split.amount)
    .fetch_one(&mut **tx)
    .await?;
    Ok(sale)
}
