//! Ledger entities
//!
//! Five balance-bearing rows plus the immutable `Sale` receipt. All monetary
//! fields are fixed-point decimals (`NUMERIC(10,2)` in Postgres); counters
//! are `i64`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Customer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub wallet_balance: Decimal,
    pub lifetime_earned: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: impl Into<String>, role: Role, wallet_balance: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            role,
            wallet_balance,
            lifetime_earned: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }
}

/// Singleton row holding accumulated commission. Created lazily by the first
/// commission; the schema forbids a second row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformWallet {
    pub id: bool,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub total_sales_count: i64,
    pub total_earned: Decimal,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            total_sales_count: 0,
            total_earned: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: Uuid,
    pub owner_id: Uuid,
    pub sales_count: i64,
    pub total_earned: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        price: Decimal,
        category_id: Uuid,
        owner_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: None,
            price,
            category_id,
            owner_id,
            sales_count: 0,
            total_earned: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }
}

/// Immutable receipt of a completed settlement. Its existence is the proof
/// that money moved; its absence after an error means nothing moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub product_id: Uuid,
    pub customer_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}
