//! Settlement engine
//!
//! [`settle`] is the only write entry point for money movement. It validates
//! the participants, computes the commission split, and hands the store one
//! atomic mutation plan. Role checks live here in the core so no caller can
//! bypass them.

use uuid::Uuid;

use crate::domain::{Account, CommissionSplit, Role, Sale, SettlementPlan};
use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;

/// Settle a purchase of `product_id` by the authenticated `customer`.
///
/// The customer's identity is trusted as resolved by the caller; its balance
/// is read and debited inside the store's transaction, never from the passed
/// struct. Insufficient funds abort with every ledger untouched.
pub async fn settle<S: LedgerStore>(
    store: &S,
    product_id: Uuid,
    customer: &Account,
) -> Result<Sale> {
    if customer.role != Role::Customer {
        return Err(LedgerError::InvalidRole);
    }

    let product = store.get_product(product_id).await?;
    if product.price <= rust_decimal::Decimal::ZERO {
        return Err(LedgerError::InvalidProduct);
    }

    let owner = store.get_account(product.owner_id).await?;
    if owner.role != Role::Owner {
        return Err(LedgerError::InvalidRole);
    }

    let split = CommissionSplit::of(product.price);
    let plan = SettlementPlan {
        product_id: product.id,
        category_id: product.category_id,
        owner_id: owner.id,
        customer_id: customer.id,
        split,
    };

    match store.apply_settlement(&plan).await {
        Ok(sale) => {
            tracing::info!(
                sale_id = %sale.id,
                product_id = %plan.product_id,
                customer_id = %plan.customer_id,
                amount = %split.amount,
                commission = %split.commission,
                seller_earnings = %split.seller_earnings,
                "settlement completed"
            );
            Ok(sale)
        }
        // Expected business outcome, not an error-level event.
        Err(LedgerError::InsufficientFunds) => {
            tracing::info!(
                product_id = %plan.product_id,
                customer_id = %plan.customer_id,
                amount = %split.amount,
                "settlement rejected: insufficient funds"
            );
            Err(LedgerError::InsufficientFunds)
        }
        Err(e) => {
            tracing::error!(
                product_id = %plan.product_id,
                customer_id = %plan.customer_id,
                error = %e,
                "settlement failed"
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Product};
    use crate::store::MemoryLedgerStore;
    use rust_decimal::Decimal;

    async fn seeded_store() -> (MemoryLedgerStore, Product, Account) {
        let store = MemoryLedgerStore::new();
        let owner = Account::new("shop", Role::Owner, Decimal::ZERO);
        let customer = Account::new("buyer", Role::Customer, Decimal::new(100000, 2));
        let category = Category::new("books");
        let product = Product::new("novel", Decimal::new(20000, 2), category.id, owner.id);
        store.insert_account(owner).await;
        store.insert_account(customer.clone()).await;
        store.insert_category(category).await;
        store.insert_product(product.clone()).await;
        (store, product, customer)
    }

    #[tokio::test]
    async fn test_settle_returns_receipt() {
        let (store, product, customer) = seeded_store().await;
        let sale = settle(&store, product.id, &customer).await.unwrap();
        assert_eq!(sale.product_id, product.id);
        assert_eq!(sale.customer_id, customer.id);
        assert_eq!(sale.amount, Decimal::new(20000, 2));
    }

    #[tokio::test]
    async fn test_owner_cannot_buy() {
        let (store, product, _) = seeded_store().await;
        let owner_as_buyer = Account::new("shop2", Role::Owner, Decimal::new(100000, 2));
        store.insert_account(owner_as_buyer.clone()).await;
        let err = settle(&store, product.id, &owner_as_buyer).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRole));
        assert!(store.sales().await.is_empty());
    }

    #[tokio::test]
    async fn test_product_owned_by_customer_is_rejected() {
        let (store, _, customer) = seeded_store().await;
        let category = Category::new("misc");
        // Seller row exists but carries the wrong role.
        let fake_owner = Account::new("buyer2", Role::Customer, Decimal::ZERO);
        let product = Product::new("bad", Decimal::new(100, 2), category.id, fake_owner.id);
        store.insert_account(fake_owner).await;
        store.insert_category(category).await;
        store.insert_product(product.clone()).await;
        let err = settle(&store, product.id, &customer).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRole));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (store, _, customer) = seeded_store().await;
        let missing = Uuid::now_v7();
        let err = settle(&store, missing, &customer).await.unwrap_err();
        assert!(matches!(err, LedgerError::ProductNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_nonpositive_price_is_rejected() {
        let (store, _, customer) = seeded_store().await;
        let category = Category::new("free");
        let owner = Account::new("shop3", Role::Owner, Decimal::ZERO);
        let product = Product::new("freebie", Decimal::ZERO, category.id, owner.id);
        store.insert_account(owner).await;
        store.insert_category(category).await;
        store.insert_product(product.clone()).await;
        let err = settle(&store, product.id, &customer).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidProduct));
    }
}
