//! Settlement properties: conservation, atomicity, rejection without side
//! effects, and behavior under concurrent purchases.

use rust_decimal::Decimal;
use storefront::domain::{Account, Category, Product, Role};
use storefront::engine::settle;
use storefront::store::memory::Fault;
use storefront::store::{LedgerStore, MemoryLedgerStore};
use storefront::LedgerError;

fn dec(mantissa: i64, scale: u32) -> Decimal {
    Decimal::new(mantissa, scale)
}

struct Fixture {
    store: MemoryLedgerStore,
    owner: Account,
    customer: Account,
    category: Category,
    product: Product,
}

async fn fixture(customer_balance: Decimal, price: Decimal) -> Fixture {
    let store = MemoryLedgerStore::new();
    let owner = Account::new("bookshop", Role::Owner, Decimal::ZERO);
    let customer = Account::new("alice", Role::Customer, customer_balance);
    let category = Category::new("books");
    let product = Product::new("novel", price, category.id, owner.id);
    store.insert_account(owner.clone()).await;
    store.insert_account(customer.clone()).await;
    store.insert_category(category.clone()).await;
    store.insert_product(product.clone()).await;
    Fixture { store, owner, customer, category, product }
}

#[tokio::test]
async fn settlement_moves_money_and_conserves_it() {
    // balance 1000.00, price 200.00 -> commission 10.00, earnings 190.00
    let f = fixture(dec(100000, 2), dec(20000, 2)).await;

    let sale = settle(&f.store, f.product.id, &f.customer).await.unwrap();
    assert_eq!(sale.amount, dec(20000, 2));

    let customer = f.store.get_account(f.customer.id).await.unwrap();
    let owner = f.store.get_account(f.owner.id).await.unwrap();
    let product = f.store.get_product(f.product.id).await.unwrap();
    let category = f.store.get_category(f.category.id).await.unwrap();
    let platform = f.store.platform_balance().await.unwrap();

    assert_eq!(customer.wallet_balance, dec(80000, 2));
    assert_eq!(owner.wallet_balance, dec(19000, 2));
    assert_eq!(owner.lifetime_earned, dec(19000, 2));
    assert_eq!(platform, dec(1000, 2));
    assert_eq!(product.sales_count, 1);
    assert_eq!(product.total_earned, dec(19000, 2));
    assert_eq!(category.total_sales_count, 1);
    assert_eq!(category.total_earned, dec(19000, 2));

    // The customer's loss equals the owner's and platform's combined gain.
    let spent = f.customer.wallet_balance - customer.wallet_balance;
    assert_eq!(spent, owner.wallet_balance + platform);

    let sales = f.store.sales().await;
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].id, sale.id);
}

#[tokio::test]
async fn rejection_leaves_every_ledger_untouched() {
    // balance 50.00, price 200.00
    let f = fixture(dec(5000, 2), dec(20000, 2)).await;

    let err = settle(&f.store, f.product.id, &f.customer).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds));

    assert_eq!(f.store.get_account(f.customer.id).await.unwrap(), f.customer);
    assert_eq!(f.store.get_account(f.owner.id).await.unwrap(), f.owner);
    assert_eq!(f.store.get_product(f.product.id).await.unwrap(), f.product);
    assert_eq!(f.store.get_category(f.category.id).await.unwrap(), f.category);
    assert_eq!(f.store.platform_balance().await.unwrap(), Decimal::ZERO);
    assert!(f.store.sales().await.is_empty());
}

#[tokio::test]
async fn fault_after_debit_rolls_back_everything() {
    let f = fixture(dec(100000, 2), dec(20000, 2)).await;

    f.store.inject_fault(Fault::OwnerCredit);
    let err = settle(&f.store, f.product.id, &f.customer).await.unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)));

    // The debit had succeeded before the fault; it must not be visible.
    assert_eq!(f.store.get_account(f.customer.id).await.unwrap(), f.customer);
    assert_eq!(f.store.get_account(f.owner.id).await.unwrap(), f.owner);
    assert!(f.store.sales().await.is_empty());

    // The fault is one-shot; the retried settlement completes.
    settle(&f.store, f.product.id, &f.customer).await.unwrap();
    let customer = f.store.get_account(f.customer.id).await.unwrap();
    assert_eq!(customer.wallet_balance, dec(80000, 2));
}

#[tokio::test]
async fn concurrent_purchases_cannot_overspend() {
    // Balance covers exactly one purchase.
    let f = fixture(dec(20000, 2), dec(20000, 2)).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = f.store.clone();
        let customer = f.customer.clone();
        let product_id = f.product.id;
        handles.push(tokio::spawn(async move {
            settle(&store, product_id, &customer).await
        }));
    }

    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LedgerError::InsufficientFunds) => rejections += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(rejections, 1);

    let customer = f.store.get_account(f.customer.id).await.unwrap();
    assert_eq!(customer.wallet_balance, Decimal::ZERO);
    assert_eq!(f.store.sales().await.len(), 1);
}

#[tokio::test]
async fn concurrent_first_commissions_share_one_wallet() {
    let store = MemoryLedgerStore::new();
    let owner = Account::new("shop", Role::Owner, Decimal::ZERO);
    let category = Category::new("gadgets");
    let product = Product::new("widget", dec(20000, 2), category.id, owner.id);
    store.insert_account(owner.clone()).await;
    store.insert_category(category).await;
    store.insert_product(product.clone()).await;

    let n = 8;
    let mut handles = Vec::new();
    for i in 0..n {
        let customer = Account::new(format!("buyer-{i}"), Role::Customer, dec(100000, 2));
        store.insert_account(customer.clone()).await;
        let store = store.clone();
        let product_id = product.id;
        handles.push(tokio::spawn(async move {
            settle(&store, product_id, &customer).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // One singleton wallet holding the sum of all commissions.
    let platform = store.platform_balance().await.unwrap();
    assert_eq!(platform, dec(1000, 2) * Decimal::from(n));
    let owner = store.get_account(owner.id).await.unwrap();
    assert_eq!(owner.wallet_balance, dec(19000, 2) * Decimal::from(n));
    assert_eq!(store.sales().await.len(), n as usize);
}

#[tokio::test]
async fn repeated_settlements_conserve_money_exactly() {
    // An awkward price whose 5% needs rounding: 0.30 -> 0.02 + 0.28.
    let f = fixture(dec(300, 2), dec(30, 2)).await;

    for _ in 0..10 {
        settle(&f.store, f.product.id, &f.customer).await.unwrap();
    }

    let customer = f.store.get_account(f.customer.id).await.unwrap();
    let owner = f.store.get_account(f.owner.id).await.unwrap();
    let platform = f.store.platform_balance().await.unwrap();

    assert_eq!(customer.wallet_balance, Decimal::ZERO);
    assert_eq!(owner.wallet_balance, dec(280, 2));
    assert_eq!(platform, dec(20, 2));
    assert_eq!(customer.wallet_balance + owner.wallet_balance + platform, dec(300, 2));
}
