//! Storefront - wallet-settled e-commerce service

use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use storefront::domain::{Account, Category, Product, Role, Sale};
use storefront::store::{LedgerStore, PgLedgerStore};
use storefront::{engine, LedgerError};

/// New accounts are provisioned with this wallet balance.
const STARTING_BALANCE: Decimal = Decimal::from_parts(100000, 0, 0, false, 2);

#[derive(Clone)]
pub struct AppState { pub db: sqlx::PgPool, pub ledger: PgLedgerStore }

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let db = PgPoolOptions::new().max_connections(10).connect(&std::env::var("DATABASE_URL")?).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let state = AppState { ledger: PgLedgerStore::new(db.clone()), db };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .route("/api/v1/accounts", post(create_account))
        .route("/api/v1/accounts/:id", get(get_account))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route("/api/v1/products/:id", get(get_product))
        .route("/api/v1/products/:id/purchase", post(purchase_product))
        .route("/api/v1/categories", get(list_categories).post(create_category))
        .route("/api/v1/sales", get(list_sales))
        .route("/api/v1/platform-wallet", get(get_platform_wallet))
        .route("/api/v1/owners/:id/dashboard", get(owner_dashboard))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

fn err_response(e: LedgerError) -> (StatusCode, String) {
    let status = match &e {
        LedgerError::AccountNotFound(_) | LedgerError::ProductNotFound(_) | LedgerError::CategoryNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::InvalidRole => StatusCode::FORBIDDEN,
        LedgerError::InvalidProduct => StatusCode::UNPROCESSABLE_ENTITY,
        // Distinct from generic failure so the UI can say "cannot afford".
        LedgerError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
        LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn internal(e: sqlx::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn invalid(e: validator::ValidationErrors) -> (StatusCode, String) {
    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}

// ---------------------------------------------------------------------------
// Accounts (provisioning only; authentication lives upstream)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub role: Role,
}

async fn create_account(State(s): State<AppState>, Json(r): Json<CreateAccountRequest>) -> Result<(StatusCode, Json<Account>), (StatusCode, String)> {
    r.validate().map_err(invalid)?;
    let a = sqlx::query_as::<_, Account>("INSERT INTO accounts (id, name, role, wallet_balance, lifetime_earned, created_at) VALUES ($1, $2, $3, $4, 0, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(&r.name).bind(r.role).bind(STARTING_BALANCE)
        .fetch_one(&s.db).await.map_err(internal)?;
    Ok((StatusCode::CREATED, Json(a)))
}

async fn get_account(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Account>, (StatusCode, String)> {
    s.ledger.get_account(id).await.map(Json).map_err(err_response)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)] pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32> }
#[derive(Debug, Serialize)] pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: i64, pub page: u32 }

async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<Product>>, (StatusCode, String)> {
    let page = p.page.unwrap_or(1).max(1); let per_page = p.per_page.unwrap_or(20).min(100);
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY sales_count DESC, created_at DESC LIMIT $1 OFFSET $2")
        .bind(per_page as i64).bind(((page - 1) * per_page) as i64).fetch_all(&s.db).await.map_err(internal)?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(&s.db).await.map_err(internal)?;
    Ok(Json(PaginatedResponse { data: products, total: total.0, page }))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>, (StatusCode, String)> {
    s.ledger.get_product(id).await.map(Json).map_err(err_response)
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        return Err(ValidationError::new("price must be positive"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub category_id: Uuid,
    pub owner_id: Uuid,
}

async fn create_product(State(s): State<AppState>, Json(r): Json<CreateProductRequest>) -> Result<(StatusCode, Json<Product>), (StatusCode, String)> {
    r.validate().map_err(invalid)?;
    let owner = s.ledger.get_account(r.owner_id).await.map_err(err_response)?;
    if owner.role != Role::Owner {
        return Err(err_response(LedgerError::InvalidRole));
    }
    s.ledger.get_category(r.category_id).await.map_err(err_response)?;
    let p = sqlx::query_as::<_, Product>("INSERT INTO products (id, name, description, price, category_id, owner_id, sales_count, total_earned, created_at) VALUES ($1, $2, $3, $4, $5, $6, 0, 0, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(&r.name).bind(&r.description).bind(r.price).bind(r.category_id).bind(r.owner_id)
        .fetch_one(&s.db).await.map_err(internal)?;
    Ok((StatusCode::CREATED, Json(p)))
}

// ---------------------------------------------------------------------------
// Purchase - the only money-movement write path
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)] pub struct PurchaseRequest { pub customer_id: Uuid }

async fn purchase_product(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<PurchaseRequest>) -> Result<(StatusCode, Json<Sale>), (StatusCode, String)> {
    let customer = s.ledger.get_account(r.customer_id).await.map_err(err_response)?;
    let sale = engine::settle(&s.ledger, id, &customer).await.map_err(err_response)?;
    Ok((StatusCode::CREATED, Json(sale)))
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>, (StatusCode, String)> {
    let cats = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY total_sales_count DESC, name")
        .fetch_all(&s.db).await.map_err(internal)?;
    Ok(Json(cats))
}

async fn create_category(State(s): State<AppState>, Json(r): Json<CreateCategoryRequest>) -> Result<(StatusCode, Json<Category>), (StatusCode, String)> {
    r.validate().map_err(invalid)?;
    let c = sqlx::query_as::<_, Category>("INSERT INTO categories (id, name, total_sales_count, total_earned) VALUES ($1, $2, 0, 0) RETURNING *")
        .bind(Uuid::now_v7()).bind(&r.name)
        .fetch_one(&s.db).await.map_err(internal)?;
    Ok((StatusCode::CREATED, Json(c)))
}

// ---------------------------------------------------------------------------
// Read-only projections
// ---------------------------------------------------------------------------

async fn list_sales(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<Sale>>, (StatusCode, String)> {
    let page = p.page.unwrap_or(1).max(1); let per_page = p.per_page.unwrap_or(20).min(100);
    let sales = sqlx::query_as::<_, Sale>("SELECT * FROM sales ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(per_page as i64).bind(((page - 1) * per_page) as i64).fetch_all(&s.db).await.map_err(internal)?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales").fetch_one(&s.db).await.map_err(internal)?;
    Ok(Json(PaginatedResponse { data: sales, total: total.0, page }))
}

async fn get_platform_wallet(State(s): State<AppState>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let balance = s.ledger.platform_balance().await.map_err(err_response)?;
    Ok(Json(serde_json::json!({ "balance": balance })))
}

#[derive(Debug, Serialize)]
pub struct OwnerDashboard { pub owner_id: Uuid, pub name: String, pub wallet_balance: Decimal, pub lifetime_earned: Decimal, pub products: Vec<Product> }

async fn owner_dashboard(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OwnerDashboard>, (StatusCode, String)> {
    let owner = s.ledger.get_account(id).await.map_err(err_response)?;
    if owner.role != Role::Owner {
        return Err(err_response(LedgerError::InvalidRole));
    }
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE owner_id = $1 ORDER BY sales_count DESC")
        .bind(id).fetch_all(&s.db).await.map_err(internal)?;
    Ok(Json(OwnerDashboard { owner_id: owner.id, name: owner.name, wallet_balance: owner.wallet_balance, lifetime_earned: owner.lifetime_earned, products }))
}
