use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("account {0} not found")]
    AccountNotFound(Uuid),

    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    #[error("category {0} not found")]
    CategoryNotFound(Uuid),

    /// The buyer is not a customer account, or the product owner is not an
    /// owner account. Checked inside the settlement core, not the caller.
    #[error("account role does not permit this purchase")]
    InvalidRole,

    #[error("product is not purchasable")]
    InvalidProduct,

    /// Expected business outcome, not a system fault. The settlement aborts
    /// with no mutation applied.
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
