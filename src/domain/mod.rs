//! Domain Layer

pub mod model;
pub mod settlement;

pub use model::{Account, Category, PlatformWallet, Product, Role, Sale};
pub use settlement::{CommissionSplit, SettlementPlan, COMMISSION_RATE};
