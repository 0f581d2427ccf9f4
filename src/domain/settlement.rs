//! Commission split arithmetic
//!
//! A sale amount splits into the platform commission and the seller
//! earnings. The commission is rounded half-up to the cent and the earnings
//! are derived by subtraction, so the two pieces always sum exactly to the
//! amount - money is conserved with no rounding residue.

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

/// 5% of every sale goes to the platform wallet.
pub const COMMISSION_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionSplit {
    pub amount: Decimal,
    pub commission: Decimal,
    pub seller_earnings: Decimal,
}

impl CommissionSplit {
    pub fn of(amount: Decimal) -> Self {
        let commission = (amount * COMMISSION_RATE)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self {
            amount,
            commission,
            seller_earnings: amount - commission,
        }
    }
}

/// The full mutation set of one settlement, computed by the engine and
/// applied atomically by a [`LedgerStore`](crate::store::LedgerStore).
#[derive(Debug, Clone)]
pub struct SettlementPlan {
    pub product_id: Uuid,
    pub category_id: Uuid,
    pub owner_id: Uuid,
    pub customer_id: Uuid,
    pub split: CommissionSplit,
}
