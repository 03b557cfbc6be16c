//! Fee Planner
//!
//! Chooses a pricing mode from the current fee quote and works out how much
//! of a balance is left to send once fees are reserved.

use crate::gateway::{FeeParams, FeePricing, FeeQuote};
use ethers::types::U256;

/// Legacy gas price floor (wei) when the endpoint reports no fee data at
/// all. 30 gwei keeps sweeps moving on fee-quiet endpoints.
pub const FALLBACK_GAS_PRICE: u64 = 30_000_000_000;

/// Priority tip floor (wei) when the market supports priority fees but the
/// endpoint omits a tip suggestion.
pub const FALLBACK_PRIORITY_FEE: u64 = 1_500_000_000;

pub struct FeePlanner {
    fallback_gas_price: U256,
    fallback_priority_fee: U256,
}

/// A funded plan: what to send and how to price it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeePlan {
    /// Balance remaining after the fee reservation.
    pub sendable: U256,
    /// Portion of the balance set aside for fees, `gas_units * per_gas`.
    pub reservation: U256,
    pub params: FeeParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Funded(FeePlan),
    /// Fees would eat the whole balance. A normal outcome meaning "skip this
    /// cycle", not an error.
    InsufficientFunds { required: U256, available: U256 },
}

impl Default for FeePlanner {
    fn default() -> Self {
        Self::new(
            U256::from(FALLBACK_GAS_PRICE),
            U256::from(FALLBACK_PRIORITY_FEE),
        )
    }
}

impl FeePlanner {
    pub fn new(fallback_gas_price: U256, fallback_priority_fee: U256) -> Self {
        Self {
            fallback_gas_price,
            fallback_priority_fee,
        }
    }

    /// Price `gas_units` of work against the quote and split `available`
    /// into a fee reservation and a sendable remainder.
    ///
    /// Priority-fee pricing wins whenever the quote carries a max fee; the
    /// tip falls back to a floor when the quote omits it, capped at the max
    /// fee. Otherwise legacy pricing applies, with its own floor.
    pub fn plan(&self, quote: &FeeQuote, gas_units: U256, available: U256) -> PlanOutcome {
        let (per_gas, pricing) = match quote.max_fee_per_gas {
            Some(max_fee) => {
                let tip = quote
                    .max_priority_fee_per_gas
                    .unwrap_or(self.fallback_priority_fee)
                    .min(max_fee);
                (
                    max_fee,
                    FeePricing::Eip1559 {
                        max_fee_per_gas: max_fee,
                        max_priority_fee_per_gas: tip,
                    },
                )
            }
            None => {
                let gas_price = quote.gas_price.unwrap_or(self.fallback_gas_price);
                (gas_price, FeePricing::Legacy { gas_price })
            }
        };

        // Overflow here would need an absurd quote; treat it as unaffordable.
        let reservation = gas_units.checked_mul(per_gas).unwrap_or(U256::MAX);

        match available.checked_sub(reservation) {
            Some(sendable) if !sendable.is_zero() => PlanOutcome::Funded(FeePlan {
                sendable,
                reservation,
                params: FeeParams {
                    gas_limit: gas_units,
                    pricing,
                },
            }),
            _ => PlanOutcome::InsufficientFunds {
                required: reservation,
                available,
            },
        }
    }
}
