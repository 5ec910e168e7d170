use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AllocationError;
use crate::types::{Money, Weight};
use crate::AllocationResult;

/// Whole-share allocation for an ordered instrument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteAllocation {
    /// Final share count per instrument
    pub quantities: Vec<u64>,
    /// Share count from the weight-implied budget alone, before reinvestment
    pub base_quantities: Vec<u64>,
    /// quantity * price per instrument
    pub amounts_used: Vec<Money>,
    /// Cash left after reinvestment; below the cheapest price
    pub remaining: Money,
}

impl DiscreteAllocation {
    pub fn total_invested(&self) -> Money {
        self.amounts_used.iter().sum()
    }

    pub fn reinvested_units(&self, i: usize) -> u64 {
        self.quantities[i] - self.base_quantities[i]
    }

    /// True when not a single share could be bought.
    pub fn is_uninvested(&self) -> bool {
        self.quantities.iter().all(|q| *q == 0)
    }
}

/// Turn weights and a cash budget into whole-share purchases.
///
/// Each line first buys `floor(weight * investment / price)` shares, so no
/// line overspends its share of the budget. Leftover cash is then spent one
/// share at a time on the cheapest instrument that still fits, until nothing
/// fits. Prices are walked in ascending order with the original index as the
/// tie-break.
pub fn allocate_discrete(
    weights: &[Weight],
    investment: Money,
    prices: &[Money],
) -> AllocationResult<DiscreteAllocation> {
    validate(weights, investment, prices)?;
    let n = weights.len();

    let mut quantities: Vec<u64> = Vec::with_capacity(n);
    for (i, (w, price)) in weights.iter().zip(prices.iter()).enumerate() {
        let shares = w
            .checked_mul(investment)
            .and_then(|target| target.checked_div(*price))
            .ok_or_else(|| {
                AllocationError::invalid(
                    format!("prices[{}]", i),
                    format!("Share count for {} at price {} overflows", investment, price),
                )
            })?
            .floor();
        let qty = shares.to_u64().ok_or_else(|| {
            AllocationError::invalid(
                format!("weights[{}]", i),
                format!("Share count {} does not fit in u64", shares),
            )
        })?;
        quantities.push(qty);
    }
    let base_quantities = quantities.clone();

    let mut amounts_used: Vec<Money> = quantities
        .iter()
        .zip(prices.iter())
        .map(|(q, p)| Decimal::from(*q) * *p)
        .collect();
    let mut remaining = investment - amounts_used.iter().sum::<Decimal>();

    let mut by_price: Vec<usize> = (0..n).collect();
    by_price.sort_by(|a, b| prices[*a].cmp(&prices[*b]).then(a.cmp(b)));
    let cheapest = prices[by_price[0]];

    while remaining >= cheapest {
        let Some(&idx) = by_price.iter().find(|&&i| prices[i] <= remaining) else {
            break;
        };
        quantities[idx] += 1;
        amounts_used[idx] += prices[idx];
        remaining -= prices[idx];
    }

    Ok(DiscreteAllocation {
        quantities,
        base_quantities,
        amounts_used,
        remaining,
    })
}

fn validate(weights: &[Weight], investment: Money, prices: &[Money]) -> AllocationResult<()> {
    if investment <= Decimal::ZERO {
        return Err(AllocationError::invalid(
            "investment_amount",
            "Investment must be positive",
        ));
    }
    if weights.is_empty() {
        return Err(AllocationError::invalid(
            "weights",
            "At least one instrument required",
        ));
    }
    if weights.len() != prices.len() {
        return Err(AllocationError::invalid(
            "prices",
            format!(
                "Expected {} prices to match weights, got {}",
                weights.len(),
                prices.len()
            ),
        ));
    }
    for (i, p) in prices.iter().enumerate() {
        if *p <= Decimal::ZERO {
            return Err(AllocationError::invalid(
                format!("prices[{}]", i),
                "Price must be positive",
            ));
        }
    }
    for (i, w) in weights.iter().enumerate() {
        if *w < Decimal::ZERO {
            return Err(AllocationError::invalid(
                format!("weights[{}]", i),
                "Weight cannot be negative",
            ));
        }
    }
    Ok(())
}
