use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::metrics::PortfolioInsight;
use crate::types::{Money, Rate, Weight};
use crate::universe::Sector;
use crate::weighting::WeightingMethod;

/// One purchased line of the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub ticker: String,
    pub sector: Sector,
    pub weight: Weight,
    /// weight * 100
    pub weight_pct: Decimal,
    pub current_price: Money,
    pub quantity: u64,
    /// Shares bought from leftover cash on top of the weight-implied count
    pub reinvested_units: u64,
    pub amount_used: Money,
    /// amount_used / investment * 100
    pub pct_of_investment: Decimal,
}

/// Non-fatal conditions that leave some result fields degenerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCondition {
    /// Portfolio volatility is zero, so the Sharpe ratio is undefined
    UndefinedSharpe,
    /// The budget is below every share price; nothing was bought
    FullyUninvested,
}

impl ResultCondition {
    pub fn message(&self) -> &'static str {
        match self {
            ResultCondition::UndefinedSharpe => {
                "Portfolio volatility is zero; Sharpe ratio is undefined"
            }
            ResultCondition::FullyUninvested => {
                "Investment is below the price of every selected instrument; nothing was purchased"
            }
        }
    }
}

/// Full outcome of one allocation request. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioResult {
    pub method: WeightingMethod,
    pub investment_amount: Money,
    pub horizon_years: u32,
    /// Selected tickers, aligned with `weights`
    pub tickers: Vec<String>,
    /// Floored and renormalised weights
    pub weights: Vec<Weight>,
    pub expected_return: Rate,
    pub portfolio_risk: Rate,
    /// `None` when `portfolio_risk` is zero
    pub sharpe_ratio: Option<Decimal>,
    pub var_95: Money,
    pub var_99: Money,
    pub projected_value: Money,
    pub diversification_ratio: Decimal,
    pub effective_num_holdings: Decimal,
    /// Lines with at least one share, largest amount first
    pub allocations: Vec<AllocationLine>,
    /// Sector -> percent of investment
    pub sector_exposure: BTreeMap<Sector, Decimal>,
    pub total_invested: Money,
    pub remaining_amount: Money,
    pub insight: PortfolioInsight,
    pub insight_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ResultCondition>,
}

impl PortfolioResult {
    pub fn has_condition(&self, condition: ResultCondition) -> bool {
        self.conditions.contains(&condition)
    }
}
