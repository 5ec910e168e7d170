use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::covariance::CovarianceMatrix;
use crate::error::AllocationError;
use crate::linalg::{quadratic_form, sqrt_decimal, vec_dot};
use crate::result::AllocationLine;
use crate::types::{Money, Rate, Weight};
use crate::universe::Sector;
use crate::AllocationResult;

/// Inverse standard-normal CDF at 5%.
pub const Z_95: Decimal = dec!(-1.6449);
/// Inverse standard-normal CDF at 1%.
pub const Z_99: Decimal = dec!(-2.3263);

const STRONG_SHARPE: Decimal = dec!(1.5);
const GOOD_SHARPE: Decimal = dec!(1.0);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Confidence levels supported by the parametric VaR model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarConfidence {
    #[serde(rename = "0.95")]
    P95,
    #[serde(rename = "0.99")]
    P99,
}

impl VarConfidence {
    pub fn z_score(&self) -> Decimal {
        match self {
            VarConfidence::P95 => Z_95,
            VarConfidence::P99 => Z_99,
        }
    }
}

/// Qualitative reading of the Sharpe ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioInsight {
    /// Sharpe > 1.5
    Strong,
    /// 1.0 < Sharpe <= 1.5
    GoodTradeoff,
    /// Sharpe <= 1.0, or undefined
    RiskOutweighsReward,
}

impl PortfolioInsight {
    pub fn from_sharpe(sharpe: Option<Decimal>) -> Self {
        match sharpe {
            Some(s) if s > STRONG_SHARPE => PortfolioInsight::Strong,
            Some(s) if s > GOOD_SHARPE => PortfolioInsight::GoodTradeoff,
            _ => PortfolioInsight::RiskOutweighsReward,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PortfolioInsight::Strong => "Excellent risk-adjusted return. Strong portfolio.",
            PortfolioInsight::GoodTradeoff => "Good risk-return tradeoff.",
            PortfolioInsight::RiskOutweighsReward => "Risk may outweigh reward. Consider optimizing.",
        }
    }
}

impl fmt::Display for PortfolioInsight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

// ---------------------------------------------------------------------------
// Return and risk
// ---------------------------------------------------------------------------

/// sum(w_i * r_i)
pub fn expected_return(weights: &[Weight], returns: &[Rate]) -> AllocationResult<Rate> {
    if weights.len() != returns.len() {
        return Err(AllocationError::invalid(
            "returns",
            format!("Expected {} returns, got {}", weights.len(), returns.len()),
        ));
    }
    vec_dot(weights, returns)
        .ok_or_else(|| AllocationError::invalid("returns", "Expected return overflows"))
}

/// sqrt(w' M w) over the full matrix, cross terms included.
pub fn portfolio_risk(weights: &[Weight], cov: &CovarianceMatrix) -> AllocationResult<Rate> {
    if weights.len() != cov.dim() {
        return Err(AllocationError::invalid(
            "weights",
            format!("Expected {} weights, got {}", cov.dim(), weights.len()),
        ));
    }
    let variance = quadratic_form(weights, cov.rows()).ok_or_else(|| {
        AllocationError::invalid("covariance_matrix", "Portfolio variance overflows")
    })?;
    Ok(sqrt_decimal(variance))
}

/// (expected_return - risk_free_rate) / risk, `Ok(None)` when risk is zero.
pub fn sharpe_ratio(
    expected_return: Rate,
    risk_free_rate: Rate,
    risk: Rate,
) -> AllocationResult<Option<Decimal>> {
    if risk.is_zero() {
        return Ok(None);
    }
    expected_return
        .checked_sub(risk_free_rate)
        .and_then(|excess| excess.checked_div(risk))
        .map(Some)
        .ok_or_else(|| AllocationError::invalid("sharpe_ratio", "Sharpe ratio overflows"))
}

/// Parametric (Gaussian) VaR: investment * |mu + z * sigma|.
pub fn value_at_risk(
    investment: Money,
    expected_return: Rate,
    risk: Rate,
    confidence: VarConfidence,
) -> AllocationResult<Money> {
    confidence
        .z_score()
        .checked_mul(risk)
        .and_then(|shock| shock.checked_add(expected_return))
        .and_then(|factor| investment.checked_mul(factor.abs()))
        .ok_or_else(|| {
            AllocationError::invalid(
                "investment_amount",
                format!("Value at risk overflows for an investment of {}", investment),
            )
        })
}

/// investment * (1 + expected_return)^horizon
pub fn projected_value(investment: Money, expected_return: Rate, horizon_years: u32) -> AllocationResult<Money> {
    let growth = Decimal::ONE
        .checked_add(expected_return)
        .and_then(|base| base.checked_powu(horizon_years as u64))
        .ok_or_else(|| {
            AllocationError::invalid(
                "horizon_years",
                format!(
                    "Growth factor overflows for {} years at {}",
                    horizon_years, expected_return
                ),
            )
        })?;
    investment.checked_mul(growth).ok_or_else(|| {
        AllocationError::invalid("horizon_years", "Projected value overflows")
    })
}

/// Weighted-average volatility over portfolio volatility. 1 when risk is zero.
pub fn diversification_ratio(weights: &[Weight], cov: &CovarianceMatrix, risk: Rate) -> Decimal {
    if risk.is_zero() {
        return Decimal::ONE;
    }
    let weighted_vol: Decimal = weights
        .iter()
        .enumerate()
        .map(|(i, w)| *w * cov.volatility(i))
        .sum();
    weighted_vol / risk
}

/// Herfindahl inverse: 1 / sum(w_i^2).
pub fn effective_num_holdings(weights: &[Weight]) -> Decimal {
    let hhi: Decimal = weights.iter().map(|w| *w * *w).sum();
    if hhi.is_zero() {
        Decimal::ZERO
    } else {
        Decimal::ONE / hhi
    }
}

// ---------------------------------------------------------------------------
// Exposure
// ---------------------------------------------------------------------------

/// Percent of the investment held in each sector. Sectors with nothing
/// bought are absent.
pub fn sector_exposure(lines: &[AllocationLine], investment: Money) -> BTreeMap<Sector, Decimal> {
    let mut totals: BTreeMap<Sector, Money> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.amount_used > Decimal::ZERO) {
        *totals.entry(line.sector).or_insert(Decimal::ZERO) += line.amount_used;
    }
    if investment <= Decimal::ZERO {
        return BTreeMap::new();
    }
    totals
        .into_iter()
        .map(|(sector, amount)| (sector, amount / investment * dec!(100)))
        .collect()
}
