use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::covariance::CovarianceMatrix;
use crate::error::AllocationError;
use crate::types::{Rate, Weight};
use crate::AllocationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Portfolio construction rule. All three are volatility heuristics that read
/// only the diagonal of the covariance matrix; cross terms enter later, in the
/// portfolio risk metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightingMethod {
    /// w_i ∝ 1/sigma_i. Stands in for minimum variance; not a QP solution.
    #[serde(alias = "variance", alias = "risk-parity")]
    MinVariance,
    /// w_i ∝ max(0, (r_i - r_f)/sigma_i), equal weights if nothing is positive
    #[serde(alias = "sharpe")]
    MaxSharpe,
    /// Inverse-volatility weights rescaled towards equal risk contribution.
    /// No clustering or recursive bisection is performed.
    #[serde(alias = "hrp")]
    HierarchicalRiskParity,
}

impl WeightingMethod {
    pub const ALL: [WeightingMethod; 3] = [
        WeightingMethod::MinVariance,
        WeightingMethod::MaxSharpe,
        WeightingMethod::HierarchicalRiskParity,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            WeightingMethod::MinVariance => "min-variance",
            WeightingMethod::MaxSharpe => "max-sharpe",
            WeightingMethod::HierarchicalRiskParity => "hierarchical-risk-parity",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeightingMethod::MinVariance => "Minimum Variance (inverse volatility)",
            WeightingMethod::MaxSharpe => "Maximum Sharpe (excess return / volatility)",
            WeightingMethod::HierarchicalRiskParity => "Hierarchical Risk Parity (approximation)",
        }
    }
}

impl fmt::Display for WeightingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for WeightingMethod {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "min-variance" | "minimum-variance" | "variance" | "risk-parity" => {
                Ok(WeightingMethod::MinVariance)
            }
            "max-sharpe" | "maximum-sharpe" | "sharpe" => Ok(WeightingMethod::MaxSharpe),
            "hrp" | "hierarchical-risk-parity" => Ok(WeightingMethod::HierarchicalRiskParity),
            other => Err(AllocationError::invalid(
                "method",
                format!(
                    "Unknown method '{}'. Use: min-variance, max-sharpe, hrp",
                    other
                ),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Raw weights for the chosen method, one per covariance row.
///
/// `returns` must be aligned with the covariance rows; it is only read by
/// `MaxSharpe`. Weights are non-negative and sum to 1 but have not been
/// floored yet.
pub fn compute_weights(
    method: WeightingMethod,
    returns: &[Rate],
    cov: &CovarianceMatrix,
    risk_free_rate: Rate,
) -> AllocationResult<Vec<Weight>> {
    if returns.len() != cov.dim() {
        return Err(AllocationError::invalid(
            "returns",
            format!(
                "Expected {} returns to match covariance matrix, got {}",
                cov.dim(),
                returns.len()
            ),
        ));
    }
    match method {
        WeightingMethod::MinVariance => inverse_volatility_weights(cov),
        WeightingMethod::MaxSharpe => max_sharpe_weights(returns, cov, risk_free_rate),
        WeightingMethod::HierarchicalRiskParity => hrp_weights(cov),
    }
}

// ---------------------------------------------------------------------------
// Weight computation methods
// ---------------------------------------------------------------------------

/// w_i = (1/sigma_i) / sum(1/sigma_j)
pub fn inverse_volatility_weights(cov: &CovarianceMatrix) -> AllocationResult<Vec<Weight>> {
    let inv_vols = (0..cov.dim())
        .map(|i| {
            let vol = cov.volatility(i);
            if vol.is_zero() {
                Err(AllocationError::invalid(
                    format!("covariance_matrix[{}][{}]", i, i),
                    "Zero volatility makes inverse-volatility weights undefined",
                ))
            } else {
                Ok(Decimal::ONE / vol)
            }
        })
        .collect::<AllocationResult<Vec<Decimal>>>()?;
    let total: Decimal = inv_vols.iter().sum();
    Ok(inv_vols.iter().map(|iv| *iv / total).collect())
}

/// w_i = max(0, (r_i - r_f)/sigma_i) / sum, or 1/n when no ratio is positive.
pub fn max_sharpe_weights(
    returns: &[Rate],
    cov: &CovarianceMatrix,
    risk_free_rate: Rate,
) -> AllocationResult<Vec<Weight>> {
    let n = cov.dim();
    let ratios = returns
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let vol = cov.volatility(i);
            if vol.is_zero() {
                return Err(AllocationError::invalid(
                    format!("covariance_matrix[{}][{}]", i, i),
                    "Zero volatility makes the excess-return ratio undefined",
                ));
            }
            r.checked_sub(risk_free_rate)
                .and_then(|excess| excess.checked_div(vol))
                .map(|ratio| ratio.max(Decimal::ZERO))
                .ok_or_else(|| {
                    AllocationError::invalid(
                        format!("returns[{}]", i),
                        "Excess-return ratio overflows",
                    )
                })
        })
        .collect::<AllocationResult<Vec<Decimal>>>()?;

    let total = ratios
        .iter()
        .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(*r))
        .ok_or_else(|| AllocationError::invalid("returns", "Excess-return ratios overflow"))?;
    if total.is_zero() {
        let equal = Decimal::ONE / Decimal::from(n as i64);
        return Ok(vec![equal; n]);
    }
    Ok(ratios.iter().map(|r| *r / total).collect())
}

/// Start from inverse-volatility weights b_i, take rc_i = b_i * sigma_i and
/// rescale: w_i = b_i * (sum(rc) / rc_i) / n.
pub fn hrp_weights(cov: &CovarianceMatrix) -> AllocationResult<Vec<Weight>> {
    let n = cov.dim();
    let base = inverse_volatility_weights(cov)?;
    let risk_contrib: Vec<Decimal> = base
        .iter()
        .enumerate()
        .map(|(i, w)| *w * cov.volatility(i))
        .collect();
    let total_risk: Decimal = risk_contrib.iter().sum();
    let n_dec = Decimal::from(n as i64);

    base.iter()
        .zip(risk_contrib.iter())
        .enumerate()
        .map(|(i, (w, rc))| {
            if rc.is_zero() {
                return Err(AllocationError::DivisionByZero {
                    context: format!("hrp risk contribution of asset {}", i),
                });
            }
            Ok(*w * (total_risk / *rc) / n_dec)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
