use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::Rate;

/// Investment objective as captured by the investor questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentObjective {
    /// Questionnaire code "1"
    Growth,
    /// Questionnaire code "2"
    Income,
    /// Questionnaire code "3"
    Balanced,
    /// Any other answer
    Unspecified,
}

impl InvestmentObjective {
    /// Parse a questionnaire code or name. Never fails.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "1" | "growth" => InvestmentObjective::Growth,
            "2" | "income" => InvestmentObjective::Income,
            "3" | "balanced" => InvestmentObjective::Balanced,
            _ => InvestmentObjective::Unspecified,
        }
    }
}

impl FromStr for InvestmentObjective {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(InvestmentObjective::from_code(s))
    }
}

/// Investor risk profile label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestorProfile {
    Aggressive,
    Moderate,
    Conservative,
}

impl InvestorProfile {
    pub fn label(&self) -> &'static str {
        match self {
            InvestorProfile::Aggressive => "Aggressive",
            InvestorProfile::Moderate => "Moderate",
            InvestorProfile::Conservative => "Conservative",
        }
    }
}

impl fmt::Display for InvestorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify an investor. First matching rule wins:
///
/// 1. risk_tolerance >= 8% and horizon >= 4y and Growth -> Aggressive
/// 2. risk_tolerance <= 5% and horizon <= 2y and Income -> Conservative
/// 3. otherwise Moderate
pub fn classify_investor(
    horizon_years: u32,
    risk_tolerance: Rate,
    objective: InvestmentObjective,
) -> InvestorProfile {
    if risk_tolerance >= dec!(0.08)
        && horizon_years >= 4
        && objective == InvestmentObjective::Growth
    {
        InvestorProfile::Aggressive
    } else if risk_tolerance <= dec!(0.05)
        && horizon_years <= 2
        && objective == InvestmentObjective::Income
    {
        InvestorProfile::Conservative
    } else {
        InvestorProfile::Moderate
    }
}

/// Same as [`classify_investor`] with the objective given as a raw code.
pub fn classify_investor_code(horizon_years: u32, risk_tolerance: Decimal, objective_code: &str) -> InvestorProfile {
    classify_investor(
        horizon_years,
        risk_tolerance,
        InvestmentObjective::from_code(objective_code),
    )
}
