use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use equity_allocator_core::classifier::{classify_investor, InvestmentObjective, InvestorProfile};

use crate::input;

/// Arguments for investor classification
#[derive(Args)]
pub struct ClassifyArgs {
    /// Path to a JSON file with horizon_years, risk_tolerance, objective
    #[arg(long)]
    pub input: Option<String>,

    /// Investment horizon in years
    #[arg(long)]
    pub horizon: Option<u32>,

    /// Risk tolerance as a fraction (0.08 = 8%)
    #[arg(long)]
    pub risk_tolerance: Option<Decimal>,

    /// Objective: 1 / growth, 2 / income, 3 / balanced
    #[arg(long, default_value = "")]
    pub objective: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassifyInput {
    horizon_years: u32,
    risk_tolerance: Decimal,
    #[serde(default)]
    objective: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassifyOutput {
    profile: InvestorProfile,
    horizon_years: u32,
    risk_tolerance: Decimal,
    objective: InvestmentObjective,
}

pub fn run_classify(args: ClassifyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input: ClassifyInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        ClassifyInput {
            horizon_years: args
                .horizon
                .ok_or("--horizon is required (or provide --input)")?,
            risk_tolerance: args
                .risk_tolerance
                .ok_or("--risk-tolerance is required (or provide --input)")?,
            objective: args.objective.clone(),
        }
    };

    let objective = InvestmentObjective::from_code(&input.objective);
    let profile = classify_investor(input.horizon_years, input.risk_tolerance, objective);
    let output = ClassifyOutput {
        profile,
        horizon_years: input.horizon_years,
        risk_tolerance: input.risk_tolerance,
        objective,
    };
    Ok(serde_json::to_value(output)?)
}
