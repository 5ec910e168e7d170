use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use equity_allocator_core::covariance::CovarianceModel;
use equity_allocator_core::universe::{RankingMetric, Sector};
use equity_allocator_core::{AllocationConfig, AllocationEngine, AllocationRequest, WeightingMethod};

use crate::input;
use crate::input::config::CliConfig;

/// Arguments for a portfolio allocation
#[derive(Args)]
pub struct AllocateArgs {
    /// Path to a JSON request ({"method", "investment_amount", "horizon_years", "sector_filter"})
    #[arg(long)]
    pub input: Option<String>,

    /// Weighting method: min-variance, max-sharpe, hrp (aliases: variance, sharpe)
    #[arg(long)]
    pub method: Option<WeightingMethod>,

    /// Cash amount to invest
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Projection horizon in whole years
    #[arg(long, default_value = "3")]
    pub horizon: u32,

    /// Restrict the universe to one sector (free text, e.g. "IT", "Banking")
    #[arg(long)]
    pub sector: Option<String>,

    /// Universe file (.csv or .json); defaults to the built-in reference set
    #[arg(long)]
    pub universe: Option<String>,

    /// Engine configuration file (.json, .yaml or .yml)
    #[arg(long)]
    pub config: Option<String>,

    /// Keep the N best-ranked instruments
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Ranking used for the top-N cut
    #[arg(long)]
    pub ranking: Option<RankingArg>,

    /// Annual risk-free rate
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Correlation assumption for portfolio risk
    #[arg(long)]
    pub covariance: Option<CovarianceArg>,

    /// Pairwise correlation (constant model) or intra-sector correlation (sector model)
    #[arg(long, default_value = "0")]
    pub rho: Decimal,

    /// Cross-sector correlation for the sector model
    #[arg(long, default_value = "0")]
    pub inter_rho: Decimal,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RankingArg {
    Return,
    Sharpe,
    LowVol,
}

impl From<RankingArg> for RankingMetric {
    fn from(arg: RankingArg) -> Self {
        match arg {
            RankingArg::Return => RankingMetric::ExpectedReturn,
            RankingArg::Sharpe => RankingMetric::SharpeRatio,
            RankingArg::LowVol => RankingMetric::InverseVolatility,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CovarianceArg {
    Diagonal,
    Constant,
    Sector,
}

/// Fold command-line overrides into the file (or default) configuration.
fn apply_overrides(mut config: AllocationConfig, args: &AllocateArgs) -> AllocationConfig {
    if let Some(rf) = args.risk_free_rate {
        config.risk_free_rate = rf;
    }
    if let Some(n) = args.top_n {
        config.selection.top_n = n;
    }
    if let Some(r) = args.ranking {
        config.selection.ranking = r.into();
    }
    if let Some(c) = args.covariance {
        config.covariance = match c {
            CovarianceArg::Diagonal => CovarianceModel::Diagonal,
            CovarianceArg::Constant => CovarianceModel::ConstantCorrelation { rho: args.rho },
            CovarianceArg::Sector => CovarianceModel::SectorCorrelation {
                intra_sector: args.rho,
                inter_sector: args.inter_rho,
            },
        };
    }
    config
}

pub fn run_allocate(args: AllocateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: AllocationRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        AllocationRequest {
            method: args
                .method
                .ok_or("--method is required (or provide --input)")?,
            investment_amount: args
                .amount
                .ok_or("--amount is required (or provide --input)")?,
            horizon_years: args.horizon,
            sector_filter: args.sector.as_deref().map(Sector::normalize),
        }
    };

    let CliConfig { engine, csv } = input::config::load_config(args.config.as_deref())?;
    let config = apply_overrides(engine, &args);
    config.validate()?;

    let provider = input::universe_source::open_provider(args.universe.as_deref(), &csv)?;
    tracing::debug!(provider = provider.name(), method = %request.method, "allocating");

    let mut engine = AllocationEngine::new(provider, config);
    let result = engine.compute(&request)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rust_decimal_macros::dec;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: AllocateArgs,
    }

    fn parse(argv: &[&str]) -> AllocateArgs {
        let mut full = vec!["eqalloc"];
        full.extend_from_slice(argv);
        Harness::parse_from(full).args
    }

    #[test]
    fn test_method_aliases_parse() {
        let args = parse(&["--method", "sharpe", "--amount", "10000"]);
        assert_eq!(args.method, Some(WeightingMethod::MaxSharpe));
        assert_eq!(args.amount, Some(dec!(10000)));
        assert_eq!(args.horizon, 3);
    }

    #[test]
    fn test_overrides_reach_config() {
        let args = parse(&[
            "--method", "hrp", "--amount", "5000", "--top-n", "8", "--ranking", "low-vol",
            "--covariance", "sector", "--rho", "0.4", "--inter-rho", "0.1",
            "--risk-free-rate", "0.05",
        ]);
        let config = apply_overrides(AllocationConfig::default(), &args);
        assert_eq!(config.selection.top_n, 8);
        assert_eq!(config.selection.ranking, RankingMetric::InverseVolatility);
        assert_eq!(config.risk_free_rate, dec!(0.05));
        assert_eq!(
            config.covariance,
            CovarianceModel::SectorCorrelation {
                intra_sector: dec!(0.4),
                inter_sector: dec!(0.1),
            }
        );
    }

    #[test]
    fn test_no_overrides_keep_defaults() {
        let args = parse(&["--method", "min-variance", "--amount", "1"]);
        let config = apply_overrides(AllocationConfig::default(), &args);
        assert_eq!(config, AllocationConfig::default());
    }
}
