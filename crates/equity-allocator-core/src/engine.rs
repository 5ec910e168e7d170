use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use crate::allocator::allocate_discrete;
use crate::config::AllocationConfig;
use crate::error::AllocationError;
use crate::metrics::{self, PortfolioInsight, VarConfidence};
use crate::normalizer::apply_weight_floor;
use crate::result::{AllocationLine, PortfolioResult, ResultCondition};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::universe::{
    select_universe, Instrument, Sector, UniverseCache, UniverseProvider, UniverseSelection,
    UniverseSource,
};
use crate::weighting::{compute_weights, WeightingMethod};
use crate::AllocationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One recomputation request from the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub method: WeightingMethod,
    pub investment_amount: Money,
    /// Whole years for the projected value
    #[serde(default)]
    pub horizon_years: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_filter: Option<Sector>,
}

impl AllocationRequest {
    pub fn new(method: WeightingMethod, investment_amount: Money, horizon_years: u32) -> Self {
        AllocationRequest {
            method,
            investment_amount,
            horizon_years,
            sector_filter: None,
        }
    }

    pub fn with_sector(mut self, sector: Sector) -> Self {
        self.sector_filter = Some(sector);
        self
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full pipeline against an explicit instrument list:
/// selection -> covariance -> weights -> floor -> discrete allocation ->
/// metrics.
///
/// Pure with respect to its arguments; identical inputs give identical
/// `result` values (only the envelope timing differs).
pub fn compute_portfolio(
    request: &AllocationRequest,
    instruments: &[Instrument],
    config: &AllocationConfig,
) -> AllocationResult<ComputationOutput<PortfolioResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // -- Validation --
    config.validate()?;
    if request.investment_amount <= Decimal::ZERO {
        return Err(AllocationError::invalid(
            "investment_amount",
            "Investment must be positive",
        ));
    }
    for (i, inst) in instruments.iter().enumerate() {
        inst.validate(i)?;
    }

    // -- Universe selection --
    let selection = UniverseSelection {
        sector: request.sector_filter.or(config.selection.sector),
        ..config.selection.clone()
    };
    let selected = select_universe(instruments, &selection, config.risk_free_rate)?;
    tracing::debug!(
        method = %request.method,
        selected = selected.len(),
        "universe selected"
    );

    let returns: Vec<Rate> = selected.iter().map(|i| i.expected_return).collect();
    let prices: Vec<Money> = selected.iter().map(|i| i.current_price).collect();

    // -- Weights --
    let cov = config.covariance.build(&selected)?;
    let raw_weights = compute_weights(request.method, &returns, &cov, config.risk_free_rate)?;
    let weights = apply_weight_floor(&raw_weights, config.weight_floor)?;

    // -- Metrics --
    let investment = request.investment_amount;
    let expected_return = metrics::expected_return(&weights, &returns)?;
    let portfolio_risk = metrics::portfolio_risk(&weights, &cov)?;
    let sharpe_ratio = metrics::sharpe_ratio(expected_return, config.risk_free_rate, portfolio_risk)?;
    let var_95 = metrics::value_at_risk(investment, expected_return, portfolio_risk, VarConfidence::P95)?;
    let var_99 = metrics::value_at_risk(investment, expected_return, portfolio_risk, VarConfidence::P99)?;
    let projected_value = metrics::projected_value(investment, expected_return, request.horizon_years)?;
    let diversification_ratio = metrics::diversification_ratio(&weights, &cov, portfolio_risk);
    let effective_num_holdings = metrics::effective_num_holdings(&weights);

    // -- Discrete allocation --
    let discrete = allocate_discrete(&weights, investment, &prices)?;
    let hundred = dec!(100);
    let mut allocations: Vec<AllocationLine> = selected
        .iter()
        .enumerate()
        .filter(|(i, _)| discrete.quantities[*i] > 0)
        .map(|(i, inst)| AllocationLine {
            ticker: inst.ticker.clone(),
            sector: inst.sector,
            weight: weights[i],
            weight_pct: weights[i] * hundred,
            current_price: inst.current_price,
            quantity: discrete.quantities[i],
            reinvested_units: discrete.reinvested_units(i),
            amount_used: discrete.amounts_used[i],
            pct_of_investment: discrete.amounts_used[i] / investment * hundred,
        })
        .collect();
    allocations.sort_by(|a, b| match b.amount_used.cmp(&a.amount_used) {
        Ordering::Equal => a.ticker.cmp(&b.ticker),
        other => other,
    });
    let sector_exposure = metrics::sector_exposure(&allocations, investment);

    // -- Degenerate conditions --
    let mut conditions = Vec::new();
    if sharpe_ratio.is_none() {
        conditions.push(ResultCondition::UndefinedSharpe);
    }
    if discrete.is_uninvested() {
        conditions.push(ResultCondition::FullyUninvested);
    }
    for c in &conditions {
        tracing::warn!(condition = ?c, "degenerate allocation result");
        warnings.push(c.message().to_string());
    }

    let floored = raw_weights
        .iter()
        .filter(|w| **w < config.weight_floor)
        .count();
    if floored > 0 {
        warnings.push(format!(
            "{} instrument(s) raised to the {}% minimum weight",
            floored,
            config.weight_floor * hundred
        ));
    }

    let insight = PortfolioInsight::from_sharpe(sharpe_ratio);
    let output = PortfolioResult {
        method: request.method,
        investment_amount: investment,
        horizon_years: request.horizon_years,
        tickers: selected.iter().map(|i| i.ticker.clone()).collect(),
        weights,
        expected_return,
        portfolio_risk,
        sharpe_ratio,
        var_95,
        var_99,
        projected_value,
        diversification_ratio,
        effective_num_holdings,
        allocations,
        sector_exposure,
        total_invested: discrete.total_invested(),
        remaining_amount: discrete.remaining,
        insight,
        insight_text: insight.message().to_string(),
        conditions,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("Discrete Portfolio Allocation ({})", request.method.label()),
        &serde_json::json!({
            "num_instruments": selected.len(),
            "risk_free_rate": config.risk_free_rate.to_string(),
            "weight_floor": config.weight_floor.to_string(),
            "covariance_model": config.covariance.describe(),
            "ranking": format!("{:?}", selection.ranking),
            "top_n": selection.top_n,
            "sector_filter": selection.sector.map(|s| s.to_string()),
            "var_model": "parametric gaussian",
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Computation context: configuration plus the universe cache shared by
/// successive requests.
pub struct AllocationEngine {
    config: AllocationConfig,
    cache: UniverseCache,
}

impl AllocationEngine {
    pub fn new(provider: Arc<dyn UniverseProvider>, config: AllocationConfig) -> Self {
        let mut cache = UniverseCache::new(provider).with_timeout(config.universe_timeout());
        if let Some(max_age) = config.universe_max_age() {
            cache = cache.with_max_age(max_age);
        }
        AllocationEngine { config, cache }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub fn cache_mut(&mut self) -> &mut UniverseCache {
        &mut self.cache
    }

    /// Current universe (loading it if needed).
    pub fn universe(&mut self) -> Arc<Vec<Instrument>> {
        Arc::clone(&self.cache.get().instruments)
    }

    /// Force the next request to refetch the universe.
    pub fn invalidate_universe(&mut self) {
        self.cache.invalidate();
    }

    /// Compute a portfolio against the cached universe. Provider failures are
    /// absorbed by the cache; they surface here only as a warning.
    pub fn compute(
        &mut self,
        request: &AllocationRequest,
    ) -> AllocationResult<ComputationOutput<PortfolioResult>> {
        let snapshot = self.cache.get();
        let instruments = Arc::clone(&snapshot.instruments);
        let fallback_note = match snapshot.source {
            UniverseSource::Fallback => Some(format!(
                "Universe provider '{}' unavailable ({}); using fallback universe",
                snapshot.provider,
                snapshot.fallback_reason.as_deref().unwrap_or("unknown error")
            )),
            UniverseSource::Provider => None,
        };

        let mut output = compute_portfolio(request, &instruments, &self.config)?;
        if let Some(note) = fallback_note {
            output.warnings.insert(0, note);
        }
        Ok(output)
    }
}
