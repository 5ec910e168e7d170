use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::instrument::{Instrument, Sector};
use crate::error::AllocationError;
use crate::types::Rate;
use crate::AllocationResult;

/// Number of instruments kept after ranking when nothing else is configured.
pub const DEFAULT_TOP_N: usize = 15;

/// Score used to rank instruments before the top-N cut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    /// Highest expected annual return first
    #[default]
    ExpectedReturn,
    /// Reported Sharpe ratio when the source carries one, otherwise
    /// (expected_return - risk_free_rate) / std_dev
    SharpeRatio,
    /// Lowest volatility first (scored as 1 / std_dev)
    InverseVolatility,
}

/// How the raw universe is narrowed before weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
    pub top_n: usize,
    pub ranking: RankingMetric,
    /// Drop instruments whose ranking score falls below this value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<Decimal>,
}

impl Default for UniverseSelection {
    fn default() -> Self {
        UniverseSelection {
            sector: None,
            top_n: DEFAULT_TOP_N,
            ranking: RankingMetric::default(),
            min_score: None,
        }
    }
}

/// Ranking score of a single instrument. Volatility-based metrics need a
/// positive `std_dev`.
pub fn ranking_score(
    inst: &Instrument,
    metric: RankingMetric,
    risk_free_rate: Rate,
) -> AllocationResult<Decimal> {
    let per_unit_vol = |numerator: Decimal| {
        if inst.std_dev <= Decimal::ZERO {
            return Err(AllocationError::invalid(
                format!("{}.std_dev", inst.ticker),
                "Volatility-based ranking needs a positive volatility",
            ));
        }
        numerator.checked_div(inst.std_dev).ok_or_else(|| {
            AllocationError::invalid(
                format!("{}.expected_return", inst.ticker),
                "Ranking score overflows",
            )
        })
    };
    match metric {
        RankingMetric::ExpectedReturn => Ok(inst.expected_return),
        RankingMetric::SharpeRatio => match inst.sharpe_ratio {
            Some(reported) => Ok(reported),
            None => {
                let excess = inst.expected_return.checked_sub(risk_free_rate).ok_or_else(|| {
                    AllocationError::invalid(
                        format!("{}.expected_return", inst.ticker),
                        "Excess return overflows",
                    )
                })?;
                per_unit_vol(excess)
            }
        },
        RankingMetric::InverseVolatility => per_unit_vol(Decimal::ONE),
    }
}

/// Apply sector filter, ranking, score threshold and top-N cut.
///
/// Ordering is by score descending with ticker ascending as the tie-break, so
/// the result is a pure function of the input set. Every stage that leaves
/// nothing behind is an error rather than an empty universe.
pub fn select_universe(
    instruments: &[Instrument],
    selection: &UniverseSelection,
    risk_free_rate: Rate,
) -> AllocationResult<Vec<Instrument>> {
    if selection.top_n == 0 {
        return Err(AllocationError::invalid(
            "selection.top_n",
            "Must keep at least one instrument",
        ));
    }
    if instruments.is_empty() {
        return Err(AllocationError::invalid("universe", "Universe is empty"));
    }

    let in_sector: Vec<&Instrument> = instruments
        .iter()
        .filter(|inst| selection.sector.map_or(true, |s| inst.sector == s))
        .collect();
    if in_sector.is_empty() {
        return Err(AllocationError::invalid(
            "sector_filter",
            format!(
                "No instruments in sector {}",
                selection.sector.map(|s| s.to_string()).unwrap_or_default()
            ),
        ));
    }

    // Zero volatility cannot be weighted, whichever metric ranks it.
    if let Some(flat) = in_sector.iter().find(|inst| inst.std_dev <= Decimal::ZERO) {
        return Err(AllocationError::invalid(
            format!("{}.std_dev", flat.ticker),
            "Volatility must be positive",
        ));
    }

    let mut scored: Vec<(Decimal, &Instrument)> = Vec::with_capacity(in_sector.len());
    for inst in in_sector {
        let score = ranking_score(inst, selection.ranking, risk_free_rate)?;
        if selection.min_score.map_or(true, |min| score >= min) {
            scored.push((score, inst));
        }
    }
    if scored.is_empty() {
        return Err(AllocationError::invalid(
            "selection.min_score",
            format!(
                "No instruments pass the {:?} ranking threshold",
                selection.ranking
            ),
        ));
    }

    scored.sort_by(|(sa, a), (sb, b)| match sb.cmp(sa) {
        Ordering::Equal => a.ticker.cmp(&b.ticker),
        other => other,
    });

    Ok(scored
        .into_iter()
        .take(selection.top_n)
        .map(|(_, inst)| inst.clone())
        .collect())
}
