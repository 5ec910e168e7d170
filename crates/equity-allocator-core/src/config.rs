use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::covariance::CovarianceModel;
use crate::error::AllocationError;
use crate::normalizer::DEFAULT_WEIGHT_FLOOR;
use crate::types::{Rate, Weight};
use crate::universe::provider::DEFAULT_LOAD_TIMEOUT;
use crate::universe::UniverseSelection;
use crate::AllocationResult;

/// Annual risk-free rate used for Sharpe and excess-return calculations.
pub const DEFAULT_RISK_FREE_RATE: Rate = dec!(0.0698);

/// Engine settings that stay fixed across requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub risk_free_rate: Rate,
    pub weight_floor: Weight,
    pub covariance: CovarianceModel,
    /// Ranking and top-N cut. A request's sector filter takes precedence over
    /// `selection.sector`.
    pub selection: UniverseSelection,
    pub universe_timeout_ms: u64,
    /// Reload the cached universe once it is older than this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub universe_max_age_secs: Option<u64>,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        AllocationConfig {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            weight_floor: DEFAULT_WEIGHT_FLOOR,
            covariance: CovarianceModel::default(),
            selection: UniverseSelection::default(),
            universe_timeout_ms: DEFAULT_LOAD_TIMEOUT.as_millis() as u64,
            universe_max_age_secs: None,
        }
    }
}

impl AllocationConfig {
    pub fn validate(&self) -> AllocationResult<()> {
        if self.weight_floor <= Decimal::ZERO || self.weight_floor >= Decimal::ONE {
            return Err(AllocationError::invalid(
                "weight_floor",
                "Must lie in (0, 1)",
            ));
        }
        if self.risk_free_rate <= dec!(-1) {
            return Err(AllocationError::invalid(
                "risk_free_rate",
                "Must be greater than -100%",
            ));
        }
        if self.selection.top_n == 0 {
            return Err(AllocationError::invalid(
                "selection.top_n",
                "Must keep at least one instrument",
            ));
        }
        if self.universe_timeout_ms == 0 {
            return Err(AllocationError::invalid(
                "universe_timeout_ms",
                "Timeout must be positive",
            ));
        }
        if let Some(secs) = self.universe_max_age_secs {
            if max_age_duration(secs).is_none() {
                return Err(AllocationError::invalid(
                    "universe_max_age_secs",
                    format!("{} seconds is out of range", secs),
                ));
            }
        }
        Ok(())
    }

    pub fn universe_timeout(&self) -> Duration {
        Duration::from_millis(self.universe_timeout_ms)
    }

    /// `None` when unset, or when the value is out of range (which
    /// `validate` rejects).
    pub fn universe_max_age(&self) -> Option<chrono::Duration> {
        self.universe_max_age_secs.and_then(max_age_duration)
    }
}

fn max_age_duration(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
}
