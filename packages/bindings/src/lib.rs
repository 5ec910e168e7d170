use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use equity_allocator_core::classifier::classify_investor_code;
use equity_allocator_core::universe::{
    reference_instruments, Instrument, ReferenceUniverse, StaticUniverse, UniverseProvider,
};
use equity_allocator_core::{AllocationConfig, AllocationEngine, AllocationRequest};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// `computePortfolio` payload: the request fields at the top level, plus an
/// optional caller-supplied universe and engine configuration.
#[derive(Deserialize)]
struct PortfolioPayload {
    #[serde(flatten)]
    request: AllocationRequest,
    #[serde(default)]
    instruments: Option<Vec<Instrument>>,
    #[serde(default)]
    config: AllocationConfig,
}

#[napi]
pub fn compute_portfolio(input_json: String) -> NapiResult<String> {
    let payload: PortfolioPayload = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let provider: Arc<dyn UniverseProvider> = match payload.instruments {
        Some(list) => Arc::new(StaticUniverse::new("caller", list)),
        None => Arc::new(ReferenceUniverse),
    };
    let mut engine = AllocationEngine::new(provider, payload.config);
    let output = engine.compute(&payload.request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Returns the profile label ("Aggressive", "Moderate", "Conservative").
#[napi]
pub fn classify_investor(
    horizon_years: u32,
    risk_tolerance: String,
    objective: String,
) -> NapiResult<String> {
    let rt = Decimal::from_str(risk_tolerance.trim()).map_err(to_napi_error)?;
    Ok(classify_investor_code(horizon_years, rt, &objective)
        .label()
        .to_string())
}

// ---------------------------------------------------------------------------
// Universe
// ---------------------------------------------------------------------------

#[napi]
pub fn reference_universe() -> NapiResult<String> {
    serde_json::to_string(&reference_instruments()).map_err(to_napi_error)
}
