use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::AllocationError;
use crate::types::Weight;
use crate::AllocationResult;

/// Minimum weight any selected instrument keeps after adjustment.
pub const DEFAULT_WEIGHT_FLOOR: Weight = dec!(0.01);

/// Raise every weight to at least `floor`, then rescale to sum to 1.
///
/// Keeps instruments with a zero or negative raw weight in the portfolio, so
/// every adjusted weight is at least `floor / sum(max(w, floor))` and strictly
/// positive.
pub fn apply_weight_floor(weights: &[Weight], floor: Weight) -> AllocationResult<Vec<Weight>> {
    if weights.is_empty() {
        return Err(AllocationError::invalid(
            "weights",
            "At least one weight required",
        ));
    }
    if floor <= Decimal::ZERO || floor >= Decimal::ONE {
        return Err(AllocationError::invalid(
            "weight_floor",
            format!("Floor {} must lie in (0, 1)", floor),
        ));
    }

    let floored: Vec<Decimal> = weights.iter().map(|w| (*w).max(floor)).collect();
    let total: Decimal = floored.iter().sum();
    Ok(floored.iter().map(|w| *w / total).collect())
}
