//! Small dense-vector helpers shared by the covariance, weighting and metrics
//! modules. Matrices are row-major `Vec<Vec<Decimal>>`.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

/// Matrix-vector multiplication: result_i = sum_j(mat[i][j] * vec[j]).
/// `None` on overflow.
pub(crate) fn mat_vec_multiply(mat: &[Vec<Decimal>], v: &[Decimal]) -> Option<Vec<Decimal>> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Dot product of two vectors. `None` on overflow.
pub(crate) fn vec_dot(a: &[Decimal], b: &[Decimal]) -> Option<Decimal> {
    a.iter()
        .zip(b.iter())
        .try_fold(Decimal::ZERO, |acc, (x, y)| acc.checked_add(x.checked_mul(*y)?))
}

/// Quadratic form w' * M * w. `None` on overflow.
pub(crate) fn quadratic_form(weights: &[Decimal], mat: &[Vec<Decimal>]) -> Option<Decimal> {
    let mw = mat_vec_multiply(mat, weights)?;
    vec_dot(weights, &mw)
}

/// Square root that maps non-positive input to zero.
pub(crate) fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}
