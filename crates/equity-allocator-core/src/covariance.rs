use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AllocationError;
use crate::linalg::sqrt_decimal;
use crate::types::Rate;
use crate::universe::Instrument;
use crate::AllocationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Correlation assumption used to turn per-instrument volatilities into a
/// covariance matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CovarianceModel {
    /// Uncorrelated instruments: off-diagonal entries are zero
    #[default]
    Diagonal,
    /// One flat correlation for every pair
    ConstantCorrelation { rho: Decimal },
    /// One correlation inside a sector, another across sectors
    SectorCorrelation {
        intra_sector: Decimal,
        inter_sector: Decimal,
    },
}

/// Validated n x n covariance matrix: square, symmetric, positive diagonal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CovarianceMatrix {
    rows: Vec<Vec<Decimal>>,
}

impl CovarianceMatrix {
    /// Wrap a row-major matrix after checking shape, symmetry and diagonal.
    pub fn from_rows(rows: Vec<Vec<Decimal>>) -> AllocationResult<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(AllocationError::invalid(
                "covariance_matrix",
                "Matrix must have at least one row",
            ));
        }
        validate_square(&rows, "covariance_matrix")?;
        validate_symmetric(&rows, "covariance_matrix")?;
        for (i, row) in rows.iter().enumerate() {
            if row[i] <= Decimal::ZERO {
                return Err(AllocationError::invalid(
                    format!("covariance_matrix[{}][{}]", i, i),
                    "Variance must be strictly positive",
                ));
            }
        }
        Ok(CovarianceMatrix { rows })
    }

    pub fn dim(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Decimal>] {
        &self.rows
    }

    pub fn variance(&self, i: usize) -> Decimal {
        self.rows[i][i]
    }

    /// sqrt(M[i][i])
    pub fn volatility(&self, i: usize) -> Decimal {
        sqrt_decimal(self.rows[i][i])
    }

    pub fn volatilities(&self) -> Vec<Decimal> {
        (0..self.dim()).map(|i| self.volatility(i)).collect()
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

impl CovarianceModel {
    /// Build the covariance matrix for an ordered instrument list.
    pub fn build(&self, instruments: &[Instrument]) -> AllocationResult<CovarianceMatrix> {
        let std_devs: Vec<Rate> = instruments.iter().map(|i| i.std_dev).collect();
        match *self {
            CovarianceModel::Diagonal => build_covariance(&std_devs, Decimal::ZERO),
            CovarianceModel::ConstantCorrelation { rho } => build_covariance(&std_devs, rho),
            CovarianceModel::SectorCorrelation {
                intra_sector,
                inter_sector,
            } => {
                check_rho(intra_sector, "intra_sector")?;
                check_rho(inter_sector, "inter_sector")?;
                let n = instruments.len();
                let corr: Vec<Vec<Decimal>> = (0..n)
                    .map(|i| {
                        (0..n)
                            .map(|j| {
                                if i == j {
                                    Decimal::ONE
                                } else if instruments[i].sector == instruments[j].sector {
                                    intra_sector
                                } else {
                                    inter_sector
                                }
                            })
                            .collect()
                    })
                    .collect();
                build_covariance_with_correlation(&std_devs, &corr)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CovarianceModel::Diagonal => "diagonal".to_string(),
            CovarianceModel::ConstantCorrelation { rho } => format!("constant correlation {}", rho),
            CovarianceModel::SectorCorrelation {
                intra_sector,
                inter_sector,
            } => format!(
                "sector correlation (intra {}, inter {})",
                intra_sector, inter_sector
            ),
        }
    }
}

/// M[i][i] = sigma_i^2, M[i][j] = rho * sigma_i * sigma_j.
///
/// `rho = 0` gives the purely diagonal model. Non-positive volatilities are
/// rejected, never floored.
pub fn build_covariance(std_devs: &[Rate], rho: Decimal) -> AllocationResult<CovarianceMatrix> {
    check_rho(rho, "rho")?;
    validate_std_devs(std_devs)?;
    let n = std_devs.len();
    let rows = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    let c = if i == j { Decimal::ONE } else { rho };
                    covariance_entry(c, std_devs, i, j)
                })
                .collect()
        })
        .collect::<AllocationResult<Vec<Vec<Decimal>>>>()?;
    CovarianceMatrix::from_rows(rows)
}

/// M[i][j] = corr[i][j] * sigma_i * sigma_j for an explicit correlation matrix.
#[allow(clippy::needless_range_loop)]
pub fn build_covariance_with_correlation(
    std_devs: &[Rate],
    correlation: &[Vec<Decimal>],
) -> AllocationResult<CovarianceMatrix> {
    validate_std_devs(std_devs)?;
    let n = std_devs.len();
    if correlation.len() != n {
        return Err(AllocationError::invalid(
            "correlation",
            format!("Expected {}x{} matrix but got {} rows", n, n, correlation.len()),
        ));
    }
    validate_square(correlation, "correlation")?;
    validate_symmetric(correlation, "correlation")?;
    for i in 0..n {
        if correlation[i][i] != Decimal::ONE {
            return Err(AllocationError::invalid(
                format!("correlation[{}][{}]", i, i),
                "Diagonal must be 1",
            ));
        }
        for j in 0..n {
            if i != j && correlation[i][j].abs() >= Decimal::ONE {
                return Err(AllocationError::invalid(
                    format!("correlation[{}][{}]", i, j),
                    "Off-diagonal correlation must lie strictly between -1 and 1",
                ));
            }
        }
    }

    let rows = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| covariance_entry(correlation[i][j], std_devs, i, j))
                .collect()
        })
        .collect::<AllocationResult<Vec<Vec<Decimal>>>>()?;
    CovarianceMatrix::from_rows(rows)
}

/// corr * sigma_i * sigma_j
fn covariance_entry(corr: Decimal, std_devs: &[Rate], i: usize, j: usize) -> AllocationResult<Decimal> {
    corr.checked_mul(std_devs[i])
        .and_then(|v| v.checked_mul(std_devs[j]))
        .ok_or_else(|| {
            AllocationError::invalid(
                format!("covariance_matrix[{}][{}]", i, j),
                "Covariance overflows",
            )
        })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_rho(rho: Decimal, field: &str) -> AllocationResult<()> {
    if rho < Decimal::ZERO || rho >= Decimal::ONE {
        return Err(AllocationError::invalid(
            field,
            format!("Correlation {} must lie in [0, 1)", rho),
        ));
    }
    Ok(())
}

fn validate_std_devs(std_devs: &[Rate]) -> AllocationResult<()> {
    if std_devs.is_empty() {
        return Err(AllocationError::invalid(
            "std_devs",
            "At least one volatility required",
        ));
    }
    for (i, sd) in std_devs.iter().enumerate() {
        if *sd <= Decimal::ZERO {
            return Err(AllocationError::invalid(
                format!("std_devs[{}]", i),
                format!("Volatility must be positive, got {}", sd),
            ));
        }
        match sd.checked_mul(*sd) {
            None => {
                return Err(AllocationError::invalid(
                    format!("std_devs[{}]", i),
                    format!("Volatility {} is too large to square", sd),
                ))
            }
            Some(variance) if variance.is_zero() => {
                return Err(AllocationError::invalid(
                    format!("std_devs[{}]", i),
                    format!("Volatility {} is too small: its variance rounds to zero", sd),
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn validate_square(mat: &[Vec<Decimal>], field: &str) -> AllocationResult<()> {
    let n = mat.len();
    for (i, row) in mat.iter().enumerate() {
        if row.len() != n {
            return Err(AllocationError::invalid(
                field,
                format!("Row {} has {} columns, expected {}", i, row.len(), n),
            ));
        }
    }
    Ok(())
}

#[allow(clippy::needless_range_loop)]
fn validate_symmetric(mat: &[Vec<Decimal>], field: &str) -> AllocationResult<()> {
    let n = mat.len();
    let tolerance = dec!(0.0000001);
    for i in 0..n {
        for j in (i + 1)..n {
            if (mat[i][j] - mat[j][i]).abs() > tolerance {
                return Err(AllocationError::invalid(
                    field,
                    format!(
                        "Matrix is not symmetric: [{}][{}]={} != [{}][{}]={}",
                        i, j, mat[i][j], j, i, mat[j][i]
                    ),
                ));
            }
        }
    }
    Ok(())
}
