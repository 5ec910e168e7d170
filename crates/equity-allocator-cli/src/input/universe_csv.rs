//! CSV universe ingestion.
//!
//! Reads a research export (one row per listed equity) into [`Instrument`]
//! values. Column names are configurable through [`CsvMapping`]; the defaults
//! match the projection export the allocator was first fed with:
//!
//! | Column             | Example   | Notes                                     |
//! |--------------------|-----------|-------------------------------------------|
//! | `Ticker`           | `TCS.NS`  | required                                  |
//! | `Sector`           | `IT`      | required, normalised onto [`Sector`]      |
//! | `Current Price`    | `3890.20` | required, > 0                             |
//! | `2030-12`          | `6120.00` | projected price, see `projection_years`   |
//! | `Std Dev (%)`      | `7.5`     | percent; missing or zero gives 15%        |
//! | `Sharpe Ratio`     | `1.12`    | optional                                  |
//! | `Beta`             | `0.94`    | optional, default 1                       |
//! | `Max Drawdown (%)` | `-22.1`   | optional, absolute value, default 20%     |
//! | `VaR (95%)`        | `-3.4`    | optional, absolute value, default 5%      |
//!
//! When the mapping names an `expected_return` column that is present, it is
//! read directly (as a fraction) and the projected price is ignored.
//!
//! Rows that cannot be parsed, or whose return or volatility fall outside
//! sane bounds, are skipped; only a missing header is an error.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use equity_allocator_core::universe::{Instrument, Sector, UniverseProvider};
use equity_allocator_core::{AllocationError, AllocationResult};

const DEFAULT_STD_DEV: Decimal = dec!(0.15);
const DEFAULT_BETA: Decimal = dec!(1);
const DEFAULT_MAX_DRAWDOWN: Decimal = dec!(0.2);
const DEFAULT_VAR_95: Decimal = dec!(0.05);

const MIN_RETURN: Decimal = dec!(-0.5);
const MAX_RETURN: Decimal = dec!(2.0);
const MAX_STD_DEV: Decimal = dec!(1.0);

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Header names and parsing limits for a universe CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvMapping {
    pub ticker: String,
    pub sector: String,
    pub current_price: String,
    /// Annual return column, used instead of the projected price when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_return: Option<String>,
    pub projected_price: String,
    /// Years between the current and the projected price
    pub projection_years: u32,
    pub std_dev_pct: String,
    pub sharpe_ratio: String,
    pub beta: String,
    pub max_drawdown_pct: String,
    pub var_95_pct: String,
    /// Data rows read before the rest of the file is ignored
    pub max_rows: usize,
}

impl Default for CsvMapping {
    fn default() -> Self {
        CsvMapping {
            ticker: "Ticker".into(),
            sector: "Sector".into(),
            current_price: "Current Price".into(),
            expected_return: None,
            projected_price: "2030-12".into(),
            projection_years: 5,
            std_dev_pct: "Std Dev (%)".into(),
            sharpe_ratio: "Sharpe Ratio".into(),
            beta: "Beta".into(),
            max_drawdown_pct: "Max Drawdown (%)".into(),
            var_95_pct: "VaR (95%)".into(),
            max_rows: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Universe provider reading a CSV file on every load.
#[derive(Debug, Clone)]
pub struct CsvUniverse {
    label: String,
    path: PathBuf,
    mapping: CsvMapping,
}

impl CsvUniverse {
    pub fn new(path: impl Into<PathBuf>, mapping: CsvMapping) -> Self {
        let path = path.into();
        CsvUniverse {
            label: format!("csv:{}", path.display()),
            path,
            mapping,
        }
    }
}

impl UniverseProvider for CsvUniverse {
    fn name(&self) -> &str {
        &self.label
    }

    fn load_universe(&self) -> AllocationResult<Vec<Instrument>> {
        let file = File::open(&self.path).map_err(|e| {
            AllocationError::DataUnavailable(format!("open '{}': {}", self.path.display(), e))
        })?;
        let load = parse_universe_csv(file, &self.mapping)?;
        tracing::info!(
            path = %self.path.display(),
            accepted = load.instruments.len(),
            skipped = load.skipped,
            "csv universe parsed"
        );
        Ok(load.instruments)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Outcome of a CSV parse.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLoad {
    pub instruments: Vec<Instrument>,
    /// Data rows read but not turned into instruments
    pub skipped: usize,
}

/// Parse universe rows from any reader.
pub fn parse_universe_csv<R: Read>(reader: R, mapping: &CsvMapping) -> AllocationResult<CsvLoad> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| AllocationError::DataUnavailable(format!("csv header: {}", e)))?
        .clone();
    let columns = ColumnIndex::build(&headers, mapping)?;

    let mut instruments = Vec::new();
    let mut skipped = 0usize;
    for (row, record) in rdr.records().take(mapping.max_rows).enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(row = row + 1, error = %e, "unreadable csv row");
                skipped += 1;
                continue;
            }
        };
        match columns.instrument(&record, mapping) {
            Some(inst) => instruments.push(inst),
            None => {
                tracing::debug!(row = row + 1, "csv row skipped");
                skipped += 1;
            }
        }
    }

    Ok(CsvLoad {
        instruments,
        skipped,
    })
}

/// Header positions resolved once per file.
struct ColumnIndex {
    ticker: usize,
    sector: usize,
    current_price: usize,
    expected_return: Option<usize>,
    projected_price: Option<usize>,
    std_dev_pct: Option<usize>,
    sharpe_ratio: Option<usize>,
    beta: Option<usize>,
    max_drawdown_pct: Option<usize>,
    var_95_pct: Option<usize>,
}

impl ColumnIndex {
    fn build(headers: &csv::StringRecord, mapping: &CsvMapping) -> AllocationResult<Self> {
        let by_name: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (header_key(h), i))
            .collect();
        let find = |name: &str| by_name.get(&header_key(name)).copied();
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                AllocationError::DataUnavailable(format!(
                    "csv missing required header column: '{}'",
                    name
                ))
            })
        };

        let expected_return = mapping.expected_return.as_deref().and_then(find);
        let projected_price = find(&mapping.projected_price);
        if expected_return.is_none() && projected_price.is_none() {
            return Err(AllocationError::DataUnavailable(format!(
                "csv needs either a return column or the projected price column '{}'",
                mapping.projected_price
            )));
        }

        Ok(ColumnIndex {
            ticker: require(&mapping.ticker)?,
            sector: require(&mapping.sector)?,
            current_price: require(&mapping.current_price)?,
            expected_return,
            projected_price,
            std_dev_pct: find(&mapping.std_dev_pct),
            sharpe_ratio: find(&mapping.sharpe_ratio),
            beta: find(&mapping.beta),
            max_drawdown_pct: find(&mapping.max_drawdown_pct),
            var_95_pct: find(&mapping.var_95_pct),
        })
    }

    fn instrument(&self, record: &csv::StringRecord, mapping: &CsvMapping) -> Option<Instrument> {
        let text = |idx: Option<usize>| idx.and_then(|i| record.get(i)).filter(|s| !s.is_empty());
        let number = |idx: Option<usize>| text(idx).and_then(parse_decimal);

        let ticker = text(Some(self.ticker))?.to_string();
        let sector = Sector::normalize(text(Some(self.sector))?);
        let current_price = number(Some(self.current_price))?;
        if current_price <= Decimal::ZERO {
            return None;
        }

        let expected_return = match number(self.expected_return) {
            Some(r) => r,
            None => annualized_return(
                current_price,
                number(self.projected_price)?,
                mapping.projection_years,
            )?,
        };

        let std_dev = number(self.std_dev_pct)
            .map(|v| v / dec!(100))
            .filter(|v| !v.is_zero())
            .unwrap_or(DEFAULT_STD_DEV);

        if expected_return <= MIN_RETURN
            || expected_return >= MAX_RETURN
            || std_dev <= Decimal::ZERO
            || std_dev >= MAX_STD_DEV
        {
            return None;
        }

        let beta = number(self.beta)
            .filter(|v| !v.is_zero())
            .unwrap_or(DEFAULT_BETA);
        let max_drawdown = number(self.max_drawdown_pct)
            .map(|v| (v / dec!(100)).abs())
            .filter(|v| !v.is_zero())
            .unwrap_or(DEFAULT_MAX_DRAWDOWN);
        let var_95 = number(self.var_95_pct)
            .map(|v| (v / dec!(100)).abs())
            .filter(|v| !v.is_zero())
            .unwrap_or(DEFAULT_VAR_95);

        Some(Instrument {
            ticker,
            sector,
            current_price,
            expected_return,
            std_dev,
            sharpe_ratio: number(self.sharpe_ratio),
            beta: Some(beta),
            max_drawdown: Some(max_drawdown),
            var_95: Some(var_95),
        })
    }
}

/// Compound annual return implied by moving from `current` to `projected`
/// over `years`. `None` for a non-positive projection, zero years, or a
/// growth ratio outside the `Decimal` range.
pub fn annualized_return(current: Decimal, projected: Decimal, years: u32) -> Option<Decimal> {
    if years == 0 || current <= Decimal::ZERO || projected <= Decimal::ZERO {
        return None;
    }
    let growth = projected.checked_div(current)?;
    if years == 1 {
        return Some(growth - Decimal::ONE);
    }
    let exponent = Decimal::ONE / Decimal::from(years);
    growth.checked_powd(exponent).map(|g| g - Decimal::ONE)
}

fn header_key(h: &str) -> String {
    h.trim().trim_matches('"').to_ascii_lowercase()
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s = raw.trim().trim_matches('"').trim_end_matches('%').replace(',', "");
    Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()
}
