use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::instrument::{Instrument, Sector};
use super::provider::UniverseProvider;
use crate::AllocationResult;

/// Fixed reference set: fifteen large-cap NSE listings with annualised
/// return and volatility estimates. Also serves as the fallback universe
/// whenever a provider cannot deliver.
pub fn reference_instruments() -> Vec<Instrument> {
    let rows: [(&str, Sector, Decimal, Decimal, Decimal); 15] = [
        ("RELIANCE.NS", Sector::Energy, dec!(2456.75), dec!(0.152), dec!(0.082)),
        ("TCS.NS", Sector::Technology, dec!(3890.20), dec!(0.148), dec!(0.075)),
        ("HDFCBANK.NS", Sector::Financial, dec!(1678.45), dec!(0.135), dec!(0.068)),
        ("INFY.NS", Sector::Technology, dec!(1456.30), dec!(0.142), dec!(0.071)),
        ("ICICIBANK.NS", Sector::Financial, dec!(1234.80), dec!(0.128), dec!(0.065)),
        ("HINDUNILVR.NS", Sector::Consumer, dec!(2567.90), dec!(0.118), dec!(0.058)),
        ("ITC.NS", Sector::Consumer, dec!(456.25), dec!(0.112), dec!(0.055)),
        ("SBIN.NS", Sector::Financial, dec!(789.60), dec!(0.125), dec!(0.072)),
        ("BHARTIARTL.NS", Sector::Telecom, dec!(1123.45), dec!(0.108), dec!(0.063)),
        ("WIPRO.NS", Sector::Technology, dec!(567.80), dec!(0.115), dec!(0.069)),
        ("LT.NS", Sector::Infrastructure, dec!(3245.60), dec!(0.132), dec!(0.078)),
        ("HCLTECH.NS", Sector::Technology, dec!(1789.30), dec!(0.138), dec!(0.074)),
        ("KOTAKBANK.NS", Sector::Financial, dec!(1876.40), dec!(0.122), dec!(0.067)),
        ("MARUTI.NS", Sector::Automotive, dec!(10234.50), dec!(0.116), dec!(0.081)),
        ("ASIANPAINT.NS", Sector::Consumer, dec!(3456.80), dec!(0.109), dec!(0.062)),
    ];

    rows.into_iter()
        .map(|(ticker, sector, price, ret, vol)| Instrument::new(ticker, sector, price, ret, vol))
        .collect()
}

/// Provider backed by [`reference_instruments`]. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceUniverse;

impl UniverseProvider for ReferenceUniverse {
    fn name(&self) -> &str {
        "reference"
    }

    fn load_universe(&self) -> AllocationResult<Vec<Instrument>> {
        Ok(reference_instruments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_set_is_valid() {
        let instruments = reference_instruments();
        assert_eq!(instruments.len(), 15);
        for (i, inst) in instruments.iter().enumerate() {
            inst.validate(i).unwrap();
            assert!(inst.std_dev > Decimal::ZERO);
        }
    }

    #[test]
    fn test_reference_tickers_unique() {
        let mut tickers: Vec<String> = reference_instruments()
            .into_iter()
            .map(|i| i.ticker)
            .collect();
        tickers.sort();
        tickers.dedup();
        assert_eq!(tickers.len(), 15);
    }
}
