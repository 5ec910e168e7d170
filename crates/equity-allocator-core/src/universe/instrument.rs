use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AllocationError;
use crate::types::{Money, Rate};
use crate::AllocationResult;

// ---------------------------------------------------------------------------
// Sector vocabulary
// ---------------------------------------------------------------------------

/// Canonical sector categories. Raw labels from data sources are mapped onto
/// this vocabulary by [`Sector::normalize`]; anything unrecognised lands in
/// [`Sector::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sector {
    Energy,
    Technology,
    Financial,
    Consumer,
    Telecom,
    Infrastructure,
    Automotive,
    Healthcare,
    Materials,
    Utilities,
    RealEstate,
    Other,
}

/// Alias table keyed by the squashed label (lower-case, alphanumerics only).
const SECTOR_ALIASES: &[(&str, Sector)] = &[
    ("energy", Sector::Energy),
    ("oilgas", Sector::Energy),
    ("oilandgas", Sector::Energy),
    ("power", Sector::Energy),
    ("technology", Sector::Technology),
    ("tech", Sector::Technology),
    ("it", Sector::Technology),
    ("informationtechnology", Sector::Technology),
    ("software", Sector::Technology),
    ("financial", Sector::Financial),
    ("financials", Sector::Financial),
    ("finance", Sector::Financial),
    ("financialservices", Sector::Financial),
    ("banking", Sector::Financial),
    ("bank", Sector::Financial),
    ("banks", Sector::Financial),
    ("insurance", Sector::Financial),
    ("consumer", Sector::Consumer),
    ("fmcg", Sector::Consumer),
    ("consumergoods", Sector::Consumer),
    ("consumerstaples", Sector::Consumer),
    ("consumerdefensive", Sector::Consumer),
    ("consumerdiscretionary", Sector::Consumer),
    ("consumercyclical", Sector::Consumer),
    ("telecom", Sector::Telecom),
    ("telecommunications", Sector::Telecom),
    ("telecommunication", Sector::Telecom),
    ("communicationservices", Sector::Telecom),
    ("infrastructure", Sector::Infrastructure),
    ("industrials", Sector::Infrastructure),
    ("industrial", Sector::Infrastructure),
    ("construction", Sector::Infrastructure),
    ("capitalgoods", Sector::Infrastructure),
    ("automotive", Sector::Automotive),
    ("auto", Sector::Automotive),
    ("automobile", Sector::Automotive),
    ("automobiles", Sector::Automotive),
    ("healthcare", Sector::Healthcare),
    ("health", Sector::Healthcare),
    ("pharma", Sector::Healthcare),
    ("pharmaceuticals", Sector::Healthcare),
    ("materials", Sector::Materials),
    ("basicmaterials", Sector::Materials),
    ("metals", Sector::Materials),
    ("metalsmining", Sector::Materials),
    ("chemicals", Sector::Materials),
    ("utilities", Sector::Utilities),
    ("utility", Sector::Utilities),
    ("realestate", Sector::RealEstate),
    ("realty", Sector::RealEstate),
];

impl Sector {
    pub const ALL: [Sector; 12] = [
        Sector::Energy,
        Sector::Technology,
        Sector::Financial,
        Sector::Consumer,
        Sector::Telecom,
        Sector::Infrastructure,
        Sector::Automotive,
        Sector::Healthcare,
        Sector::Materials,
        Sector::Utilities,
        Sector::RealEstate,
        Sector::Other,
    ];

    /// Map a raw data-source label onto the canonical vocabulary.
    ///
    /// Case, whitespace and punctuation are ignored, so "Information Technology",
    /// "information-technology" and "INFORMATIONTECHNOLOGY" all resolve to
    /// `Technology`. Unmapped labels return `Other`.
    pub fn normalize(raw: &str) -> Sector {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        SECTOR_ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, sector)| *sector)
            .unwrap_or(Sector::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Energy => "Energy",
            Sector::Technology => "Technology",
            Sector::Financial => "Financial",
            Sector::Consumer => "Consumer",
            Sector::Telecom => "Telecom",
            Sector::Infrastructure => "Infrastructure",
            Sector::Automotive => "Automotive",
            Sector::Healthcare => "Healthcare",
            Sector::Materials => "Materials",
            Sector::Utilities => "Utilities",
            Sector::RealEstate => "Real Estate",
            Sector::Other => "Other",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Sector::normalize(s))
    }
}

impl From<String> for Sector {
    fn from(raw: String) -> Self {
        Sector::normalize(&raw)
    }
}

impl From<Sector> for String {
    fn from(sector: Sector) -> Self {
        sector.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Instrument
// ---------------------------------------------------------------------------

/// A single equity in the investable universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub ticker: String,
    pub sector: Sector,
    /// Last traded price per share
    pub current_price: Money,
    /// Expected annual return (0.12 = 12%)
    pub expected_return: Rate,
    /// Annualised volatility of returns
    pub std_dev: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_drawdown: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_95: Option<Rate>,
}

impl Instrument {
    /// Build an instrument with only the core fields populated.
    pub fn new(
        ticker: impl Into<String>,
        sector: Sector,
        current_price: Money,
        expected_return: Rate,
        std_dev: Rate,
    ) -> Self {
        Instrument {
            ticker: ticker.into(),
            sector,
            current_price,
            expected_return,
            std_dev,
            sharpe_ratio: None,
            beta: None,
            max_drawdown: None,
            var_95: None,
        }
    }

    /// Reject instruments that cannot take part in an allocation.
    pub fn validate(&self, index: usize) -> AllocationResult<()> {
        if self.ticker.trim().is_empty() {
            return Err(AllocationError::invalid(
                format!("instruments[{}].ticker", index),
                "Ticker must not be empty",
            ));
        }
        if self.current_price <= Decimal::ZERO {
            return Err(AllocationError::invalid(
                format!("instruments[{}].current_price", index),
                format!("{}: price must be positive", self.ticker),
            ));
        }
        if self.std_dev < Decimal::ZERO {
            return Err(AllocationError::invalid(
                format!("instruments[{}].std_dev", index),
                format!("{}: volatility cannot be negative", self.ticker),
            ));
        }
        Ok(())
    }
}
