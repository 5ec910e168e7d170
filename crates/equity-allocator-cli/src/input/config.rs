use serde::Deserialize;

use equity_allocator_core::AllocationConfig;

use super::file;
use super::universe_csv::CsvMapping;

/// Settings file accepted by `--config`: the engine configuration at the top
/// level plus an optional `csv` section describing universe columns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub engine: AllocationConfig,
    #[serde(default)]
    pub csv: CsvMapping,
}

/// Load `--config` (JSON or YAML) or fall back to defaults.
pub fn load_config(path: Option<&str>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let cfg: CliConfig = file::read_structured(path)?;
    cfg.engine.validate()?;
    tracing::debug!(path, "configuration loaded");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use equity_allocator_core::covariance::CovarianceModel;
    use rust_decimal_macros::dec;

    #[test]
    fn test_yaml_config_with_csv_section() {
        let text = "\
risk_free_rate: \"0.065\"
covariance:
  kind: sector_correlation
  intra_sector: \"0.3\"
  inter_sector: \"0.1\"
selection:
  top_n: 10
csv:
  projected_price: \"2029-12\"
  projection_years: 4
";
        let cfg: CliConfig = serde_yaml::from_str(text).unwrap();
        assert_eq!(cfg.engine.risk_free_rate, dec!(0.065));
        assert_eq!(cfg.engine.selection.top_n, 10);
        assert_eq!(
            cfg.engine.covariance,
            CovarianceModel::SectorCorrelation {
                intra_sector: dec!(0.3),
                inter_sector: dec!(0.1),
            }
        );
        assert_eq!(cfg.csv.projected_price, "2029-12");
        assert_eq!(cfg.csv.projection_years, 4);
        assert_eq!(cfg.csv.ticker, "Ticker");
    }

    #[test]
    fn test_empty_json_config_is_default() {
        let cfg: CliConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.engine, AllocationConfig::default());
        assert_eq!(cfg.csv, CsvMapping::default());
    }

    #[test]
    fn test_no_path_gives_defaults() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.engine.weight_floor, dec!(0.01));
    }
}
