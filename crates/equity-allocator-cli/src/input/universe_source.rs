use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use equity_allocator_core::universe::{Instrument, ReferenceUniverse, UniverseProvider};
use equity_allocator_core::{AllocationError, AllocationResult};

use super::file;
use super::universe_csv::{CsvMapping, CsvUniverse};

/// Provider reading a JSON array of instruments.
#[derive(Debug, Clone)]
pub struct JsonUniverse {
    label: String,
    path: PathBuf,
}

impl JsonUniverse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        JsonUniverse {
            label: format!("json:{}", path.display()),
            path,
        }
    }
}

impl UniverseProvider for JsonUniverse {
    fn name(&self) -> &str {
        &self.label
    }

    fn load_universe(&self) -> AllocationResult<Vec<Instrument>> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            AllocationError::DataUnavailable(format!("read '{}': {}", self.path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            AllocationError::DataUnavailable(format!("parse '{}': {}", self.path.display(), e))
        })
    }
}

/// Pick a provider for `--universe`: the reference set when absent, otherwise
/// CSV or JSON by extension.
///
/// A path that does not exist is a usage error. Read or parse failures are
/// left to the provider so the engine can fall back to the reference set.
pub fn open_provider(
    path: Option<&str>,
    mapping: &CsvMapping,
) -> Result<Arc<dyn UniverseProvider>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(Arc::new(ReferenceUniverse));
    };
    let resolved = file::resolve_path(path)?;
    match file::extension(&resolved).as_str() {
        "csv" => Ok(Arc::new(CsvUniverse::new(resolved, mapping.clone()))),
        "json" => Ok(Arc::new(JsonUniverse::new(resolved))),
        other => Err(format!(
            "Unsupported universe file type '{}'. Use a .csv or .json file",
            other
        )
        .into()),
    }
}
