use clap::Args;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;

use equity_allocator_core::types::with_metadata;
use equity_allocator_core::universe::{
    select_universe, Instrument, Sector, UniverseCache, UniverseSelection, UniverseSource,
};

use crate::commands::allocate::RankingArg;
use crate::input;

/// Arguments for listing the universe
#[derive(Args)]
pub struct UniverseArgs {
    /// Universe file (.csv or .json); defaults to the built-in reference set
    #[arg(long)]
    pub universe: Option<String>,

    /// Engine configuration file (.json, .yaml or .yml)
    #[arg(long)]
    pub config: Option<String>,

    /// Only list instruments of this sector
    #[arg(long)]
    pub sector: Option<String>,

    /// Apply the ranking and top-N cut the allocator would use
    #[arg(long)]
    pub selected: bool,

    /// Ranking used with --selected
    #[arg(long)]
    pub ranking: Option<RankingArg>,

    /// Top-N used with --selected
    #[arg(long)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
struct UniverseListing {
    provider: String,
    source: UniverseSource,
    count: usize,
    instruments: Vec<Instrument>,
}

pub fn run_universe(args: UniverseArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let cfg = input::config::load_config(args.config.as_deref())?;
    let provider = input::universe_source::open_provider(args.universe.as_deref(), &cfg.csv)?;

    let mut cache = UniverseCache::new(provider).with_timeout(cfg.engine.universe_timeout());
    let snapshot = cache.get().clone();
    let sector = args.sector.as_deref().map(Sector::normalize);

    let instruments: Vec<Instrument> = if args.selected {
        let selection = UniverseSelection {
            sector: sector.or(cfg.engine.selection.sector),
            top_n: args.top_n.unwrap_or(cfg.engine.selection.top_n),
            ranking: args
                .ranking
                .map(Into::into)
                .unwrap_or(cfg.engine.selection.ranking),
            min_score: cfg.engine.selection.min_score,
        };
        select_universe(&snapshot.instruments, &selection, cfg.engine.risk_free_rate)?
    } else {
        snapshot
            .instruments
            .iter()
            .filter(|i| sector.map_or(true, |s| i.sector == s))
            .cloned()
            .collect()
    };

    let mut warnings = Vec::new();
    if let Some(reason) = &snapshot.fallback_reason {
        warnings.push(format!(
            "Universe provider '{}' unavailable ({}); using fallback universe",
            snapshot.provider, reason
        ));
    }

    let listing = UniverseListing {
        provider: snapshot.provider.clone(),
        source: snapshot.source,
        count: instruments.len(),
        instruments,
    };
    let output = with_metadata(
        "Universe snapshot",
        &json!({
            "loaded_at": snapshot.loaded_at.to_rfc3339(),
            "selected": args.selected,
            "sector_filter": sector.map(|s| s.to_string()),
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        listing,
    );
    Ok(serde_json::to_value(output)?)
}
