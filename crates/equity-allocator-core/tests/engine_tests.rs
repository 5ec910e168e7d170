use equity_allocator_core::classifier::{classify_investor_code, InvestorProfile};
use equity_allocator_core::universe::{
    reference_instruments, Instrument, ReferenceUniverse, Sector, StaticUniverse, UniverseProvider,
    UniverseSource,
};
use equity_allocator_core::{
    AllocationConfig, AllocationEngine, AllocationError, AllocationRequest, AllocationResult,
    WeightingMethod,
};
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ===========================================================================
// Engine context: cached universe, fallback, classification
// ===========================================================================

struct BrokenFeed;

impl UniverseProvider for BrokenFeed {
    fn name(&self) -> &str {
        "broken-feed"
    }

    fn load_universe(&self) -> AllocationResult<Vec<Instrument>> {
        Err(AllocationError::DataUnavailable("connection refused".into()))
    }
}

struct CountingFeed {
    calls: AtomicUsize,
}

impl UniverseProvider for CountingFeed {
    fn name(&self) -> &str {
        "counting"
    }

    fn load_universe(&self) -> AllocationResult<Vec<Instrument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            Instrument::new("AAA", Sector::Energy, dec!(50), dec!(0.14), dec!(0.09)),
            Instrument::new("BBB", Sector::Utilities, dec!(20), dec!(0.09), dec!(0.05)),
        ])
    }
}

#[test]
fn test_engine_with_reference_provider_has_no_fallback_warning() {
    let mut engine = AllocationEngine::new(Arc::new(ReferenceUniverse), AllocationConfig::default());
    let out = engine
        .compute(&AllocationRequest::new(WeightingMethod::MaxSharpe, dec!(100000), 3))
        .unwrap();
    assert!(out.warnings.iter().all(|w| !w.contains("unavailable")));
    assert_eq!(out.result.tickers.len(), 15);
}

#[test]
fn test_engine_falls_back_when_provider_fails() {
    let mut engine = AllocationEngine::new(Arc::new(BrokenFeed), AllocationConfig::default());
    let out = engine
        .compute(&AllocationRequest::new(WeightingMethod::MinVariance, dec!(100000), 2))
        .unwrap();
    assert!(out.warnings[0].contains("broken-feed"));
    assert!(out.warnings[0].contains("connection refused"));
    let reference: Vec<String> = reference_instruments().into_iter().map(|i| i.ticker).collect();
    for ticker in &out.result.tickers {
        assert!(reference.contains(ticker));
    }
}

#[test]
fn test_engine_falls_back_on_empty_list() {
    let provider = StaticUniverse::new("empty", Vec::new());
    let mut engine = AllocationEngine::new(Arc::new(provider), AllocationConfig::default());
    let snapshot = engine.cache_mut().get().clone();
    assert_eq!(snapshot.source, UniverseSource::Fallback);
    assert_eq!(snapshot.instruments.len(), 15);
}

#[test]
fn test_engine_loads_universe_once_until_invalidated() {
    let feed = Arc::new(CountingFeed {
        calls: AtomicUsize::new(0),
    });
    let mut engine = AllocationEngine::new(feed.clone(), AllocationConfig::default());
    let req = AllocationRequest::new(WeightingMethod::HierarchicalRiskParity, dec!(1000), 1);

    engine.compute(&req).unwrap();
    engine.compute(&req).unwrap();
    assert_eq!(feed.calls.load(Ordering::SeqCst), 1);

    engine.invalidate_universe();
    engine.compute(&req).unwrap();
    assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_engine_request_errors_propagate() {
    let mut engine = AllocationEngine::new(Arc::new(ReferenceUniverse), AllocationConfig::default());
    let req = AllocationRequest::new(WeightingMethod::MinVariance, dec!(5000), 1)
        .with_sector(Sector::RealEstate);
    assert!(engine.compute(&req).is_err());

    // The cached universe survives a rejected request.
    assert_eq!(engine.universe().len(), 15);
}

#[test]
fn test_request_parses_from_json() {
    let json = r#"{"method": "hrp", "investment_amount": "25000", "sector_filter": "tech"}"#;
    let req: AllocationRequest = serde_json::from_str(json).unwrap();
    assert_eq!(req.method, WeightingMethod::HierarchicalRiskParity);
    assert_eq!(req.investment_amount, dec!(25000));
    assert_eq!(req.horizon_years, 0);
    assert_eq!(req.sector_filter, Some(Sector::Technology));
}

#[test]
fn test_classifier_examples() {
    assert_eq!(classify_investor_code(5, dec!(0.09), "1"), InvestorProfile::Aggressive);
    assert_eq!(classify_investor_code(1, dec!(0.03), "2"), InvestorProfile::Conservative);
    assert_eq!(classify_investor_code(3, dec!(0.06), "1"), InvestorProfile::Moderate);
}
