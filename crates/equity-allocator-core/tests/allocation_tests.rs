use equity_allocator_core::allocator::allocate_discrete;
use equity_allocator_core::metrics::{sharpe_ratio, PortfolioInsight};
use equity_allocator_core::universe::{reference_instruments, Instrument, Sector};
use equity_allocator_core::{
    compute_portfolio, AllocationConfig, AllocationError, AllocationRequest, ResultCondition,
    WeightingMethod,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

// ===========================================================================
// End-to-end allocation properties over the reference universe
// ===========================================================================

fn request(method: WeightingMethod, amount: Decimal) -> AllocationRequest {
    AllocationRequest::new(method, amount, 3)
}

fn min_price(instruments: &[Instrument]) -> Decimal {
    instruments
        .iter()
        .map(|i| i.current_price)
        .min()
        .unwrap_or(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Weight invariants
// ---------------------------------------------------------------------------

#[test]
fn test_adjusted_weights_sum_to_one_for_every_method() {
    let universe = reference_instruments();
    let config = AllocationConfig::default();
    for method in WeightingMethod::ALL {
        let out = compute_portfolio(&request(method, dec!(100000)), &universe, &config).unwrap();
        let weights = &out.result.weights;
        let total: Decimal = weights.iter().sum();
        assert!(
            (total - Decimal::ONE).abs() < dec!(0.000000001),
            "{:?} weights sum to {}",
            method,
            total
        );
        let n = Decimal::from(weights.len() as i64);
        let lower = config.weight_floor / (Decimal::ONE + n * config.weight_floor);
        for w in weights {
            assert!(*w >= lower, "{:?} weight {} below floor", method, w);
        }
    }
}

#[test]
fn test_weights_align_with_tickers() {
    let out = compute_portfolio(
        &request(WeightingMethod::MinVariance, dec!(50000)),
        &reference_instruments(),
        &AllocationConfig::default(),
    )
    .unwrap();
    assert_eq!(out.result.tickers.len(), out.result.weights.len());
    assert_eq!(out.result.tickers.len(), 15);
}

// ---------------------------------------------------------------------------
// Cash invariants
// ---------------------------------------------------------------------------

#[test]
fn test_cash_conservation_and_loop_postcondition() {
    let universe = reference_instruments();
    let cheapest = min_price(&universe);
    for method in WeightingMethod::ALL {
        for amount in [dec!(1000), dec!(25000), dec!(123456.78), dec!(1000000)] {
            let out =
                compute_portfolio(&request(method, amount), &universe, &AllocationConfig::default())
                    .unwrap();
            let r = &out.result;
            let used: Decimal = r.allocations.iter().map(|a| a.amount_used).sum();
            assert_eq!(used, r.total_invested);
            assert_eq!(used + r.remaining_amount, amount);
            assert!(r.remaining_amount < cheapest);
            assert!(r.remaining_amount >= Decimal::ZERO);
            assert!(r.allocations.iter().all(|a| a.quantity > 0));
        }
    }
}

#[test]
fn test_allocations_sorted_by_amount_desc() {
    let out = compute_portfolio(
        &request(WeightingMethod::MaxSharpe, dec!(500000)),
        &reference_instruments(),
        &AllocationConfig::default(),
    )
    .unwrap();
    for pair in out.result.allocations.windows(2) {
        assert!(pair[0].amount_used >= pair[1].amount_used);
    }
}

// ---------------------------------------------------------------------------
// Determinism and monotonicity
// ---------------------------------------------------------------------------

#[test]
fn test_identical_inputs_give_identical_results() {
    let universe = reference_instruments();
    let config = AllocationConfig::default();
    let req = request(WeightingMethod::HierarchicalRiskParity, dec!(75000)).with_sector(Sector::Financial);
    let a = compute_portfolio(&req, &universe, &config).unwrap();
    let b = compute_portfolio(&req, &universe, &config).unwrap();
    assert_eq!(a.result, b.result);
}

#[test]
fn test_weight_implied_quantities_grow_with_investment() {
    let universe = reference_instruments();
    let config = AllocationConfig::default();
    let mut previous: HashMap<String, u64> = HashMap::new();
    let mut amount = dec!(5000);
    while amount <= dec!(400000) {
        let out = compute_portfolio(&request(WeightingMethod::MinVariance, amount), &universe, &config)
            .unwrap();
        let mut current: HashMap<String, u64> = HashMap::new();
        for line in &out.result.allocations {
            current.insert(line.ticker.clone(), line.quantity - line.reinvested_units);
        }
        for (ticker, base) in &previous {
            let now = current.get(ticker).copied().unwrap_or(0);
            assert!(now >= *base, "{} fell from {} to {}", ticker, base, now);
        }
        previous = current;
        amount += dec!(12500);
    }
}

// ---------------------------------------------------------------------------
// Worked examples
// ---------------------------------------------------------------------------

#[test]
fn test_single_instrument_example() {
    let universe = vec![Instrument::new("SOLO", Sector::Energy, dec!(100), dec!(0.1), dec!(0.1))];
    let out = compute_portfolio(
        &request(WeightingMethod::MaxSharpe, dec!(250)),
        &universe,
        &AllocationConfig::default(),
    )
    .unwrap();
    let r = &out.result;
    assert_eq!(r.weights, vec![Decimal::ONE]);
    assert_eq!(r.allocations.len(), 1);
    assert_eq!(r.allocations[0].quantity, 2);
    assert_eq!(r.allocations[0].amount_used, dec!(200));
    assert_eq!(r.remaining_amount, dec!(50));
}

#[test]
fn test_sharpe_example_gives_lowest_insight() {
    let s = sharpe_ratio(dec!(0.12), dec!(0.0698), dec!(0.08)).unwrap().unwrap();
    assert_eq!(s, dec!(0.6275));
    assert_eq!(PortfolioInsight::from_sharpe(Some(s)), PortfolioInsight::RiskOutweighsReward);
}

#[test]
fn test_leftover_cash_buys_cheaper_instrument() {
    let a = allocate_discrete(&[dec!(0.5), dec!(0.5)], dec!(500), &[dec!(300), dec!(150)]).unwrap();
    assert!(a.quantities[1] >= 1);
    assert!(a.remaining < dec!(150));
    assert_eq!(a.total_invested() + a.remaining, dec!(500));
}

#[test]
fn test_two_instrument_portfolio_respects_budget() {
    let universe = vec![
        Instrument::new("BIG", Sector::Infrastructure, dec!(300), dec!(0.12), dec!(0.08)),
        Instrument::new("SMALL", Sector::Consumer, dec!(150), dec!(0.10), dec!(0.06)),
    ];
    let out = compute_portfolio(
        &request(WeightingMethod::MinVariance, dec!(500)),
        &universe,
        &AllocationConfig::default(),
    )
    .unwrap();
    let r = &out.result;
    let small = r.allocations.iter().find(|a| a.ticker == "SMALL").unwrap();
    assert!(small.quantity >= 1);
    assert!(r.remaining_amount < dec!(150));
}

// ---------------------------------------------------------------------------
// Sector filter and exposure
// ---------------------------------------------------------------------------

#[test]
fn test_sector_filter_restricts_exposure() {
    let req = request(WeightingMethod::MaxSharpe, dec!(100000)).with_sector(Sector::Technology);
    let out = compute_portfolio(&req, &reference_instruments(), &AllocationConfig::default()).unwrap();
    let r = &out.result;
    assert!(r.allocations.iter().all(|a| a.sector == Sector::Technology));
    assert_eq!(r.sector_exposure.len(), 1);
    let pct = r.sector_exposure[&Sector::Technology];
    let expected = r.total_invested / dec!(100000) * dec!(100);
    assert_eq!(pct, expected);
}

#[test]
fn test_sector_exposure_sums_to_invested_share() {
    let out = compute_portfolio(
        &request(WeightingMethod::HierarchicalRiskParity, dec!(250000)),
        &reference_instruments(),
        &AllocationConfig::default(),
    )
    .unwrap();
    let r = &out.result;
    let total_pct: Decimal = r.sector_exposure.values().sum();
    let invested_pct = r.total_invested / dec!(250000) * dec!(100);
    assert!((total_pct - invested_pct).abs() < dec!(0.000000001));
}

// ---------------------------------------------------------------------------
// Errors and degenerate results
// ---------------------------------------------------------------------------

#[test]
fn test_empty_sector_is_rejected() {
    let req = request(WeightingMethod::MinVariance, dec!(100000)).with_sector(Sector::Healthcare);
    let err = compute_portfolio(&req, &reference_instruments(), &AllocationConfig::default()).unwrap_err();
    assert!(matches!(err, AllocationError::InvalidInput { .. }));
}

#[test]
fn test_non_positive_investment_rejected() {
    for amount in [Decimal::ZERO, dec!(-100)] {
        let err = compute_portfolio(
            &request(WeightingMethod::MinVariance, amount),
            &reference_instruments(),
            &AllocationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AllocationError::InvalidInput { .. }));
    }
}

#[test]
fn test_zero_volatility_rejected() {
    let universe = vec![
        Instrument::new("A", Sector::Energy, dec!(100), dec!(0.1), dec!(0.1)),
        Instrument::new("B", Sector::Energy, dec!(100), dec!(0.1), dec!(0)),
    ];
    let err = compute_portfolio(
        &request(WeightingMethod::MinVariance, dec!(1000)),
        &universe,
        &AllocationConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AllocationError::InvalidInput { .. }));
}

#[test]
fn test_extreme_magnitudes_are_rejected_not_panics() {
    let config = AllocationConfig::default();
    let cases = [
        // budget / price overflows the share count
        (
            Instrument::new("DUST", Sector::Energy, dec!(0.0000000001), dec!(0.1), dec!(0.1)),
            dec!(100000000000000000000),
        ),
        // sigma^2 overflows
        (
            Instrument::new("WILD", Sector::Energy, dec!(100), dec!(0.1), dec!(10000000000000000)),
            dec!(1000),
        ),
        // investment * |mu + z * sigma| overflows
        (
            Instrument::new("BOOM", Sector::Energy, dec!(100), dec!(3), dec!(0.1)),
            dec!(50000000000000000000000000000),
        ),
    ];
    for (inst, amount) in cases {
        let ticker = inst.ticker.clone();
        let err = compute_portfolio(&request(WeightingMethod::MinVariance, amount), &[inst], &config)
            .unwrap_err();
        assert!(
            matches!(err, AllocationError::InvalidInput { .. }),
            "{}: {}",
            ticker,
            err
        );
    }
}

#[test]
fn test_budget_below_every_price_is_uninvested_not_error() {
    let out = compute_portfolio(
        &request(WeightingMethod::MinVariance, dec!(100)),
        &reference_instruments(),
        &AllocationConfig::default(),
    )
    .unwrap();
    let r = &out.result;
    assert!(r.allocations.is_empty());
    assert!(r.sector_exposure.is_empty());
    assert_eq!(r.remaining_amount, dec!(100));
    assert!(r.has_condition(ResultCondition::FullyUninvested));
    assert!(!out.warnings.is_empty());
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[test]
fn test_projected_value_uses_horizon() {
    let universe = reference_instruments();
    let config = AllocationConfig::default();
    let zero = compute_portfolio(
        &AllocationRequest::new(WeightingMethod::MaxSharpe, dec!(10000), 0),
        &universe,
        &config,
    )
    .unwrap();
    assert_eq!(zero.result.projected_value, dec!(10000));

    let five = compute_portfolio(
        &AllocationRequest::new(WeightingMethod::MaxSharpe, dec!(10000), 5),
        &universe,
        &config,
    )
    .unwrap();
    assert!(five.result.projected_value > dec!(10000));
}

#[test]
fn test_correlation_raises_risk() {
    let universe = reference_instruments();
    let diag = AllocationConfig::default();
    let flat = AllocationConfig {
        covariance: equity_allocator_core::covariance::CovarianceModel::ConstantCorrelation {
            rho: dec!(0.15),
        },
        ..Default::default()
    };
    let req = request(WeightingMethod::MinVariance, dec!(100000));
    let a = compute_portfolio(&req, &universe, &diag).unwrap();
    let b = compute_portfolio(&req, &universe, &flat).unwrap();
    // Weights only read the diagonal; risk picks up the cross terms.
    assert_eq!(a.result.weights, b.result.weights);
    assert!(b.result.portfolio_risk > a.result.portfolio_risk);
}

#[test]
fn test_reference_universe_sharpe_is_defined() {
    let out = compute_portfolio(
        &request(WeightingMethod::MaxSharpe, dec!(100000)),
        &reference_instruments(),
        &AllocationConfig::default(),
    )
    .unwrap();
    let r = &out.result;
    assert!(r.sharpe_ratio.is_some());
    assert!(r.var_95 > Decimal::ZERO);
    assert_eq!(r.insight, PortfolioInsight::from_sharpe(r.sharpe_ratio));
    assert_eq!(r.insight_text, r.insight.message());
}
