//! Integration tests for the subset risk pipeline
//!
//! These tests run records → panel → returns → covariance → Monte Carlo /
//! VaR end to end on synthetic market data.

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use subset_risk::{
    historical_var_from_returns, DuplicatePolicy, MarketContext, PanelConfig, PriceRecord,
    RejectionReason, RiskConfig, RiskError, SimulationConfig, VarConfig,
};

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 8, 18).unwrap()
}

/// One-factor log-normal price paths
fn synthetic_records(num_symbols: usize, num_days: usize, seed: u64) -> Vec<PriceRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let market = Normal::new(0.0003, 0.01).unwrap();
    let noise = Normal::new(0.0, 0.015).unwrap();

    let betas: Vec<f64> = (0..num_symbols).map(|i| 0.5 + i as f64 * 0.15).collect();
    let mut prices: Vec<f64> = (0..num_symbols).map(|i| 20.0 + 5.0 * i as f64).collect();
    let mut records = Vec::with_capacity(num_symbols * num_days);

    for day in 0..num_days {
        let date = start_date() + Duration::days(day as i64);
        let m = market.sample(&mut rng);
        for (i, price) in prices.iter_mut().enumerate() {
            if day > 0 {
                *price *= (betas[i] * m + noise.sample(&mut rng)).exp();
            }
            records.push(PriceRecord::new(format!("SYM{:02}", i), date, *price));
        }
    }

    records
}

fn simulation(num_simulations: usize, portfolio_size: usize) -> SimulationConfig {
    SimulationConfig {
        num_simulations,
        portfolio_size,
        random_seed: Some(2024),
        ..Default::default()
    }
}

#[test]
fn test_returns_reproduce_hand_computed_changes() {
    let closes = [
        ("AAA", [100.0, 110.0, 121.0, 108.9, 108.9, 119.79, 131.769, 118.5921, 130.45131, 143.496441]),
        ("BBB", [50.0, 55.0, 44.0, 44.0, 48.4, 48.4, 24.2, 36.3, 36.3, 39.93]),
        ("CCC", [10.0, 10.0, 10.5, 10.5, 10.0, 12.0, 12.0, 9.0, 9.0, 10.8]),
    ];
    let mut records = Vec::new();
    for (symbol, series) in &closes {
        for (i, close) in series.iter().enumerate() {
            records.push(PriceRecord::new(*symbol, start_date() + Duration::days(i as i64), *close));
        }
    }

    let ctx = MarketContext::build(&records, &PanelConfig::default()).unwrap();
    let returns = ctx.returns();

    assert_eq!(returns.num_periods(), 9);
    assert_eq!(returns.dates()[0], start_date() + Duration::days(1));
    assert_eq!(returns.get(0, 0), Some(0.10));

    let expected_bbb = [0.1, -0.2, 0.0, 0.1, 0.0, -0.5, 0.5, 0.0, 0.1];
    for (t, expected) in expected_bbb.iter().enumerate() {
        assert_relative_eq!(returns.get(t, 1).unwrap(), *expected, epsilon = 1e-12);
    }

    let expected_ccc = [0.0, 0.05, 0.0, -0.5 / 10.5, 0.2, 0.0, -0.25, 0.0, 0.2];
    for (t, expected) in expected_ccc.iter().enumerate() {
        assert_relative_eq!(returns.get(t, 2).unwrap(), *expected, epsilon = 1e-12);
    }
}

#[test]
fn test_symbol_with_single_gap_is_excluded() {
    let records: Vec<PriceRecord> = synthetic_records(3, 10, 1)
        .into_iter()
        .filter(|r| !(r.symbol == "SYM01" && r.date == start_date() + Duration::days(4)))
        .collect();

    let ctx = MarketContext::build(&records, &PanelConfig::default()).unwrap();

    assert_eq!(ctx.universe().symbols(), &["SYM00", "SYM02"]);
    assert!(!ctx.universe().contains("SYM01"));
    assert_eq!(ctx.prices().rejected().len(), 1);
    assert_eq!(
        ctx.prices().rejected()[0].reason,
        RejectionReason::Incomplete {
            observed: 9,
            expected: 10
        }
    );
}

#[test]
fn test_duplicate_rows() {
    let mut records = synthetic_records(2, 5, 3);
    records.push(records[0].clone());

    let err = MarketContext::build(&records, &PanelConfig::default()).unwrap_err();
    assert!(matches!(err, RiskError::DuplicateObservation { .. }));

    let lenient = PanelConfig {
        duplicate_policy: DuplicatePolicy::KeepLast,
    };
    assert!(MarketContext::build(&records, &lenient).is_ok());
}

#[test]
fn test_sampler_draws_from_universe() {
    let ctx = MarketContext::build(&synthetic_records(12, 60, 4), &PanelConfig::default()).unwrap();
    let sampler = ctx.sampler();
    let mut rng = StdRng::seed_from_u64(77);

    for _ in 0..500 {
        let p = sampler.sample_symbol("SYM05", 4, &mut rng).unwrap();
        let symbols = p.symbols(ctx.universe());
        assert_eq!(symbols.len(), 4);
        assert_eq!(symbols.iter().filter(|s| **s == "SYM05").count(), 1);
        let mut unique = symbols.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }
}

#[test]
fn test_euler_identity_on_random_portfolios() {
    let ctx = MarketContext::build(&synthetic_records(15, 120, 5), &PanelConfig::default()).unwrap();
    let sampler = ctx.sampler();
    let engine = ctx.risk_engine();
    let mut rng = StdRng::seed_from_u64(8);

    for k in 1..=8 {
        for anchor in 0..ctx.universe().len() {
            let p = sampler.sample(anchor, k, &mut rng).unwrap();
            let sigma = engine.volatility(&p).unwrap();
            assert!(sigma >= 0.0);

            let euler: f64 = p
                .members()
                .iter()
                .map(|&m| p.weight() * engine.marginal_risk_contribution(m, &p).unwrap())
                .sum();
            assert_relative_eq!(euler, sigma, max_relative = 1e-9);
        }
    }
}

#[test]
fn test_covariance_selection_matches_subset_rebuild() {
    let records = synthetic_records(6, 80, 6);
    let ctx = MarketContext::build(&records, &PanelConfig::default()).unwrap();

    let keep = ["SYM01", "SYM04"];
    let subset: Vec<PriceRecord> = records
        .iter()
        .filter(|r| keep.contains(&r.symbol.as_str()))
        .cloned()
        .collect();
    let direct = MarketContext::build(&subset, &PanelConfig::default()).unwrap();

    let p = ctx.portfolio(&keep).unwrap();
    let selected = ctx.covariance().submatrix(p.members());

    for i in 0..2 {
        for j in 0..2 {
            assert_relative_eq!(
                selected[(i, j)],
                direct.covariance().get(i, j).unwrap(),
                max_relative = 1e-12
            );
        }
    }
    assert_relative_eq!(
        ctx.risk_engine().volatility(&p).unwrap(),
        direct.risk_engine().volatility(&direct.portfolio(&keep).unwrap()).unwrap(),
        max_relative = 1e-12
    );
}

#[test]
fn test_standard_error_shrinks_with_simulations() {
    let ctx = MarketContext::build(&synthetic_records(30, 250, 7), &PanelConfig::default()).unwrap();
    let estimator = ctx.monte_carlo(simulation(100, 5)).unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    let small = estimator.expected_volatility("SYM10", 5, 100, &mut rng).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    let large = estimator.expected_volatility("SYM10", 5, 10_000, &mut rng).unwrap();

    let ratio = large.std_error.unwrap() / small.std_error.unwrap();
    assert!(ratio > 0.05 && ratio < 0.2, "SE ratio {} not near 0.1", ratio);

    // Both estimates target the same mean
    let tolerance = 4.0 * small.std_error.unwrap();
    assert!((large.mean - small.mean).abs() < tolerance);
}

#[test]
fn test_universe_table_end_to_end() {
    let ctx = MarketContext::build(&synthetic_records(10, 250, 8), &PanelConfig::default()).unwrap();
    let estimator = ctx.monte_carlo(simulation(300, 4)).unwrap();

    let table = estimator.estimate_universe().unwrap();
    assert_eq!(table.len(), 10);
    assert_eq!(table.portfolio_size, 4);
    assert_eq!(table.rows[0].symbol, "SYM00");

    for row in &table.rows {
        assert!(row.volatility.mean > 0.0);
        assert!(row.volatility.std_error.unwrap() >= 0.0);
        assert!(row.mrc.std_error.unwrap() >= 0.0);
        assert_eq!(row.mrc.samples, 300);
        let (lo, hi) = row.volatility.confidence_interval(0.95).unwrap().unwrap();
        assert!(lo <= row.volatility.mean && row.volatility.mean <= hi);
    }

    // Higher beta names carry more risk in this synthetic universe
    let low = table.get("SYM00").unwrap().mrc.mean;
    let high = table.get("SYM09").unwrap().mrc.mean;
    assert!(high > low);

    let json = table.to_json().unwrap();
    assert!(json.contains("\"SYM09\""));
    assert!(json.contains("std_error"));
}

#[test]
fn test_single_asset_estimate_matches_table_row_seeding() {
    let ctx = MarketContext::build(&synthetic_records(5, 90, 9), &PanelConfig::default()).unwrap();
    let estimator = ctx.monte_carlo(simulation(150, 3)).unwrap();

    let table = estimator.estimate_universe().unwrap();
    // Row i is seeded with base_seed + i
    let mut rng = StdRng::seed_from_u64(2024 + 2);
    let row = estimator.estimate_asset("SYM02", &mut rng).unwrap();

    assert_eq!(table.get("SYM02"), Some(&row));
}

#[test]
fn test_historical_var_scenario_through_pipeline() {
    // Single-asset portfolio returns: -5%, -2%, +1%, +3%, -10%
    let closes = [100.0, 95.0, 93.1, 94.031, 96.85193, 87.166737];
    let records: Vec<PriceRecord> = closes
        .iter()
        .enumerate()
        .map(|(i, c)| PriceRecord::new("ONLY", start_date() + Duration::days(i as i64), *c))
        .collect();

    let ctx = MarketContext::build(&records, &PanelConfig::default()).unwrap();
    let calc = ctx.var_calculator(VarConfig::default()).unwrap();
    let p = ctx.portfolio(&["ONLY"]).unwrap();

    let result = calc
        .historical_var(0.8, &p, start_date(), start_date() + Duration::days(30))
        .unwrap();

    assert_relative_eq!(result.var_pct, 0.06, epsilon = 1e-9);
    assert_eq!(result.observations, 5);
    assert_relative_eq!(
        historical_var_from_returns(&[-0.05, -0.02, 0.01, 0.03, -0.10], 0.8).unwrap(),
        0.06,
        epsilon = 1e-12
    );
}

#[test]
fn test_var_on_sub_window() {
    let ctx = MarketContext::build(&synthetic_records(8, 200, 10), &PanelConfig::default()).unwrap();
    let calc = ctx.var_calculator(VarConfig::default()).unwrap();
    let p = ctx.portfolio(&["SYM00", "SYM03", "SYM07"]).unwrap();

    let start = start_date() + Duration::days(50);
    let end = start_date() + Duration::days(149);
    let series = calc.portfolio_returns(&p, start, end).unwrap();
    assert_eq!(series.len(), 100);
    assert_eq!(series[0].0, start);
    assert_eq!(series[99].0, end);

    let var_95 = calc.historical_var(0.95, &p, start, end).unwrap();
    let var_99 = calc.historical_var(0.99, &p, start, end).unwrap();
    assert!(var_99.var_pct >= var_95.var_pct);

    let cvar_95 = calc.historical_cvar(0.95, &p, start, end).unwrap();
    assert!(cvar_95 >= var_95.var_pct);
}

#[test]
fn test_config_driven_run() {
    let yaml = r#"
panel:
  duplicate_policy: reject
simulation:
  num_simulations: 100
  portfolio_size: 3
  random_seed: 11
  parallel: false
var:
  confidence_level: 0.9
"#;
    let config = RiskConfig::from_yaml(yaml).unwrap();
    let ctx = MarketContext::build(&synthetic_records(6, 40, 12), &config.panel).unwrap();

    let table = ctx
        .monte_carlo(config.simulation.clone())
        .unwrap()
        .estimate_universe()
        .unwrap();
    assert_eq!(table.num_simulations, 100);

    let calc = ctx.var_calculator(config.var.clone()).unwrap();
    let p = ctx.portfolio(&["SYM00", "SYM01"]).unwrap();
    let dates = ctx.returns().dates();
    let result = calc
        .historical_var_default(&p, dates[0], dates[dates.len() - 1])
        .unwrap();
    assert_eq!(result.confidence_level, 0.9);
}

#[test]
fn test_oversized_portfolio_is_rejected() {
    let ctx = MarketContext::build(&synthetic_records(4, 30, 13), &PanelConfig::default()).unwrap();
    let estimator = ctx.monte_carlo(simulation(10, 5)).unwrap();

    assert_eq!(
        estimator.estimate_universe().unwrap_err(),
        RiskError::InvalidPortfolioSize {
            requested: 5,
            available: 4
        }
    );
}
