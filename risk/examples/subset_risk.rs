//! Subset risk example
//!
//! Builds a synthetic price universe, estimates expected portfolio volatility
//! and expected marginal risk contribution for every asset, and decomposes
//! one sampled portfolio.
//!
//! Run with: RUST_LOG=info cargo run --example subset_risk

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use subset_risk::{MarketContext, PriceRecord, RiskConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Subset Risk Contribution Example ===\n");

    // 1. Configuration (defaults overridden for a quick interactive run)
    let config = RiskConfig::from_yaml(
        r#"
simulation:
  num_simulations: 2000
  portfolio_size: 5
  random_seed: 42
"#,
    )?;

    // 2. Synthetic end-of-day prices: 25 tickers, ~1 year, one with a gap
    let records = synthetic_records(25, 260);
    println!("Input records: {}", records.len());

    // 3. Build the market context once
    let ctx = MarketContext::build(&records, &config.panel)?;
    println!("Universe: {} symbols", ctx.universe().len());
    for rejected in ctx.prices().rejected() {
        println!("  Excluded {}: {:?}", rejected.symbol, rejected.reason);
    }
    println!("Return periods: {}", ctx.returns().num_periods());
    println!();

    // 4. Monte Carlo over the whole universe
    let estimator = ctx.monte_carlo(config.simulation.clone())?;
    let table = estimator.estimate_universe()?;

    println!(
        "{:<8} {:>12} {:>10} {:>12} {:>10}",
        "symbol", "E[sigma]", "SE", "E[MRC]", "SE"
    );
    for row in &table.rows {
        println!(
            "{:<8} {:>12.6} {:>10.2e} {:>12.6} {:>10.2e}",
            row.symbol,
            row.volatility.mean,
            row.volatility.std_error.unwrap_or_default(),
            row.mrc.mean,
            row.mrc.std_error.unwrap_or_default()
        );
    }
    println!();

    // 5. Decompose one random portfolio around the first symbol
    let anchor = &table.rows[0].symbol;
    let mut rng = StdRng::seed_from_u64(7);
    let portfolio = ctx
        .sampler()
        .sample_symbol(anchor, config.simulation.portfolio_size, &mut rng)?;
    let decomposition = ctx.risk_engine().decompose(&portfolio, ctx.universe())?;

    println!("--- Risk decomposition of a portfolio containing {} ---", anchor);
    println!("Portfolio volatility: {:.6}", decomposition.volatility);
    for c in &decomposition.contributions {
        println!(
            "  {:<8} MRC {:.6}  component {:.6}  ({:.1}%)",
            c.symbol, c.marginal_contribution, c.component_contribution, c.risk_pct
        );
    }

    Ok(())
}

fn synthetic_records(num_symbols: usize, num_days: usize) -> Vec<PriceRecord> {
    let mut rng = StdRng::seed_from_u64(2020);
    let market = Normal::new(0.0004, 0.012).unwrap();
    let noise = Normal::new(0.0, 0.02).unwrap();
    let first = NaiveDate::from_ymd_opt(2020, 8, 18).unwrap();

    let mut prices: Vec<f64> = (0..num_symbols).map(|i| 30.0 + 7.0 * i as f64).collect();
    let mut records = Vec::new();
    for day in 0..num_days {
        let m = market.sample(&mut rng);
        for (i, price) in prices.iter_mut().enumerate() {
            if day > 0 {
                let beta = 0.4 + 0.06 * i as f64;
                *price *= (beta * m + noise.sample(&mut rng)).exp();
            }
            // TICK24 listed late: no history for the first 20 days
            if i == 24 && day < 20 {
                continue;
            }
            records.push(PriceRecord::new(
                format!("TICK{:02}", i),
                first + Duration::days(day as i64),
                *price,
            ));
        }
    }
    records
}
