//! Historical VaR example
//!
//! Computes historical VaR and expected shortfall for an equally-weighted
//! portfolio over several date windows.
//!
//! Run with: cargo run --example historical_var

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StudentT};
use subset_risk::{MarketContext, PanelConfig, PriceRecord, VarConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Historical Value at Risk Example ===\n");

    let first = NaiveDate::from_ymd_opt(2020, 8, 18).unwrap();
    let records = fat_tailed_records(&["AAPL", "AMZN", "MSFT", "NVDA", "TSLA"], 750, first);
    let ctx = MarketContext::build(&records, &PanelConfig::default())?;

    let portfolio = ctx.portfolio(&["AAPL", "MSFT", "NVDA"])?;
    let calc = ctx.var_calculator(VarConfig::default())?;

    println!("Portfolio: {:?} (equal weights)", portfolio.symbols(ctx.universe()));
    println!();

    let windows = [
        ("First year", first, first + Duration::days(365)),
        ("Second year", first + Duration::days(366), first + Duration::days(730)),
        ("Full history", first, first + Duration::days(750)),
    ];

    for (label, start, end) in windows {
        println!("--- {} ({} to {}) ---", label, start, end);
        for confidence in [0.95, 0.99] {
            let var = calc.historical_var(confidence, &portfolio, start, end)?;
            let cvar = calc.historical_cvar(confidence, &portfolio, start, end)?;
            println!(
                "  {:.0}% VaR: {:.2}%  CVaR: {:.2}%  ({} observations)",
                confidence * 100.0,
                var.var_pct * 100.0,
                cvar * 100.0,
                var.observations
            );
        }
        println!();
    }

    Ok(())
}

fn fat_tailed_records(symbols: &[&str], num_days: usize, first: NaiveDate) -> Vec<PriceRecord> {
    let mut rng = StdRng::seed_from_u64(11);
    let shocks = StudentT::new(4.0).unwrap();

    let mut records = Vec::new();
    for (i, symbol) in symbols.iter().enumerate() {
        let mut price = 100.0 + 25.0 * i as f64;
        for day in 0..num_days {
            if day > 0 {
                let shock: f64 = shocks.sample(&mut rng);
                price *= (0.0003 + 0.012 * shock).exp();
            }
            records.push(PriceRecord::new(*symbol, first + Duration::days(day as i64), price));
        }
    }
    records
}
