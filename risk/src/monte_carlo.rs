//! Monte Carlo estimation of subset risk
//!
//! For an anchor asset A and portfolio size k, draws random equally-weighted
//! portfolios containing A and averages:
//! - portfolio volatility σ_p (expected risk of portfolios holding A)
//! - A's marginal risk contribution (expected MRC of A)
//!
//! Each estimate carries its standard error s / √n with the unbiased sample
//! standard deviation.

use crate::config::SimulationConfig;
use crate::context::MarketContext;
use crate::error::{Result, RiskError};
use crate::portfolio::PortfolioRiskEngine;
use crate::sampler::SubsetSampler;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;
use std::time::Instant;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Monte Carlo mean with its sampling uncertainty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Sample mean
    pub mean: f64,

    /// Standard error of the mean (None with fewer than two draws)
    pub std_error: Option<f64>,

    /// Number of draws
    pub samples: usize,
}

impl Estimate {
    /// Mean and standard error of `values`
    pub fn from_samples(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(RiskError::InsufficientData(
                "No Monte Carlo samples to aggregate".to_string(),
            ));
        }

        let mean = values.iter().mean();
        let std_error = if values.len() >= 2 {
            Some(values.iter().std_dev() / (values.len() as f64).sqrt())
        } else {
            None
        };

        if !mean.is_finite() || std_error.map_or(false, |se| !se.is_finite()) {
            return Err(RiskError::NumericalInstability(
                "Non-finite Monte Carlo aggregate".to_string(),
            ));
        }

        Ok(Self {
            mean,
            std_error,
            samples: values.len(),
        })
    }

    /// Normal-approximation confidence interval `mean ± z·SE`
    ///
    /// None when the standard error is undefined.
    pub fn confidence_interval(&self, level: f64) -> Result<Option<(f64, f64)>> {
        crate::config::validate_confidence(level)?;
        let Some(se) = self.std_error else {
            return Ok(None);
        };

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| RiskError::NumericalInstability(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + level / 2.0);

        Ok(Some((self.mean - z * se, self.mean + z * se)))
    }
}

/// One row of the risk result table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRiskEstimate {
    pub symbol: String,

    /// Expected volatility of size-k portfolios containing the asset
    pub volatility: Estimate,

    /// Expected marginal risk contribution of the asset in those portfolios
    pub mrc: Estimate,
}

/// Risk result table for a whole universe, sorted by symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskTable {
    pub portfolio_size: usize,
    pub num_simulations: usize,
    pub rows: Vec<AssetRiskEstimate>,
}

impl RiskTable {
    pub fn get(&self, symbol: &str) -> Option<&AssetRiskEstimate> {
        self.rows
            .binary_search_by(|row| row.symbol.as_str().cmp(symbol))
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Monte Carlo estimator bound to a market context
pub struct MonteCarloEstimator<'a> {
    context: &'a MarketContext,
    sampler: SubsetSampler<'a>,
    engine: PortfolioRiskEngine<'a>,
    config: SimulationConfig,
}

impl<'a> MonteCarloEstimator<'a> {
    pub fn new(context: &'a MarketContext, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            context,
            sampler: context.sampler(),
            engine: context.risk_engine(),
            config,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// E[σ_p] over size-k portfolios containing `anchor`
    pub fn expected_volatility<R: Rng + ?Sized>(
        &self,
        anchor: &str,
        k: usize,
        num_sims: usize,
        rng: &mut R,
    ) -> Result<Estimate> {
        let anchor = self.context.universe().resolve(anchor)?;
        self.volatility_estimate(anchor, k, num_sims, rng)
    }

    /// E[MRC of `anchor`] over size-k portfolios containing it
    pub fn expected_mrc<R: Rng + ?Sized>(
        &self,
        anchor: &str,
        k: usize,
        num_sims: usize,
        rng: &mut R,
    ) -> Result<Estimate> {
        let anchor = self.context.universe().resolve(anchor)?;
        self.mrc_estimate(anchor, k, num_sims, rng)
    }

    /// Both estimates for one asset using the configured k and simulation count
    pub fn estimate_asset<R: Rng + ?Sized>(&self, anchor: &str, rng: &mut R) -> Result<AssetRiskEstimate> {
        let index = self.context.universe().resolve(anchor)?;
        self.asset_estimate(index, rng)
    }

    /// Risk result table for every universe asset
    pub fn estimate_universe(&self) -> Result<RiskTable> {
        self.estimate_universe_with_progress(&|_| {})
    }

    /// Like [`estimate_universe`](Self::estimate_universe), calling `progress`
    /// after each asset finishes
    ///
    /// Every asset draws from its own RNG seeded from the base seed and the
    /// asset's index, so results do not depend on scheduling.
    pub fn estimate_universe_with_progress(
        &self,
        progress: &(dyn Fn(&AssetRiskEstimate) + Sync),
    ) -> Result<RiskTable> {
        let universe = self.context.universe();
        self.sampler.validate_size(self.config.portfolio_size)?;

        let base_seed = self.config.random_seed.unwrap_or_else(rand::random);
        let started = Instant::now();

        info!(
            assets = universe.len(),
            portfolio_size = self.config.portfolio_size,
            num_simulations = self.config.num_simulations,
            parallel = self.config.parallel,
            "Starting universe risk estimation"
        );

        let run = |index: usize| -> Result<AssetRiskEstimate> {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(index as u64));
            let estimate = self.asset_estimate(index, &mut rng)?;
            progress(&estimate);
            Ok(estimate)
        };

        let mut rows = self.run_assets(universe.len(), &run)?;
        rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        info!(
            assets = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Finished universe risk estimation"
        );

        Ok(RiskTable {
            portfolio_size: self.config.portfolio_size,
            num_simulations: self.config.num_simulations,
            rows,
        })
    }

    #[cfg(feature = "parallel")]
    fn run_assets(
        &self,
        count: usize,
        run: &(dyn Fn(usize) -> Result<AssetRiskEstimate> + Sync),
    ) -> Result<Vec<AssetRiskEstimate>> {
        if self.config.parallel {
            (0..count).into_par_iter().map(run).collect()
        } else {
            (0..count).map(run).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_assets(
        &self,
        count: usize,
        run: &(dyn Fn(usize) -> Result<AssetRiskEstimate> + Sync),
    ) -> Result<Vec<AssetRiskEstimate>> {
        if self.config.parallel {
            debug!("Built without the parallel feature; estimating serially");
        }
        (0..count).map(run).collect()
    }

    fn asset_estimate<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<AssetRiskEstimate> {
        let k = self.config.portfolio_size;
        let n = self.config.num_simulations;

        let volatility = self.volatility_estimate(index, k, n, rng)?;
        let mrc = self.mrc_estimate(index, k, n, rng)?;
        let symbol = self
            .context
            .universe()
            .symbol(index)
            .ok_or_else(|| RiskError::UnknownSymbol(format!("universe index {}", index)))?
            .to_string();

        debug!(
            symbol = %symbol,
            expected_volatility = volatility.mean,
            expected_mrc = mrc.mean,
            "Estimated asset risk"
        );

        Ok(AssetRiskEstimate {
            symbol,
            volatility,
            mrc,
        })
    }

    fn volatility_estimate<R: Rng + ?Sized>(
        &self,
        anchor: usize,
        k: usize,
        num_sims: usize,
        rng: &mut R,
    ) -> Result<Estimate> {
        check_simulations(num_sims)?;
        self.sampler.validate_size(k)?;

        let mut values = Vec::with_capacity(num_sims);
        for _ in 0..num_sims {
            let portfolio = self.sampler.sample(anchor, k, rng)?;
            values.push(self.engine.volatility(&portfolio)?);
        }

        Estimate::from_samples(&values)
    }

    fn mrc_estimate<R: Rng + ?Sized>(
        &self,
        anchor: usize,
        k: usize,
        num_sims: usize,
        rng: &mut R,
    ) -> Result<Estimate> {
        check_simulations(num_sims)?;
        self.sampler.validate_size(k)?;

        let mut values = Vec::with_capacity(num_sims);
        let mut total_redraws = 0usize;

        for _ in 0..num_sims {
            let mut redraws = 0usize;
            let value = loop {
                let portfolio = self.sampler.sample(anchor, k, rng)?;
                match self.engine.marginal_risk_contribution(anchor, &portfolio) {
                    Err(RiskError::DegeneratePortfolio(reason)) => {
                        if redraws >= self.config.max_degenerate_redraws {
                            return Err(RiskError::DegeneratePortfolio(format!(
                                "{} ({} consecutive zero-variance draws for {})",
                                reason,
                                redraws + 1,
                                self.context.universe().symbol(anchor).unwrap_or_default()
                            )));
                        }
                        redraws += 1;
                    }
                    other => break other?,
                }
            };
            total_redraws += redraws;
            values.push(value);
        }

        if total_redraws > 0 {
            warn!(
                anchor = self.context.universe().symbol(anchor).unwrap_or_default(),
                redraws = total_redraws,
                "Redrew zero-variance portfolios during MRC estimation"
            );
        }

        Estimate::from_samples(&values)
    }
}

fn check_simulations(num_sims: usize) -> Result<()> {
    if num_sims == 0 {
        return Err(RiskError::InvalidSimulationCount(num_sims));
    }
    Ok(())
}
