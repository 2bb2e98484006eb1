//! Immutable market context
//!
//! Runs the panel → returns → covariance pipeline once and hands out
//! borrowing views (sampler, risk engine, estimators) over the result.

use crate::config::{PanelConfig, SimulationConfig, VarConfig};
use crate::covariance::CovarianceMatrix;
use crate::error::Result;
use crate::monte_carlo::MonteCarloEstimator;
use crate::panel::{PricePanel, PriceRecord};
use crate::portfolio::{Portfolio, PortfolioRiskEngine};
use crate::returns::ReturnPanel;
use crate::sampler::SubsetSampler;
use crate::universe::Universe;
use crate::var::HistoricalVarCalculator;

/// Universe, prices, returns and covariance for one run
///
/// Read-only after construction and `Sync`, so it can be shared across
/// worker threads.
#[derive(Debug, Clone)]
pub struct MarketContext {
    universe: Universe,
    prices: PricePanel,
    returns: ReturnPanel,
    covariance: CovarianceMatrix,
}

impl MarketContext {
    /// Build everything from long-format price records
    ///
    /// # Example
    ///
    /// ```
    /// use subset_risk::{MarketContext, PanelConfig, PriceRecord};
    ///
    /// let records = vec![
    ///     PriceRecord::parse("A", "2024-01-02", 10.0).unwrap(),
    ///     PriceRecord::parse("A", "2024-01-03", 10.5).unwrap(),
    ///     PriceRecord::parse("A", "2024-01-04", 10.2).unwrap(),
    ///     PriceRecord::parse("B", "2024-01-02", 20.0).unwrap(),
    ///     PriceRecord::parse("B", "2024-01-03", 19.0).unwrap(),
    ///     PriceRecord::parse("B", "2024-01-04", 19.5).unwrap(),
    /// ];
    ///
    /// let ctx = MarketContext::build(&records, &PanelConfig::default()).unwrap();
    /// assert_eq!(ctx.universe().len(), 2);
    /// assert_eq!(ctx.returns().num_periods(), 2);
    /// ```
    pub fn build(records: &[PriceRecord], config: &PanelConfig) -> Result<Self> {
        Self::from_panel(PricePanel::build(records, config)?)
    }

    /// Build from an already filtered price panel
    pub fn from_panel(prices: PricePanel) -> Result<Self> {
        let universe = Universe::new(prices.symbols().to_vec())?;
        let returns = ReturnPanel::from_prices(&prices)?;
        let covariance = CovarianceMatrix::from_returns(&returns)?;

        Ok(Self {
            universe,
            prices,
            returns,
            covariance,
        })
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn prices(&self) -> &PricePanel {
        &self.prices
    }

    pub fn returns(&self) -> &ReturnPanel {
        &self.returns
    }

    pub fn covariance(&self) -> &CovarianceMatrix {
        &self.covariance
    }

    pub fn sampler(&self) -> SubsetSampler<'_> {
        SubsetSampler::new(&self.universe)
    }

    pub fn risk_engine(&self) -> PortfolioRiskEngine<'_> {
        PortfolioRiskEngine::new(&self.covariance)
    }

    /// Portfolio of the given symbols, in order
    pub fn portfolio<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Portfolio> {
        Portfolio::from_symbols(&self.universe, symbols)
    }

    pub fn monte_carlo(&self, config: SimulationConfig) -> Result<MonteCarloEstimator<'_>> {
        MonteCarloEstimator::new(self, config)
    }

    pub fn var_calculator(&self, config: VarConfig) -> Result<HistoricalVarCalculator<'_>> {
        HistoricalVarCalculator::new(&self.returns, config)
    }
}
