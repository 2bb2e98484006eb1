//! # subset-risk: Monte Carlo Subset Risk for Equity Universes
//!
//! This library estimates how much risk an individual stock brings to random
//! equally-weighted portfolios, and computes historical Value at Risk for a
//! chosen portfolio.
//!
//! ## Core Components
//!
//! - **PricePanel**: pivots `(symbol, date, close)` records into a dense
//!   date × symbol matrix, keeping only symbols with complete histories
//! - **ReturnPanel**: simple period-over-period returns
//! - **CovarianceMatrix**: universe covariance, computed once
//! - **SubsetSampler**: random size-k portfolios that contain an anchor asset
//! - **PortfolioRiskEngine**: equal-weight volatility and marginal risk
//!   contribution (MRC)
//! - **MonteCarloEstimator**: expected volatility and expected MRC per asset,
//!   with standard errors
//! - **HistoricalVarCalculator**: empirical-quantile VaR over a date window
//!
//! `MarketContext` ties the pipeline together and is read-only once built.
//!
//! ## Example Usage
//!
//! ```rust
//! use subset_risk::{MarketContext, PanelConfig, PriceRecord, SimulationConfig};
//!
//! let closes: [(&str, [f64; 6]); 3] = [
//!     ("AAA", [10.0, 10.4, 10.1, 10.6, 10.5, 10.9]),
//!     ("BBB", [20.0, 19.5, 19.9, 20.3, 19.8, 20.1]),
//!     ("CCC", [5.0, 5.1, 5.05, 4.9, 5.2, 5.25]),
//! ];
//!
//! let mut records = Vec::new();
//! for (symbol, prices) in &closes {
//!     for (day, close) in prices.iter().enumerate() {
//!         let date = format!("2024-01-{:02}", day + 2);
//!         records.push(PriceRecord::parse(*symbol, &date, *close).unwrap());
//!     }
//! }
//!
//! let ctx = MarketContext::build(&records, &PanelConfig::default()).unwrap();
//!
//! let estimator = ctx
//!     .monte_carlo(SimulationConfig {
//!         num_simulations: 200,
//!         portfolio_size: 2,
//!         random_seed: Some(42),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! let table = estimator.estimate_universe().unwrap();
//! assert_eq!(table.len(), 3);
//! assert!(table.get("BBB").unwrap().volatility.mean > 0.0);
//! ```

mod config;
mod context;
mod covariance;
mod error;
mod monte_carlo;
mod panel;
mod portfolio;
mod returns;
mod sampler;
mod universe;
mod var;

pub use config::{DuplicatePolicy, PanelConfig, RiskConfig, SimulationConfig, VarConfig};
pub use context::MarketContext;
pub use covariance::CovarianceMatrix;
pub use error::{Result, RiskError};
pub use monte_carlo::{AssetRiskEstimate, Estimate, MonteCarloEstimator, RiskTable};
pub use panel::{PricePanel, PriceRecord, RejectedSymbol, RejectionReason};
pub use portfolio::{
    MarginalRisk, Portfolio, PortfolioRiskEngine, RiskContribution, RiskDecomposition,
};
pub use returns::ReturnPanel;
pub use sampler::SubsetSampler;
pub use universe::Universe;
pub use var::{empirical_quantile, historical_var_from_returns, HistoricalVarCalculator, VarResult};
