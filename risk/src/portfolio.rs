//! Equally-weighted portfolio risk
//!
//! Provides portfolio-level risk metrics for equal weights w = 1/k:
//! - Portfolio volatility σ_p = √(wᵀ C w)
//! - Marginal risk contribution vector m = (C w) / σ_p
//! - Risk decomposition (component contribution wᵢ·mᵢ and share of total)
//!
//! C is always a sub-matrix of the universe covariance matrix.

use crate::covariance::CovarianceMatrix;
use crate::error::{Result, RiskError};
use crate::universe::Universe;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Variance this far below zero is rounding noise and is clamped to zero
const NEGATIVE_VARIANCE_TOLERANCE: f64 = 1e-14;

/// An ordered set of distinct universe members, equally weighted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Portfolio {
    members: Vec<usize>,
}

impl Portfolio {
    /// Build from universe indices
    pub fn new(members: Vec<usize>, universe: &Universe) -> Result<Self> {
        if members.is_empty() {
            return Err(RiskError::InvalidPortfolioSize {
                requested: 0,
                available: universe.len(),
            });
        }

        let mut seen = HashSet::with_capacity(members.len());
        for &index in &members {
            let symbol = universe
                .symbol(index)
                .ok_or_else(|| RiskError::UnknownSymbol(format!("universe index {}", index)))?;
            if !seen.insert(index) {
                return Err(RiskError::DuplicateMember(symbol.to_string()));
            }
        }

        Ok(Self { members })
    }

    /// Build from symbols, preserving their order
    ///
    /// # Example
    ///
    /// ```
    /// use subset_risk::{Portfolio, Universe};
    ///
    /// let universe = Universe::new(vec!["AAPL".into(), "AMZN".into(), "MSFT".into()]).unwrap();
    /// let portfolio = Portfolio::from_symbols(&universe, &["MSFT", "AAPL"]).unwrap();
    /// assert_eq!(portfolio.members(), &[2, 0]);
    /// assert_eq!(portfolio.weight(), 0.5);
    /// ```
    pub fn from_symbols<S: AsRef<str>>(universe: &Universe, symbols: &[S]) -> Result<Self> {
        let members = symbols
            .iter()
            .map(|s| universe.resolve(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(members, universe)
    }

    /// Members already known to be distinct and in range
    pub(crate) fn from_validated(members: Vec<usize>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Weight of each member (1/k)
    pub fn weight(&self) -> f64 {
        1.0 / self.members.len() as f64
    }

    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    /// Position of universe index `index` within the portfolio
    pub fn position(&self, index: usize) -> Option<usize> {
        self.members.iter().position(|&m| m == index)
    }

    /// Member symbols in portfolio order
    pub fn symbols<'u>(&self, universe: &'u Universe) -> Vec<&'u str> {
        self.members
            .iter()
            .filter_map(|&i| universe.symbol(i))
            .collect()
    }
}

/// Risk contribution of one portfolio member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskContribution {
    /// Asset symbol
    pub symbol: String,

    /// ∂σ_p/∂wᵢ = (C w)ᵢ / σ_p
    pub marginal_contribution: f64,

    /// wᵢ · MRCᵢ; these sum to σ_p
    pub component_contribution: f64,

    /// Percentage of total portfolio risk
    pub risk_pct: f64,
}

/// Full Euler decomposition of an equally-weighted portfolio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskDecomposition {
    pub volatility: f64,
    pub contributions: Vec<RiskContribution>,
}

/// Volatility and MRC vector for one portfolio
#[derive(Debug, Clone)]
pub struct MarginalRisk {
    /// σ_p
    pub volatility: f64,

    /// MRC per member, in portfolio order
    pub mrc: DVector<f64>,
}

/// Portfolio risk calculator over a shared universe covariance matrix
#[derive(Debug, Clone, Copy)]
pub struct PortfolioRiskEngine<'a> {
    covariance: &'a CovarianceMatrix,
}

impl<'a> PortfolioRiskEngine<'a> {
    pub fn new(covariance: &'a CovarianceMatrix) -> Self {
        Self { covariance }
    }

    /// Equally-weighted portfolio variance wᵀ C w
    pub fn variance(&self, portfolio: &Portfolio) -> Result<f64> {
        let (variance, _) = self.variance_and_exposure(portfolio)?;
        Ok(variance)
    }

    /// Equally-weighted portfolio volatility √(wᵀ C w)
    pub fn volatility(&self, portfolio: &Portfolio) -> Result<f64> {
        Ok(self.variance(portfolio)?.sqrt())
    }

    /// σ_p and the full MRC vector m = (C w) / σ_p
    ///
    /// Fails with `DegeneratePortfolio` when σ_p is zero.
    pub fn marginal_risk(&self, portfolio: &Portfolio) -> Result<MarginalRisk> {
        let (variance, exposure) = self.variance_and_exposure(portfolio)?;
        let volatility = variance.sqrt();

        if volatility == 0.0 {
            return Err(RiskError::DegeneratePortfolio(format!(
                "zero variance for portfolio of {} assets {:?}",
                portfolio.len(),
                portfolio.members()
            )));
        }

        Ok(MarginalRisk {
            volatility,
            mrc: exposure / volatility,
        })
    }

    /// MRC of `anchor` (a universe index) within `portfolio`
    pub fn marginal_risk_contribution(&self, anchor: usize, portfolio: &Portfolio) -> Result<f64> {
        let position = portfolio
            .position(anchor)
            .ok_or_else(|| RiskError::AnchorNotInPortfolio(format!("universe index {}", anchor)))?;
        let risk = self.marginal_risk(portfolio)?;
        Ok(risk.mrc[position])
    }

    /// Per-member risk decomposition with symbols from `universe`
    pub fn decompose(&self, portfolio: &Portfolio, universe: &Universe) -> Result<RiskDecomposition> {
        let risk = self.marginal_risk(portfolio)?;
        let weight = portfolio.weight();

        let contributions = portfolio
            .members()
            .iter()
            .zip(risk.mrc.iter())
            .map(|(&index, &mrc)| {
                let symbol = universe.symbol(index).ok_or_else(|| {
                    RiskError::UnknownSymbol(format!("universe index {}", index))
                })?;
                let component = weight * mrc;
                Ok(RiskContribution {
                    symbol: symbol.to_string(),
                    marginal_contribution: mrc,
                    component_contribution: component,
                    risk_pct: component / risk.volatility * 100.0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RiskDecomposition {
            volatility: risk.volatility,
            contributions,
        })
    }

    /// (wᵀ C w, C w) for equal weights
    fn variance_and_exposure(&self, portfolio: &Portfolio) -> Result<(f64, DVector<f64>)> {
        if portfolio.is_empty() {
            return Err(RiskError::InvalidPortfolioSize {
                requested: 0,
                available: self.covariance.dim(),
            });
        }
        if let Some(&bad) = portfolio.members().iter().find(|&&m| m >= self.covariance.dim()) {
            return Err(RiskError::InvalidParameter(format!(
                "portfolio member {} outside covariance matrix of dimension {}",
                bad,
                self.covariance.dim()
            )));
        }

        let sub = self.covariance.submatrix(portfolio.members());
        let w = DVector::from_element(portfolio.len(), portfolio.weight());
        let exposure = &sub * &w;
        let variance = w.dot(&exposure);

        if !variance.is_finite() {
            return Err(RiskError::NumericalInstability(format!(
                "Non-finite portfolio variance: {}",
                variance
            )));
        }
        if variance < 0.0 {
            if variance > -NEGATIVE_VARIANCE_TOLERANCE {
                return Ok((0.0, exposure));
            }
            return Err(RiskError::NumericalInstability(format!(
                "Negative portfolio variance: {}",
                variance
            )));
        }

        Ok((variance, exposure))
    }
}
