//! Historical Value at Risk
//!
//! Non-parametric VaR for an equally-weighted portfolio over a date window:
//! the portfolio return series is the equal-weight average of member
//! returns, and VaR is the negated α-quantile (α = 1 - confidence) with
//! linear interpolation between order statistics.

use crate::config::{validate_confidence, VarConfig};
use crate::error::{Result, RiskError};
use crate::portfolio::Portfolio;
use crate::returns::ReturnPanel;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Historical VaR result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarResult {
    /// VaR as a fraction of portfolio value (positive = loss)
    pub var_pct: f64,

    /// α-quantile of the portfolio return series
    pub quantile: f64,

    /// Confidence level (e.g., 0.95, 0.99)
    pub confidence_level: f64,

    /// Number of returns in the window
    pub observations: usize,

    pub start: NaiveDate,
    pub end: NaiveDate,

    /// Timestamp of calculation
    pub timestamp: DateTime<Utc>,
}

/// Historical VaR calculator over a return panel
pub struct HistoricalVarCalculator<'a> {
    returns: &'a ReturnPanel,
    config: VarConfig,
}

impl<'a> HistoricalVarCalculator<'a> {
    pub fn new(returns: &'a ReturnPanel, config: VarConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { returns, config })
    }

    /// Equally-weighted portfolio returns for dates in `[start, end]`
    pub fn portfolio_returns(
        &self,
        portfolio: &Portfolio,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        if start > end {
            return Err(RiskError::InvalidParameter(format!(
                "window start {} is after end {}",
                start, end
            )));
        }
        if portfolio.is_empty() {
            return Err(RiskError::InvalidPortfolioSize {
                requested: 0,
                available: self.returns.num_symbols(),
            });
        }
        if let Some(&bad) = portfolio
            .members()
            .iter()
            .find(|&&m| m >= self.returns.num_symbols())
        {
            return Err(RiskError::UnknownSymbol(format!("universe index {}", bad)));
        }

        let weight = portfolio.weight();
        let matrix = self.returns.returns();

        Ok(self
            .returns
            .window(start, end)
            .map(|row| {
                let total: f64 = portfolio.members().iter().map(|&col| matrix[(row, col)]).sum();
                (self.returns.dates()[row], total * weight)
            })
            .collect())
    }

    /// Historical VaR at `confidence` over `[start, end]`
    ///
    /// # Example
    ///
    /// ```
    /// use subset_risk::{MarketContext, PanelConfig, PriceRecord, VarConfig};
    ///
    /// let closes = [100.0, 95.0, 93.1, 94.031, 96.85193, 87.166737];
    /// let records: Vec<_> = closes
    ///     .iter()
    ///     .enumerate()
    ///     .map(|(i, p)| PriceRecord::parse("A", &format!("2024-01-{:02}", i + 1), *p).unwrap())
    ///     .collect();
    ///
    /// let ctx = MarketContext::build(&records, &PanelConfig::default()).unwrap();
    /// let calc = ctx.var_calculator(VarConfig::default()).unwrap();
    /// let portfolio = ctx.portfolio(&["A"]).unwrap();
    ///
    /// let dates = ctx.returns().dates();
    /// let result = calc
    ///     .historical_var(0.8, &portfolio, dates[0], dates[dates.len() - 1])
    ///     .unwrap();
    /// assert!((result.var_pct - 0.06).abs() < 1e-9);
    /// ```
    pub fn historical_var(
        &self,
        confidence: f64,
        portfolio: &Portfolio,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<VarResult> {
        validate_confidence(confidence)?;
        let series = self.window_returns(portfolio, start, end)?;
        let quantile = empirical_quantile(&series, 1.0 - confidence)?;

        Ok(VarResult {
            var_pct: -quantile,
            quantile,
            confidence_level: confidence,
            observations: series.len(),
            start,
            end,
            timestamp: Utc::now(),
        })
    }

    /// Historical VaR at the configured default confidence level
    pub fn historical_var_default(
        &self,
        portfolio: &Portfolio,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<VarResult> {
        self.historical_var(self.config.confidence_level, portfolio, start, end)
    }

    /// Historical expected shortfall (CVaR) at `confidence` over `[start, end]`
    ///
    /// Negated mean of the portfolio returns at or below the VaR quantile.
    pub fn historical_cvar(
        &self,
        confidence: f64,
        portfolio: &Portfolio,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<f64> {
        validate_confidence(confidence)?;
        let series = self.window_returns(portfolio, start, end)?;
        let quantile = empirical_quantile(&series, 1.0 - confidence)?;

        let tail: Vec<f64> = series.iter().copied().filter(|r| *r <= quantile).collect();
        if tail.is_empty() {
            return Err(RiskError::NumericalInstability(
                "No tail returns found for CVaR calculation".to_string(),
            ));
        }

        Ok(-(tail.iter().sum::<f64>() / tail.len() as f64))
    }

    fn window_returns(
        &self,
        portfolio: &Portfolio,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<f64>> {
        let series: Vec<f64> = self
            .portfolio_returns(portfolio, start, end)?
            .into_iter()
            .map(|(_, r)| r)
            .collect();

        if series.is_empty() {
            return Err(RiskError::EmptyWindow { start, end });
        }
        if series.len() < self.config.min_observations {
            return Err(RiskError::InsufficientData(format!(
                "Need at least {} observations, got {}",
                self.config.min_observations,
                series.len()
            )));
        }

        Ok(series)
    }
}

/// Historical VaR of a plain return series
pub fn historical_var_from_returns(returns: &[f64], confidence: f64) -> Result<f64> {
    validate_confidence(confidence)?;
    Ok(-empirical_quantile(returns, 1.0 - confidence)?)
}

/// `p`-quantile with linear interpolation between order statistics
///
/// Rank is `p · (n - 1)` on the sorted sample, the same convention as the
/// common default in numerical array libraries.
pub fn empirical_quantile(values: &[f64], p: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(RiskError::InsufficientData(
            "Cannot take a quantile of an empty sample".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(RiskError::InvalidParameter(format!(
            "quantile probability {} outside [0, 1]",
            p
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(RiskError::NumericalInstability(
            "Non-finite value in return sample".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Ok(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}
