//! Simple period-over-period returns

use crate::error::{Result, RiskError};
use crate::panel::{is_valid_price, PricePanel};
use chrono::NaiveDate;
use nalgebra::DMatrix;
use std::ops::Range;

/// Return matrix (dates × symbols), one row shorter than its price panel
///
/// Row `t` holds `(p[t+1] - p[t]) / p[t]` and is dated at `t+1`.
#[derive(Debug, Clone)]
pub struct ReturnPanel {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    returns: DMatrix<f64>,
}

impl ReturnPanel {
    /// Derive returns from a complete price panel
    ///
    /// The first date is dropped. Any non-positive or non-finite price is
    /// reported instead of producing non-finite returns.
    pub fn from_prices(panel: &PricePanel) -> Result<Self> {
        if panel.num_dates() < 2 {
            return Err(RiskError::InsufficientData(format!(
                "Need at least 2 price dates to compute returns, got {}",
                panel.num_dates()
            )));
        }

        let prices = panel.prices();
        for (col, symbol) in panel.symbols().iter().enumerate() {
            for (row, date) in panel.dates().iter().enumerate() {
                let price = prices[(row, col)];
                if !is_valid_price(price) {
                    return Err(RiskError::InvalidPrice {
                        symbol: symbol.clone(),
                        date: *date,
                        price,
                    });
                }
            }
        }

        let n = panel.num_dates() - 1;
        let returns = DMatrix::from_fn(n, panel.num_symbols(), |t, s| {
            let previous = prices[(t, s)];
            (prices[(t + 1, s)] - previous) / previous
        });

        // Extreme price ratios can overflow even when every price is valid
        for (col, symbol) in panel.symbols().iter().enumerate() {
            for t in 0..n {
                let value = returns[(t, col)];
                if !value.is_finite() {
                    return Err(RiskError::NumericalInstability(format!(
                        "Non-finite return {} for {} on {}",
                        value,
                        symbol,
                        panel.dates()[t + 1]
                    )));
                }
            }
        }

        Ok(Self {
            dates: panel.dates()[1..].to_vec(),
            symbols: panel.symbols().to_vec(),
            returns,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn returns(&self) -> &DMatrix<f64> {
        &self.returns
    }

    /// Number of return periods
    pub fn num_periods(&self) -> usize {
        self.dates.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// Return of symbol column `col` at period `row`
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.returns.get((row, col)).copied()
    }

    /// Row range covering dates in `[start, end]`, inclusive
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Range<usize> {
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end);
        lo..hi.max(lo)
    }
}
