//! Price panel construction
//!
//! Pivots long-format `(symbol, date, close)` records into a dense
//! date × symbol matrix and keeps only symbols with a complete, valid price
//! history across every date seen in the input.

use crate::config::{DuplicatePolicy, PanelConfig};
use crate::error::{Result, RiskError};
use chrono::NaiveDate;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// One end-of-day observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Asset symbol (e.g., "AAPL")
    pub symbol: String,

    /// Trading date
    pub date: NaiveDate,

    /// Closing price
    pub close: f64,
}

impl PriceRecord {
    pub fn new(symbol: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            close,
        }
    }

    /// Build a record from an ISO `YYYY-MM-DD` date string
    ///
    /// # Example
    ///
    /// ```
    /// use subset_risk::PriceRecord;
    ///
    /// let record = PriceRecord::parse("MSFT", "2020-08-18", 211.49).unwrap();
    /// assert_eq!(record.date.to_string(), "2020-08-18");
    /// ```
    pub fn parse(symbol: impl Into<String>, date: &str, close: f64) -> Result<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")?;
        Ok(Self::new(symbol, date, close))
    }
}

/// Why a symbol was left out of the universe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// Price history has gaps
    Incomplete { observed: usize, expected: usize },

    /// A price was zero, negative or not finite
    InvalidPrice { date: NaiveDate, price: f64 },
}

/// A symbol dropped by the universe filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedSymbol {
    pub symbol: String,
    pub reason: RejectionReason,
}

/// Dense price matrix with rows = dates (ascending) and columns = symbols
#[derive(Debug, Clone)]
pub struct PricePanel {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    prices: DMatrix<f64>,
    rejected: Vec<RejectedSymbol>,
}

impl PricePanel {
    /// Pivot records and filter to symbols with complete histories
    ///
    /// Symbols are ordered alphabetically. A symbol with any invalid price is
    /// rejected the same way as one with a missing date.
    pub fn build(records: &[PriceRecord], config: &PanelConfig) -> Result<Self> {
        if records.is_empty() {
            return Err(RiskError::EmptyUniverse("no price records supplied".to_string()));
        }

        let mut series: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        let mut all_dates = BTreeSet::new();

        for record in records {
            all_dates.insert(record.date);
            let previous = series
                .entry(record.symbol.as_str())
                .or_default()
                .insert(record.date, record.close);

            if previous.is_some() && config.duplicate_policy == DuplicatePolicy::Reject {
                return Err(RiskError::DuplicateObservation {
                    symbol: record.symbol.clone(),
                    date: record.date,
                });
            }
        }

        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();
        let mut symbols = Vec::new();
        let mut rejected = Vec::new();
        let mut values = Vec::new();

        for (symbol, history) in &series {
            if let Some((date, price)) = history.iter().find(|(_, p)| !is_valid_price(**p)) {
                rejected.push(RejectedSymbol {
                    symbol: symbol.to_string(),
                    reason: RejectionReason::InvalidPrice {
                        date: *date,
                        price: *price,
                    },
                });
                continue;
            }

            if history.len() < dates.len() {
                rejected.push(RejectedSymbol {
                    symbol: symbol.to_string(),
                    reason: RejectionReason::Incomplete {
                        observed: history.len(),
                        expected: dates.len(),
                    },
                });
                continue;
            }

            // Complete histories iterate in the same date order as `dates`.
            values.extend(history.values().copied());
            symbols.push(symbol.to_string());
        }

        for rejection in &rejected {
            debug!(symbol = %rejection.symbol, reason = ?rejection.reason, "Symbol excluded from universe");
        }
        if !rejected.is_empty() {
            warn!(
                rejected = rejected.len(),
                retained = symbols.len(),
                "Dropped symbols without a complete price history"
            );
        }

        if symbols.is_empty() {
            return Err(RiskError::EmptyUniverse(format!(
                "all {} symbols were rejected",
                rejected.len()
            )));
        }

        // Column-major fill: one column per retained symbol.
        let prices = DMatrix::from_vec(dates.len(), symbols.len(), values);

        info!(
            symbols = symbols.len(),
            dates = dates.len(),
            first = %dates[0],
            last = %dates[dates.len() - 1],
            "Built price panel"
        );

        Ok(Self {
            dates,
            symbols,
            prices,
            rejected,
        })
    }

    /// Trading dates, strictly increasing
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Retained symbols in column order
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Price matrix (dates × symbols)
    pub fn prices(&self) -> &DMatrix<f64> {
        &self.prices
    }

    /// Symbols dropped by the completeness filter
    pub fn rejected(&self) -> &[RejectedSymbol] {
        &self.rejected
    }

    pub fn num_dates(&self) -> usize {
        self.dates.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// Price of `symbol` on `date`, if both are in the panel
    pub fn price(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        let col = self.symbols.iter().position(|s| s == symbol)?;
        let row = self.dates.binary_search(&date).ok()?;
        Some(self.prices[(row, col)])
    }
}

pub(crate) fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}
