//! The set of assets eligible for sampling

use crate::error::{Result, RiskError};
use std::collections::HashMap;

/// Ordered symbol set with O(1) symbol → index lookup
///
/// Indices match the column order of the price, return and covariance
/// matrices built from the same panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    symbols: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Universe {
    pub fn new(symbols: Vec<String>) -> Result<Self> {
        if symbols.is_empty() {
            return Err(RiskError::EmptyUniverse("no symbols supplied".to_string()));
        }

        let mut positions = HashMap::with_capacity(symbols.len());
        for (i, symbol) in symbols.iter().enumerate() {
            if positions.insert(symbol.clone(), i).is_some() {
                return Err(RiskError::InvalidParameter(format!(
                    "symbol {} appears twice in the universe",
                    symbol
                )));
            }
        }

        Ok(Self { symbols, positions })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn symbol(&self, index: usize) -> Option<&str> {
        self.symbols.get(index).map(String::as_str)
    }

    pub fn position(&self, symbol: &str) -> Option<usize> {
        self.positions.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Index of `symbol`, or `UnknownSymbol`
    pub fn resolve(&self, symbol: &str) -> Result<usize> {
        self.position(symbol)
            .ok_or_else(|| RiskError::UnknownSymbol(symbol.to_string()))
    }
}
