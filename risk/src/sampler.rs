//! Random subset sampling around an anchor asset

use crate::error::{Result, RiskError};
use crate::portfolio::Portfolio;
use crate::universe::Universe;
use rand::seq::index;
use rand::Rng;

/// Draws size-k portfolios that always contain a given anchor
///
/// The k-1 other members are drawn uniformly without replacement from
/// `Universe \ {anchor}`; the anchor is appended last. The random source is
/// supplied per call, so a seeded RNG makes draws reproducible.
#[derive(Debug, Clone, Copy)]
pub struct SubsetSampler<'a> {
    universe: &'a Universe,
}

impl<'a> SubsetSampler<'a> {
    pub fn new(universe: &'a Universe) -> Self {
        Self { universe }
    }

    /// Check that a size-k portfolio around some anchor can be drawn
    pub fn validate_size(&self, k: usize) -> Result<()> {
        if k < 1 || k > self.universe.len() {
            return Err(RiskError::InvalidPortfolioSize {
                requested: k,
                available: self.universe.len(),
            });
        }
        Ok(())
    }

    /// Draw a portfolio of `k` universe indices containing `anchor`
    pub fn sample<R: Rng + ?Sized>(&self, anchor: usize, k: usize, rng: &mut R) -> Result<Portfolio> {
        if anchor >= self.universe.len() {
            return Err(RiskError::UnknownSymbol(format!("universe index {}", anchor)));
        }
        self.validate_size(k)?;

        // Sample positions in the pool with the anchor removed, then shift
        // positions at or above the anchor up by one.
        let pool = self.universe.len() - 1;
        let mut members: Vec<usize> = index::sample(rng, pool, k - 1)
            .into_iter()
            .map(|i| if i >= anchor { i + 1 } else { i })
            .collect();
        members.push(anchor);

        Ok(Portfolio::from_validated(members))
    }

    /// Same as [`sample`](Self::sample) with the anchor given by symbol
    pub fn sample_symbol<R: Rng + ?Sized>(
        &self,
        anchor: &str,
        k: usize,
        rng: &mut R,
    ) -> Result<Portfolio> {
        let anchor = self.universe.resolve(anchor)?;
        self.sample(anchor, k, rng)
    }
}
