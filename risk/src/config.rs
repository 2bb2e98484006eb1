//! Run configuration
//!
//! All sections deserialize from YAML or JSON and every field has a default,
//! so a config file only needs to list what it overrides.

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};

/// Top-level configuration for a risk run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Price panel construction
    #[serde(default)]
    pub panel: PanelConfig,

    /// Monte Carlo estimation
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Historical VaR
    #[serde(default)]
    pub var: VarConfig,
}

/// How to treat repeated (symbol, date) rows in the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Abort the build with a `DuplicateObservation` error
    #[default]
    Reject,

    /// Keep the row that appears last in the input
    KeepLast,
}

/// Price panel configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

/// Monte Carlo configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of random portfolios drawn per asset
    #[serde(default = "default_num_simulations")]
    pub num_simulations: usize,

    /// Portfolio size k (anchor included)
    #[serde(default = "default_portfolio_size")]
    pub portfolio_size: usize,

    /// Random seed for reproducible runs (None = entropy)
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Estimate assets in parallel
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Consecutive zero-variance draws tolerated before an asset fails
    #[serde(default = "default_max_degenerate_redraws")]
    pub max_degenerate_redraws: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_simulations: default_num_simulations(),
            portfolio_size: default_portfolio_size(),
            random_seed: None,
            parallel: default_parallel(),
            max_degenerate_redraws: default_max_degenerate_redraws(),
        }
    }
}

/// Historical VaR configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarConfig {
    /// Default confidence level (e.g. 0.95)
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,

    /// Minimum number of returns inside a window
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
}

impl Default for VarConfig {
    fn default() -> Self {
        Self {
            confidence_level: default_confidence_level(),
            min_observations: default_min_observations(),
        }
    }
}

impl RiskConfig {
    /// Load configuration from a YAML string
    ///
    /// # Example
    ///
    /// ```
    /// use subset_risk::RiskConfig;
    ///
    /// let yaml = r#"
    /// simulation:
    ///   num_simulations: 500
    ///   portfolio_size: 3
    ///   random_seed: 7
    /// "#;
    ///
    /// let config = RiskConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.simulation.num_simulations, 500);
    /// assert_eq!(config.var.confidence_level, 0.95);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RiskConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RiskConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.var.validate()
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_simulations == 0 {
            return Err(RiskError::InvalidSimulationCount(self.num_simulations));
        }
        if self.portfolio_size == 0 {
            return Err(RiskError::InvalidParameter(
                "portfolio_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl VarConfig {
    pub fn validate(&self) -> Result<()> {
        validate_confidence(self.confidence_level)?;
        if self.min_observations == 0 {
            return Err(RiskError::InvalidParameter(
                "min_observations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_confidence(confidence_level: f64) -> Result<()> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(RiskError::InvalidConfidenceLevel(confidence_level));
    }
    Ok(())
}

// Default value functions
fn default_num_simulations() -> usize {
    10_000
}

fn default_portfolio_size() -> usize {
    5
}

fn default_parallel() -> bool {
    true
}

fn default_max_degenerate_redraws() -> usize {
    1_000
}

fn default_confidence_level() -> f64 {
    0.95
}

fn default_min_observations() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RiskConfig::default();
        assert_eq!(config.simulation.num_simulations, 10_000);
        assert_eq!(config.simulation.portfolio_size, 5);
        assert!(config.simulation.random_seed.is_none());
        assert_eq!(config.panel.duplicate_policy, DuplicatePolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
panel:
  duplicate_policy: keep_last
var:
  confidence_level: 0.99
"#;
        let config = RiskConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.panel.duplicate_policy, DuplicatePolicy::KeepLast);
        assert_eq!(config.var.confidence_level, 0.99);
        assert_eq!(config.simulation, SimulationConfig::default());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
  "simulation": { "num_simulations": 200, "portfolio_size": 4, "parallel": false }
}"#;
        let config = RiskConfig::from_json(json).unwrap();
        assert_eq!(config.simulation.num_simulations, 200);
        assert_eq!(config.simulation.portfolio_size, 4);
        assert!(!config.simulation.parallel);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let yaml = "var:\n  confidence_level: 1.5\n";
        assert_eq!(
            RiskConfig::from_yaml(yaml),
            Err(RiskError::InvalidConfidenceLevel(1.5))
        );

        let yaml = "simulation:\n  num_simulations: 0\n";
        assert_eq!(
            RiskConfig::from_yaml(yaml),
            Err(RiskError::InvalidSimulationCount(0))
        );

        let yaml = "simulation:\n  portfolio_size: 0\n";
        assert!(RiskConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_malformed_input_is_config_error() {
        let result = RiskConfig::from_json("{ not json");
        assert!(matches!(result, Err(RiskError::Config(_))));
    }
}
