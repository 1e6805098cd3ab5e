//! Ensemble configuration

use serde::{Deserialize, Serialize};

/// Ensemble name used when none is given
pub const DEFAULT_ENSEMBLE_NAME: &str = "glue_bins";

/// Settings for building and validating a [`CorrelatorEnsemble`](crate::CorrelatorEnsemble)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Label attached to every observable built from the ensemble
    pub ensemble_name: String,
    /// Reject tables whose index columns do not form a dense 1-based grid
    pub check_density: bool,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            ensemble_name: DEFAULT_ENSEMBLE_NAME.to_string(),
            check_density: true,
        }
    }
}

impl EnsembleConfig {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ensemble name
    #[must_use]
    pub fn with_ensemble_name(mut self, name: impl Into<String>) -> Self {
        self.ensemble_name = name.into();
        self
    }

    /// Enable or disable the density check on freeze
    #[must_use]
    pub fn with_density_check(mut self, enabled: bool) -> Self {
        self.check_density = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EnsembleConfig::default();
        assert_eq!(config.ensemble_name, "glue_bins");
        assert!(config.check_density);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = EnsembleConfig::new()
            .with_ensemble_name("b5.7_L16")
            .with_density_check(false);
        let json = serde_json::to_string(&config).unwrap();
        let back: EnsembleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
