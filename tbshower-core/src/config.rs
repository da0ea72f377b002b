//! Analysis configuration.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coordinate reported for clusters whose log weights all vanish.
pub const CENTROID_SENTINEL: f32 = -99.0;

/// Number of layers in the electromagnetic section.
const EM_LAYERS: usize = 28;
/// Electromagnetic plus front hadronic sections.
const HAD_LAYERS: usize = 40;

/// Kind of shower the run was taken with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ShowerType {
    /// Electromagnetic shower (electrons, photons).
    #[default]
    Em,
    /// Hadronic shower (pions).
    Had,
}

impl ShowerType {
    /// Number of instrumented layers read out for this shower type.
    #[must_use]
    pub fn max_layers(self) -> usize {
        match self {
            Self::Em => EM_LAYERS,
            Self::Had => HAD_LAYERS,
        }
    }

    /// Logarithmic weighting offset used for this shower type.
    #[must_use]
    pub fn default_log_weight_floor(self) -> f64 {
        match self {
            Self::Em | Self::Had => 2.9,
        }
    }
}

impl fmt::Display for ShowerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Em => f.write_str("em"),
            Self::Had => f.write_str("had"),
        }
    }
}

impl FromStr for ShowerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "em" | "electromagnetic" => Ok(Self::Em),
            "had" | "hadronic" => Ok(Self::Had),
            other => Err(Error::ConfigError(format!("unknown shower type '{other}'"))),
        }
    }
}

/// What the uncut position estimator reports for a cluster whose log
/// weights sum to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ZeroWeightSentinel {
    /// Report `(0, 0)` on layer 0.
    #[default]
    Origin,
    /// Report [`CENTROID_SENTINEL`] for both coordinates.
    Marker,
}

impl FromStr for ZeroWeightSentinel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "origin" | "zero" => Ok(Self::Origin),
            "marker" | "-99" => Ok(Self::Marker),
            other => Err(Error::ConfigError(format!(
                "unknown zero-weight sentinel '{other}'"
            ))),
        }
    }
}

/// Configuration shared by all aggregators.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisConfig {
    /// Shower type of the run.
    pub shower_type: ShowerType,
    /// Number of layers results are produced for.
    pub max_layers: usize,
    /// Logarithmic weighting offset `W0`.
    pub log_weight_floor: f64,
    /// Radius around the highest-energy hit that enters the centroid.
    pub distance_cut: f64,
    /// Zero-weight policy of the uncut estimator.
    pub zero_weight_sentinel: ZeroWeightSentinel,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::for_shower(ShowerType::Em)
    }
}

impl AnalysisConfig {
    /// Preset for the given shower type.
    #[must_use]
    pub fn for_shower(shower_type: ShowerType) -> Self {
        Self {
            shower_type,
            max_layers: shower_type.max_layers(),
            log_weight_floor: shower_type.default_log_weight_floor(),
            distance_cut: 1.3, // 13 mm
            zero_weight_sentinel: ZeroWeightSentinel::Origin,
        }
    }

    /// Set the number of layers.
    #[must_use]
    pub fn with_max_layers(mut self, max_layers: usize) -> Self {
        self.max_layers = max_layers;
        self
    }

    /// Set the logarithmic weighting offset.
    #[must_use]
    pub fn with_log_weight_floor(mut self, w0: f64) -> Self {
        self.log_weight_floor = w0;
        self
    }

    /// Set the centroid distance cut.
    #[must_use]
    pub fn with_distance_cut(mut self, cut: f64) -> Self {
        self.distance_cut = cut;
        self
    }

    /// Set the zero-weight policy of the uncut estimator.
    #[must_use]
    pub fn with_zero_weight_sentinel(mut self, sentinel: ZeroWeightSentinel) -> Self {
        self.zero_weight_sentinel = sentinel;
        self
    }

    /// Checks that the configuration can drive an analysis.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for a zero layer count, a negative or
    /// non-finite weighting offset, or a non-positive distance cut.
    pub fn validate(&self) -> Result<()> {
        if self.max_layers == 0 {
            return Err(Error::ConfigError("max_layers must be positive".into()));
        }
        if !self.log_weight_floor.is_finite() || self.log_weight_floor < 0.0 {
            return Err(Error::ConfigError(format!(
                "log_weight_floor must be finite and non-negative, got {}",
                self.log_weight_floor
            )));
        }
        if !(self.distance_cut.is_finite() && self.distance_cut > 0.0) {
            return Err(Error::ConfigError(format!(
                "distance_cut must be positive, got {}",
                self.distance_cut
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_presets() {
        let em = AnalysisConfig::for_shower(ShowerType::Em);
        assert_eq!(em.max_layers, 28);
        assert_relative_eq!(em.log_weight_floor, 2.9);
        assert_relative_eq!(em.distance_cut, 1.3);

        let had = AnalysisConfig::for_shower(ShowerType::Had);
        assert_eq!(had.max_layers, 40);
        assert_eq!(AnalysisConfig::default(), em);
    }

    #[test]
    fn test_builder_setters() {
        let config = AnalysisConfig::default()
            .with_max_layers(3)
            .with_log_weight_floor(4.0)
            .with_distance_cut(2.0)
            .with_zero_weight_sentinel(ZeroWeightSentinel::Marker);

        assert_eq!(config.max_layers, 3);
        assert_relative_eq!(config.log_weight_floor, 4.0);
        assert_relative_eq!(config.distance_cut, 2.0);
        assert_eq!(config.zero_weight_sentinel, ZeroWeightSentinel::Marker);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(AnalysisConfig::default().with_max_layers(0).validate().is_err());
        assert!(AnalysisConfig::default()
            .with_log_weight_floor(f64::NAN)
            .validate()
            .is_err());
        assert!(AnalysisConfig::default()
            .with_distance_cut(0.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_parse_shower_type() {
        assert_eq!("EM".parse::<ShowerType>().unwrap(), ShowerType::Em);
        assert_eq!("hadronic".parse::<ShowerType>().unwrap(), ShowerType::Had);
        assert!("muon".parse::<ShowerType>().is_err());
        assert_eq!(ShowerType::Had.to_string(), "had");
    }
}
