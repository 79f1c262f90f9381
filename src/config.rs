//! Engine configuration and strategy presets

use crate::error::{NegotiatorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Everything the decision engine needs besides the session itself
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiatorConfig {
    /// Fraction of the deadline spent anchoring on the best outcome
    pub opening_fraction: f64,
    /// Probability of proposing a random qualifying candidate instead of the top-ranked one
    pub epsilon: f64,
    pub model: ModelConfig,
    pub threshold: ThresholdConfig,
    pub search: SearchConfig,
    pub ranking: RankingConfig,
    /// Fixed RNG seed; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Preset::Hardheaded.config()
    }
}

impl NegotiatorConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("opening_fraction", self.opening_fraction)?;
        check_unit("epsilon", self.epsilon)?;
        self.model.validate()?;
        self.threshold.validate()?;
        self.search.validate()?;
        self.ranking.validate()
    }
}

/// Opponent estimator variant and its tunables
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    /// Value scores grow by `(1 - concession)^(decay_factor * count)`
    Concession { decay_factor: f64 },
    /// Value scores grow by `rate^count` with a logistic warm-up on unique outcomes
    Sigmoid { steepness: f64, midpoint: f64 },
    /// Normalised issue/value preferences with a round-decaying observation weight
    Preference {
        freq_intercept: f64,
        freq_divider: f64,
        freq_bias: f64,
        min_weight: f64,
    },
}

impl ModelConfig {
    pub fn concession() -> Self {
        ModelConfig::Concession { decay_factor: 4.0 }
    }

    pub fn sigmoid() -> Self {
        ModelConfig::Sigmoid {
            steepness: -0.02,
            midpoint: 100.0,
        }
    }

    pub fn preference() -> Self {
        ModelConfig::Preference {
            freq_intercept: 3.5,
            freq_divider: 50.0,
            freq_bias: 0.25,
            min_weight: 1.0,
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            ModelConfig::Concession { decay_factor } => {
                check_non_negative("model.decay_factor", decay_factor)
            }
            ModelConfig::Sigmoid {
                steepness,
                midpoint,
            } => {
                check_finite("model.steepness", steepness)?;
                check_finite("model.midpoint", midpoint)
            }
            ModelConfig::Preference {
                freq_intercept,
                freq_divider,
                freq_bias,
                min_weight,
            } => {
                check_finite("model.freq_intercept", freq_intercept)?;
                check_positive("model.freq_divider", freq_divider)?;
                check_positive("model.freq_bias", freq_bias)?;
                check_positive("model.min_weight", min_weight)
            }
        }
    }
}

/// Shape of the acceptance threshold curve
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdConfig {
    /// `max - (max - min) * t^(1 / concession_rate)`
    Boulware { concession_rate: f64 },
    /// Linear to `min_negotiable` at `soften_point`, then linear to `hard_floor` at the deadline.
    /// With `greed`, never below the strongest opponent's predicted threshold times `greed`.
    Piecewise {
        soften_point: f64,
        min_negotiable: f64,
        hard_floor: f64,
        greed: Option<f64>,
    },
}

impl ThresholdConfig {
    pub fn boulware() -> Self {
        ThresholdConfig::Boulware {
            concession_rate: 0.3,
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            ThresholdConfig::Boulware { concession_rate } => {
                check_positive("threshold.concession_rate", concession_rate)
            }
            ThresholdConfig::Piecewise {
                soften_point,
                min_negotiable,
                hard_floor,
                greed,
            } => {
                check_unit("threshold.soften_point", soften_point)?;
                check_unit("threshold.min_negotiable", min_negotiable)?;
                check_unit("threshold.hard_floor", hard_floor)?;
                if soften_point <= 0.0 {
                    return Err(NegotiatorError::InvalidConfig(
                        "threshold.soften_point must be above 0".to_string(),
                    ));
                }
                if hard_floor > min_negotiable {
                    return Err(NegotiatorError::InvalidConfig(format!(
                        "threshold.hard_floor {} exceeds min_negotiable {}",
                        hard_floor, min_negotiable
                    )));
                }
                if let Some(greed) = greed {
                    check_positive("threshold.greed", greed)?;
                }
                Ok(())
            }
        }
    }
}

/// Limits of one candidate search
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Stop once this many qualifying outcomes are held
    pub target_count: usize,
    /// Maximum number of random draws
    pub max_samples: usize,
    /// Stop after this many consecutive draws without a new qualifying outcome
    pub stall_samples: usize,
    /// Wall-clock cap on the whole search
    pub time_budget_ms: Option<u64>,
    /// Wall-clock cap since the last new qualifying outcome
    pub idle_budget_ms: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target_count: 30,
            max_samples: 10_000,
            stall_samples: 1_000,
            time_budget_ms: None,
            idle_budget_ms: None,
        }
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<()> {
        if self.target_count == 0 {
            return Err(NegotiatorError::InvalidConfig(
                "search.target_count must be at least 1".to_string(),
            ));
        }
        if self.max_samples == 0 {
            return Err(NegotiatorError::InvalidConfig(
                "search.max_samples must be at least 1".to_string(),
            ));
        }
        if self.stall_samples == 0 {
            return Err(NegotiatorError::InvalidConfig(
                "search.stall_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// How retained candidates are ranked
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RankingConfig {
    /// `selfishness(t) * own + confidence(rounds) * opponents`
    Blend {
        selfish_start: f64,
        selfish_end: f64,
        /// Logistic confidence in the opponent model; constant 1 when absent
        confidence: Option<ConfidenceCurve>,
    },
    /// Prefer outcomes just above every party's (predicted) threshold
    Proximity {
        curve: f64,
        accepted_weight: f64,
        rejected_weight: f64,
    },
}

impl RankingConfig {
    /// Rank purely by estimated opponent preference
    pub fn opponent_only() -> Self {
        RankingConfig::Blend {
            selfish_start: 0.0,
            selfish_end: 0.0,
            confidence: None,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            RankingConfig::Blend {
                selfish_start,
                selfish_end,
                confidence,
            } => {
                check_non_negative("ranking.selfish_start", *selfish_start)?;
                check_non_negative("ranking.selfish_end", *selfish_end)?;
                if let Some(curve) = confidence {
                    check_finite("ranking.confidence.offset", curve.offset)?;
                    check_positive("ranking.confidence.scale", curve.scale)?;
                }
                Ok(())
            }
            RankingConfig::Proximity {
                curve,
                accepted_weight,
                rejected_weight,
            } => {
                check_positive("ranking.curve", *curve)?;
                check_positive("ranking.accepted_weight", *accepted_weight)?;
                check_positive("ranking.rejected_weight", *rejected_weight)
            }
        }
    }
}

/// `1 / (1 + e^(-(rounds - offset) / scale))`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceCurve {
    pub offset: f64,
    pub scale: f64,
}

impl ConfidenceCurve {
    pub fn at(&self, rounds: u64) -> f64 {
        1.0 / (1.0 + (-(rounds as f64 - self.offset) / self.scale).exp())
    }
}

/// Discriminant used by the ensemble selector to commit to a preset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Fraction of the deadline spent observing before committing
    pub opening_fraction: f64,
    /// Mean received utility above which opponents look generous
    pub mean_cutoff: f64,
    /// Variance of received utility above which opponents look erratic
    pub variance_cutoff: f64,
}

impl SelectorConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit("selector.opening_fraction", self.opening_fraction)?;
        check_finite("selector.mean_cutoff", self.mean_cutoff)?;
        check_non_negative("selector.variance_cutoff", self.variance_cutoff)
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            opening_fraction: 0.1,
            mean_cutoff: 0.55,
            variance_cutoff: 0.015,
        }
    }
}

/// Named strategy configurations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Concession-weighted frequencies, Boulware threshold, rank by opponents
    Hardheaded,
    /// Sigmoid frequencies, opponent-aware piecewise threshold, proximity ranking
    Responsive,
    /// Issue/value preferences, piecewise threshold, selfish/opponent blend
    Cooperative,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Hardheaded, Preset::Responsive, Preset::Cooperative];

    pub fn config(self) -> NegotiatorConfig {
        match self {
            Preset::Hardheaded => NegotiatorConfig {
                opening_fraction: 0.1,
                epsilon: 0.05,
                model: ModelConfig::concession(),
                threshold: ThresholdConfig::boulware(),
                search: SearchConfig::default(),
                ranking: RankingConfig::opponent_only(),
                seed: None,
            },
            Preset::Responsive => NegotiatorConfig {
                opening_fraction: 0.1,
                epsilon: 0.0,
                model: ModelConfig::sigmoid(),
                threshold: ThresholdConfig::Piecewise {
                    soften_point: 0.95,
                    min_negotiable: 0.905,
                    hard_floor: 0.5,
                    greed: Some(1.1),
                },
                search: SearchConfig {
                    target_count: 200,
                    max_samples: 50_000,
                    stall_samples: 5_000,
                    time_budget_ms: Some(40),
                    idle_budget_ms: Some(6),
                },
                ranking: RankingConfig::Proximity {
                    curve: 10.0,
                    accepted_weight: 6.0,
                    rejected_weight: 3.0,
                },
                seed: None,
            },
            Preset::Cooperative => NegotiatorConfig {
                opening_fraction: 0.1,
                epsilon: 0.15,
                model: ModelConfig::preference(),
                threshold: ThresholdConfig::Piecewise {
                    soften_point: 0.85,
                    min_negotiable: 0.825,
                    hard_floor: 0.75,
                    greed: None,
                },
                search: SearchConfig {
                    target_count: 10,
                    max_samples: 10_000,
                    stall_samples: 1_000,
                    time_budget_ms: Some(400),
                    idle_budget_ms: None,
                },
                ranking: RankingConfig::Blend {
                    selfish_start: 3.0,
                    selfish_end: 2.5,
                    confidence: Some(ConfidenceCurve {
                        offset: 25.0,
                        scale: 17.5,
                    }),
                },
                seed: None,
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Preset::Hardheaded => "hardheaded",
            Preset::Responsive => "responsive",
            Preset::Cooperative => "cooperative",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Preset {
    type Err = NegotiatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hardheaded" => Ok(Preset::Hardheaded),
            "responsive" => Ok(Preset::Responsive),
            "cooperative" => Ok(Preset::Cooperative),
            other => Err(NegotiatorError::Configuration(format!(
                "unknown strategy preset: {}",
                other
            ))),
        }
    }
}

fn check_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(NegotiatorError::InvalidConfig(format!(
            "{} must be finite, got {}",
            name, value
        )))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    check_finite(name, value)?;
    if value < 0.0 {
        return Err(NegotiatorError::InvalidConfig(format!(
            "{} must not be negative, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    check_finite(name, value)?;
    if value <= 0.0 {
        return Err(NegotiatorError::InvalidConfig(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    check_finite(name, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(NegotiatorError::InvalidConfig(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for preset in Preset::ALL {
            assert!(preset.config().validate().is_ok(), "{} invalid", preset);
        }
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("Cooperative".parse::<Preset>().unwrap(), Preset::Cooperative);
        assert!("pokemon".parse::<Preset>().is_err());
        for preset in Preset::ALL {
            assert_eq!(preset.to_string().parse::<Preset>().unwrap(), preset);
        }
    }

    #[test]
    fn test_rejects_bad_epsilon() {
        let mut config = NegotiatorConfig::default();
        config.epsilon = 1.5;
        assert!(matches!(
            config.validate(),
            Err(NegotiatorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_rising_piecewise_floor() {
        let mut config = Preset::Cooperative.config();
        config.threshold = ThresholdConfig::Piecewise {
            soften_point: 0.85,
            min_negotiable: 0.825,
            hard_floor: 0.875,
            greed: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_search_target() {
        let mut config = NegotiatorConfig::default();
        config.search.target_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"epsilon": 0.2, "threshold": {"kind": "boulware", "concession_rate": 0.5}}"#;
        let config: NegotiatorConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.epsilon, 0.2);
        assert_eq!(
            config.threshold,
            ThresholdConfig::Boulware {
                concession_rate: 0.5
            }
        );
        assert_eq!(config.search, SearchConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_confidence_curve_midpoint() {
        let curve = ConfidenceCurve {
            offset: 25.0,
            scale: 17.5,
        };
        assert!((curve.at(25) - 0.5).abs() < 1e-12);
        assert!(curve.at(0) < curve.at(100));
    }
}
