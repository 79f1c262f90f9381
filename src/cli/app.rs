//! Bargain application wiring files, strategies and the session host

use crate::config::{NegotiatorConfig, Preset, SelectorConfig};
use crate::domain::{AdditiveUtilitySpace, Domain, UtilityProfile, UtilitySpace};
use crate::host::{Deadline, Session, SessionReport};
use crate::negotiation::{NegotiationEngine, Party, StrategySelector, ThresholdContext, ThresholdPolicy};
use crate::types::PartyId;
use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Strategy a local party plays
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyChoice {
    Preset(Preset),
    Selector,
    /// Engine built from a user-supplied configuration file
    Custom,
}

impl FromStr for StrategyChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "selector" => Ok(StrategyChoice::Selector),
            "custom" => Ok(StrategyChoice::Custom),
            other => Ok(StrategyChoice::Preset(other.parse()?)),
        }
    }
}

impl fmt::Display for StrategyChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyChoice::Preset(preset) => write!(f, "{}", preset),
            StrategyChoice::Selector => write!(f, "selector"),
            StrategyChoice::Custom => write!(f, "custom"),
        }
    }
}

/// Main bargain application: one domain and one utility space per party
pub struct BargainApp {
    domain: Domain,
    spaces: Vec<Arc<AdditiveUtilitySpace>>,
    custom: Option<NegotiatorConfig>,
}

impl BargainApp {
    /// Load a domain and the parties' utility profiles
    pub fn load(domain_path: &Path, profile_paths: &[impl AsRef<Path>]) -> Result<Self> {
        let domain: Domain = read_json(domain_path)?;
        let mut profiles = Vec::with_capacity(profile_paths.len());
        for path in profile_paths {
            profiles.push(read_json::<UtilityProfile>(path.as_ref())?);
        }
        Self::new(domain, profiles)
    }

    pub fn new(domain: Domain, profiles: Vec<UtilityProfile>) -> Result<Self> {
        let spaces = profiles
            .into_iter()
            .map(|profile| {
                let name = profile.name.clone();
                AdditiveUtilitySpace::new(domain.clone(), profile)
                    .map(Arc::new)
                    .with_context(|| format!("invalid utility profile {}", name))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            "Loaded domain {} ({} issues, {} outcomes) with {} profiles",
            domain.name(),
            domain.issue_count(),
            domain.outcome_count(),
            spaces.len()
        );

        Ok(Self {
            domain,
            spaces,
            custom: None,
        })
    }

    /// Configuration for parties playing `custom`
    pub fn with_custom_config(mut self, config: NegotiatorConfig) -> Self {
        self.custom = Some(config);
        self
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn party_count(&self) -> usize {
        self.spaces.len()
    }

    /// Party identifier derived from turn position and profile name
    pub fn party_id(&self, index: usize) -> PartyId {
        let name = self
            .spaces
            .get(index)
            .map(|space| space.name().to_string())
            .unwrap_or_default();
        PartyId::new(format!("p{}-{}", index + 1, name))
    }

    fn build_party(&self, index: usize, choice: StrategyChoice, seed: Option<u64>) -> Result<Box<dyn Party>> {
        let id = self.party_id(index);
        let seed = seed.map(|seed| seed.wrapping_add(index as u64 * 1_000));

        let party: Box<dyn Party> = match choice {
            StrategyChoice::Preset(preset) => {
                let mut config = preset.config();
                config.seed = seed;
                Box::new(NegotiationEngine::new(id, config)?.with_label(preset.to_string()))
            }
            StrategyChoice::Custom => {
                let mut config = self
                    .custom
                    .clone()
                    .ok_or_else(|| anyhow!("strategy custom needs --config"))?;
                if seed.is_some() {
                    config.seed = seed;
                }
                Box::new(NegotiationEngine::new(id, config)?.with_label("custom"))
            }
            StrategyChoice::Selector => {
                Box::new(StrategySelector::new(id, SelectorConfig::default(), seed)?)
            }
        };
        Ok(party)
    }

    /// Run one session; parties without a strategy play hardheaded
    pub async fn simulate(
        &self,
        strategies: &[StrategyChoice],
        deadline: Deadline,
        seed: Option<u64>,
    ) -> Result<SessionReport> {
        if strategies.len() > self.spaces.len() {
            bail!(
                "{} strategies given for {} profiles",
                strategies.len(),
                self.spaces.len()
            );
        }

        let mut builder = Session::builder(deadline);
        for (index, space) in self.spaces.iter().enumerate() {
            let choice = strategies
                .get(index)
                .copied()
                .unwrap_or(StrategyChoice::Preset(Preset::Hardheaded));
            tracing::info!("{} plays {}", self.party_id(index), choice);
            let space: Arc<dyn UtilitySpace> = space.clone();
            builder = builder.boxed_party(self.build_party(index, choice, seed)?, space);
        }

        let report = builder.build()?.run().await?;
        Ok(report)
    }
}

/// Threshold samples of a configuration from t=0 to t=1
pub fn threshold_curve(config: &NegotiatorConfig, steps: usize, ctx: &ThresholdContext) -> Vec<(f64, f64)> {
    ThresholdPolicy::new(config.threshold.clone()).curve(steps, ctx)
}

/// Every preset configuration keyed by name
pub fn presets_json() -> Result<String> {
    let presets: serde_json::Map<String, serde_json::Value> = Preset::ALL
        .iter()
        .map(|preset| -> Result<(String, serde_json::Value)> {
            Ok((preset.to_string(), serde_json::to_value(preset.config())?))
        })
        .collect::<Result<_>>()?;
    Ok(serde_json::to_string_pretty(&presets)?)
}

/// Human-readable summary of a finished session
pub fn render_report(report: &SessionReport) -> String {
    let mut lines = vec![format!(
        "{}: {} after {} rounds ({} turns)",
        report.domain, report.termination, report.rounds, report.turns
    )];
    if let Some(agreement) = &report.agreement {
        lines.push(format!("agreement: {}", agreement));
    }
    for party in &report.parties {
        lines.push(format!(
            "  {:<20} {:<24} utility {:.4}  offers {:>4}  received mean {:.4} sd {:.4}",
            party.id.to_string(),
            party.strategy,
            party.utility,
            party.offers_made,
            party.offers_received.mean,
            party.offers_received.std_dev()
        ));
    }
    lines.join("\n")
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::space::tests::{profile, small_domain};
    use tokio_test::assert_ok;

    fn app() -> BargainApp {
        BargainApp::new(
            small_domain(),
            vec![
                profile(
                    "buyer",
                    &[
                        (1, 0.6, &[("low", 1.0), ("high", 0.0)]),
                        (2, 0.4, &[("red", 1.0), ("blue", 0.25)]),
                    ],
                ),
                profile(
                    "seller",
                    &[
                        (1, 0.7, &[("low", 0.0), ("high", 1.0)]),
                        (2, 0.3, &[("red", 0.2), ("blue", 1.0)]),
                    ],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("Selector".parse::<StrategyChoice>().unwrap(), StrategyChoice::Selector);
        assert_eq!(
            "responsive".parse::<StrategyChoice>().unwrap(),
            StrategyChoice::Preset(Preset::Responsive)
        );
        assert!("boulder".parse::<StrategyChoice>().is_err());
    }

    #[test]
    fn test_party_ids_follow_profiles() {
        let app = app();
        assert_eq!(app.party_count(), 2);
        assert_eq!(app.party_id(1), PartyId::new("p2-seller"));
    }

    #[tokio::test]
    async fn test_simulate_fills_missing_strategies() {
        let app = app();
        let report = app
            .simulate(&[StrategyChoice::Selector], Deadline::Rounds(30), Some(9))
            .await;
        assert_ok!(&report);
        let report = report.unwrap();

        assert_eq!(report.parties[1].strategy, "hardheaded");
        assert!(render_report(&report).contains("p1-buyer"));
    }

    #[tokio::test]
    async fn test_custom_strategy_needs_config() {
        let app = app();
        let result = app
            .simulate(&[StrategyChoice::Custom], Deadline::Rounds(5), None)
            .await;
        assert!(result.is_err());

        let app = app.with_custom_config(Preset::Responsive.config());
        assert_ok!(
            app.simulate(&[StrategyChoice::Custom], Deadline::Rounds(5), Some(1))
                .await
        );
    }

    #[test]
    fn test_too_many_strategies() {
        let app = app();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(app.simulate(
            &[StrategyChoice::Selector; 3],
            Deadline::Rounds(5),
            None,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_party_files() {
        let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/party");
        let app = BargainApp::load(
            &data.join("domain.json"),
            &[data.join("host.json"), data.join("budget.json"), data.join("guests.json")],
        )
        .unwrap();
        assert_eq!(app.domain().name(), "party");
        assert_eq!(app.domain().outcome_count(), 144);
        assert_eq!(app.party_id(2), PartyId::new("p3-guests"));

        assert!(BargainApp::load(&data.join("missing.json"), &[data.join("host.json")]).is_err());
    }

    #[test]
    fn test_presets_json_lists_every_preset() {
        let json = presets_json().unwrap();
        let parsed: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&json).unwrap();
        for preset in Preset::ALL {
            let config: NegotiatorConfig =
                serde_json::from_value(parsed[&preset.to_string()].clone()).unwrap();
            assert_eq!(config, preset.config());
        }
    }

    #[test]
    fn test_threshold_curve_endpoints() {
        let curve = threshold_curve(
            &Preset::Hardheaded.config(),
            10,
            &ThresholdContext::new(0.2, 1.0),
        );
        assert_eq!(curve.len(), 11);
        assert_eq!(curve[0], (0.0, 1.0));
        assert!((curve[10].1 - 0.2).abs() < 1e-9);
    }
}
