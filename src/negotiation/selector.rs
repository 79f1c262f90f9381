//! Ensemble selector: observe with every preset, then commit to one

use crate::config::{Preset, SelectorConfig};
use crate::error::Result;
use crate::types::{Action, ActionKind, Outcome, PartyId, UtilityStats};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

use super::engine::NegotiationEngine;
use super::session::SessionInfo;
use super::types::Party;

enum SelectorState {
    /// Every preset engine sees every message; none has acted yet
    Shadow(Vec<(Preset, NegotiationEngine)>),
    Committed(Preset, NegotiationEngine),
}

/// Runs one engine per preset in shadow mode during the opening, anchoring
/// on the best outcome itself, then hands the session over to the preset
/// picked from the utilities opponents have offered so far.
pub struct StrategySelector {
    id: PartyId,
    config: SelectorConfig,
    state: SelectorState,
    info: Option<SessionInfo>,
    anchor: Option<Outcome>,
    received: HashMap<PartyId, Vec<f64>>,
    rng: StdRng,
}

impl StrategySelector {
    pub fn new(id: PartyId, config: SelectorConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let mut engines = Vec::with_capacity(Preset::ALL.len());
        for (i, preset) in Preset::ALL.into_iter().enumerate() {
            let mut engine_config = preset.config();
            engine_config.seed = seed.map(|seed| seed.wrapping_add(i as u64 + 1));
            let engine = NegotiationEngine::new(id.clone(), engine_config)?
                .with_label(preset.to_string());
            engines.push((preset, engine));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            id,
            config,
            state: SelectorState::Shadow(engines),
            info: None,
            anchor: None,
            received: HashMap::new(),
            rng,
        })
    }

    /// Preset in charge, once committed
    pub fn committed(&self) -> Option<Preset> {
        match &self.state {
            SelectorState::Shadow(_) => None,
            SelectorState::Committed(preset, _) => Some(*preset),
        }
    }

    /// Per-opponent statistics of the utilities offered to us
    pub fn opponent_stats(&self) -> HashMap<PartyId, UtilityStats> {
        self.received
            .iter()
            .map(|(party, utilities)| (party.clone(), UtilityStats::from_samples(utilities)))
            .collect()
    }

    /// Pick a preset from observed opponent behaviour
    pub fn classify(&self) -> Preset {
        let stats: Vec<UtilityStats> = self
            .opponent_stats()
            .into_values()
            .filter(|stats| stats.count > 0)
            .collect();
        if stats.is_empty() {
            return Preset::Hardheaded;
        }
        let n = stats.len() as f64;
        let mean = stats.iter().map(|s| s.mean).sum::<f64>() / n;
        let variance = stats.iter().map(|s| s.variance).sum::<f64>() / n;

        if mean > self.config.mean_cutoff {
            Preset::Cooperative
        } else if variance > self.config.variance_cutoff {
            Preset::Responsive
        } else {
            Preset::Hardheaded
        }
    }

    fn commit(&mut self) {
        let preset = self.classify();
        let state = std::mem::replace(&mut self.state, SelectorState::Shadow(Vec::new()));
        self.state = match state {
            SelectorState::Shadow(engines) => {
                let mut engines = engines;
                match engines.iter().position(|(p, _)| *p == preset) {
                    Some(index) => {
                        let (preset, engine) = engines.swap_remove(index);
                        tracing::info!("{} commits to the {} strategy", self.id, preset);
                        SelectorState::Committed(preset, engine)
                    }
                    None => SelectorState::Shadow(engines),
                }
            }
            committed => committed,
        };
    }

    fn in_opening(&self) -> bool {
        self.info
            .as_ref()
            .map(|info| info.clock.time() < self.config.opening_fraction)
            .unwrap_or(true)
    }
}

impl Party for StrategySelector {
    fn id(&self) -> &PartyId {
        &self.id
    }

    fn init(&mut self, info: SessionInfo) -> Result<()> {
        if let SelectorState::Shadow(engines) = &mut self.state {
            for (_, engine) in engines.iter_mut() {
                engine.init(info.clone())?;
            }
        }
        self.anchor = match info.space.max_utility_outcome() {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!("{} has no best outcome to anchor on: {}", self.id, e);
                None
            }
        };
        self.info = Some(info);
        Ok(())
    }

    fn receive_message(&mut self, sender: &PartyId, action: &Action) {
        if sender != &self.id {
            if let (Action::Offer(outcome), Some(info)) = (action, self.info.as_ref()) {
                let utility = info.space.utility(outcome);
                self.received.entry(sender.clone()).or_default().push(utility);
            }
        }

        match &mut self.state {
            SelectorState::Shadow(engines) => {
                for (_, engine) in engines.iter_mut() {
                    engine.receive_message(sender, action);
                }
            }
            SelectorState::Committed(_, engine) => engine.receive_message(sender, action),
        }
    }

    fn choose_action(&mut self, allowed: &[ActionKind]) -> Action {
        if matches!(self.state, SelectorState::Shadow(_)) && !self.in_opening() {
            self.commit();
        }

        match &mut self.state {
            SelectorState::Committed(_, engine) => engine.choose_action(allowed),
            SelectorState::Shadow(_) => {
                let Some(info) = self.info.as_ref() else {
                    return Action::EndNegotiation;
                };
                if !allowed.is_empty() && !allowed.contains(&ActionKind::Offer) {
                    return Action::EndNegotiation;
                }
                let anchor = match &self.anchor {
                    Some(outcome) => outcome.clone(),
                    None => info.space.domain().random_outcome(&mut self.rng),
                };
                Action::Offer(anchor)
            }
        }
    }

    fn description(&self) -> String {
        match &self.state {
            SelectorState::Shadow(_) => "selector".to_string(),
            SelectorState::Committed(preset, _) => format!("selector({})", preset),
        }
    }
}
