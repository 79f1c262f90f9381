//! Registry of per-opponent models

use super::history::ActionHistory;
use super::model::{Observation, OpponentModel};
use crate::config::ModelConfig;
use crate::domain::Domain;
use crate::types::{Action, Outcome, PartyId};
use std::collections::HashMap;

/// Steepness of the history predictor's learning rate
const PREDICTOR_STEEPNESS: f64 = -0.02;

/// Midpoint of the history predictor's learning rate
const PREDICTOR_MIDPOINT: f64 = 100.0;

/// Everything known about one opponent
#[derive(Clone, Debug)]
pub struct OpponentRecord {
    pub id: PartyId,
    pub model: OpponentModel,
    pub history: ActionHistory,
}

impl OpponentRecord {
    fn new(id: PartyId, config: &ModelConfig, domain: &Domain) -> Self {
        Self {
            id,
            model: OpponentModel::from_config(config, domain),
            history: ActionHistory::new(domain, PREDICTOR_STEEPNESS, PREDICTOR_MIDPOINT),
        }
    }

    /// Whether the model has seen at least one offer
    pub fn is_informed(&self) -> bool {
        self.model.observations() > 0
    }
}

/// Opponent identifier to owned model, created on first contact
#[derive(Clone, Debug)]
pub struct OpponentRegistry {
    opponents: HashMap<PartyId, OpponentRecord>,
    config: ModelConfig,
    domain: Domain,
}

impl OpponentRegistry {
    pub fn new(config: ModelConfig, domain: Domain) -> Self {
        Self {
            opponents: HashMap::new(),
            config,
            domain,
        }
    }

    /// Record for `party`, creating an empty one for a previously unseen opponent
    pub fn register(&mut self, party: &PartyId) -> &mut OpponentRecord {
        let model = self.model_name();
        let config = &self.config;
        let domain = &self.domain;
        self.opponents.entry(party.clone()).or_insert_with(|| {
            tracing::debug!("Registering opponent {} with {} model", party, model);
            OpponentRecord::new(party.clone(), config, domain)
        })
    }

    /// Feed an offer from `party` into its model and history
    pub fn observe_offer(
        &mut self,
        party: &PartyId,
        outcome: &Outcome,
        self_utility: f64,
        weight: f64,
        time: f64,
    ) {
        let record = self.register(party);
        record.model.observe(&Observation {
            outcome,
            self_utility,
            weight,
        });
        record
            .history
            .record(&Action::Offer(outcome.clone()), self_utility, time);
    }

    /// Record a non-offer action from `party`
    pub fn observe_action(&mut self, party: &PartyId, action: &Action, self_utility: f64, time: f64) {
        let record = self.register(party);
        if !matches!(action, Action::Offer(_)) {
            record.history.record(action, self_utility, time);
        }
    }

    pub fn get(&self, party: &PartyId) -> Option<&OpponentRecord> {
        self.opponents.get(party)
    }

    pub fn contains(&self, party: &PartyId) -> bool {
        self.opponents.contains_key(party)
    }

    pub fn len(&self) -> usize {
        self.opponents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opponents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpponentRecord> {
        self.opponents.values()
    }

    /// Opponents that have made at least one offer
    pub fn informed(&self) -> impl Iterator<Item = &OpponentRecord> {
        self.opponents.values().filter(|record| record.is_informed())
    }

    pub fn has_observations(&self) -> bool {
        self.informed().next().is_some()
    }

    /// Mean over informed opponents of their normalised score for `outcome`.
    ///
    /// `None` when there is nothing to average: no informed opponent or no
    /// issues in the domain.
    pub fn aggregate_score(&self, outcome: &Outcome) -> Option<f64> {
        if self.domain.issue_count() == 0 {
            return None;
        }
        let (sum, count) = self
            .informed()
            .fold((0.0, 0usize), |(sum, count), record| {
                (sum + record.model.normalized_score(outcome), count + 1)
            });
        if count == 0 {
            return None;
        }
        Some(sum / count as f64)
    }

    /// Highest worst-recent-offer utility across opponents
    pub fn offered_floor(&self) -> Option<f64> {
        self.opponents
            .values()
            .filter_map(|record| record.history.offered_floor())
            .reduce(f64::max)
    }

    pub fn model_name(&self) -> &'static str {
        match self.config {
            ModelConfig::Concession { .. } => "concession",
            ModelConfig::Sigmoid { .. } => "sigmoid",
            ModelConfig::Preference { .. } => "preference",
        }
    }
}
