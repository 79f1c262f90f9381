//! One opponent-model capability over three estimators

use super::concession::ConcessionModel;
use super::frequency::FrequencyTable;
use super::preference::{observation_weight, PreferenceModel};
use super::sigmoid::SigmoidModel;
use crate::config::ModelConfig;
use crate::domain::Domain;
use crate::types::Outcome;

/// An offer as seen by an opponent model
#[derive(Clone, Copy, Debug)]
pub struct Observation<'a> {
    pub outcome: &'a Outcome,
    /// Our own utility of the offered outcome
    pub self_utility: f64,
    /// Importance of this offer, used by estimators that weight observations
    pub weight: f64,
}

/// Online estimate of one opponent's preferences, selected at session start
#[derive(Clone, Debug)]
pub enum OpponentModel {
    Concession(ConcessionModel),
    Sigmoid(SigmoidModel),
    Preference(PreferenceModel),
}

impl OpponentModel {
    pub fn from_config(config: &ModelConfig, domain: &Domain) -> Self {
        match *config {
            ModelConfig::Concession { decay_factor } => {
                OpponentModel::Concession(ConcessionModel::new(decay_factor, domain.issue_count()))
            }
            ModelConfig::Sigmoid {
                steepness,
                midpoint,
            } => OpponentModel::Sigmoid(SigmoidModel::new(domain, steepness, midpoint)),
            ModelConfig::Preference { .. } => OpponentModel::Preference(PreferenceModel::new(domain)),
        }
    }

    pub fn observe(&mut self, observation: &Observation<'_>) {
        match self {
            OpponentModel::Concession(model) => {
                model.observe(observation.outcome, observation.self_utility)
            }
            OpponentModel::Sigmoid(model) => model.observe(observation.outcome),
            OpponentModel::Preference(model) => {
                model.observe(observation.outcome, observation.weight)
            }
        }
    }

    /// Relative preference of the opponent for an outcome; comparable only
    /// against other scores from this same model
    pub fn estimated_score(&self, outcome: &Outcome) -> f64 {
        match self {
            OpponentModel::Concession(model) => model.estimated_score(outcome),
            OpponentModel::Sigmoid(model) => model.estimated_score(outcome),
            OpponentModel::Preference(model) => model.score(outcome),
        }
    }

    /// Score in [0, 1], comparable across opponents
    pub fn normalized_score(&self, outcome: &Outcome) -> f64 {
        match self {
            OpponentModel::Concession(model) => model.normalized_score(outcome),
            OpponentModel::Sigmoid(model) => model.estimated_score(outcome),
            OpponentModel::Preference(model) => model.score(outcome),
        }
    }

    pub fn observations(&self) -> u64 {
        match self {
            OpponentModel::Concession(model) => model.observations(),
            OpponentModel::Sigmoid(model) => model.observations(),
            OpponentModel::Preference(model) => model.observations(),
        }
    }

    pub fn table(&self) -> &FrequencyTable {
        match self {
            OpponentModel::Concession(model) => model.table(),
            OpponentModel::Sigmoid(model) => model.table(),
            OpponentModel::Preference(model) => model.table(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OpponentModel::Concession(_) => "concession",
            OpponentModel::Sigmoid(_) => "sigmoid",
            OpponentModel::Preference(_) => "preference",
        }
    }
}

/// Weight given to an offer received after `rounds` of our own turns
pub fn offer_weight(config: &ModelConfig, rounds: u64) -> f64 {
    match *config {
        ModelConfig::Preference {
            freq_intercept,
            freq_divider,
            freq_bias,
            min_weight,
        } => observation_weight(rounds, freq_intercept, freq_divider, freq_bias, min_weight),
        _ => 1.0,
    }
}
