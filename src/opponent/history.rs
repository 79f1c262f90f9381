//! Per-opponent action history and predicted acceptance threshold

use super::sigmoid::SigmoidModel;
use crate::domain::Domain;
use crate::types::{Action, ActionKind, Outcome};

/// Actions considered when predicting an opponent's threshold
const THRESHOLD_WINDOW: usize = 20;

/// Lowest-valued actions averaged into the predicted threshold
const THRESHOLD_LOWEST: usize = 5;

/// Recent offers inspected for the worst utility an opponent has offered us
const FLOOR_WINDOW: usize = 5;

/// One accept or offer made by an opponent
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub kind: ActionKind,
    pub outcome: Outcome,
    /// Our own utility of the outcome
    pub self_utility: f64,
    /// Normalised time at which the action was seen
    pub time: f64,
}

/// Append-only record of one opponent's actions.
///
/// Offers also feed a private accumulated-frequency predictor used to guess
/// how much the opponent values its own proposals.
#[derive(Clone, Debug)]
pub struct ActionHistory {
    entries: Vec<HistoryEntry>,
    predictor: SigmoidModel,
}

impl ActionHistory {
    pub fn new(domain: &Domain, steepness: f64, midpoint: f64) -> Self {
        Self {
            entries: Vec::new(),
            predictor: SigmoidModel::new(domain, steepness, midpoint),
        }
    }

    /// Append an action; `EndNegotiation` carries no outcome and is skipped
    pub fn record(&mut self, action: &Action, self_utility: f64, time: f64) {
        let outcome = match action {
            Action::Offer(outcome) => {
                self.predictor.observe(outcome);
                outcome
            }
            Action::Accept(outcome) => outcome,
            Action::EndNegotiation => return,
        };
        self.entries.push(HistoryEntry {
            kind: action.kind(),
            outcome: outcome.clone(),
            self_utility,
            time,
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn offers(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == ActionKind::Offer)
    }

    /// Our utility of the opponent's first offer
    pub fn first_offer_utility(&self) -> Option<f64> {
        self.offers().next().map(|entry| entry.self_utility)
    }

    /// Our utilities of every offer received from this opponent
    pub fn received_utilities(&self) -> Vec<f64> {
        self.offers().map(|entry| entry.self_utility).collect()
    }

    /// Predicted utility of an outcome for the opponent, in [0, 1]
    pub fn predicted_utility(&self, outcome: &Outcome) -> f64 {
        self.predictor.estimated_score(outcome)
    }

    /// Average predicted opponent utility of the lowest-valued actions among
    /// the most recent ones
    pub fn predicted_threshold(&self) -> Option<f64> {
        let start = self.entries.len().saturating_sub(THRESHOLD_WINDOW);
        let mut recent: Vec<f64> = self.entries[start..]
            .iter()
            .map(|entry| self.predicted_utility(&entry.outcome))
            .collect();
        if recent.is_empty() {
            return None;
        }
        recent.sort_by(|a, b| a.total_cmp(b));
        let lowest = &recent[..recent.len().min(THRESHOLD_LOWEST)];
        Some(lowest.iter().sum::<f64>() / lowest.len() as f64)
    }

    /// Worst utility to us among the opponent's most recent offers
    pub fn offered_floor(&self) -> Option<f64> {
        self.offers()
            .rev()
            .take(FLOOR_WINDOW)
            .map(|entry| entry.self_utility)
            .reduce(f64::min)
    }
}
