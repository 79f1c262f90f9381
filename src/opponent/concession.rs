//! Concession-weighted frequency estimator

use super::frequency::FrequencyTable;
use crate::types::Outcome;

/// Scores values by how often, and how stubbornly, an opponent proposes them.
///
/// Each proposal adds `(1 - c)^(decay_factor * n)` to every proposed value,
/// where `n` is how often that value was seen before and `c` is the
/// opponent's concession measured in our own utility since its first offer.
#[derive(Clone, Debug)]
pub struct ConcessionModel {
    table: FrequencyTable,
    decay_factor: f64,
    first_utility: Option<f64>,
    observations: u64,
    issue_count: usize,
}

impl ConcessionModel {
    pub fn new(decay_factor: f64, issue_count: usize) -> Self {
        Self {
            table: FrequencyTable::new(0.0),
            decay_factor,
            first_utility: None,
            observations: 0,
            issue_count,
        }
    }

    /// Concession implied by an offer worth `utility` to us, in [0, 1]
    pub fn concession(&self, utility: f64) -> f64 {
        match self.first_utility {
            Some(first) if first < 1.0 => ((utility - first) / (1.0 - first)).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn observe(&mut self, outcome: &Outcome, self_utility: f64) {
        self.first_utility.get_or_insert(self_utility);
        let concession = self.concession(self_utility);

        for (issue, value) in outcome.iter() {
            let seen = self.table.count(issue, value) as f64;
            let increment = (1.0 - concession).powf(self.decay_factor * seen);
            self.table.record(issue, value, increment);
        }
        self.observations += 1;
    }

    /// Unnormalised score, comparable only within this model
    pub fn estimated_score(&self, outcome: &Outcome) -> f64 {
        self.table.outcome_total(outcome)
    }

    /// Score divided by observed offers and issue count, in [0, 1]
    pub fn normalized_score(&self, outcome: &Outcome) -> f64 {
        if self.observations == 0 || self.issue_count == 0 {
            return 0.0;
        }
        let denominator = self.observations as f64 * self.issue_count as f64;
        (self.estimated_score(outcome) / denominator).clamp(0.0, 1.0)
    }

    pub fn first_utility(&self) -> Option<f64> {
        self.first_utility
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }
}
