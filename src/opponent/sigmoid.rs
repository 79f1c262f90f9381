//! Frequency estimator with a logistic learning rate

use super::frequency::FrequencyTable;
use crate::domain::Domain;
use crate::types::Outcome;
use std::collections::HashSet;

/// Accumulated-frequency estimator.
///
/// Every value starts at weight 1. Each occurrence adds `rate^n` to the
/// value, `n` being the value's occurrence count, and
/// `rate = 1 / (1 + e^(-steepness * (unique - midpoint)))` with `unique` the
/// number of distinct outcomes proposed so far.
#[derive(Clone, Debug)]
pub struct SigmoidModel {
    table: FrequencyTable,
    steepness: f64,
    midpoint: f64,
    seen: HashSet<Outcome>,
    observations: u64,
}

impl SigmoidModel {
    pub fn new(domain: &Domain, steepness: f64, midpoint: f64) -> Self {
        Self {
            table: FrequencyTable::for_domain(domain, 1.0),
            steepness,
            midpoint,
            seen: HashSet::new(),
            observations: 0,
        }
    }

    /// Current learning rate, in (0, 1)
    pub fn learning_rate(&self) -> f64 {
        let unique = self.seen.len() as f64;
        1.0 / (1.0 + (-self.steepness * (unique - self.midpoint)).exp())
    }

    pub fn observe(&mut self, outcome: &Outcome) {
        self.observations += 1;
        if !self.seen.contains(outcome) {
            self.seen.insert(outcome.clone());
        }
        let rate = self.learning_rate();

        for (issue, value) in outcome.iter() {
            let occurrences = self.table.count(issue, value) + 1;
            self.table
                .record(issue, value, rate.powi(occurrences as i32));
        }
    }

    /// The outcome this opponent appears to like best
    pub fn predicted_best(&self) -> Outcome {
        self.table.best_outcome()
    }

    /// Ratio of this outcome's weights to those of the predicted best, in [0, 1]
    pub fn estimated_score(&self, outcome: &Outcome) -> f64 {
        let best = self.table.outcome_total(&self.predicted_best());
        if best <= 0.0 {
            return 0.0;
        }
        (self.table.outcome_total(outcome) / best).clamp(0.0, 1.0)
    }

    pub fn unique_outcomes(&self) -> usize {
        self.seen.len()
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }
}
