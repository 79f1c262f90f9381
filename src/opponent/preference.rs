//! Normalised issue and value preference estimator

use super::frequency::FrequencyTable;
use crate::domain::Domain;
use crate::types::{IssueId, Outcome, Value};
use std::collections::{BTreeMap, HashMap};

/// Estimates an opponent's value preferences per issue and the relative
/// importance of each issue.
///
/// A value's preference is its share of the issue's accumulated weight. An
/// issue's importance is its top value weight divided by the sum of every
/// issue's top value weight, so issues with sharply differentiated proposals
/// count as more important.
#[derive(Clone, Debug)]
pub struct PreferenceModel {
    table: FrequencyTable,
    value_prefs: BTreeMap<IssueId, HashMap<Value, f64>>,
    issue_prefs: BTreeMap<IssueId, f64>,
    observations: u64,
}

impl PreferenceModel {
    pub fn new(domain: &Domain) -> Self {
        Self {
            table: FrequencyTable::for_domain(domain, 0.0),
            value_prefs: BTreeMap::new(),
            issue_prefs: BTreeMap::new(),
            observations: 0,
        }
    }

    /// Add `weight` to every value the outcome takes
    pub fn update_frequencies(&mut self, outcome: &Outcome, weight: f64) {
        for (issue, value) in outcome.iter() {
            self.table.record(issue, value, weight);
        }
        self.observations += 1;
    }

    /// Recompute value and issue preferences from the accumulated weights
    pub fn update_preferences(&mut self) {
        let issues: Vec<IssueId> = self.table.issues().collect();
        let max_weights: BTreeMap<IssueId, f64> = issues
            .iter()
            .map(|issue| {
                let max = self
                    .table
                    .best_value(*issue)
                    .map(|(_, weight)| weight)
                    .unwrap_or(0.0);
                (*issue, max)
            })
            .collect();
        let max_total: f64 = max_weights.values().sum();

        self.value_prefs.clear();
        self.issue_prefs.clear();
        for issue in issues {
            let total = self.table.issue_total(issue);
            let prefs = self
                .table
                .values(issue)
                .map(|(value, weight)| {
                    let pref = if total > 0.0 { weight / total } else { 0.0 };
                    (value.clone(), pref)
                })
                .collect();
            self.value_prefs.insert(issue, prefs);

            let importance = if max_total > 0.0 {
                max_weights.get(&issue).copied().unwrap_or(0.0) / max_total
            } else {
                0.0
            };
            self.issue_prefs.insert(issue, importance);
        }
    }

    pub fn observe(&mut self, outcome: &Outcome, weight: f64) {
        self.update_frequencies(outcome, weight);
        self.update_preferences();
    }

    pub fn value_preference(&self, issue: IssueId, value: &Value) -> f64 {
        self.value_prefs
            .get(&issue)
            .and_then(|prefs| prefs.get(value))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn issue_preference(&self, issue: IssueId) -> f64 {
        self.issue_prefs.get(&issue).copied().unwrap_or(0.0)
    }

    /// Sum over issues of importance times value preference, in [0, 1]
    pub fn score(&self, outcome: &Outcome) -> f64 {
        outcome
            .iter()
            .map(|(issue, value)| self.issue_preference(issue) * self.value_preference(issue, value))
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }
}

/// Round-decaying observation weight: early proposals count for more
pub fn observation_weight(
    rounds: u64,
    intercept: f64,
    divider: f64,
    bias: f64,
    min_weight: f64,
) -> f64 {
    (intercept - (rounds as f64 / divider + bias).ln()).max(min_weight)
}
