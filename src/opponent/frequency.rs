//! Per-issue, per-value accumulated weights

use crate::domain::Domain;
use crate::types::{IssueId, Outcome, Value};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug, Default)]
struct Cell {
    weight: f64,
    count: u32,
}

/// Weighted occurrence counts of the values one opponent has proposed.
///
/// Weights never shrink. Values that were never proposed report the table's
/// base weight instead of failing the lookup.
#[derive(Clone, Debug)]
pub struct FrequencyTable {
    cells: BTreeMap<IssueId, HashMap<Value, Cell>>,
    base: f64,
}

impl FrequencyTable {
    pub fn new(base: f64) -> Self {
        Self {
            cells: BTreeMap::new(),
            base: base.max(0.0),
        }
    }

    /// Table pre-populated with every value of the domain at the base weight
    pub fn for_domain(domain: &Domain, base: f64) -> Self {
        let mut table = Self::new(base);
        for issue in domain.issues() {
            let cells = table.cells.entry(issue.id).or_default();
            for value in &issue.values {
                cells.insert(
                    value.clone(),
                    Cell {
                        weight: table.base,
                        count: 0,
                    },
                );
            }
        }
        table
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn weight(&self, issue: IssueId, value: &Value) -> f64 {
        self.cells
            .get(&issue)
            .and_then(|values| values.get(value))
            .map(|cell| cell.weight)
            .unwrap_or(self.base)
    }

    /// How many times this value has been recorded
    pub fn count(&self, issue: IssueId, value: &Value) -> u32 {
        self.cells
            .get(&issue)
            .and_then(|values| values.get(value))
            .map(|cell| cell.count)
            .unwrap_or(0)
    }

    /// Add a non-negative amount to a value's weight and bump its count,
    /// returning the new weight.
    pub fn record(&mut self, issue: IssueId, value: &Value, amount: f64) -> f64 {
        let base = self.base;
        let cell = self
            .cells
            .entry(issue)
            .or_default()
            .entry(value.clone())
            .or_insert_with(|| Cell {
                weight: base,
                count: 0,
            });
        if amount.is_finite() && amount > 0.0 {
            cell.weight += amount;
        }
        cell.count += 1;
        cell.weight
    }

    pub fn issues(&self) -> impl Iterator<Item = IssueId> + '_ {
        self.cells.keys().copied()
    }

    /// Known values of an issue with their weights
    pub fn values(&self, issue: IssueId) -> impl Iterator<Item = (&Value, f64)> + '_ {
        self.cells
            .get(&issue)
            .into_iter()
            .flat_map(|values| values.iter().map(|(value, cell)| (value, cell.weight)))
    }

    /// Sum of the weights of every known value of an issue
    pub fn issue_total(&self, issue: IssueId) -> f64 {
        self.cells
            .get(&issue)
            .map(|values| values.values().map(|cell| cell.weight).sum())
            .unwrap_or(0.0)
    }

    /// Highest-weighted value of an issue; ties resolve to the smallest value
    pub fn best_value(&self, issue: IssueId) -> Option<(&Value, f64)> {
        self.cells.get(&issue)?.iter().fold(None, |best, (value, cell)| {
            match best {
                Some((best_value, best_weight))
                    if best_weight > cell.weight
                        || (best_weight == cell.weight && best_value < value) =>
                {
                    Some((best_value, best_weight))
                }
                _ => Some((value, cell.weight)),
            }
        })
    }

    /// Sum of the weights of an outcome's values
    pub fn outcome_total(&self, outcome: &Outcome) -> f64 {
        outcome
            .iter()
            .map(|(issue, value)| self.weight(issue, value))
            .sum()
    }

    /// Outcome assembling the best value of every issue
    pub fn best_outcome(&self) -> Outcome {
        self.cells
            .keys()
            .filter_map(|issue| {
                self.best_value(*issue)
                    .map(|(value, _)| (*issue, value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::space::tests::small_domain;

    #[test]
    fn test_unseen_values_use_base() {
        let table = FrequencyTable::new(1.0);
        assert_eq!(table.weight(IssueId(1), &Value::new("low")), 1.0);
        assert_eq!(table.count(IssueId(1), &Value::new("low")), 0);

        let table = FrequencyTable::new(0.0);
        assert_eq!(table.weight(IssueId(9), &Value::new("x")), 0.0);
    }

    #[test]
    fn test_record_accumulates() {
        let mut table = FrequencyTable::new(0.0);
        let low = Value::new("low");

        assert_eq!(table.record(IssueId(1), &low, 1.0), 1.0);
        assert_eq!(table.record(IssueId(1), &low, 0.5), 1.5);
        assert_eq!(table.count(IssueId(1), &low), 2);
    }

    #[test]
    fn test_record_ignores_negative_amounts() {
        let mut table = FrequencyTable::new(0.0);
        let low = Value::new("low");

        table.record(IssueId(1), &low, 2.0);
        assert_eq!(table.record(IssueId(1), &low, -5.0), 2.0);
        assert_eq!(table.record(IssueId(1), &low, f64::NAN), 2.0);
    }

    #[test]
    fn test_best_value_and_outcome() {
        let mut table = FrequencyTable::for_domain(&small_domain(), 1.0);
        table.record(IssueId(1), &Value::new("high"), 2.0);
        table.record(IssueId(2), &Value::new("blue"), 0.5);

        assert_eq!(
            table.best_value(IssueId(1)),
            Some((&Value::new("high"), 3.0))
        );

        let best = table.best_outcome();
        assert_eq!(best.get(IssueId(1)), Some(&Value::new("high")));
        assert_eq!(best.get(IssueId(2)), Some(&Value::new("blue")));
        assert_eq!(table.outcome_total(&best), 4.5);
        assert_eq!(table.issue_total(IssueId(1)), 4.0);
    }

    #[test]
    fn test_best_value_ties_are_deterministic() {
        let table = FrequencyTable::for_domain(&small_domain(), 1.0);
        assert_eq!(
            table.best_value(IssueId(2)).map(|(value, _)| value.clone()),
            Some(Value::new("blue"))
        );
    }
}
