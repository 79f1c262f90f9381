//! Outcome space and utility evaluation

use crate::error::{NegotiatorError, Result};
use crate::types::{IssueId, Outcome, Value};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A negotiable attribute with a finite set of discrete values
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub name: String,
    pub values: Vec<Value>,
}

impl Issue {
    pub fn new(id: u32, name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            id: IssueId(id),
            name: name.into(),
            values: values.iter().map(|v| Value::new(*v)).collect(),
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value)
    }
}

/// The set of issues under negotiation.
///
/// Every issue has at least one value, so a complete outcome always exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DomainSpec", into = "DomainSpec")]
pub struct Domain {
    name: String,
    issues: Vec<Issue>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct DomainSpec {
    name: String,
    issues: Vec<Issue>,
}

impl TryFrom<DomainSpec> for Domain {
    type Error = NegotiatorError;

    fn try_from(spec: DomainSpec) -> Result<Self> {
        Domain::new(spec.name, spec.issues)
    }
}

impl From<Domain> for DomainSpec {
    fn from(domain: Domain) -> Self {
        Self {
            name: domain.name,
            issues: domain.issues,
        }
    }
}

impl Domain {
    pub fn new(name: impl Into<String>, issues: Vec<Issue>) -> Result<Self> {
        if issues.is_empty() {
            return Err(NegotiatorError::EmptyDomain);
        }
        if let Some(issue) = issues.iter().find(|issue| issue.values.is_empty()) {
            return Err(NegotiatorError::EmptyIssue(issue.id.0));
        }
        Ok(Self {
            name: name.into(),
            issues,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn issue(&self, id: IssueId) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.id == id)
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    /// Number of distinct complete outcomes, saturating on overflow
    pub fn outcome_count(&self) -> u64 {
        self.issues
            .iter()
            .fold(1u64, |acc, issue| acc.saturating_mul(issue.values.len() as u64))
    }

    /// Draw an outcome uniformly at random
    pub fn random_outcome<R: Rng + ?Sized>(&self, rng: &mut R) -> Outcome {
        self.issues
            .iter()
            .map(|issue| {
                let index = rng.gen_range(0..issue.values.len());
                (issue.id, issue.values[index].clone())
            })
            .collect()
    }

    /// Check that an outcome assigns a known value to every issue
    pub fn validate(&self, outcome: &Outcome) -> Result<()> {
        for issue in &self.issues {
            let value = outcome
                .get(issue.id)
                .ok_or(NegotiatorError::IncompleteOutcome(issue.id.0))?;
            if !issue.contains(value) {
                return Err(NegotiatorError::UnknownValue {
                    issue: issue.id.0,
                    value: value.0.clone(),
                });
            }
        }
        for (issue, _) in outcome.iter() {
            if self.issue(issue).is_none() {
                return Err(NegotiatorError::UnknownIssue(issue.0));
            }
        }
        Ok(())
    }
}

/// Read-only access to one party's preferences over the outcome space
pub trait UtilitySpace: Send + Sync {
    fn domain(&self) -> &Domain;

    /// Utility of an outcome, in [0, 1]
    fn utility(&self, outcome: &Outcome) -> f64;

    fn max_utility_outcome(&self) -> Result<Outcome>;

    fn min_utility_outcome(&self) -> Result<Outcome>;
}

/// Per-issue weight and value evaluations of an additive profile
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssueEvaluator {
    pub issue: IssueId,
    pub weight: f64,
    pub evaluations: BTreeMap<Value, f64>,
}

/// Additive utility profile as loaded from a JSON file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UtilityProfile {
    pub name: String,
    pub issues: Vec<IssueEvaluator>,
}

/// Linear additive utility: weighted sum of normalised value evaluations
#[derive(Clone, Debug)]
pub struct AdditiveUtilitySpace {
    domain: Domain,
    name: String,
    weights: BTreeMap<IssueId, f64>,
    evaluations: BTreeMap<IssueId, BTreeMap<Value, f64>>,
}

impl AdditiveUtilitySpace {
    /// Build a utility space, normalising issue weights to sum to one and
    /// each issue's evaluations so its best value scores one.
    pub fn new(domain: Domain, profile: UtilityProfile) -> Result<Self> {
        let mut weights = BTreeMap::new();
        let mut evaluations = BTreeMap::new();

        for evaluator in profile.issues {
            let issue = domain
                .issue(evaluator.issue)
                .ok_or(NegotiatorError::UnknownIssue(evaluator.issue.0))?;
            if !evaluator.weight.is_finite() || evaluator.weight < 0.0 {
                return Err(NegotiatorError::Profile(format!(
                    "issue {} has invalid weight {}",
                    issue.id, evaluator.weight
                )));
            }
            for (value, eval) in &evaluator.evaluations {
                if !issue.contains(value) {
                    return Err(NegotiatorError::UnknownValue {
                        issue: issue.id.0,
                        value: value.0.clone(),
                    });
                }
                if !eval.is_finite() || *eval < 0.0 {
                    return Err(NegotiatorError::Profile(format!(
                        "value {} of issue {} has invalid evaluation {}",
                        value, issue.id, eval
                    )));
                }
            }

            let max_eval = evaluator
                .evaluations
                .values()
                .cloned()
                .fold(0.0_f64, f64::max);
            let normalised = evaluator
                .evaluations
                .into_iter()
                .map(|(value, eval)| {
                    let scaled = if max_eval > 0.0 { eval / max_eval } else { 0.0 };
                    (value, scaled)
                })
                .collect();

            weights.insert(issue.id, evaluator.weight);
            evaluations.insert(issue.id, normalised);
        }

        for issue in domain.issues() {
            if !weights.contains_key(&issue.id) {
                return Err(NegotiatorError::Profile(format!(
                    "profile {} has no evaluator for issue {}",
                    profile.name, issue.id
                )));
            }
        }

        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return Err(NegotiatorError::Profile(format!(
                "profile {} has zero total weight",
                profile.name
            )));
        }
        for weight in weights.values_mut() {
            *weight /= total;
        }

        Ok(Self {
            domain,
            name: profile.name,
            weights,
            evaluations,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalised weight of an issue
    pub fn weight(&self, issue: IssueId) -> f64 {
        self.weights.get(&issue).copied().unwrap_or(0.0)
    }

    /// Normalised evaluation of a value, zero when unlisted
    pub fn evaluation(&self, issue: IssueId, value: &Value) -> f64 {
        self.evaluations
            .get(&issue)
            .and_then(|values| values.get(value))
            .copied()
            .unwrap_or(0.0)
    }

    fn extreme_outcome(&self, best: bool) -> Result<Outcome> {
        self.domain
            .issues()
            .iter()
            .map(|issue| {
                let mut candidates = issue.values.iter();
                let first = candidates.next().ok_or_else(|| {
                    NegotiatorError::DegenerateSpace(format!("issue {} has no values", issue.id))
                })?;
                let chosen = candidates.fold(first, |current, value| {
                    let current_eval = self.evaluation(issue.id, current);
                    let eval = self.evaluation(issue.id, value);
                    if (best && eval > current_eval) || (!best && eval < current_eval) {
                        value
                    } else {
                        current
                    }
                });
                Ok((issue.id, chosen.clone()))
            })
            .collect()
    }
}

impl UtilitySpace for AdditiveUtilitySpace {
    fn domain(&self) -> &Domain {
        &self.domain
    }

    fn utility(&self, outcome: &Outcome) -> f64 {
        let utility: f64 = outcome
            .iter()
            .map(|(issue, value)| self.weight(issue) * self.evaluation(issue, value))
            .sum();
        utility.clamp(0.0, 1.0)
    }

    fn max_utility_outcome(&self) -> Result<Outcome> {
        self.extreme_outcome(true)
    }

    fn min_utility_outcome(&self) -> Result<Outcome> {
        self.extreme_outcome(false)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Two issues with two values each
    pub(crate) fn small_domain() -> Domain {
        Domain::new(
            "small",
            vec![
                Issue::new(1, "price", &["low", "high"]),
                Issue::new(2, "color", &["red", "blue"]),
            ],
        )
        .unwrap()
    }

    pub(crate) fn profile(name: &str, entries: &[(u32, f64, &[(&str, f64)])]) -> UtilityProfile {
        UtilityProfile {
            name: name.to_string(),
            issues: entries
                .iter()
                .map(|(issue, weight, values)| IssueEvaluator {
                    issue: IssueId(*issue),
                    weight: *weight,
                    evaluations: values
                        .iter()
                        .map(|(value, eval)| (Value::new(*value), *eval))
                        .collect(),
                })
                .collect(),
        }
    }

    /// Prefers low price and red
    pub(crate) fn buyer_space() -> AdditiveUtilitySpace {
        AdditiveUtilitySpace::new(
            small_domain(),
            profile(
                "buyer",
                &[
                    (1, 0.6, &[("low", 1.0), ("high", 0.0)]),
                    (2, 0.4, &[("red", 1.0), ("blue", 0.25)]),
                ],
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_domain_rejects_empty_issue() {
        let result = Domain::new("broken", vec![Issue::new(1, "price", &[])]);
        assert!(matches!(result, Err(NegotiatorError::EmptyIssue(1))));

        let result = Domain::new("broken", vec![]);
        assert!(matches!(result, Err(NegotiatorError::EmptyDomain)));
    }

    #[test]
    fn test_outcome_count() {
        assert_eq!(small_domain().outcome_count(), 4);
    }

    #[test]
    fn test_random_outcome_is_valid() {
        let domain = small_domain();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let outcome = domain.random_outcome(&mut rng);
            assert!(domain.validate(&outcome).is_ok());
        }
    }

    #[test]
    fn test_validate_rejects_unknown_value() {
        let domain = small_domain();
        let outcome: Outcome = [
            (IssueId(1), Value::new("free")),
            (IssueId(2), Value::new("red")),
        ]
        .into_iter()
        .collect();
        assert!(matches!(
            domain.validate(&outcome),
            Err(NegotiatorError::UnknownValue { issue: 1, .. })
        ));
    }

    #[test]
    fn test_additive_utility() {
        let space = buyer_space();
        let best = space.max_utility_outcome().unwrap();
        let worst = space.min_utility_outcome().unwrap();

        assert_eq!(best.get(IssueId(1)), Some(&Value::new("low")));
        assert_eq!(best.get(IssueId(2)), Some(&Value::new("red")));
        assert!((space.utility(&best) - 1.0).abs() < 1e-9);
        assert!((space.utility(&worst) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_weights_are_normalised() {
        let space = AdditiveUtilitySpace::new(
            small_domain(),
            profile(
                "unnormalised",
                &[
                    (1, 3.0, &[("low", 2.0), ("high", 1.0)]),
                    (2, 1.0, &[("red", 4.0)]),
                ],
            ),
        )
        .unwrap();

        assert!((space.weight(IssueId(1)) - 0.75).abs() < 1e-9);
        assert!((space.evaluation(IssueId(1), &Value::new("high")) - 0.5).abs() < 1e-9);
        assert_eq!(space.evaluation(IssueId(2), &Value::new("blue")), 0.0);
    }

    #[test]
    fn test_profile_missing_issue() {
        let result = AdditiveUtilitySpace::new(
            small_domain(),
            profile("partial", &[(1, 1.0, &[("low", 1.0)])]),
        );
        assert!(matches!(result, Err(NegotiatorError::Profile(_))));
    }

    #[test]
    fn test_domain_deserialization_validates() {
        let json = r#"{"name":"empty","issues":[{"id":1,"name":"x","values":[]}]}"#;
        assert!(serde_json::from_str::<Domain>(json).is_err());

        let json = r#"{"name":"ok","issues":[{"id":1,"name":"x","values":["a","b"]}]}"#;
        let domain: Domain = serde_json::from_str(json).unwrap();
        assert_eq!(domain.issue_count(), 1);
    }
}
