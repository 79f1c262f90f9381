//! Core types used throughout bargain

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a negotiating party
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyId(pub String);

impl PartyId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a negotiable issue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueId(pub u32);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A discrete value from an issue's domain
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Value(pub String);

impl Value {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A complete assignment of one value to every issue (a bid).
///
/// Outcomes are immutable; [`Outcome::with_value`] builds a copy with a
/// single issue changed. Equality and hashing cover the full mapping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outcome(BTreeMap<IssueId, Value>);

impl Outcome {
    pub fn new(values: BTreeMap<IssueId, Value>) -> Self {
        Self(values)
    }

    /// Value assigned to an issue, if the issue is part of this outcome
    pub fn get(&self, issue: IssueId) -> Option<&Value> {
        self.0.get(&issue)
    }

    /// Copy of this outcome with one issue set to `value`
    pub fn with_value(&self, issue: IssueId, value: Value) -> Self {
        let mut values = self.0.clone();
        values.insert(issue, value);
        Self(values)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IssueId, &Value)> {
        self.0.iter().map(|(issue, value)| (*issue, value))
    }

    pub fn issue_count(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(IssueId, Value)> for Outcome {
    fn from_iter<I: IntoIterator<Item = (IssueId, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (issue, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", issue, value)?;
        }
        write!(f, "}}")
    }
}

/// Action a party can take on its turn
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Put a new outcome on the table
    Offer(Outcome),
    /// Accept the outcome currently on the table
    Accept(Outcome),
    /// Walk away without agreement
    EndNegotiation,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Offer(_) => ActionKind::Offer,
            Action::Accept(_) => ActionKind::Accept,
            Action::EndNegotiation => ActionKind::EndNegotiation,
        }
    }

    /// Outcome carried by this action, if any
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Action::Offer(outcome) | Action::Accept(outcome) => Some(outcome),
            Action::EndNegotiation => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Offer(outcome) => write!(f, "Offer{}", outcome),
            Action::Accept(outcome) => write!(f, "Accept{}", outcome),
            Action::EndNegotiation => write!(f, "EndNegotiation"),
        }
    }
}

/// Kinds of action the host may allow on a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Offer,
    Accept,
    EndNegotiation,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Offer => "Offer",
            ActionKind::Accept => "Accept",
            ActionKind::EndNegotiation => "EndNegotiation",
        };
        write!(f, "{}", name)
    }
}

/// Count, mean and population variance of a series of utilities
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilityStats {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
}

impl UtilityStats {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        let variance = samples.iter().map(|u| (u - mean).powi(2)).sum::<f64>() / count as f64;
        Self {
            count,
            mean,
            variance,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}
