//! Session report

use crate::error::Result;
use crate::types::{Action, Outcome, PartyId, UtilityStats};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a session ended
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Every other party accepted the outcome on the table
    Agreement,
    /// The deadline passed without agreement
    Deadline,
    /// A party walked away
    Ended { by: PartyId },
    /// A party took an action the protocol does not allow
    ProtocolViolation { party: PartyId, reason: String },
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Agreement => write!(f, "agreement"),
            Termination::Deadline => write!(f, "deadline"),
            Termination::Ended { by } => write!(f, "ended by {}", by),
            Termination::ProtocolViolation { party, reason } => {
                write!(f, "protocol violation by {}: {}", party, reason)
            }
        }
    }
}

/// One action as it happened
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub turn: usize,
    pub round: u64,
    pub time: f64,
    pub party: PartyId,
    pub action: Action,
}

/// Per-party results
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartySummary {
    pub id: PartyId,
    pub strategy: String,
    /// Utility of the agreement, 0 without one
    pub utility: f64,
    pub offers_made: usize,
    /// Own utility of every offer received from the other parties
    pub offers_received: UtilityStats,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub domain: String,
    pub termination: Termination,
    pub agreement: Option<Outcome>,
    /// Completed rounds: every party had one turn per round
    pub rounds: u64,
    pub turns: usize,
    pub parties: Vec<PartySummary>,
    pub transcript: Vec<TranscriptEntry>,
}

impl SessionReport {
    pub fn is_agreement(&self) -> bool {
        matches!(self.termination, Termination::Agreement)
    }

    pub fn party(&self, id: &PartyId) -> Option<&PartySummary> {
        self.parties.iter().find(|summary| &summary.id == id)
    }

    /// Mean agreement utility over all parties
    pub fn social_welfare(&self) -> f64 {
        if self.parties.is_empty() {
            return 0.0;
        }
        self.parties.iter().map(|summary| summary.utility).sum::<f64>() / self.parties.len() as f64
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IssueId, Value};

    fn report() -> SessionReport {
        let outcome: Outcome = [(IssueId(1), Value::new("low"))].into_iter().collect();
        SessionReport {
            domain: "small".to_string(),
            termination: Termination::Agreement,
            agreement: Some(outcome.clone()),
            rounds: 3,
            turns: 7,
            parties: vec![
                PartySummary {
                    id: PartyId::new("a"),
                    strategy: "hardheaded".to_string(),
                    utility: 0.8,
                    offers_made: 3,
                    offers_received: UtilityStats::from_samples(&[0.2, 0.4]),
                },
                PartySummary {
                    id: PartyId::new("b"),
                    strategy: "responsive".to_string(),
                    utility: 0.4,
                    offers_made: 4,
                    offers_received: UtilityStats::from_samples(&[0.6]),
                },
            ],
            transcript: vec![TranscriptEntry {
                turn: 0,
                round: 0,
                time: 0.0,
                party: PartyId::new("a"),
                action: Action::Offer(outcome),
            }],
        }
    }

    #[test]
    fn test_report_summary() {
        let report = report();
        assert!(report.is_agreement());
        assert!((report.social_welfare() - 0.6).abs() < 1e-12);
        assert_eq!(report.party(&PartyId::new("b")).unwrap().offers_made, 4);
        assert!(report.party(&PartyId::new("z")).is_none());
    }

    #[test]
    fn test_report_serialization() {
        let report = report();
        let json = report.to_json().unwrap();
        let parsed: SessionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
        assert!(json.contains("\"kind\": \"agreement\""));
    }

    #[test]
    fn test_termination_display() {
        let violation = Termination::ProtocolViolation {
            party: PartyId::new("a"),
            reason: "accepted nothing".to_string(),
        };
        assert_eq!(violation.to_string(), "protocol violation by a: accepted nothing");
        assert_eq!(Termination::Deadline.to_string(), "deadline");
    }
}
