//! Bargain negotiation library
//!
//! Autonomous agents for multi-party, multi-issue negotiation under the
//! stacked alternating offers protocol:
//! - frequency-based opponent models (concession, sigmoid and preference)
//! - time-dependent acceptance thresholds
//! - bounded candidate search and opponent-aware ranking
//! - a per-party decision engine and a strategy selector
//! - an in-process tokio host that runs sessions and reports on them

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod host;
pub mod negotiation;
pub mod opponent;
pub mod types;

// Re-export commonly used types
pub use config::{NegotiatorConfig, Preset, SelectorConfig};
pub use domain::{AdditiveUtilitySpace, Clock, Domain, UtilityProfile, UtilitySpace};
pub use error::{NegotiatorError, Result};
pub use host::{Deadline, Session, SessionReport, Termination};
pub use negotiation::{NegotiationEngine, Party, Phase, StrategySelector};
pub use types::{Action, ActionKind, IssueId, Outcome, PartyId, Value};
