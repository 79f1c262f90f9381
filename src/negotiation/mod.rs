//! Acceptance threshold, candidate search and the decision engine

pub mod engine;
pub mod ranking;
pub mod search;
pub mod selector;
pub mod session;
pub mod threshold;
pub mod types;

pub use engine::NegotiationEngine;
pub use ranking::{RankContext, Ranker};
pub use search::{CandidateSearch, SearchBudget, SearchOutcome, StopReason};
pub use selector::StrategySelector;
pub use session::{PartySession, Pending, SessionInfo};
pub use threshold::{ThresholdContext, ThresholdPolicy};
pub use types::{Party, Phase};
