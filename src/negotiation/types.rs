//! Negotiation phases and the party contract

use super::session::SessionInfo;
use crate::error::Result;
use crate::types::{Action, ActionKind, PartyId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision engine state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Anchoring on the best outcome while gathering first signals
    Opening,
    /// Normal accept/offer loop
    Bargaining,
    /// An accept was emitted or the deadline was reached
    Terminal,
}

impl Phase {
    /// Check if the engine has stopped bargaining
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Terminal)
    }

    /// Check if the engine is still bargaining
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Opening => "opening",
            Phase::Bargaining => "bargaining",
            Phase::Terminal => "terminal",
        };
        write!(f, "{}", name)
    }
}

/// Callbacks a negotiation host drives a party through.
///
/// `init` is called once before any round. `receive_message` is called for
/// every action taken by any party, including this one. `choose_action` is
/// called on this party's turn and must return one of the allowed kinds.
pub trait Party: Send {
    fn id(&self) -> &PartyId;

    fn init(&mut self, info: SessionInfo) -> Result<()>;

    fn receive_message(&mut self, sender: &PartyId, action: &Action);

    fn choose_action(&mut self, allowed: &[ActionKind]) -> Action;

    /// Short human-readable strategy name
    fn description(&self) -> String;
}
