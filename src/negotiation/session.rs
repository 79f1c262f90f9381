//! Per-party negotiation session state

use crate::domain::{Clock, UtilitySpace};
use crate::opponent::OpponentRegistry;
use crate::config::ModelConfig;
use crate::types::{Outcome, PartyId};
use rand::Rng;
use std::fmt;
use std::sync::Arc;

/// What the host hands a party at `init`
#[derive(Clone)]
pub struct SessionInfo {
    pub space: Arc<dyn UtilitySpace>,
    pub clock: Arc<dyn Clock>,
}

impl SessionInfo {
    pub fn new(space: Arc<dyn UtilitySpace>, clock: Arc<dyn Clock>) -> Self {
        Self { space, clock }
    }
}

impl fmt::Debug for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionInfo")
            .field("domain", &self.space.domain().name())
            .field("time", &self.clock.time())
            .finish()
    }
}

/// The latest offer made by an opponent that we could accept
#[derive(Clone, Debug, PartialEq)]
pub struct Pending {
    pub from: PartyId,
    pub outcome: Outcome,
    /// Our own utility of the outcome
    pub utility: f64,
}

/// State one party keeps for the lifetime of a session
pub struct PartySession {
    info: SessionInfo,
    max_outcome: Option<Outcome>,
    max_utility: f64,
    min_utility: f64,
    opponents: OpponentRegistry,
    pending: Option<Pending>,
    rounds: u64,
}

impl PartySession {
    /// Open a session, resolving our utility bounds.
    ///
    /// Accessor failures are recovered locally: without a best outcome the
    /// fail-safe becomes a random outcome, and missing bounds fall back to
    /// the full unit interval.
    pub fn open(info: SessionInfo, model: ModelConfig) -> Self {
        let space = info.space.as_ref();
        let max_outcome = match space.max_utility_outcome() {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!("Best outcome unavailable, falling back to random offers: {}", e);
                None
            }
        };
        let max_utility = max_outcome
            .as_ref()
            .map(|outcome| space.utility(outcome))
            .unwrap_or(1.0);
        let min_utility = match space.min_utility_outcome() {
            Ok(outcome) => space.utility(&outcome),
            Err(e) => {
                tracing::warn!("Worst outcome unavailable, assuming utility floor 0: {}", e);
                0.0
            }
        }
        .min(max_utility);

        let opponents = OpponentRegistry::new(model, space.domain().clone());

        Self {
            info,
            max_outcome,
            max_utility,
            min_utility,
            opponents,
            pending: None,
            rounds: 0,
        }
    }

    pub fn space(&self) -> &dyn UtilitySpace {
        self.info.space.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.info.clock.as_ref()
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn time(&self) -> f64 {
        self.info.clock.time()
    }

    pub fn utility(&self, outcome: &Outcome) -> f64 {
        self.info.space.utility(outcome)
    }

    pub fn max_outcome(&self) -> Option<&Outcome> {
        self.max_outcome.as_ref()
    }

    pub fn max_utility(&self) -> f64 {
        self.max_utility
    }

    pub fn min_utility(&self) -> f64 {
        self.min_utility
    }

    /// Outcome that is always safe to propose: the best one, or a random
    /// one if the accessor could not produce it
    pub fn fail_safe<R: Rng + ?Sized>(&self, rng: &mut R) -> Outcome {
        match &self.max_outcome {
            Some(outcome) => outcome.clone(),
            None => self.info.space.domain().random_outcome(rng),
        }
    }

    pub fn opponents(&self) -> &OpponentRegistry {
        &self.opponents
    }

    pub fn opponents_mut(&mut self) -> &mut OpponentRegistry {
        &mut self.opponents
    }

    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    pub fn set_pending(&mut self, pending: Pending) {
        self.pending = Some(pending);
    }

    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Number of turns this party has taken
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn start_turn(&mut self) -> u64 {
        self.rounds += 1;
        self.rounds
    }
}
