//! Bounded random search for outcomes above a utility floor

use crate::config::SearchConfig;
use crate::domain::{Clock, UtilitySpace};
use crate::types::Outcome;
use rand::Rng;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};

/// Slack when comparing a floor against the utility range
const FLOOR_TOLERANCE: f64 = 1e-9;

/// Limits of one search
#[derive(Clone, Debug, PartialEq)]
pub struct SearchBudget {
    pub target_count: usize,
    pub max_samples: usize,
    pub stall_samples: usize,
    pub time_budget: Option<Duration>,
    pub idle_budget: Option<Duration>,
}

impl From<&SearchConfig> for SearchBudget {
    fn from(config: &SearchConfig) -> Self {
        Self {
            target_count: config.target_count.max(1),
            max_samples: config.max_samples,
            stall_samples: config.stall_samples.max(1),
            time_budget: config.time_budget_ms.map(Duration::from_millis),
            idle_budget: config.idle_budget_ms.map(Duration::from_millis),
        }
    }
}

/// Why a search stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    SampleLimit,
    /// Too many consecutive draws without a new qualifying outcome
    Stalled,
    TimeBudget,
    /// Wall-clock window since the last new qualifying outcome ran out
    IdleBudget,
    /// The negotiation deadline passed mid-search
    Deadline,
    /// The floor lies outside the reachable utility range
    FloorOutOfRange,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopReason::TargetReached => "target reached",
            StopReason::SampleLimit => "sample limit",
            StopReason::Stalled => "stalled",
            StopReason::TimeBudget => "time budget",
            StopReason::IdleBudget => "idle budget",
            StopReason::Deadline => "deadline",
            StopReason::FloorOutOfRange => "floor out of range",
        };
        write!(f, "{}", name)
    }
}

/// Result of one search: never empty, fail-safe first
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    candidates: Vec<Outcome>,
    pub draws: usize,
    pub stop: StopReason,
}

impl SearchOutcome {
    /// Every retained outcome, starting with the fail-safe seed
    pub fn candidates(&self) -> &[Outcome] {
        &self.candidates
    }

    pub fn fail_safe(&self) -> &Outcome {
        &self.candidates[0]
    }

    /// Retained outcomes found by sampling, excluding the fail-safe seed
    pub fn qualifying(&self) -> &[Outcome] {
        &self.candidates[1..]
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn into_candidates(self) -> Vec<Outcome> {
        self.candidates
    }
}

/// Samples uniformly random outcomes, keeping those at or above a floor
pub struct CandidateSearch<'a> {
    space: &'a dyn UtilitySpace,
    clock: &'a dyn Clock,
    budget: &'a SearchBudget,
}

impl<'a> CandidateSearch<'a> {
    pub fn new(space: &'a dyn UtilitySpace, clock: &'a dyn Clock, budget: &'a SearchBudget) -> Self {
        Self {
            space,
            clock,
            budget,
        }
    }

    /// Run one search.
    ///
    /// `fail_safe` seeds the result so it is never empty. `range` is the
    /// reachable `(min, max)` self-utility; a floor outside it returns the
    /// seed alone without drawing.
    pub fn run<R: Rng + ?Sized>(
        &self,
        floor: f64,
        fail_safe: Outcome,
        range: (f64, f64),
        rng: &mut R,
    ) -> SearchOutcome {
        let (min_utility, max_utility) = range;
        let mut candidates = vec![fail_safe];

        if !floor.is_finite()
            || floor > max_utility + FLOOR_TOLERANCE
            || floor < min_utility - FLOOR_TOLERANCE
        {
            tracing::trace!("Search floor {:.4} outside [{:.4}, {:.4}]", floor, min_utility, max_utility);
            return SearchOutcome {
                candidates,
                draws: 0,
                stop: StopReason::FloorOutOfRange,
            };
        }

        let mut seen: HashSet<Outcome> = candidates.iter().cloned().collect();
        let domain = self.space.domain();
        let started = Instant::now();
        let mut last_found = started;
        let mut draws = 0;
        let mut since_found = 0;

        let stop = loop {
            if candidates.len() >= self.budget.target_count {
                break StopReason::TargetReached;
            }
            if draws >= self.budget.max_samples {
                break StopReason::SampleLimit;
            }
            if since_found >= self.budget.stall_samples {
                break StopReason::Stalled;
            }
            if self.clock.is_expired() {
                break StopReason::Deadline;
            }
            if let Some(budget) = self.budget.time_budget {
                if started.elapsed() >= budget {
                    break StopReason::TimeBudget;
                }
            }
            if let Some(budget) = self.budget.idle_budget {
                if last_found.elapsed() >= budget {
                    break StopReason::IdleBudget;
                }
            }

            let outcome = domain.random_outcome(rng);
            draws += 1;
            since_found += 1;

            if self.space.utility(&outcome) >= floor && seen.insert(outcome.clone()) {
                candidates.push(outcome);
                since_found = 0;
                last_found = Instant::now();
            }
        };

        tracing::trace!(
            "Search kept {} of {} draws above {:.4} ({})",
            candidates.len() - 1,
            draws,
            floor,
            stop
        );

        SearchOutcome {
            candidates,
            draws,
            stop,
        }
    }
}
