//! Decision engine: one negotiating party driven by the session host

use crate::config::NegotiatorConfig;
use crate::error::Result;
use crate::opponent::offer_weight;
use crate::types::{Action, ActionKind, Outcome, PartyId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::ranking::{RankContext, Ranker};
use super::search::{CandidateSearch, SearchBudget};
use super::session::{PartySession, Pending, SessionInfo};
use super::threshold::{ThresholdContext, ThresholdPolicy};
use super::types::{Party, Phase};

/// Frequency-modelling negotiator.
///
/// Anchors on its best outcome during the opening, then accepts any pending
/// offer at or above its time-dependent threshold and otherwise proposes the
/// best-ranked outcome among those above the threshold.
pub struct NegotiationEngine {
    id: PartyId,
    config: NegotiatorConfig,
    threshold: ThresholdPolicy,
    ranker: Ranker,
    budget: SearchBudget,
    rng: StdRng,
    phase: Phase,
    session: Option<PartySession>,
    label: String,
}

impl NegotiationEngine {
    /// Create an engine with a validated configuration
    pub fn new(id: PartyId, config: NegotiatorConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            id,
            threshold: ThresholdPolicy::new(config.threshold.clone()),
            ranker: Ranker::new(config.ranking.clone()),
            budget: SearchBudget::from(&config.search),
            rng,
            phase: Phase::Opening,
            session: None,
            label: "custom".to_string(),
            config,
        })
    }

    /// Name reported by [`Party::description`]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&PartySession> {
        self.session.as_ref()
    }

    /// Acceptance threshold at the current time, once initialised
    pub fn current_threshold(&self) -> Option<f64> {
        let session = self.session.as_ref()?;
        Some(self.threshold_at(session, session.time()))
    }

    fn threshold_at(&self, session: &PartySession, time: f64) -> f64 {
        let ctx = ThresholdContext::new(session.min_utility(), session.max_utility())
            .with_opponent_floor(session.opponents().offered_floor());
        self.threshold.threshold(time, &ctx)
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::info!("{} moves from {} to {}", self.id, self.phase, phase);
            self.phase = phase;
        }
    }

    /// Re-derive the phase from the clock at the start of a turn
    fn advance_phase(&mut self, time: f64, expired: bool) {
        let next = match self.phase {
            _ if expired => Phase::Terminal,
            Phase::Opening if time >= self.config.opening_fraction => Phase::Bargaining,
            Phase::Terminal => Phase::Bargaining,
            phase => phase,
        };
        self.set_phase(next);
    }

    fn decide(&mut self, time: f64) -> Action {
        let Some(session) = self.session.as_ref() else {
            return Action::EndNegotiation;
        };

        if self.phase == Phase::Opening {
            let anchor = session.fail_safe(&mut self.rng);
            tracing::debug!("{} anchors on {}", self.id, anchor);
            return Action::Offer(anchor);
        }

        let threshold = self.threshold_at(session, time);
        if let Some(pending) = session.pending() {
            if pending.utility >= threshold {
                tracing::debug!(
                    "{} accepts {} from {} ({:.4} >= {:.4})",
                    self.id,
                    pending.outcome,
                    pending.from,
                    pending.utility,
                    threshold
                );
                return Action::Accept(pending.outcome.clone());
            }
        }

        if self.phase == Phase::Terminal {
            // deadline reached: nothing left to search for
            return Action::Offer(session.fail_safe(&mut self.rng));
        }

        self.propose(threshold)
            .map(Action::Offer)
            .unwrap_or(Action::EndNegotiation)
    }

    /// Search above `threshold` and pick the outcome to offer
    fn propose(&mut self, threshold: f64) -> Option<Outcome> {
        let session = self.session.as_ref()?;
        let fail_safe = session.fail_safe(&mut self.rng);
        let range = (session.min_utility(), session.max_utility());
        let search = CandidateSearch::new(session.space(), session.clock(), &self.budget);
        let result = search.run(threshold, fail_safe, range, &mut self.rng);

        tracing::debug!(
            "{} found {} candidates above {:.4} in {} draws ({})",
            self.id,
            result.len(),
            threshold,
            result.draws,
            result.stop
        );

        if result.qualifying().is_empty() {
            return Some(result.fail_safe().clone());
        }
        if !session.opponents().has_observations() {
            tracing::debug!("{} has no opponent information, proposing best outcome", self.id);
            return Some(result.fail_safe().clone());
        }

        if self.rng.gen::<f64>() < self.config.epsilon {
            if let Some(explore) = result.qualifying().choose(&mut self.rng) {
                tracing::debug!("{} explores with {}", self.id, explore);
                return Some(explore.clone());
            }
        }

        let ctx = RankContext {
            opponents: session.opponents(),
            time: session.time(),
            rounds: session.rounds(),
            threshold,
        };
        let chosen = match self
            .ranker
            .best(result.candidates(), |outcome| session.utility(outcome), &ctx)
        {
            Some(best) => best.clone(),
            None => {
                tracing::debug!("{} has no opponent information, proposing best outcome", self.id);
                result.fail_safe().clone()
            }
        };
        Some(chosen)
    }

    /// Make sure the returned action is one the host allows
    fn conform(&mut self, action: Action, allowed: &[ActionKind]) -> Action {
        if allowed.is_empty() || allowed.contains(&action.kind()) {
            return action;
        }
        tracing::debug!("{} may not {}, allowed {:?}", self.id, action.kind(), allowed);

        if allowed.contains(&ActionKind::Offer) {
            if let Some(session) = self.session.as_ref() {
                return Action::Offer(session.fail_safe(&mut self.rng));
            }
        }
        if allowed.contains(&ActionKind::Accept) {
            if let Some(pending) = self.session.as_ref().and_then(|s| s.pending()) {
                return Action::Accept(pending.outcome.clone());
            }
        }
        Action::EndNegotiation
    }
}

impl Party for NegotiationEngine {
    fn id(&self) -> &PartyId {
        &self.id
    }

    fn init(&mut self, info: SessionInfo) -> Result<()> {
        let session = PartySession::open(info, self.config.model.clone());
        tracing::info!(
            "{} joins {} (utility range [{:.4}, {:.4}])",
            self.id,
            session.space().domain().name(),
            session.min_utility(),
            session.max_utility()
        );
        self.session = Some(session);
        self.phase = Phase::Opening;
        Ok(())
    }

    fn receive_message(&mut self, sender: &PartyId, action: &Action) {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("{} ignores {} before init", self.id, action);
            return;
        };

        if sender == &self.id {
            // our own offer replaces whatever was on the table
            if matches!(action, Action::Offer(_)) {
                session.clear_pending();
            }
            return;
        }

        let time = session.time();
        match action {
            Action::Offer(outcome) => {
                let utility = session.utility(outcome);
                let weight = offer_weight(&self.config.model, session.rounds());
                session
                    .opponents_mut()
                    .observe_offer(sender, outcome, utility, weight, time);
                session.set_pending(Pending {
                    from: sender.clone(),
                    outcome: outcome.clone(),
                    utility,
                });
                tracing::debug!("{} received {} from {} worth {:.4}", self.id, outcome, sender, utility);

                if self.phase.is_terminal() && !session.clock().is_expired() {
                    self.set_phase(Phase::Bargaining);
                }
            }
            Action::Accept(outcome) => {
                let utility = session.utility(outcome);
                session
                    .opponents_mut()
                    .observe_action(sender, action, utility, time);
            }
            Action::EndNegotiation => {
                session
                    .opponents_mut()
                    .observe_action(sender, action, 0.0, time);
                tracing::debug!("{} saw {} walk away", self.id, sender);
            }
        }
    }

    fn choose_action(&mut self, allowed: &[ActionKind]) -> Action {
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("{} asked to act before init", self.id);
            return Action::EndNegotiation;
        };
        session.start_turn();
        let time = session.time();
        let expired = session.clock().is_expired();

        self.advance_phase(time, expired);
        let action = self.decide(time);
        let action = self.conform(action, allowed);

        match &action {
            Action::Accept(_) => self.set_phase(Phase::Terminal),
            Action::Offer(_) => {
                if let Some(session) = self.session.as_mut() {
                    session.clear_pending();
                }
            }
            Action::EndNegotiation => self.set_phase(Phase::Terminal),
        }
        action
    }

    fn description(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, Preset, ThresholdConfig};
    use crate::domain::space::tests::{buyer_space, profile, small_domain};
    use crate::domain::{AdditiveUtilitySpace, ManualClock, UtilitySpace};
    use crate::negotiation::session::tests::BrokenSpace;
    use crate::types::{IssueId, Value};
    use std::sync::Arc;

    const BOTH: [ActionKind; 2] = [ActionKind::Accept, ActionKind::Offer];

    fn outcome(price: &str, color: &str) -> Outcome {
        [
            (IssueId(1), Value::new(price)),
            (IssueId(2), Value::new(color)),
        ]
        .into_iter()
        .collect()
    }

    fn engine(config: NegotiatorConfig) -> NegotiationEngine {
        NegotiationEngine::new(PartyId::new("buyer"), config.with_seed(11)).unwrap()
    }

    fn start(
        engine: &mut NegotiationEngine,
        space: impl UtilitySpace + 'static,
        time: f64,
    ) -> Arc<ManualClock> {
        let clock = Arc::new(ManualClock::at(time));
        engine
            .init(SessionInfo::new(Arc::new(space), clock.clone()))
            .unwrap();
        clock
    }

    /// Buyer whose utility for low/blue is exactly 0.9
    fn picky_space() -> AdditiveUtilitySpace {
        AdditiveUtilitySpace::new(
            small_domain(),
            profile(
                "picky",
                &[
                    (1, 0.6, &[("low", 1.0), ("high", 0.0)]),
                    (2, 0.4, &[("red", 1.0), ("blue", 0.75)]),
                ],
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = NegotiatorConfig::default();
        config.opening_fraction = 2.0;
        assert!(NegotiationEngine::new(PartyId::new("x"), config).is_err());
    }

    #[test]
    fn test_opening_offer_is_best_outcome() {
        for preset in Preset::ALL {
            let mut engine = engine(preset.config());
            start(&mut engine, buyer_space(), 0.0);

            let action = engine.choose_action(&BOTH);
            assert_eq!(action, Action::Offer(outcome("low", "red")), "{}", preset);
            assert_eq!(engine.phase(), Phase::Opening);
        }
    }

    #[test]
    fn test_accepts_pending_above_threshold() {
        let mut config = Preset::Hardheaded.config();
        config.threshold = ThresholdConfig::Piecewise {
            soften_point: 0.5,
            min_negotiable: 0.6,
            hard_floor: 0.6,
            greed: None,
        };
        let mut engine = engine(config);
        start(&mut engine, picky_space(), 0.75);

        let offer = outcome("low", "blue");
        engine.receive_message(&PartyId::new("seller"), &Action::Offer(offer.clone()));

        assert!((engine.current_threshold().unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(engine.choose_action(&BOTH), Action::Accept(offer));
        assert_eq!(engine.phase(), Phase::Terminal);
    }

    #[test]
    fn test_counter_offers_above_threshold() {
        let mut config = Preset::Hardheaded.config();
        config.epsilon = 0.0;
        let mut engine = engine(config);
        let clock = start(&mut engine, buyer_space(), 0.2);
        let space = buyer_space();

        let seller = PartyId::new("seller");
        for _ in 0..3 {
            engine.receive_message(&seller, &Action::Offer(outcome("high", "blue")));
        }
        clock.set(0.8);

        let threshold = engine.current_threshold().unwrap();
        match engine.choose_action(&BOTH) {
            Action::Offer(bid) => assert!(space.utility(&bid) >= threshold - 1e-9),
            other => panic!("expected a counter offer, got {}", other),
        }
        assert_eq!(engine.phase(), Phase::Bargaining);
        assert!(engine.session().unwrap().pending().is_none());
    }

    #[test]
    fn test_without_opponents_proposes_best_outcome() {
        let mut config = Preset::Hardheaded.config();
        config.epsilon = 0.0;
        let mut engine = engine(config);
        start(&mut engine, buyer_space(), 0.9);

        assert_eq!(
            engine.choose_action(&BOTH),
            Action::Offer(outcome("low", "red"))
        );
    }

    #[test]
    fn test_without_opponents_never_explores() {
        for seed in 0..50 {
            let mut config = Preset::Hardheaded.config();
            config.epsilon = 1.0;
            let mut engine = NegotiationEngine::new(PartyId::new("buyer"), config.with_seed(seed)).unwrap();
            start(&mut engine, buyer_space(), 0.95);

            assert_eq!(
                engine.choose_action(&BOTH),
                Action::Offer(outcome("low", "red")),
                "seed {}",
                seed
            );
        }
    }

    #[test]
    fn test_explores_once_opponents_are_known() {
        let mut config = Preset::Hardheaded.config();
        config.epsilon = 1.0;
        config.threshold = ThresholdConfig::Piecewise {
            soften_point: 0.5,
            min_negotiable: 0.0,
            hard_floor: 0.0,
            greed: None,
        };
        let mut engine = engine(config);
        start(&mut engine, buyer_space(), 0.9);
        let seller = PartyId::new("seller");

        engine.receive_message(&seller, &Action::Offer(outcome("high", "blue")));
        let mut offered = std::collections::HashSet::new();
        for _ in 0..40 {
            match engine.choose_action(&[ActionKind::Offer]) {
                Action::Offer(bid) => {
                    offered.insert(bid);
                }
                other => panic!("expected an offer, got {}", other),
            }
        }
        assert!(offered.len() > 1);
    }

    #[test]
    fn test_accessor_failure_falls_back_to_random_outcome() {
        let mut engine = engine(Preset::Hardheaded.config());
        start(&mut engine, BrokenSpace::new(), 0.0);

        match engine.choose_action(&BOTH) {
            Action::Offer(bid) => assert!(small_domain().validate(&bid).is_ok()),
            other => panic!("expected an offer, got {}", other),
        }
    }

    #[test]
    fn test_choose_before_init_ends_negotiation() {
        let mut engine = engine(Preset::Hardheaded.config());
        assert_eq!(engine.choose_action(&BOTH), Action::EndNegotiation);
    }

    #[test]
    fn test_own_messages_do_not_feed_the_model() {
        let mut engine = engine(Preset::Hardheaded.config());
        start(&mut engine, buyer_space(), 0.5);

        let me = PartyId::new("buyer");
        engine.receive_message(&me, &Action::Offer(outcome("low", "red")));

        let session = engine.session().unwrap();
        assert!(session.opponents().is_empty());
        assert!(session.pending().is_none());
    }

    #[test]
    fn test_new_offer_reopens_after_accept() {
        let mut config = Preset::Hardheaded.config();
        config.threshold = ThresholdConfig::Piecewise {
            soften_point: 0.5,
            min_negotiable: 0.6,
            hard_floor: 0.6,
            greed: None,
        };
        let mut engine = engine(config);
        start(&mut engine, picky_space(), 0.75);
        let seller = PartyId::new("seller");

        engine.receive_message(&seller, &Action::Offer(outcome("low", "blue")));
        assert!(matches!(engine.choose_action(&BOTH), Action::Accept(_)));
        assert!(engine.phase().is_terminal());

        engine.receive_message(&seller, &Action::Offer(outcome("high", "blue")));
        assert_eq!(engine.phase(), Phase::Bargaining);
        assert!(matches!(engine.choose_action(&BOTH), Action::Offer(_)));
    }

    #[test]
    fn test_deadline_is_terminal() {
        let mut engine = engine(Preset::Responsive.config());
        start(&mut engine, buyer_space(), 1.0);
        engine.receive_message(&PartyId::new("seller"), &Action::Offer(outcome("high", "blue")));

        let action = engine.choose_action(&BOTH);
        assert_eq!(engine.phase(), Phase::Terminal);
        // threshold bottoms out at the hard floor, above what the seller offers
        assert_eq!(action, Action::Offer(outcome("low", "red")));
    }

    #[test]
    fn test_respects_allowed_actions() {
        let mut engine = engine(Preset::Hardheaded.config());
        start(&mut engine, buyer_space(), 0.0);

        assert_eq!(
            engine.choose_action(&[ActionKind::EndNegotiation]),
            Action::EndNegotiation
        );
    }

    #[test]
    fn test_model_variant_follows_config() {
        let mut config = Preset::Hardheaded.config();
        config.model = ModelConfig::sigmoid();
        let mut engine = engine(config);
        start(&mut engine, buyer_space(), 0.5);

        let seller = PartyId::new("seller");
        engine.receive_message(&seller, &Action::Offer(outcome("high", "blue")));
        let record = engine.session().unwrap().opponents().get(&seller).unwrap();
        assert_eq!(record.model.name(), "sigmoid");
    }
}
