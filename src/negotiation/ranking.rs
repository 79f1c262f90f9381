//! Ranking of search candidates against opponent estimates

use crate::config::RankingConfig;
use crate::opponent::OpponentRegistry;
use crate::types::Outcome;

/// Everything a ranking needs to know about the current turn
#[derive(Clone, Copy)]
pub struct RankContext<'a> {
    pub opponents: &'a OpponentRegistry,
    /// Normalised time
    pub time: f64,
    /// Turns this party has taken
    pub rounds: u64,
    /// Current acceptance threshold
    pub threshold: f64,
}

/// Scores candidates; `None` whenever there is no opponent information to
/// score with, in which case the caller proposes its fail-safe
#[derive(Clone, Debug)]
pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Score of one candidate with our own utility `own`
    pub fn score(&self, outcome: &Outcome, own: f64, ctx: &RankContext<'_>) -> Option<f64> {
        match &self.config {
            RankingConfig::Blend {
                selfish_start,
                selfish_end,
                confidence,
            } => {
                let opponents = ctx.opponents.aggregate_score(outcome)?;
                let t = ctx.time.clamp(0.0, 1.0);
                let selfishness = selfish_start + (selfish_end - selfish_start) * t;
                let trust = confidence.map(|curve| curve.at(ctx.rounds)).unwrap_or(1.0);
                Some(selfishness * own + trust * opponents)
            }
            RankingConfig::Proximity {
                curve,
                accepted_weight,
                rejected_weight,
            } => {
                let mut informed = 0;
                let mut total = own - ctx.threshold;
                for record in ctx.opponents.informed() {
                    let Some(threshold) = record.history.predicted_threshold() else {
                        continue;
                    };
                    let distance = record.history.predicted_utility(outcome) - threshold;
                    total += proximity(distance, *curve, *accepted_weight, *rejected_weight);
                    informed += 1;
                }
                (informed > 0).then_some(total)
            }
        }
    }

    /// Highest-scoring candidate, the first one on ties
    pub fn best<'c, F>(&self, candidates: &'c [Outcome], utility: F, ctx: &RankContext<'_>) -> Option<&'c Outcome>
    where
        F: Fn(&Outcome) -> f64,
    {
        let mut best: Option<(&Outcome, f64)> = None;
        for candidate in candidates {
            let score = self.score(candidate, utility(candidate), ctx)?;
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((candidate, score)),
            }
        }
        best.map(|(outcome, _)| outcome)
    }
}

/// Peaks just above a party's predicted threshold: falls off quickly for
/// outcomes it would reject, slowly for ones it would accept
fn proximity(distance: f64, curve: f64, accepted_weight: f64, rejected_weight: f64) -> f64 {
    if distance >= 0.0 {
        1.0 / (curve * distance + 1.0 / accepted_weight)
    } else {
        1.0 / (-curve * distance + 1.0 / rejected_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfidenceCurve, ModelConfig};
    use crate::domain::space::tests::{buyer_space, small_domain};
    use crate::domain::UtilitySpace;
    use crate::types::{IssueId, PartyId, Value};

    fn outcome(price: &str, color: &str) -> Outcome {
        [
            (IssueId(1), Value::new(price)),
            (IssueId(2), Value::new(color)),
        ]
        .into_iter()
        .collect()
    }

    fn ctx(opponents: &OpponentRegistry) -> RankContext<'_> {
        RankContext {
            opponents,
            time: 0.5,
            rounds: 10,
            threshold: 0.5,
        }
    }

    fn seller(config: ModelConfig) -> OpponentRegistry {
        let mut registry = OpponentRegistry::new(config, small_domain());
        let seller = PartyId::new("seller");
        for i in 0..6 {
            registry.observe_offer(&seller, &outcome("high", "blue"), 0.1, 1.0, i as f64 / 10.0);
        }
        registry
    }

    #[test]
    fn test_no_information_means_no_ranking() {
        let empty = OpponentRegistry::new(ModelConfig::concession(), small_domain());
        let candidates = vec![outcome("low", "red"), outcome("high", "blue")];

        for config in [
            RankingConfig::opponent_only(),
            RankingConfig::Proximity {
                curve: 10.0,
                accepted_weight: 6.0,
                rejected_weight: 3.0,
            },
        ] {
            let ranker = Ranker::new(config);
            assert_eq!(ranker.score(&candidates[0], 1.0, &ctx(&empty)), None);
            assert_eq!(ranker.best(&candidates, |_| 1.0, &ctx(&empty)), None);
        }
    }

    #[test]
    fn test_opponent_only_prefers_opponent_bid() {
        let registry = seller(ModelConfig::concession());
        let space = buyer_space();
        let ranker = Ranker::new(RankingConfig::opponent_only());
        let candidates = vec![outcome("low", "red"), outcome("low", "blue"), outcome("high", "blue")];

        let best = ranker
            .best(&candidates, |o| space.utility(o), &ctx(&registry))
            .unwrap();
        assert_eq!(best, &outcome("high", "blue"));
    }

    #[test]
    fn test_selfish_blend_prefers_own_bid() {
        let registry = seller(ModelConfig::preference());
        let space = buyer_space();
        let ranker = Ranker::new(RankingConfig::Blend {
            selfish_start: 3.0,
            selfish_end: 2.5,
            confidence: Some(ConfidenceCurve {
                offset: 25.0,
                scale: 17.5,
            }),
        });
        let candidates = vec![outcome("high", "blue"), outcome("low", "red")];

        let best = ranker
            .best(&candidates, |o| space.utility(o), &ctx(&registry))
            .unwrap();
        assert_eq!(best, &outcome("low", "red"));
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let registry = seller(ModelConfig::concession());
        let ranker = Ranker::new(RankingConfig::opponent_only());
        let candidates = vec![outcome("low", "red"), outcome("low", "red")];

        let best = ranker.best(&candidates, |_| 0.5, &ctx(&registry)).unwrap();
        assert!(std::ptr::eq(best, &candidates[0]));
    }

    #[test]
    fn test_proximity_peaks_at_threshold() {
        let at = proximity(0.0, 10.0, 6.0, 3.0);
        assert!((at - 6.0).abs() < 1e-12);
        assert!(proximity(0.1, 10.0, 6.0, 3.0) < at);
        assert!(proximity(-0.1, 10.0, 6.0, 3.0) < proximity(0.1, 10.0, 6.0, 3.0));
    }

    #[test]
    fn test_proximity_ranking_scores_informed_opponents() {
        let registry = seller(ModelConfig::sigmoid());
        let ranker = Ranker::new(RankingConfig::Proximity {
            curve: 10.0,
            accepted_weight: 6.0,
            rejected_weight: 3.0,
        });
        let bid = outcome("high", "blue");

        // the seller's own bid sits exactly on its predicted threshold
        let score = ranker.score(&bid, 0.5, &ctx(&registry)).unwrap();
        assert!((score - 6.0).abs() < 1e-9);
    }
}
