//! Deadline-aware acceptance threshold

use crate::config::ThresholdConfig;

/// Inputs besides time that shape the threshold
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdContext {
    pub max_utility: f64,
    pub min_utility: f64,
    /// Highest self-utility among the worst recent offers of each opponent
    pub opponent_floor: Option<f64>,
}

impl ThresholdContext {
    pub fn new(min_utility: f64, max_utility: f64) -> Self {
        Self {
            max_utility,
            min_utility,
            opponent_floor: None,
        }
    }

    pub fn with_opponent_floor(mut self, floor: Option<f64>) -> Self {
        self.opponent_floor = floor;
        self
    }

    fn bounds(&self) -> (f64, f64) {
        let hi = self.max_utility;
        let lo = self.min_utility.min(hi);
        (lo, hi)
    }
}

/// Maps normalised time to the self-utility a proposal must reach to be
/// accepted. Non-increasing in time and always within
/// `[min_utility, max_utility]`; no smoothing across rounds.
#[derive(Clone, Debug)]
pub struct ThresholdPolicy {
    config: ThresholdConfig,
}

impl ThresholdPolicy {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    pub fn threshold(&self, time: f64, ctx: &ThresholdContext) -> f64 {
        let t = if time.is_nan() { 1.0 } else { time.clamp(0.0, 1.0) };
        let (lo, hi) = ctx.bounds();

        let value = match self.config {
            ThresholdConfig::Boulware { concession_rate } => {
                hi - (hi - lo) * t.powf(1.0 / concession_rate)
            }
            ThresholdConfig::Piecewise {
                soften_point,
                min_negotiable,
                hard_floor,
                greed,
            } => {
                let base = piecewise(t, lo, hi, soften_point, min_negotiable, hard_floor);
                match (greed, ctx.opponent_floor) {
                    (Some(greed), Some(floor)) => base.max((floor * greed).min(hi)),
                    _ => base,
                }
            }
        };
        value.clamp(lo, hi)
    }

    /// `steps + 1` evenly spaced samples of the curve from t=0 to t=1
    pub fn curve(&self, steps: usize, ctx: &ThresholdContext) -> Vec<(f64, f64)> {
        let steps = steps.max(1);
        (0..=steps)
            .map(|i| {
                let t = i as f64 / steps as f64;
                (t, self.threshold(t, ctx))
            })
            .collect()
    }
}

/// Linear from `hi` to the negotiable minimum at `soften_point`, then linear
/// to the hard floor at the deadline
fn piecewise(t: f64, lo: f64, hi: f64, soften_point: f64, min_negotiable: f64, hard_floor: f64) -> f64 {
    let negotiable = min_negotiable.clamp(lo, hi);
    let floor = hard_floor.clamp(lo, negotiable);

    if t <= soften_point {
        hi - (hi - negotiable) * (t / soften_point)
    } else if soften_point >= 1.0 {
        negotiable
    } else {
        negotiable - (negotiable - floor) * ((t - soften_point) / (1.0 - soften_point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;

    const EPS: f64 = 1e-9;

    fn policies() -> Vec<ThresholdPolicy> {
        let mut policies: Vec<ThresholdPolicy> = Preset::ALL
            .iter()
            .map(|preset| ThresholdPolicy::new(preset.config().threshold))
            .collect();
        policies.push(ThresholdPolicy::new(ThresholdConfig::Piecewise {
            soften_point: 1.0,
            min_negotiable: 0.7,
            hard_floor: 0.7,
            greed: None,
        }));
        policies
    }

    fn contexts() -> Vec<ThresholdContext> {
        vec![
            ThresholdContext::new(0.0, 1.0),
            ThresholdContext::new(0.1, 0.9),
            ThresholdContext::new(0.3, 1.0).with_opponent_floor(Some(0.6)),
            ThresholdContext::new(0.5, 0.5),
            // inverted bounds are collapsed onto the maximum
            ThresholdContext::new(0.8, 0.4),
        ]
    }

    #[test]
    fn test_monotone_non_increasing() {
        for policy in policies() {
            for ctx in contexts() {
                let curve = policy.curve(400, &ctx);
                for pair in curve.windows(2) {
                    assert!(
                        pair[1].1 <= pair[0].1 + EPS,
                        "{:?} rises at t={} under {:?}",
                        policy.config(),
                        pair[1].0,
                        ctx
                    );
                }
            }
        }
    }

    #[test]
    fn test_boundaries() {
        for policy in policies() {
            for ctx in contexts() {
                let (lo, hi) = ctx.bounds();
                assert!((policy.threshold(0.0, &ctx) - hi).abs() < EPS);
                assert!(policy.threshold(1.0, &ctx) >= lo - EPS);
                for (_, value) in policy.curve(50, &ctx) {
                    assert!(value >= lo - EPS && value <= hi + EPS);
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_time_is_clamped() {
        let policy = ThresholdPolicy::new(ThresholdConfig::boulware());
        let ctx = ThresholdContext::new(0.2, 1.0);

        assert_eq!(policy.threshold(-3.0, &ctx), policy.threshold(0.0, &ctx));
        assert_eq!(policy.threshold(7.0, &ctx), policy.threshold(1.0, &ctx));
        assert_eq!(policy.threshold(f64::NAN, &ctx), policy.threshold(1.0, &ctx));
    }

    #[test]
    fn test_boulware_stays_high_then_drops() {
        let policy = ThresholdPolicy::new(ThresholdConfig::boulware());
        let ctx = ThresholdContext::new(0.0, 1.0);

        assert!(policy.threshold(0.5, &ctx) > 0.85);
        assert!((policy.threshold(1.0, &ctx) - 0.0).abs() < EPS);
    }

    #[test]
    fn test_piecewise_is_continuous_at_soften_point() {
        let policy = ThresholdPolicy::new(ThresholdConfig::Piecewise {
            soften_point: 0.85,
            min_negotiable: 0.825,
            hard_floor: 0.75,
            greed: None,
        });
        let ctx = ThresholdContext::new(0.0, 1.0);

        let before = policy.threshold(0.85 - 1e-9, &ctx);
        let at = policy.threshold(0.85, &ctx);
        let after = policy.threshold(0.85 + 1e-9, &ctx);
        assert!((at - 0.825).abs() < EPS);
        assert!((before - at).abs() < 1e-6);
        assert!((after - at).abs() < 1e-6);
        assert!((policy.threshold(1.0, &ctx) - 0.75).abs() < EPS);
    }

    #[test]
    fn test_greed_keeps_threshold_above_opponent_offers() {
        let policy = ThresholdPolicy::new(ThresholdConfig::Piecewise {
            soften_point: 0.95,
            min_negotiable: 0.905,
            hard_floor: 0.5,
            greed: Some(1.1),
        });
        let plain = ThresholdContext::new(0.0, 1.0);
        let informed = plain.with_opponent_floor(Some(0.8));

        let late = 0.99;
        assert!(policy.threshold(late, &plain) < 0.88);
        assert!((policy.threshold(late, &informed) - 0.88).abs() < EPS);

        // never above the maximum, whatever opponents offer
        let generous = plain.with_opponent_floor(Some(0.99));
        assert!((policy.threshold(late, &generous) - 1.0).abs() < EPS);
    }
}
