//! Normalised negotiation clocks

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Normalised elapsed time: 0 at the start, 1 at the deadline
pub trait Clock: Send + Sync {
    fn time(&self) -> f64;

    fn is_expired(&self) -> bool {
        self.time() >= 1.0
    }
}

/// Wall-clock deadline
#[derive(Debug, Clone)]
pub struct DeadlineClock {
    start: Instant,
    duration: Duration,
}

impl DeadlineClock {
    pub fn new(duration: Duration) -> Self {
        Self {
            start: Instant::now(),
            duration,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.start.elapsed())
    }
}

impl Clock for DeadlineClock {
    fn time(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.start.elapsed().as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}

/// Deadline expressed as a number of rounds, advanced by the host
#[derive(Debug)]
pub struct RoundClock {
    round: AtomicU64,
    total: u64,
}

impl RoundClock {
    pub fn new(total: u64) -> Self {
        Self {
            round: AtomicU64::new(0),
            total,
        }
    }

    /// Move to the next round, returning the new round number
    pub fn advance(&self) -> u64 {
        self.round.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn round(&self) -> u64 {
        self.round.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Clock for RoundClock {
    fn time(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.round() as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

/// Clock set explicitly by the caller
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn at(time: f64) -> Self {
        let clock = Self::default();
        clock.set(time);
        clock
    }

    pub fn set(&self, time: f64) {
        self.bits
            .store(time.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn time(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
