//! Outcome space, utility evaluation and negotiation clocks

pub mod clock;
pub mod space;

pub use clock::{Clock, DeadlineClock, ManualClock, RoundClock};
pub use space::{
    AdditiveUtilitySpace, Domain, Issue, IssueEvaluator, UtilityProfile, UtilitySpace,
};
