//! Online opponent modelling from observed proposals

pub mod concession;
pub mod frequency;
pub mod history;
pub mod model;
pub mod preference;
pub mod registry;
pub mod sigmoid;

pub use concession::ConcessionModel;
pub use frequency::FrequencyTable;
pub use history::{ActionHistory, HistoryEntry};
pub use model::{offer_weight, Observation, OpponentModel};
pub use preference::{observation_weight, PreferenceModel};
pub use registry::{OpponentRecord, OpponentRegistry};
pub use sigmoid::SigmoidModel;
