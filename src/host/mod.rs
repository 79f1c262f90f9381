//! Tokio session host running several parties in one process

pub mod message;
pub mod report;
pub mod session;

pub use message::{PartyCommand, PartyHandle};
pub use report::{PartySummary, SessionReport, Termination, TranscriptEntry};
pub use session::{Deadline, Session, SessionBuilder};
