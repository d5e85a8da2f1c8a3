//! Room coordination core.

pub mod code;
pub mod coordinator;
pub mod deck;
pub mod filters;
pub mod ledger;
pub mod lifecycle;

pub use coordinator::{MatchedMovie, PollSnapshot, RoomCoordinator, SubmitOutcome};
