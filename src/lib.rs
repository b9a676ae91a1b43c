pub mod aggregate;
pub mod breakdown;
pub mod classify;
pub mod config;
pub mod delivery;
pub mod error;
pub mod event_store;
pub mod form;
pub mod head_to_head;
pub mod partnership;
pub mod phase;
pub mod report;
pub mod sqlite_store;
pub mod telemetry;
pub mod win_prob;

pub use error::{Analysis, EngineError, EngineResult};
