//! School timetable generation: a constraint-satisfaction engine over a
//! declarative school configuration, plus the pre-flight and single-entry
//! validators, an in-memory generation queue and an HTTP surface around it.

pub mod config;
pub mod data;
pub mod entry_validator;
pub mod error;
pub mod preflight;
pub mod queue;
pub mod server;
pub mod solver;

#[cfg(test)]
mod fixtures;

pub use error::GenerationError;
pub use solver::{CancellationToken, ProgressSink, generate};
