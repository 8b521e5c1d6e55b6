//! Domain layer for the analyzer job engine
//!
//! Job and step models, domain errors and the ports the orchestrator
//! depends on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
