//! Inbound adapters that expose the job service to the outside world.

pub mod http;
