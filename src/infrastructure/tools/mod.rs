//! Stage adapters wrapping the external tools
//!
//! Each adapter turns a stage of a job into one or more process runner
//! invocations and reports the artifacts it left behind.

pub mod availability;
pub mod clone;
pub mod pipeline;
pub mod scanners;
pub mod toolchain;

pub use availability::{capability_availability, ToolProbe};
pub use clone::{authenticated_url, GitCloneAdapter};
pub use pipeline::{IndexAdapter, ReportAdapter};
pub use scanners::{DependencyScanAdapter, GitleaksAdapter, SemgrepAdapter};
pub use toolchain::Toolchain;
