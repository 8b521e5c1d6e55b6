//! Built-in index and report tools
//!
//! Default implementations behind the `index` and `report` subcommands. The
//! orchestrator still reaches them through the process runner like any other
//! external tool.

pub mod code_index;
pub mod findings_report;

pub use code_index::{build_index, write_index, IndexRecord};
pub use findings_report::{render_report, write_report};
