//! Port trait definitions (Hexagonal Architecture)
//!
//! - ProcessRunner: bounded execution of external commands
//! - StageAdapter: one pipeline capability (clone, scanner, index, report)
//! - TerminalHook: best-effort post-processing after a job finishes
//!
//! The orchestrator only talks to these traits, so tests can swap in scripted
//! runners and the production build wires in tokio processes.

pub mod process_runner;
pub mod stage_adapter;
pub mod terminal_hook;

pub use process_runner::{CommandSpec, ProcessError, ProcessOutput, ProcessRunner};
pub use stage_adapter::{StageAdapter, StageContext, StageError};
pub use terminal_hook::TerminalHook;
