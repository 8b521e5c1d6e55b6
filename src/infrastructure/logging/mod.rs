//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty stdout formatting
//! - Rolling file output
//! - Credential redaction for URLs and tool output

pub mod logger;
pub mod secret_scrubbing;

pub use logger::{init_stderr, LoggerImpl};
pub use secret_scrubbing::{redact_url, SecretScrubber};
